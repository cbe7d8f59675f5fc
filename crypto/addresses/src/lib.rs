mod bech32;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, PartialEq, Eq, Debug, Clone)]
pub enum AddressError {
    #[error("Invalid address prefix {0}")]
    InvalidPrefix(String),

    #[error("Address prefix is missing")]
    MissingPrefix,

    #[error("Invalid address version {0}")]
    InvalidVersion(u8),

    #[error("Invalid character {0}")]
    DecodingError(char),

    #[error("Checksum is invalid")]
    BadChecksum,

    #[error("Invalid address payload length {1} for version {0:?}")]
    InvalidPayloadLength(Version, usize),
}

/// The human-readable network prefix of an address
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum Prefix {
    Mainnet,
    Testnet,
    Simnet,
    Devnet,
}

impl Prefix {
    fn as_str(&self) -> &'static str {
        match self {
            Prefix::Mainnet => "kaspa",
            Prefix::Testnet => "kaspatest",
            Prefix::Simnet => "kaspasim",
            Prefix::Devnet => "kaspadev",
        }
    }
}

impl Display for Prefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Prefix {
    type Error = AddressError;

    fn try_from(prefix: &str) -> Result<Self, Self::Error> {
        match prefix {
            "kaspa" => Ok(Prefix::Mainnet),
            "kaspatest" => Ok(Prefix::Testnet),
            "kaspasim" => Ok(Prefix::Simnet),
            "kaspadev" => Ok(Prefix::Devnet),
            _ => Err(AddressError::InvalidPrefix(prefix.to_string())),
        }
    }
}

/// Address version determining the payload interpretation
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[repr(u8)]
#[borsh(use_discriminant = true)]
pub enum Version {
    /// 32-byte schnorr public key
    PubKey = 0,
    /// 33-byte compressed ECDSA public key
    PubKeyEcdsa = 1,
    /// 20-byte script hash
    ScriptHash = 8,
}

impl Version {
    pub fn payload_len(&self) -> usize {
        match self {
            Version::PubKey => 32,
            Version::PubKeyEcdsa => 33,
            Version::ScriptHash => 20,
        }
    }
}

impl TryFrom<u8> for Version {
    type Error = AddressError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Version::PubKey),
            1 => Ok(Version::PubKeyEcdsa),
            8 => Ok(Version::ScriptHash),
            _ => Err(AddressError::InvalidVersion(value)),
        }
    }
}

pub type PayloadVec = SmallVec<[u8; 36]>;

/// A Kaspa address: network prefix, payload version and raw payload,
/// rendered as `prefix:bech32(version || payload || checksum)`
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct Address {
    pub prefix: Prefix,
    pub version: Version,
    pub payload: PayloadVec,
}

// Borsh serializers need to be manually implemented for `Address` since
// smallvec does not currently support Borsh
impl BorshSerialize for Address {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        borsh::BorshSerialize::serialize(&self.prefix, writer)?;
        borsh::BorshSerialize::serialize(&self.version, writer)?;
        borsh::BorshSerialize::serialize(&self.payload.as_slice(), writer)?;
        Ok(())
    }
}

impl BorshDeserialize for Address {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let prefix: Prefix = borsh::BorshDeserialize::deserialize_reader(reader)?;
        let version: Version = borsh::BorshDeserialize::deserialize_reader(reader)?;
        let payload: Vec<u8> = borsh::BorshDeserialize::deserialize_reader(reader)?;
        Ok(Self::new(prefix, version, &payload))
    }
}

impl Address {
    pub fn new(prefix: Prefix, version: Version, payload: &[u8]) -> Self {
        debug_assert_eq!(payload.len(), version.payload_len(), "invalid payload length for version {version:?}");
        Self { prefix, version, payload: PayloadVec::from_slice(payload) }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.encode_payload())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(address_str: &str) -> Result<Self, Self::Err> {
        let Some((prefix, payload)) = address_str.split_once(':') else {
            return Err(AddressError::MissingPrefix);
        };
        let address = Self::decode_payload(Prefix::try_from(prefix)?, payload)?;
        if address.payload.len() != address.version.payload_len() {
            return Err(AddressError::InvalidPayloadLength(address.version, address.payload.len()));
        }
        Ok(address)
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Address::from_str(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        for version in [Version::PubKey, Version::PubKeyEcdsa, Version::ScriptHash] {
            let payload: Vec<u8> = (0..version.payload_len() as u8).collect();
            for prefix in [Prefix::Mainnet, Prefix::Testnet, Prefix::Simnet, Prefix::Devnet] {
                let address = Address::new(prefix, version, &payload);
                let encoded = address.to_string();
                assert!(encoded.starts_with(&format!("{prefix}:")));
                let decoded: Address = encoded.parse().unwrap();
                assert_eq!(address, decoded);
            }
        }
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let address = Address::new(Prefix::Mainnet, Version::PubKey, &[7u8; 32]);
        let mut encoded = address.to_string();
        // Corrupt the last character deterministically
        let last = encoded.pop().unwrap();
        let replacement = if last == 'q' { 'p' } else { 'q' };
        encoded.push(replacement);
        assert_eq!(encoded.parse::<Address>(), Err(AddressError::BadChecksum));
    }

    #[test]
    fn test_missing_or_invalid_prefix() {
        assert_eq!("qqqqqq".parse::<Address>(), Err(AddressError::MissingPrefix));
        assert!(matches!("bitcoincash:qqqq".parse::<Address>(), Err(AddressError::InvalidPrefix(_))));
    }

    #[test]
    fn test_invalid_character() {
        assert!(matches!("kaspa:qqqqqqq1qq".parse::<Address>(), Err(AddressError::DecodingError('1'))));
    }
}
