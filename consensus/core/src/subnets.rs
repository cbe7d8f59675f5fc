use borsh::{BorshDeserialize, BorshSerialize};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// The size of the array used to store subnetwork IDs
pub const SUBNETWORK_ID_SIZE: usize = 20;

/// The domain representation of a Subnetwork ID
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, BorshSerialize, BorshDeserialize)]
pub struct SubnetworkId([u8; SUBNETWORK_ID_SIZE]);

/// The default subnetwork ID used for transactions without related payload data
pub const SUBNETWORK_ID_NATIVE: SubnetworkId = SubnetworkId::from_byte(0);

/// The subnetwork ID used for the coinbase transaction
pub const SUBNETWORK_ID_COINBASE: SubnetworkId = SubnetworkId::from_byte(1);

/// The subnetwork ID used for adding new subnetworks to the registry
pub const SUBNETWORK_ID_REGISTRY: SubnetworkId = SubnetworkId::from_byte(2);

impl SubnetworkId {
    pub const fn from_byte(b: u8) -> SubnetworkId {
        let mut bytes = [0u8; SUBNETWORK_ID_SIZE];
        bytes[0] = b;
        SubnetworkId(bytes)
    }

    pub const fn from_bytes(bytes: [u8; SUBNETWORK_ID_SIZE]) -> SubnetworkId {
        SubnetworkId(bytes)
    }

    #[inline]
    pub fn is_native(&self) -> bool {
        *self == SUBNETWORK_ID_NATIVE
    }

    /// Returns true for a built-in subnetwork, which all nodes must validate
    /// and whose transactions always use 0 gas
    #[inline]
    pub fn is_builtin(&self) -> bool {
        *self == SUBNETWORK_ID_COINBASE || *self == SUBNETWORK_ID_REGISTRY
    }

    #[inline]
    pub fn is_builtin_or_native(&self) -> bool {
        self.is_native() || self.is_builtin()
    }
}

impl AsRef<[u8]> for SubnetworkId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for SubnetworkId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&faster_hex::hex_string(&self.0))
    }
}

impl FromStr for SubnetworkId {
    type Err = faster_hex::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; SUBNETWORK_ID_SIZE];
        faster_hex::hex_decode(s.as_bytes(), &mut bytes)?;
        Ok(SubnetworkId(bytes))
    }
}

impl serde::Serialize for SubnetworkId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> serde::Deserialize<'de> for SubnetworkId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        if deserializer.is_human_readable() {
            let s = <String as serde::Deserialize>::deserialize(deserializer)?;
            Self::from_str(&s).map_err(D::Error::custom)
        } else {
            let bytes: Vec<u8> = serde::Deserialize::deserialize(deserializer)?;
            let array: [u8; SUBNETWORK_ID_SIZE] = bytes.as_slice().try_into().map_err(|_| D::Error::custom("invalid length"))?;
            Ok(SubnetworkId(array))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_detection() {
        assert!(SUBNETWORK_ID_NATIVE.is_native());
        assert!(!SUBNETWORK_ID_NATIVE.is_builtin());
        assert!(SUBNETWORK_ID_NATIVE.is_builtin_or_native());
        assert!(SUBNETWORK_ID_COINBASE.is_builtin());
        assert!(SUBNETWORK_ID_REGISTRY.is_builtin());
        assert!(!SubnetworkId::from_byte(3).is_builtin_or_native());
    }

    #[test]
    fn test_display_round_trip() {
        let id = SubnetworkId::from_byte(1);
        assert_eq!(id.to_string(), "0100000000000000000000000000000000000000");
        assert_eq!(id, id.to_string().parse().unwrap());
    }
}
