mod hashers;

pub use hashers::*;

use borsh::{BorshDeserialize, BorshSerialize};
use kaspad_utils::hex::ToHex;
use std::fmt::{Debug, Display, Formatter};
use std::str::{self, FromStr};

pub const HASH_SIZE: usize = 32;

pub const ZERO_HASH: Hash = Hash([0; HASH_SIZE]);

/// A fixed 32-byte hash. Hex display follows the reversed byte-order
/// convention of the original node, i.e. the last byte is printed first.
#[derive(PartialEq, Eq, Ord, PartialOrd, Clone, Copy, Hash, Default, BorshSerialize, BorshDeserialize)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    #[inline(always)]
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    #[inline(always)]
    pub const fn as_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Hash(<[u8; HASH_SIZE]>::try_from(bytes).expect("expecting a slice of length 32"))
    }

    /// Creates a hash with the given u64 word placed in the first (lowest) bytes.
    /// Mainly used to create distinct hashes in tests.
    #[inline(always)]
    pub const fn from_u64_word(word: u64) -> Self {
        let mut bytes = [0u8; HASH_SIZE];
        let word_bytes = word.to_le_bytes();
        let mut i = 0;
        while i < 8 {
            bytes[i] = word_bytes[i];
            i += 1;
        }
        Hash(bytes)
    }

    #[inline(always)]
    pub fn is_zero(self) -> bool {
        self == ZERO_HASH
    }

    pub fn iter_le_u64(&self) -> impl ExactSizeIterator<Item = u64> + '_ {
        self.0.chunks_exact(8).map(|c| u64::from_le_bytes(c.try_into().expect("chunk is exactly 8 bytes")))
    }
}

impl From<u64> for Hash {
    fn from(word: u64) -> Self {
        Self::from_u64_word(word)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Hash {
    type Error = std::array::TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Hash(<[u8; HASH_SIZE]>::try_from(value)?))
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.write_str(&faster_hex::hex_string(&reversed))
    }
}

impl Debug for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Hash {
    type Err = faster_hex::Error;

    fn from_str(hash_str: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; HASH_SIZE];
        faster_hex::hex_decode(hash_str.as_bytes(), &mut bytes)?;
        bytes.reverse();
        Ok(Hash(bytes))
    }
}

impl ToHex for Hash {
    /// Forward (storage-order) hex, unlike `Display` which is reversed
    fn to_hex(&self) -> String {
        faster_hex::hex_string(&self.0)
    }
}

impl serde::Serialize for Hash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> serde::Deserialize<'de> for Hash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        if deserializer.is_human_readable() {
            let s = <String as serde::Deserialize>::deserialize(deserializer)?;
            Self::from_str(&s).map_err(D::Error::custom)
        } else {
            struct BytesVisitor;
            impl<'de> serde::de::Visitor<'de> for BytesVisitor {
                type Value = Hash;

                fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                    formatter.write_str("a byte array of length 32")
                }

                fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                    Hash::try_from(v).map_err(E::custom)
                }

                fn visit_seq<A: serde::de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                    let mut bytes = [0u8; HASH_SIZE];
                    for (i, byte) in bytes.iter_mut().enumerate() {
                        *byte = seq.next_element()?.ok_or_else(|| A::Error::invalid_length(i, &self))?;
                    }
                    Ok(Hash(bytes))
                }
            }
            deserializer.deserialize_bytes(BytesVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_basics() {
        let hash_str = "8e40af02265360d59f4ecf9ae9ebf8f00a3118408f5a9cdcbcc9c0f93642f3af";
        let hash = Hash::from_str(hash_str).unwrap();
        assert_eq!(hash_str, hash.to_string());
        let hash2 = Hash::from_str(hash_str).unwrap();
        assert_eq!(hash, hash2);

        let hash3 = Hash::from_str("8e40af02265360d59f4ecf9ae9ebf8f00a3118408f5a9cdcbcc9c0f93642f3ab").unwrap();
        assert_ne!(hash2, hash3);

        let odd_str = "8e40af02265360d59f4ecf9ae9ebf8f00a3118408f5a9cdcbcc9c0f93642f3a";
        assert!(Hash::from_str(odd_str).is_err());
    }

    #[test]
    fn test_display_is_reversed() {
        let mut bytes = [0u8; HASH_SIZE];
        bytes[0] = 0xab;
        let hash = Hash::from_bytes(bytes);
        let display = hash.to_string();
        assert!(display.ends_with("ab"));
        assert!(display.starts_with("00"));
        // Forward hex preserves storage order
        assert!(hash.to_hex().starts_with("ab"));
    }

    #[test]
    fn test_serde_round_trip() {
        let hash = Hash::from_u64_word(123456789);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(hash, serde_json::from_str::<Hash>(&json).unwrap());
        let bin = bincode::serialize(&hash).unwrap();
        assert_eq!(bin.len(), 8 + HASH_SIZE); // bincode length prefix + payload
        assert_eq!(hash, bincode::deserialize(&bin).unwrap());
    }

    #[test]
    fn test_iter_le_u64() {
        let hash = Hash::from_u64_word(7);
        let words: Vec<u64> = hash.iter_le_u64().collect();
        assert_eq!(words, vec![7, 0, 0, 0]);
    }
}
