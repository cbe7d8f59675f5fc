mod u3072;

use crate::u3072::U3072;
use kaspad_hashes::{Hash, Hasher, HasherBase, MuHashElementHash, MuHashFinalizeHash};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::Display;

pub const SERIALIZED_MUHASH_SIZE: usize = ELEMENT_BYTE_SIZE;
// The hash of `MuHash::new().finalize()`
pub const EMPTY_MUHASH: Hash = Hash::from_bytes([
    0x54, 0x4e, 0xb3, 0x14, 0x2c, 0x0, 0xf, 0xa, 0xd2, 0xc7, 0x6a, 0xc4, 0x1f, 0x42, 0x22, 0xab, 0xba, 0xba, 0xbe, 0xd8, 0x30, 0xee,
    0xaf, 0xee, 0x4b, 0x6d, 0xc5, 0x6b, 0x52, 0xd5, 0xca, 0xc0,
]);

pub(crate) const ELEMENT_BIT_SIZE: usize = 3072;
pub(crate) const ELEMENT_BYTE_SIZE: usize = ELEMENT_BIT_SIZE / 8;

/// MuHash is a rolling (homomorphic) multiset hash: elements can be added and
/// removed in any order, and removing every added element returns the hash to
/// its initial value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MuHash {
    numerator: U3072,
    denominator: U3072,
}

#[derive(Debug, PartialEq, Eq)]
pub struct OverflowError;

impl Display for OverflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Overflow in the MuHash field")
    }
}

impl Error for OverflowError {}

impl MuHash {
    /// Returns an empty initialized set.
    /// When finalized it is equal to a finalized set with all elements removed.
    #[inline]
    pub fn new() -> Self {
        Self { numerator: U3072::one(), denominator: U3072::one() }
    }

    /// Hashes the data and adds it to the muhash. Supports arbitrary length data.
    #[inline]
    pub fn add_element(&mut self, data: &[u8]) {
        let element = data_to_element(data);
        self.numerator *= element;
    }

    /// Hashes the data and removes it from the muhash. Supports arbitrary length data.
    #[inline]
    pub fn remove_element(&mut self, data: &[u8]) {
        let element = data_to_element(data);
        self.denominator *= element;
    }

    /// Returns a hasher which on `finalize` adds the hashed element to the muhash
    #[inline]
    pub fn add_element_builder(&mut self) -> MuHashElementBuilder<'_> {
        MuHashElementBuilder::new(&mut self.numerator)
    }

    /// Returns a hasher which on `finalize` removes the hashed element from the muhash
    #[inline]
    pub fn remove_element_builder(&mut self) -> MuHashElementBuilder<'_> {
        MuHashElementBuilder::new(&mut self.denominator)
    }

    /// Adds the other muhash into this one. Equivalent to adding all its data elements.
    #[inline]
    pub fn combine(&mut self, other: &Self) {
        self.numerator *= other.numerator;
        self.denominator *= other.denominator;
    }

    #[inline]
    pub fn finalize(&mut self) -> Hash {
        let serialized = self.serialize();
        MuHashFinalizeHash::hash(serialized)
    }

    #[inline]
    fn normalize(&mut self) {
        self.numerator /= self.denominator;
        self.denominator = U3072::one();
    }

    #[inline]
    pub fn serialize(&mut self) -> [u8; SERIALIZED_MUHASH_SIZE] {
        self.normalize();
        self.numerator.to_le_bytes()
    }

    #[inline]
    pub fn deserialize(data: [u8; SERIALIZED_MUHASH_SIZE]) -> Result<Self, OverflowError> {
        let numerator = U3072::from_le_bytes(data);
        if numerator.is_overflow() {
            Err(OverflowError)
        } else {
            Ok(Self { numerator, denominator: U3072::one() })
        }
    }
}

impl Default for MuHash {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

pub struct MuHashElementBuilder<'a> {
    muhash_field: &'a mut U3072,
    element_hasher: MuHashElementHash,
}

impl HasherBase for MuHashElementBuilder<'_> {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.element_hasher.write(data);
        self
    }
}

impl<'a> MuHashElementBuilder<'a> {
    pub fn new(muhash_field: &'a mut U3072) -> Self {
        Self { muhash_field, element_hasher: MuHashElementHash::new() }
    }

    pub fn finalize(self) {
        *self.muhash_field *= expand_hash(self.element_hasher.finalize());
    }
}

#[inline]
fn data_to_element(data: &[u8]) -> U3072 {
    expand_hash(MuHashElementHash::hash(data))
}

#[inline]
fn expand_hash(hash: Hash) -> U3072 {
    let mut stream = ChaCha20Rng::from_seed(hash.as_bytes());
    let mut bytes = [0u8; ELEMENT_BYTE_SIZE];
    stream.fill_bytes(&mut bytes);
    U3072::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_empty_muhash() {
        assert_eq!(MuHash::new().finalize(), EMPTY_MUHASH);
    }

    #[test]
    fn test_add_remove_cancels() {
        let mut muhash = MuHash::new();
        muhash.add_element(b"element one");
        muhash.add_element(b"element two");
        muhash.remove_element(b"element one");
        muhash.remove_element(b"element two");
        assert_eq!(muhash.finalize(), EMPTY_MUHASH);
    }

    #[test]
    fn test_order_independence() {
        let mut first = MuHash::new();
        first.add_element(b"a");
        first.add_element(b"b");
        first.add_element(b"c");

        let mut second = MuHash::new();
        second.add_element(b"c");
        second.add_element(b"a");
        second.add_element(b"b");

        assert_eq!(first.finalize(), second.finalize());
    }

    #[test]
    fn test_remove_before_add() {
        let mut muhash = MuHash::new();
        muhash.remove_element(b"x");
        muhash.add_element(b"y");
        muhash.add_element(b"x");

        let mut expected = MuHash::new();
        expected.add_element(b"y");
        assert_eq!(muhash.finalize(), expected.finalize());
    }

    #[test]
    fn test_combine() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let elements: Vec<[u8; 32]> = (0..10).map(|_| rng.gen()).collect();

        let mut all = MuHash::new();
        for element in elements.iter() {
            all.add_element(element);
        }

        let (left_elements, right_elements) = elements.split_at(5);
        let mut left = MuHash::new();
        for element in left_elements {
            left.add_element(element);
        }
        let mut right = MuHash::new();
        for element in right_elements {
            right.add_element(element);
        }
        left.combine(&right);
        assert_eq!(left.finalize(), all.finalize());
    }

    #[test]
    fn test_element_builder_matches_direct() {
        let mut via_builder = MuHash::new();
        let mut builder = via_builder.add_element_builder();
        builder.update(b"split ");
        builder.update(b"element");
        builder.finalize();

        let mut direct = MuHash::new();
        direct.add_element(b"split element");
        assert_eq!(via_builder.finalize(), direct.finalize());
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut muhash = MuHash::new();
        muhash.add_element(b"payload");
        let serialized = muhash.serialize();
        let mut restored = MuHash::deserialize(serialized).unwrap();
        assert_eq!(restored.finalize(), muhash.finalize());
    }

    #[test]
    fn test_deserialize_overflow() {
        let overflowing = [0xffu8; SERIALIZED_MUHASH_SIZE];
        assert!(matches!(MuHash::deserialize(overflowing), Err(OverflowError)));
    }
}
