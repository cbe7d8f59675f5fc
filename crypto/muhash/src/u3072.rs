//! Arithmetic over the prime field GF(2^3072 - 1103717) backing the muhash set.

use crate::ELEMENT_BYTE_SIZE;
use serde::{Deserialize, Serialize};
use std::ops::{DivAssign, MulAssign};

pub(crate) const LIMBS: usize = ELEMENT_BYTE_SIZE / 8;

/// The (negated) low part of the modulus: p = 2^3072 - PRIME_DIFF
const PRIME_DIFF: u64 = 1103717;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct U3072 {
    // Little-endian limbs
    #[serde(with = "serde_limbs")]
    limbs: [u64; LIMBS],
}

impl U3072 {
    #[inline]
    pub fn one() -> Self {
        let mut limbs = [0u64; LIMBS];
        limbs[0] = 1;
        Self { limbs }
    }

    pub fn from_le_bytes(bytes: [u8; ELEMENT_BYTE_SIZE]) -> Self {
        let mut limbs = [0u64; LIMBS];
        for (chunk, limb) in bytes.chunks_exact(8).zip(limbs.iter_mut()) {
            *limb = u64::from_le_bytes(chunk.try_into().expect("chunk is exactly 8 bytes"));
        }
        Self { limbs }
    }

    pub fn to_le_bytes(self) -> [u8; ELEMENT_BYTE_SIZE] {
        let mut out = [0u8; ELEMENT_BYTE_SIZE];
        for (chunk, limb) in out.chunks_exact_mut(8).zip(self.limbs) {
            chunk.copy_from_slice(&limb.to_le_bytes());
        }
        out
    }

    /// True if the value is not fully reduced, i.e. >= p
    pub fn is_overflow(&self) -> bool {
        if self.limbs[0] < u64::MAX - PRIME_DIFF + 1 {
            return false;
        }
        self.limbs[1..].iter().all(|&l| l == u64::MAX)
    }

    fn reduce(&mut self) {
        if self.is_overflow() {
            // self - p == self + PRIME_DIFF (mod 2^3072), and the result is < p
            let mut carry = PRIME_DIFF as u128;
            for limb in self.limbs.iter_mut() {
                let sum = *limb as u128 + (carry & u64::MAX as u128);
                *limb = sum as u64;
                carry = sum >> 64;
                if carry == 0 {
                    break;
                }
            }
        }
    }

    /// Full schoolbook multiplication followed by folding the high half back
    /// with weight PRIME_DIFF (since 2^3072 ≡ PRIME_DIFF mod p)
    fn mul(&self, other: &Self) -> Self {
        let mut wide = [0u64; 2 * LIMBS];
        for i in 0..LIMBS {
            if other.limbs[i] == 0 {
                continue;
            }
            let mut carry = 0u128;
            for j in 0..LIMBS {
                let product = (self.limbs[j] as u128) * (other.limbs[i] as u128) + (wide[i + j] as u128) + carry;
                wide[i + j] = product as u64;
                carry = product >> 64;
            }
            let mut k = i + LIMBS;
            while carry != 0 {
                let sum = wide[k] as u128 + carry;
                wide[k] = sum as u64;
                carry = sum >> 64;
                k += 1;
            }
        }

        // First fold: low + high * PRIME_DIFF. The extra limb is at most ~21 bits.
        let mut folded = [0u64; LIMBS + 1];
        folded[..LIMBS].copy_from_slice(&wide[..LIMBS]);
        let mut carry = 0u128;
        for i in 0..LIMBS {
            let product = (wide[LIMBS + i] as u128) * (PRIME_DIFF as u128) + (folded[i] as u128) + carry;
            folded[i] = product as u64;
            carry = product >> 64;
        }
        folded[LIMBS] = carry as u64;

        // Second fold of the single overflow limb
        let mut limbs = [0u64; LIMBS];
        limbs.copy_from_slice(&folded[..LIMBS]);
        let mut carry = (folded[LIMBS] as u128) * (PRIME_DIFF as u128);
        let mut i = 0;
        while carry != 0 && i < LIMBS {
            let sum = limbs[i] as u128 + (carry & u64::MAX as u128);
            limbs[i] = sum as u64;
            carry = (carry >> 64) + (sum >> 64);
            i += 1;
        }
        // A wrap past 2^3072 can shed at most one modulus worth of value
        if carry != 0 {
            let mut fold_carry = PRIME_DIFF as u128;
            for limb in limbs.iter_mut() {
                let sum = *limb as u128 + (fold_carry & u64::MAX as u128);
                *limb = sum as u64;
                fold_carry = sum >> 64;
                if fold_carry == 0 {
                    break;
                }
            }
        }

        let mut result = Self { limbs };
        result.reduce();
        result
    }

    fn square(&self) -> Self {
        self.mul(self)
    }

    /// Modular inverse via Fermat: x^(p-2) mod p. The exponent p-2 is
    /// 2^3072 - 1103719, i.e. all-ones limbs except the lowest.
    fn inverse(&self) -> Self {
        const LOW_EXPONENT_LIMB: u64 = u64::MAX - (PRIME_DIFF + 1);

        let mut exponent = [u64::MAX; LIMBS];
        exponent[0] = LOW_EXPONENT_LIMB;

        let mut result = Self::one();
        for &limb in exponent.iter().rev() {
            for bit in (0..64).rev() {
                result = result.square();
                if (limb >> bit) & 1 == 1 {
                    result = result.mul(self);
                }
            }
        }
        result
    }
}

impl MulAssign for U3072 {
    fn mul_assign(&mut self, rhs: Self) {
        *self = self.mul(&rhs);
    }
}

impl DivAssign for U3072 {
    fn div_assign(&mut self, rhs: Self) {
        *self = self.mul(&rhs.inverse());
    }
}

mod serde_limbs {
    use super::LIMBS;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(limbs: &[u64; LIMBS], serializer: S) -> Result<S::Ok, S::Error> {
        limbs.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u64; LIMBS], D::Error> {
        use serde::de::Error;
        let v = Vec::<u64>::deserialize(deserializer)?;
        v.as_slice().try_into().map_err(|_| D::Error::custom("invalid limb count"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_u64(n: u64) -> U3072 {
        let mut limbs = [0u64; LIMBS];
        limbs[0] = n;
        U3072 { limbs }
    }

    #[test]
    fn test_mul_small() {
        let mut a = from_u64(3);
        a *= from_u64(7);
        assert_eq!(a, from_u64(21));
    }

    #[test]
    fn test_mul_div_inverse() {
        let mut a = from_u64(0xdeadbeefcafebabe);
        let b = from_u64(0x1234567890abcdef);
        a *= b;
        a /= b;
        assert_eq!(a, from_u64(0xdeadbeefcafebabe));
    }

    #[test]
    fn test_one_is_identity() {
        let mut a = from_u64(999);
        a *= U3072::one();
        assert_eq!(a, from_u64(999));
        a /= U3072::one();
        assert_eq!(a, from_u64(999));
    }

    #[test]
    fn test_overflow_detection() {
        assert!(!U3072::one().is_overflow());
        let max = U3072 { limbs: [u64::MAX; LIMBS] };
        assert!(max.is_overflow());

        let mut just_below = [u64::MAX; LIMBS];
        just_below[0] = u64::MAX - PRIME_DIFF;
        assert!(!(U3072 { limbs: just_below }).is_overflow());

        let mut exactly_p = [u64::MAX; LIMBS];
        exactly_p[0] = u64::MAX - PRIME_DIFF + 1;
        assert!((U3072 { limbs: exactly_p }).is_overflow());
    }

    #[test]
    fn test_byte_round_trip() {
        let mut bytes = [0u8; ELEMENT_BYTE_SIZE];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        let value = U3072::from_le_bytes(bytes);
        assert_eq!(value.to_le_bytes(), bytes);
    }
}
