macro_rules! construct_uint {
    ($name:ident, $n_words:literal) => {
        /// Little-endian large integer type
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub [u64; $n_words]);

        impl $name {
            pub const ZERO: Self = Self([0; $n_words]);
            pub const MAX: Self = Self([u64::MAX; $n_words]);
            pub const BITS: u32 = $n_words * 64;
            pub const BYTES: usize = $n_words * 8;
            pub const LIMBS: usize = $n_words;

            #[inline]
            pub const fn from_u64(n: u64) -> Self {
                let mut words = [0u64; $n_words];
                words[0] = n;
                Self(words)
            }

            /// Returns the lowest 64 bits. Use only when the value is known to fit.
            #[inline]
            pub const fn as_u64(self) -> u64 {
                self.0[0]
            }

            #[inline]
            pub fn is_zero(self) -> bool {
                self.0.iter().all(|&w| w == 0)
            }

            /// Number of significant bits
            #[inline]
            pub fn bits(self) -> u32 {
                for (i, &word) in self.0.iter().enumerate().rev() {
                    if word != 0 {
                        return (i as u32) * 64 + (64 - word.leading_zeros());
                    }
                }
                0
            }

            #[inline]
            pub fn overflowing_add(self, other: Self) -> (Self, bool) {
                let mut words = [0u64; $n_words];
                let mut carry = false;
                for i in 0..$n_words {
                    let (sum, c1) = self.0[i].overflowing_add(other.0[i]);
                    let (sum, c2) = sum.overflowing_add(carry as u64);
                    words[i] = sum;
                    carry = c1 | c2;
                }
                (Self(words), carry)
            }

            #[inline]
            pub fn overflowing_sub(self, other: Self) -> (Self, bool) {
                let mut words = [0u64; $n_words];
                let mut borrow = false;
                for i in 0..$n_words {
                    let (diff, b1) = self.0[i].overflowing_sub(other.0[i]);
                    let (diff, b2) = diff.overflowing_sub(borrow as u64);
                    words[i] = diff;
                    borrow = b1 | b2;
                }
                (Self(words), borrow)
            }

            /// Schoolbook multiplication, truncated to the type width.
            /// The boolean indicates whether high bits were lost.
            #[inline]
            pub fn overflowing_mul(self, other: Self) -> (Self, bool) {
                let mut result = [0u64; $n_words];
                let mut overflow = false;
                for i in 0..$n_words {
                    if other.0[i] == 0 {
                        continue;
                    }
                    let mut carry = 0u128;
                    for j in 0..$n_words {
                        if i + j >= $n_words {
                            if self.0[j] != 0 || carry != 0 {
                                overflow = true;
                            }
                            continue;
                        }
                        let product = (self.0[j] as u128) * (other.0[i] as u128) + (result[i + j] as u128) + carry;
                        result[i + j] = product as u64;
                        carry = product >> 64;
                    }
                    if carry != 0 {
                        overflow = true;
                    }
                }
                (Self(result), overflow)
            }

            pub fn checked_add(self, other: Self) -> Option<Self> {
                match self.overflowing_add(other) {
                    (v, false) => Some(v),
                    _ => None,
                }
            }

            pub fn checked_sub(self, other: Self) -> Option<Self> {
                match self.overflowing_sub(other) {
                    (v, false) => Some(v),
                    _ => None,
                }
            }

            pub fn checked_mul(self, other: Self) -> Option<Self> {
                match self.overflowing_mul(other) {
                    (v, false) => Some(v),
                    _ => None,
                }
            }

            /// Shift-subtract long division. Panics on division by zero.
            pub fn div_rem(self, divisor: Self) -> (Self, Self) {
                assert!(!divisor.is_zero(), "division by zero");
                if self < divisor {
                    return (Self::ZERO, self);
                }
                let shift = self.bits() - divisor.bits();
                let mut remainder = self;
                let mut quotient = Self::ZERO;
                let mut shifted = divisor << shift;
                for i in (0..=shift).rev() {
                    if remainder >= shifted {
                        remainder = remainder.overflowing_sub(shifted).0;
                        quotient.0[(i / 64) as usize] |= 1 << (i % 64);
                    }
                    shifted = shifted >> 1u32;
                }
                (quotient, remainder)
            }

            #[inline]
            pub fn to_le_bytes(self) -> [u8; Self::BYTES] {
                let mut out = [0u8; Self::BYTES];
                for (chunk, word) in out.chunks_exact_mut(8).zip(self.0) {
                    chunk.copy_from_slice(&word.to_le_bytes());
                }
                out
            }

            #[inline]
            pub fn from_le_bytes(bytes: [u8; Self::BYTES]) -> Self {
                let mut words = [0u64; $n_words];
                for (chunk, word) in bytes.chunks_exact(8).zip(words.iter_mut()) {
                    *word = u64::from_le_bytes(chunk.try_into().expect("chunk is exactly 8 bytes"));
                }
                Self(words)
            }

            #[inline]
            pub fn to_be_bytes(self) -> [u8; Self::BYTES] {
                let mut out = self.to_le_bytes();
                out.reverse();
                out
            }

            #[inline]
            pub fn from_be_bytes(mut bytes: [u8; Self::BYTES]) -> Self {
                bytes.reverse();
                Self::from_le_bytes(bytes)
            }
        }

        impl std::ops::Add for $name {
            type Output = Self;
            fn add(self, other: Self) -> Self {
                let (sum, overflow) = self.overflowing_add(other);
                debug_assert!(!overflow, "add overflow");
                sum
            }
        }

        impl std::ops::AddAssign for $name {
            fn add_assign(&mut self, other: Self) {
                *self = *self + other;
            }
        }

        impl std::ops::Sub for $name {
            type Output = Self;
            fn sub(self, other: Self) -> Self {
                let (diff, borrow) = self.overflowing_sub(other);
                debug_assert!(!borrow, "sub underflow");
                diff
            }
        }

        impl std::ops::Mul for $name {
            type Output = Self;
            fn mul(self, other: Self) -> Self {
                let (product, overflow) = self.overflowing_mul(other);
                debug_assert!(!overflow, "mul overflow");
                product
            }
        }

        impl std::ops::Mul<u64> for $name {
            type Output = Self;
            fn mul(self, other: u64) -> Self {
                self * Self::from_u64(other)
            }
        }

        impl std::ops::Div for $name {
            type Output = Self;
            fn div(self, other: Self) -> Self {
                self.div_rem(other).0
            }
        }

        impl std::ops::Div<u64> for $name {
            type Output = Self;
            fn div(self, other: u64) -> Self {
                self / Self::from_u64(other)
            }
        }

        impl std::ops::Rem for $name {
            type Output = Self;
            fn rem(self, other: Self) -> Self {
                self.div_rem(other).1
            }
        }

        impl std::ops::Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                let mut words = self.0;
                for word in words.iter_mut() {
                    *word = !*word;
                }
                Self(words)
            }
        }

        impl std::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, other: Self) -> Self {
                let mut words = self.0;
                for (word, o) in words.iter_mut().zip(other.0) {
                    *word &= o;
                }
                Self(words)
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, other: Self) -> Self {
                let mut words = self.0;
                for (word, o) in words.iter_mut().zip(other.0) {
                    *word |= o;
                }
                Self(words)
            }
        }

        impl std::ops::Shl<u32> for $name {
            type Output = Self;
            fn shl(self, shift: u32) -> Self {
                if shift >= Self::BITS {
                    return Self::ZERO;
                }
                let mut words = [0u64; $n_words];
                let word_shift = (shift / 64) as usize;
                let bit_shift = shift % 64;
                for i in word_shift..$n_words {
                    words[i] = self.0[i - word_shift] << bit_shift;
                    if bit_shift > 0 && i > word_shift {
                        words[i] |= self.0[i - word_shift - 1] >> (64 - bit_shift);
                    }
                }
                Self(words)
            }
        }

        impl std::ops::Shr<u32> for $name {
            type Output = Self;
            fn shr(self, shift: u32) -> Self {
                if shift >= Self::BITS {
                    return Self::ZERO;
                }
                let mut words = [0u64; $n_words];
                let word_shift = (shift / 64) as usize;
                let bit_shift = shift % 64;
                for i in word_shift..$n_words {
                    words[i - word_shift] = self.0[i] >> bit_shift;
                    if bit_shift > 0 && i < $n_words - 1 {
                        words[i - word_shift] |= self.0[i + 1] << (64 - bit_shift);
                    }
                }
                Self(words)
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.0.iter().rev().cmp(other.0.iter().rev())
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                Self::from_u64(n)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self::ZERO, |acc, item| acc + item)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&faster_hex::hex_string(&self.to_be_bytes()))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(self, f)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_string())
                } else {
                    serializer.serialize_bytes(&self.to_le_bytes())
                }
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                use serde::de::Error;
                if deserializer.is_human_readable() {
                    let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                    let mut bytes = [0u8; Self::BYTES];
                    faster_hex::hex_decode(s.as_bytes(), &mut bytes).map_err(D::Error::custom)?;
                    Ok(Self::from_be_bytes(bytes))
                } else {
                    let bytes: Vec<u8> = serde::Deserialize::deserialize(deserializer)?;
                    let array: [u8; Self::BYTES] =
                        bytes.as_slice().try_into().map_err(|_| D::Error::custom("invalid length"))?;
                    Ok(Self::from_le_bytes(array))
                }
            }
        }

        impl borsh::BorshSerialize for $name {
            fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
                writer.write_all(&self.to_le_bytes())
            }
        }

        impl borsh::BorshDeserialize for $name {
            fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
                let mut bytes = [0u8; Self::BYTES];
                reader.read_exact(&mut bytes)?;
                Ok(Self::from_le_bytes(bytes))
            }
        }
    };
}

construct_uint!(Uint192, 3);
construct_uint!(Uint256, 4);
construct_uint!(Uint320, 5);

impl Uint256 {
    /// Builds a target from Bitcoin-style compact representation
    /// (8-bit exponent, 23-bit mantissa)
    pub fn from_compact_target_bits(bits: u32) -> Self {
        let mantissa = bits & 0x007fffff;
        let exponent = bits >> 24;
        if exponent <= 3 {
            Self::from_u64((mantissa >> (8 * (3 - exponent))) as u64)
        } else {
            Self::from_u64(mantissa as u64) << (8 * (exponent - 3))
        }
    }

    /// Converts back to compact representation, rounding down
    pub fn compact_target_bits(self) -> u32 {
        let mut size = self.bits().div_ceil(8);
        let mut mantissa = if size <= 3 { (self.as_u64() << (8 * (3 - size))) as u32 } else { (self >> (8 * (size - 3))).as_u64() as u32 };
        // The sign bit is reserved; normalize by pushing the exponent up
        if mantissa & 0x00800000 != 0 {
            mantissa >>= 8;
            size += 1;
        }
        (size << 24) | mantissa
    }
}

impl From<Uint192> for Uint256 {
    fn from(u: Uint192) -> Self {
        Uint256([u.0[0], u.0[1], u.0[2], 0])
    }
}

impl From<Uint256> for Uint320 {
    fn from(u: Uint256) -> Self {
        Uint320([u.0[0], u.0[1], u.0[2], u.0[3], 0])
    }
}

impl TryFrom<Uint320> for Uint256 {
    type Error = TryFromIntError;

    fn try_from(u: Uint320) -> Result<Self, Self::Error> {
        if u.0[4] != 0 {
            Err(TryFromIntError)
        } else {
            Ok(Uint256([u.0[0], u.0[1], u.0[2], u.0[3]]))
        }
    }
}

impl TryFrom<Uint256> for Uint192 {
    type Error = TryFromIntError;

    fn try_from(u: Uint256) -> Result<Self, Self::Error> {
        if u.0[3] != 0 {
            Err(TryFromIntError)
        } else {
            Ok(Uint192([u.0[0], u.0[1], u.0[2]]))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryFromIntError;

impl std::fmt::Display for TryFromIntError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("out of range integral type conversion attempted")
    }
}

impl std::error::Error for TryFromIntError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_arithmetic() {
        let a = Uint256::from_u64(u64::MAX);
        let b = Uint256::from_u64(1);
        let sum = a + b;
        assert_eq!(sum.0, [0, 1, 0, 0]);
        assert_eq!(sum - b, a);

        let product = sum * sum;
        assert_eq!(product.0, [0, 0, 1, 0]);
        assert_eq!(product / sum, sum);
        assert_eq!((product + b) % sum, b);
    }

    #[test]
    fn test_overflow_detection() {
        assert!(Uint192::MAX.checked_add(Uint192::from_u64(1)).is_none());
        assert!(Uint192::ZERO.checked_sub(Uint192::from_u64(1)).is_none());
        assert!(Uint192::MAX.checked_mul(Uint192::from_u64(2)).is_none());
        assert_eq!(Uint192::MAX.checked_mul(Uint192::from_u64(1)), Some(Uint192::MAX));
    }

    #[test]
    fn test_shifts() {
        let one = Uint256::from_u64(1);
        assert_eq!((one << 255u32) >> 255u32, one);
        assert_eq!((one << 64u32).0, [0, 1, 0, 0]);
        assert_eq!((one << 100u32) >> 36u32, one << 64u32);
    }

    #[test]
    fn test_bits() {
        assert_eq!(Uint256::ZERO.bits(), 0);
        assert_eq!(Uint256::from_u64(1).bits(), 1);
        assert_eq!(Uint256::from_u64(0xff).bits(), 8);
        assert_eq!((Uint256::from_u64(1) << 200u32).bits(), 201);
        assert_eq!(Uint256::MAX.bits(), 256);
    }

    #[test]
    fn test_compact_target_round_trip() {
        // 0x1d00ffff is the classic maximal Bitcoin target encoding
        let target = Uint256::from_compact_target_bits(0x1d00ffff);
        assert_eq!(target.compact_target_bits(), 0x1d00ffff);

        let target = Uint256::from_compact_target_bits(0x207fffff);
        assert_eq!(target.compact_target_bits(), 0x207fffff);

        // Mantissa with high bit set gets renormalized
        let target = Uint256::from_compact_target_bits(0x03123456);
        assert_eq!(target.as_u64(), 0x123456);
    }

    #[test]
    fn test_byte_round_trips() {
        let value = (Uint256::from_u64(0xdeadbeef) << 128u32) + Uint256::from_u64(42);
        assert_eq!(Uint256::from_le_bytes(value.to_le_bytes()), value);
        assert_eq!(Uint256::from_be_bytes(value.to_be_bytes()), value);
    }

    #[test]
    fn test_ordering() {
        let small = Uint192::from_u64(u64::MAX);
        let big = Uint192::from_u64(1) << 64u32;
        assert!(small < big);
        assert!(big > small);
        assert_eq!(big.cmp(&big), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_serde_round_trips() {
        let value = (Uint192::from_u64(99) << 100u32) + Uint192::from_u64(7);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(value, serde_json::from_str(&json).unwrap());
        let bin = bincode::serialize(&value).unwrap();
        assert_eq!(value, bincode::deserialize(&bin).unwrap());
    }

    #[test]
    fn test_widening_conversion() {
        let v = Uint192([1, 2, 3]);
        let wide: Uint256 = v.into();
        assert_eq!(Uint192::try_from(wide).unwrap(), v);
        assert!(Uint192::try_from(Uint256::MAX).is_err());
    }
}
