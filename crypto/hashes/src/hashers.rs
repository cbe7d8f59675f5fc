use once_cell::sync::Lazy;

pub trait HasherBase {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self;
}

pub trait Hasher: HasherBase + Clone + Default {
    fn finalize(self) -> crate::Hash;
    fn reset(&mut self);
    #[inline(always)]
    fn hash<A: AsRef<[u8]>>(data: A) -> crate::Hash {
        let mut hasher = Self::default();
        hasher.update(data);
        hasher.finalize()
    }
}

blake2b_hasher! {
    struct TransactionHash => b"TransactionHash",
    struct TransactionID => b"TransactionID",
    struct TransactionSigningHash => b"TransactionSigningHash",
    struct BlockHash => b"BlockHash",
    struct ProofOfWorkHash => b"ProofOfWorkHash",
    struct MerkleBranchHash => b"MerkleBranchHash",
    struct MuHashElementHash => b"MuHashElement",
    struct MuHashFinalizeHash => b"MuHashFinalize",
}

sha256_hasher! {
    struct TransactionSigningHashECDSA => "TransactionSigningHashECDSA",
}

macro_rules! sha256_hasher {
    ($(struct $name:ident => $domain_sep:literal),+ $(,)? ) => {$(
        #[derive(Clone)]
        pub struct $name(sha2::Sha256);

        impl $name {
            #[inline]
            pub fn new() -> Self {
                use sha2::{Sha256, Digest};
                // We use Lazy in order to avoid rehashing the domain prefix on each construction
                static HASHER: Lazy<$name> = Lazy::new(|| {
                    // SHA256 doesn't natively support domain separation, so we hash the domain to make it constant size
                    let mut tmp_state = Sha256::new();
                    tmp_state.update($domain_sep);
                    let mut out = $name(Sha256::new());
                    out.write(tmp_state.finalize());

                    out
                });
                (*HASHER).clone()
            }

            pub fn write<A: AsRef<[u8]>>(&mut self, data: A) {
                sha2::Digest::update(&mut self.0, data.as_ref());
            }

            #[inline(always)]
            pub fn finalize(self) -> crate::Hash {
                let mut out = [0u8; 32];
                out.copy_from_slice(sha2::Digest::finalize(self.0).as_slice());
                crate::Hash(out)
            }
        }
    impl_hasher!{ struct $name }
    )*};
}

macro_rules! blake2b_hasher {
    ($(struct $name:ident => $domain_sep:literal),+ $(,)? ) => {$(
        #[derive(Clone)]
        pub struct $name(blake2b_simd::State);

        impl $name {
            #[inline(always)]
            pub fn new() -> Self {
                Self(
                    blake2b_simd::Params::new()
                        .hash_length(32)
                        .key($domain_sep)
                        .to_state(),
                )
            }

            pub fn write<A: AsRef<[u8]>>(&mut self, data: A) {
                self.0.update(data.as_ref());
            }

            #[inline(always)]
            pub fn finalize(self) -> crate::Hash {
                let mut out = [0u8; 32];
                out.copy_from_slice(self.0.finalize().as_bytes());
                crate::Hash(out)
            }
        }
    impl_hasher!{ struct $name }
    )*};
}

macro_rules! impl_hasher {
    (struct $name:ident) => {
        impl HasherBase for $name {
            #[inline(always)]
            fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
                self.write(data);
                self
            }
        }
        impl Hasher for $name {
            #[inline(always)]
            fn finalize(self) -> crate::Hash {
                $name::finalize(self)
            }
            #[inline(always)]
            fn reset(&mut self) {
                *self = Self::new();
            }
        }
        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

use {blake2b_hasher, impl_hasher, sha256_hasher};

#[cfg(test)]
mod tests {
    use super::*;
    use kaspad_utils::hex::ToHex;

    #[test]
    fn test_hasher_incremental_matches_oneshot() {
        let mut hasher = TransactionHash::new();
        hasher.update(b"abc").update(b"def");
        let incremental = hasher.finalize();
        assert_eq!(incremental, TransactionHash::hash(b"abcdef"));
    }

    #[test]
    fn test_domains_are_separated() {
        let data = b"some block data";
        assert_ne!(TransactionHash::hash(data), TransactionID::hash(data));
        assert_ne!(TransactionHash::hash(data), BlockHash::hash(data));
        assert_ne!(BlockHash::hash(data), MerkleBranchHash::hash(data));
        assert_ne!(TransactionSigningHash::hash(data), TransactionSigningHashECDSA::hash(data));
    }

    #[test]
    fn test_blake2b_vectors() {
        // Keyed blake2b-256 with key "TransactionHash" over the empty input, forward hex.
        // The construction matches the original node so the digest is stable.
        let expected = "50272a9e37c728026f93d0eda6ab4467f627338b879076483c88d291193cb3bf";
        assert_eq!(TransactionHash::hash([]).to_hex(), expected);

        let expected = "e5f65efda0894d2b0590c2e9e46e9acc03032f505a1522f5e8c78c5ec70b1d9c";
        assert_eq!(TransactionID::hash([]).to_hex(), expected);

        let expected = "a80b6aa20f20b15ebabe2b1949527f78a257594a732e774de637d85e6973a768";
        assert_eq!(BlockHash::hash([]).to_hex(), expected);

        let expected = "4de3617db456d01248173f17ec58196e92fbd994b636476db4b875ed2ec84054";
        assert_eq!(MerkleBranchHash::hash([]).to_hex(), expected);
    }

    #[test]
    fn test_reset() {
        let mut hasher = BlockHash::new();
        hasher.update(b"polluted state");
        hasher.reset();
        assert_eq!(hasher.finalize(), BlockHash::hash([]));
    }
}
