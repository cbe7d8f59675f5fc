use crate::registry::DatabaseStorePrefixes;
use smallvec::SmallVec;
use std::fmt::{Debug, Display};

#[derive(Clone)]
pub struct DbKey {
    // Optimized for the common case of { prefix byte || HASH (32 bytes) }
    path: SmallVec<[u8; 36]>,
    prefix_len: usize,
}

impl DbKey {
    pub fn new<TKey>(prefix: &[u8], key: TKey) -> Self
    where
        TKey: Clone + AsRef<[u8]>,
    {
        Self { path: prefix.iter().chain(key.as_ref().iter()).copied().collect(), prefix_len: prefix.len() }
    }

    pub fn prefix_only(prefix: &[u8]) -> Self {
        Self::new(prefix, [])
    }

    /// Adds a bucket to the DbKey, extending the prefix length
    pub fn add_bucket<TBucket>(&mut self, bucket: TBucket)
    where
        TBucket: Copy + AsRef<[u8]>,
    {
        self.path.extend(bucket.as_ref().iter().copied());
        self.prefix_len += bucket.as_ref().len();
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }
}

impl AsRef<[u8]> for DbKey {
    fn as_ref(&self) -> &[u8] {
        &self.path
    }
}

impl Display for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut pos = 0;
        if self.prefix_len > 0 {
            if let Ok(prefix) = DatabaseStorePrefixes::try_from(self.path[0]) {
                write!(f, "{:?}/", prefix)?;
                pos += 1;
            }
        }
        // The key part is usually more readable as hex
        f.write_str(&faster_hex::hex_string(&self.path[pos..]))
    }
}

impl Debug for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaspad_hashes::Hash;

    #[test]
    fn test_key_display() {
        let key1 = DbKey::new(DatabaseStorePrefixes::Ghostdag.as_ref(), Hash::from_u64_word(34567890));
        assert!(key1.to_string().starts_with("Ghostdag/"));

        let key2 = DbKey::prefix_only(b"human-readable-prefix");
        // Make sure display can handle arbitrary prefixes
        let _ = key2.to_string();
    }

    #[test]
    fn test_prefix_len_tracks_buckets() {
        let mut key = DbKey::prefix_only(DatabaseStorePrefixes::Relations.as_ref());
        assert_eq!(key.prefix_len(), 1);
        key.add_bucket([7u8]);
        assert_eq!(key.prefix_len(), 2);
    }
}
