pub mod perf {
    /// Default cache size for most stores, denominated in entries
    pub const DEFAULT_CACHE_SIZE: u64 = 100_000;

    /// Cache size for stores holding heavier structures (full headers, block bodies)
    pub const LARGE_DATA_CACHE_SIZE: u64 = 2_000;
}

/// Rotation boundary of flat block files
pub const BLOCK_FILE_MAX_SIZE: u32 = 512 * 1024 * 1024;

/// The flat-file store name holding raw block bytes
pub const BLOCK_STORE_NAME: &str = "blocks";
