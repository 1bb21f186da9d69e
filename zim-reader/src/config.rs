//! Reader configuration

/// Configuration for opening an archive.
#[derive(Debug, Clone)]
pub struct ZimConfig {
    /// Maximum number of cached entry records. Zero disables the cache;
    /// lookups behave identically either way.
    pub cache_size: usize,
}

impl Default for ZimConfig {
    fn default() -> Self {
        Self { cache_size: 2048 }
    }
}

impl ZimConfig {
    pub fn with_cache_size(cache_size: usize) -> Self {
        Self { cache_size }
    }
}
