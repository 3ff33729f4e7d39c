use crate::error::{RangeFileError, Result};

/// Default size of the read-ahead block: 16 MiB.
pub const DEFAULT_CACHE_CAPACITY: u64 = 16 * 1024 * 1024;

/// Construction-time settings of a [`VirtualFile`](super::VirtualFile).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFileOptions {
    /// Bytes fetched on every cache refill
    pub cache_capacity: u64,
    /// Reads larger than this skip the cache. `None` means half the capacity.
    pub bypass_threshold: Option<u64>,
}

impl Default for VirtualFileOptions {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            bypass_threshold: None,
        }
    }
}

impl VirtualFileOptions {
    pub fn with_cache_capacity(mut self, cache_capacity: u64) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn with_bypass_threshold(mut self, bypass_threshold: u64) -> Self {
        self.bypass_threshold = Some(bypass_threshold);
        self
    }

    /// Effective bypass threshold.
    pub fn bypass_threshold(&self) -> u64 {
        self.bypass_threshold.unwrap_or(self.cache_capacity / 2)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(RangeFileError::InvalidConfig(
                "cache capacity must be positive".to_string(),
            ));
        }
        // A cached read has to fit in one block.
        if self.bypass_threshold() > self.cache_capacity {
            return Err(RangeFileError::InvalidConfig(format!(
                "bypass threshold {} exceeds cache capacity {}",
                self.bypass_threshold(),
                self.cache_capacity
            )));
        }
        Ok(())
    }
}
