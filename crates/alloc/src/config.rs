//! Shared configuration for the buffer-backed strategies

/// Configuration for arena, stack, pool and freelist allocators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Enable statistics tracking
    pub track_stats: bool,

    /// Byte written over every freshly allocated span
    pub alloc_pattern: Option<u8>,

    /// Byte written over every span the allocator takes back
    pub release_pattern: Option<u8>,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            track_stats: cfg!(debug_assertions),
            alloc_pattern: if cfg!(debug_assertions) { Some(0xCC) } else { None },
            release_pattern: if cfg!(debug_assertions) { Some(0xDD) } else { None },
        }
    }
}

impl AllocatorConfig {
    /// Production configuration - no stats, no fill patterns
    #[must_use]
    pub const fn production() -> Self {
        Self {
            track_stats: false,
            alloc_pattern: None,
            release_pattern: None,
        }
    }

    /// Debug configuration - stats on, allocations filled with `0xCC`,
    /// released memory with `0xDD`
    #[must_use]
    pub const fn debug() -> Self {
        Self {
            track_stats: true,
            alloc_pattern: Some(0xCC),
            release_pattern: Some(0xDD),
        }
    }

    /// Set statistics tracking
    #[must_use]
    pub const fn with_stats(mut self, enabled: bool) -> Self {
        self.track_stats = enabled;
        self
    }

    /// Set the allocation fill pattern
    #[must_use]
    pub const fn with_alloc_pattern(mut self, pattern: Option<u8>) -> Self {
        self.alloc_pattern = pattern;
        self
    }

    /// Set the release fill pattern
    #[must_use]
    pub const fn with_release_pattern(mut self, pattern: Option<u8>) -> Self {
        self.release_pattern = pattern;
        self
    }
}
