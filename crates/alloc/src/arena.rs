//! Bump arena over a borrowed buffer
//!
//! Allocation advances a cursor; nothing is reclaimed until the whole arena
//! is [reset](Resettable::reset). The one exception is
//! [`reallocate`](Allocator::reallocate) on the most recent allocation, which
//! moves the cursor in place.

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

use crate::config::AllocatorConfig;
use crate::cursor::BumpCursor;
use crate::error::AllocResult;
use crate::stats::{AllocatorStats, OptionalStats, StatisticsProvider};
use crate::traits::{Allocator, MemoryUsage, Resettable};

/// Monotonic bump allocator
///
/// # Examples
/// ```rust
/// use core::alloc::Layout;
/// use nebula_alloc::prelude::*;
///
/// let mut buffer = [0u8; 64];
/// let arena = ArenaAllocator::new(&mut buffer);
///
/// let a = arena.allocate(Layout::from_size_align(3, 1)?)?;
/// let b = arena.allocate(Layout::from_size_align(5, 1)?)?;
/// assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 3);
/// assert_eq!(arena.offset(), 8);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ArenaAllocator<'buf> {
    cursor: BumpCursor<'buf>,
    config: AllocatorConfig,
    stats: OptionalStats,
}

impl<'buf> ArenaAllocator<'buf> {
    /// Creates an arena over `buffer` with the default configuration
    pub fn new(buffer: &'buf mut [u8]) -> Self {
        Self::with_config(buffer, AllocatorConfig::default())
    }

    /// Creates an arena over `buffer`
    pub fn with_config(buffer: &'buf mut [u8], config: AllocatorConfig) -> Self {
        #[cfg(feature = "logging")]
        debug!(capacity = buffer.len(), "created arena allocator");

        Self {
            cursor: BumpCursor::new(buffer),
            config,
            stats: OptionalStats::new(config.track_stats),
        }
    }

    /// Bytes consumed so far, alignment padding included
    #[inline]
    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }

    /// Size of the underlying buffer
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cursor.capacity()
    }

    /// Configuration this arena was created with
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }
}

// SAFETY: spans come from BumpCursor, which never hands out a byte twice
// between resets and honours the requested alignment
unsafe impl Allocator for ArenaAllocator<'_> {
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        self.cursor.allocate(layout, &self.config, &self.stats)
    }

    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_layout: Layout,
    ) -> AllocResult<NonNull<u8>> {
        // SAFETY: forwarded contract
        unsafe {
            self.cursor
                .reallocate(ptr, old_size, new_layout, &self.config, &self.stats)
        }
    }

    unsafe fn release(&self, ptr: Option<NonNull<u8>>, _size: usize) {
        if ptr.is_some() {
            self.stats.record_release();
        }
    }
}

impl Resettable for ArenaAllocator<'_> {
    unsafe fn reset(&self) {
        let used = self.offset();
        if let Some(byte) = self.config.release_pattern {
            // SAFETY: [0, used) belongs to the arena and the caller has given
            // up every pointer into it
            unsafe { self.cursor.buffer().fill(0, used, byte) };
        }
        self.cursor.set_offset(0);

        #[cfg(feature = "logging")]
        trace!(released = used, "arena reset");
    }
}

impl MemoryUsage for ArenaAllocator<'_> {
    fn used_memory(&self) -> usize {
        self.offset()
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.cursor.remaining())
    }
}

impl StatisticsProvider for ArenaAllocator<'_> {
    fn statistics(&self) -> AllocatorStats {
        self.stats.snapshot()
    }

    fn reset_statistics(&self) {
        self.stats.reset();
    }

    fn statistics_enabled(&self) -> bool {
        self.stats.is_enabled()
    }
}

impl fmt::Debug for ArenaAllocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaAllocator")
            .field("offset", &self.offset())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
