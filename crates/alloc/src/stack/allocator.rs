//! Stack allocator implementation

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

use super::StackMarker;
use crate::buffer::fill_pattern;
use crate::config::AllocatorConfig;
use crate::cursor::BumpCursor;
use crate::error::AllocResult;
use crate::stats::{AllocatorStats, OptionalStats, StatisticsProvider};
use crate::traits::{Allocator, MemoryUsage, Resettable};

/// Stack allocator over a borrowed buffer
///
/// Allocation and in-place resizing behave exactly like
/// [`ArenaAllocator`](crate::ArenaAllocator). On top of that the stack can
/// release its most recent allocation and roll back to a [`StackMarker`].
///
/// # Memory Layout
/// ```text
/// [start]----[alloc1]----[alloc2]----[alloc3]----[cursor]----[free]----[end]
///             <------------ allocated ------------>   <--- available --->
/// ```
///
/// Only `alloc3` can be released individually; markers must be restored in
/// reverse order of creation.
pub struct StackAllocator<'buf> {
    cursor: BumpCursor<'buf>,
    config: AllocatorConfig,
    stats: OptionalStats,
}

impl<'buf> StackAllocator<'buf> {
    /// Creates a stack allocator over `buffer` with the default configuration
    pub fn new(buffer: &'buf mut [u8]) -> Self {
        Self::with_config(buffer, AllocatorConfig::default())
    }

    /// Creates a stack allocator over `buffer`
    pub fn with_config(buffer: &'buf mut [u8], config: AllocatorConfig) -> Self {
        #[cfg(feature = "logging")]
        debug!(capacity = buffer.len(), "created stack allocator");

        Self {
            cursor: BumpCursor::new(buffer),
            config,
            stats: OptionalStats::new(config.track_stats),
        }
    }

    /// Current top of the stack, as an offset into the buffer
    #[inline]
    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }

    /// Size of the underlying buffer
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cursor.capacity()
    }

    /// Records the current top of the stack
    #[inline]
    pub fn mark(&self) -> StackMarker {
        StackMarker {
            offset: self.cursor.offset(),
        }
    }

    /// Rolls the stack back to `marker`
    ///
    /// Everything allocated after the marker was taken is released at once.
    /// Restoring the marker just taken changes nothing.
    ///
    /// # Safety
    /// - `marker` must have been produced by this allocator
    /// - Markers must be restored in reverse order of creation; the marker
    ///   must not be ahead of the current top
    /// - Pointers allocated after the marker must not be used afterward
    pub unsafe fn restore(&self, marker: StackMarker) {
        let current = self.cursor.offset();
        debug_assert!(
            marker.offset <= current,
            "stack marker {} is ahead of the cursor {current}",
            marker.offset
        );

        if marker.offset < current {
            if let Some(byte) = self.config.release_pattern {
                // SAFETY: [marker, current) is allocated stack space the
                // caller has given up
                unsafe { self.cursor.buffer().fill(marker.offset, current - marker.offset, byte) };
            }
        }
        self.cursor.set_offset(marker.offset);

        #[cfg(feature = "logging")]
        trace!(from = current, to = marker.offset, "stack restored");
    }

    /// Releases `[ptr, ptr + size)` if it is the most recent allocation
    ///
    /// Returns `false`, leaving the stack untouched, for any other block.
    ///
    /// # Safety
    /// - `ptr` must come from this allocator and `size` must be its size
    /// - On success `ptr` must not be used afterward
    pub unsafe fn try_pop(&self, ptr: NonNull<u8>, size: usize) -> bool {
        if !self.cursor.is_top(ptr, size) {
            return false;
        }

        // SAFETY: the block is the live top allocation of `size` bytes
        unsafe { fill_pattern(ptr, size, self.config.release_pattern) };
        self.cursor.set_offset(self.cursor.offset() - size);
        true
    }
}

// SAFETY: spans come from BumpCursor; the cursor only moves back over
// memory the caller released or rolled back
unsafe impl Allocator for StackAllocator<'_> {
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

    unsafe fn release(&self, ptr: Option<NonNull<u8>>, size: usize) {
        let Some(ptr) = ptr else { return };

        // SAFETY: forwarded contract
        if unsafe { self.try_pop(ptr, size) } {
            self.stats.record_release();
        }
    }
}

impl Resettable for StackAllocator<'_> {
    unsafe fn reset(&self) {
        // SAFETY: the start marker is never ahead of the cursor
        unsafe { self.restore(StackMarker::START) };
    }
}

impl MemoryUsage for StackAllocator<'_> {
    fn used_memory(&self) -> usize {
        self.offset()
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.cursor.remaining())
    }
}

impl StatisticsProvider for StackAllocator<'_> {
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

impl fmt::Debug for StackAllocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackAllocator")
            .field("offset", &self.offset())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::StackFrame;

    fn bytes(size: usize) -> Layout {
        Layout::from_size_align(size, 1).unwrap()
    }

    #[test]
    fn release_only_reclaims_top() {
        let mut buffer = [0u8; 64];
        let stack = StackAllocator::new(&mut buffer);
        let first = stack.allocate(bytes(8)).unwrap();
        let second = stack.allocate(bytes(8)).unwrap();

        unsafe { stack.release(Some(first), 8) };
        assert_eq!(stack.offset(), 16);

        unsafe { stack.release(Some(second), 8) };
        assert_eq!(stack.offset(), 8);

        unsafe { stack.release(Some(first), 8) };
        assert_eq!(stack.offset(), 0);
    }

    #[test]
    fn release_null_is_no_op() {
        let mut buffer = [0u8; 16];
        let stack = StackAllocator::new(&mut buffer);
        stack.allocate(bytes(4)).unwrap();
        unsafe { stack.release(None, 4) };
        assert_eq!(stack.offset(), 4);
    }

    #[test]
    fn restore_immediately_is_idempotent() {
        let mut buffer = [0u8; 64];
        let stack = StackAllocator::new(&mut buffer);
        stack.allocate(bytes(10)).unwrap();

        let marker = stack.mark();
        unsafe { stack.restore(marker) };
        assert_eq!(stack.offset(), 10);
        assert_eq!(marker.offset(), 10);
    }

    #[test]
    fn nested_markers_restore_in_reverse() {
        let mut buffer = [0u8; 64];
        let stack = StackAllocator::new(&mut buffer);

        let outer = stack.mark();
        stack.allocate(bytes(4)).unwrap();
        let inner = stack.mark();
        stack.allocate(bytes(4)).unwrap();

        unsafe { stack.restore(inner) };
        assert_eq!(stack.offset(), 4);
        unsafe { stack.restore(outer) };
        assert_eq!(stack.offset(), 0);
    }

    #[test]
    fn restore_fills_released_range() {
        let mut buffer = [0u8; 8];
        {
            let stack = StackAllocator::with_config(&mut buffer, AllocatorConfig::debug());
            stack.allocate(bytes(2)).unwrap();
            let marker = stack.mark();
            stack.allocate(bytes(3)).unwrap();
            unsafe { stack.restore(marker) };
        }
        assert_eq!(buffer, [0xCC, 0xCC, 0xDD, 0xDD, 0xDD, 0, 0, 0]);
    }

    #[test]
    fn frames_out_of_order_do_not_move_forward() {
        let mut buffer = [0u8; 64];
        let stack = StackAllocator::new(&mut buffer);

        let outer = StackFrame::new(&stack);
        stack.allocate(bytes(8)).unwrap();
        let inner = StackFrame::new(&stack);
        stack.allocate(bytes(8)).unwrap();

        drop(outer);
        assert_eq!(stack.offset(), 0);
        drop(inner);
        assert_eq!(stack.offset(), 0);
    }

    #[test]
    fn reset_returns_to_start() {
        let mut buffer = [0u8; 64];
        let stack = StackAllocator::with_config(&mut buffer, AllocatorConfig::debug());
        stack.allocate(bytes(30)).unwrap();
        unsafe { stack.reset() };

        assert_eq!(stack.offset(), 0);
        assert_eq!(stack.statistics().allocation_count, 1);
        assert_eq!(stack.memory_usage().available, Some(64));
    }
}
