//! Tracking scratch allocator
//!
//! Wraps any other allocator and remembers every allocation it forwards, so
//! a whole batch of temporary allocations can be released with one
//! [`reset`](Resettable::reset).
//!
//! # Safety
//!
//! - The tracking table lives in memory obtained from the backing allocator
//!   and is accessed unaligned, so backings that ignore alignment (pools)
//!   work too
//! - Entries `[0, len)` are initialized; `capacity` entries are allocated
//! - Every tracked pointer was returned by the backing allocator and has not
//!   been released since the last reset

use core::alloc::Layout;
use core::cell::Cell;
use core::fmt;
use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

use crate::config::AllocatorConfig;
use crate::error::{AllocError, AllocResult};
use crate::stats::{AllocatorStats, OptionalStats, StatisticsProvider};
use crate::traits::{Allocator, Resettable};

/// Capacity of the tracking table after its first growth
pub const INITIAL_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy)]
#[repr(C)]
struct TrackedAllocation {
    ptr: *mut u8,
    size: usize,
}

/// Decorator that releases everything it allocated in one call
///
/// Individual [`release`](Allocator::release) calls are ignored; memory goes
/// back to the backing allocator only on reset or drop.
///
/// # Examples
/// ```rust
/// use core::alloc::Layout;
/// use nebula_alloc::prelude::*;
///
/// let mut buffer = [0u8; 1024];
/// let freelist = FreeListAllocator::new(&mut buffer)?;
/// let scratch = ScratchAllocator::new(&freelist);
///
/// for _ in 0..3 {
///     scratch.allocate(Layout::from_size_align(64, 8).unwrap())?;
/// }
/// assert_eq!(scratch.tracked_count(), 3);
///
/// unsafe { scratch.reset() };
/// assert_eq!(scratch.tracked_count(), 0);
/// # Ok::<(), nebula_alloc::AllocError>(())
/// ```
pub struct ScratchAllocator<'b> {
    backing: &'b dyn Allocator,
    entries: Cell<Option<NonNull<TrackedAllocation>>>,
    len: Cell<usize>,
    capacity: Cell<usize>,
    tracked_bytes: Cell<usize>,
    stats: OptionalStats,
}

impl<'b> ScratchAllocator<'b> {
    /// Wraps `backing` with the default configuration
    pub fn new(backing: &'b dyn Allocator) -> Self {
        Self::with_config(backing, AllocatorConfig::default())
    }

    /// Wraps `backing`
    ///
    /// Only `track_stats` applies; fill patterns are the backing's business.
    pub fn with_config(backing: &'b dyn Allocator, config: AllocatorConfig) -> Self {
        #[cfg(feature = "logging")]
        debug!("created scratch allocator");

        Self {
            backing,
            entries: Cell::new(None),
            len: Cell::new(0),
            capacity: Cell::new(0),
            tracked_bytes: Cell::new(0),
            stats: OptionalStats::new(config.track_stats),
        }
    }

    /// The allocator every request is forwarded to
    pub fn backing(&self) -> &'b dyn Allocator {
        self.backing
    }

    /// Allocations issued since the last reset
    #[inline]
    pub fn tracked_count(&self) -> usize {
        self.len.get()
    }

    /// Entries the tracking table can hold before growing
    #[inline]
    pub fn tracked_capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Sum of the sizes of all tracked allocations
    #[inline]
    pub fn tracked_bytes(&self) -> usize {
        self.tracked_bytes.get()
    }

    /// Releases everything, then the tracking table itself
    pub fn destroy(self) {
        drop(self);
    }

    fn entry_ptr(&self, index: usize) -> Option<*mut TrackedAllocation> {
        debug_assert!(index < self.capacity.get());
        // SAFETY: index < capacity, inside the table allocation
        self.entries
            .get()
            .map(|entries| unsafe { entries.as_ptr().add(index) })
    }

    fn read_entry(&self, index: usize) -> Option<TrackedAllocation> {
        debug_assert!(index < self.len.get());
        // SAFETY: entries [0, len) are initialized
        self.entry_ptr(index)
            .map(|entry| unsafe { entry.read_unaligned() })
    }

    fn write_entry(&self, index: usize, value: TrackedAllocation) {
        if let Some(entry) = self.entry_ptr(index) {
            // SAFETY: index < capacity
            unsafe { entry.write_unaligned(value) };
        }
    }

    fn table_layout(capacity: usize) -> AllocResult<Layout> {
        Layout::array::<TrackedAllocation>(capacity).map_err(|_| {
            AllocError::invalid_layout(usize::MAX, align_of::<TrackedAllocation>())
        })
    }

    /// Doubles the tracking table (or creates it)
    fn grow(&self) -> AllocResult<()> {
        let capacity = self.capacity.get();
        let new_capacity = if capacity == 0 {
            INITIAL_CAPACITY
        } else {
            capacity
                .checked_mul(2)
                .ok_or_else(|| AllocError::invalid_layout(usize::MAX, 1))?
        };

        let old_size = capacity * size_of::<TrackedAllocation>();
        let new_layout = Self::table_layout(new_capacity)?;
        // SAFETY: the table was allocated by the backing with old_size bytes
        let table = unsafe {
            self.backing
                .reallocate(self.entries.get().map(NonNull::cast), old_size, new_layout)?
        };

        self.entries.set(Some(table.cast()));
        self.capacity.set(new_capacity);

        #[cfg(feature = "logging")]
        trace!(capacity = new_capacity, "scratch tracking table grown");
        Ok(())
    }

    fn track(&self, ptr: NonNull<u8>, size: usize) -> AllocResult<()> {
        let len = self.len.get();
        if len == self.capacity.get() {
            self.grow()?;
        }

        self.write_entry(
            len,
            TrackedAllocation {
                ptr: ptr.as_ptr(),
                size,
            },
        );
        self.len.set(len + 1);
        self.tracked_bytes.set(self.tracked_bytes.get() + size);
        Ok(())
    }

    /// Releases every tracked allocation, newest first
    fn release_all(&self) {
        let len = self.len.get();
        for index in (0..len).rev() {
            if let Some(entry) = self.read_entry(index) {
                // SAFETY: tracked pointers came from the backing with this size
                unsafe { self.backing.release(NonNull::new(entry.ptr), entry.size) };
            }
        }
        self.len.set(0);
        self.tracked_bytes.set(0);

        #[cfg(feature = "logging")]
        trace!(released = len, "scratch allocations released");
    }
}

// SAFETY: every pointer comes straight from the backing allocator, which
// upholds the contract; tracking never touches the returned memory
unsafe impl Allocator for ScratchAllocator<'_> {
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        let ptr = match self.backing.allocate(layout) {
            Ok(ptr) => ptr,
            Err(error) => {
                self.stats.record_failure();
                return Err(AllocError::backing_failure(error));
            }
        };

        if self.track(ptr, layout.size()).is_err() {
            // SAFETY: ptr was just obtained from the backing with this size
            unsafe { self.backing.release(Some(ptr), layout.size()) };
            self.stats.record_failure();
            return Err(AllocError::out_of_space_for(layout, 0));
        }

        self.stats.record_allocation(self.tracked_bytes());
        Ok(ptr)
    }

    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_layout: Layout,
    ) -> AllocResult<NonNull<u8>> {
        let Some(old) = ptr else {
            return self.allocate(new_layout);
        };

        // SAFETY: forwarded contract
        let new_ptr = match unsafe { self.backing.reallocate(Some(old), old_size, new_layout) } {
            Ok(new_ptr) => new_ptr,
            Err(error) => {
                self.stats.record_failure();
                return Err(AllocError::backing_failure(error));
            }
        };

        let slot = (0..self.len.get())
            .find(|index| self.read_entry(*index).is_some_and(|entry| entry.ptr == old.as_ptr()));
        if let Some(index) = slot {
            if let Some(entry) = self.read_entry(index) {
                self.tracked_bytes
                    .set(self.tracked_bytes.get() - entry.size + new_layout.size());
            }
            self.write_entry(
                index,
                TrackedAllocation {
                    ptr: new_ptr.as_ptr(),
                    size: new_layout.size(),
                },
            );
        }

        self.stats.record_reallocation(new_ptr == old, self.tracked_bytes());
        Ok(new_ptr)
    }

    unsafe fn release(&self, _ptr: Option<NonNull<u8>>, _size: usize) {}
}

impl Resettable for ScratchAllocator<'_> {
    /// Releases every tracked allocation; the table keeps its capacity
    unsafe fn reset(&self) {
        self.release_all();
    }
}

impl StatisticsProvider for ScratchAllocator<'_> {
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

impl Drop for ScratchAllocator<'_> {
    fn drop(&mut self) {
        self.release_all();

        let table_size = self.capacity.get() * size_of::<TrackedAllocation>();
        // SAFETY: the table came from the backing with table_size bytes
        unsafe { self.backing.release(self.entries.get().map(NonNull::cast), table_size) };
        self.entries.set(None);
        self.capacity.set(0);
    }
}

impl fmt::Debug for ScratchAllocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchAllocator")
            .field("tracked", &self.tracked_count())
            .field("capacity", &self.tracked_capacity())
            .field("tracked_bytes", &self.tracked_bytes())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArenaAllocator, PoolAllocator, StackAllocator};

    fn bytes(size: usize) -> Layout {
        Layout::from_size_align(size, 1).unwrap()
    }

    #[test]
    fn table_grows_by_doubling() {
        let mut buffer = [0u8; 4096];
        let arena = ArenaAllocator::new(&mut buffer);
        let scratch = ScratchAllocator::new(&arena);

        assert_eq!(scratch.tracked_capacity(), 0);
        scratch.allocate(bytes(4)).unwrap();
        assert_eq!(scratch.tracked_capacity(), INITIAL_CAPACITY);

        for _ in 0..INITIAL_CAPACITY {
            scratch.allocate(bytes(4)).unwrap();
        }
        assert_eq!(scratch.tracked_count(), INITIAL_CAPACITY + 1);
        assert_eq!(scratch.tracked_capacity(), INITIAL_CAPACITY * 2);
    }

    #[test]
    fn release_is_ignored() {
        let mut buffer = [0u8; 512];
        let arena = ArenaAllocator::new(&mut buffer);
        let scratch = ScratchAllocator::new(&arena);
        let ptr = scratch.allocate(bytes(16)).unwrap();

        unsafe { scratch.release(Some(ptr), 16) };
        assert_eq!(scratch.tracked_count(), 1);
    }

    #[test]
    fn reset_releases_through_backing_and_keeps_capacity() {
        let mut buffer = [0u8; 512];
        let stack = StackAllocator::new(&mut buffer);
        {
            let scratch = ScratchAllocator::new(&stack);
            scratch.allocate(bytes(8)).unwrap();
            let table_end = stack.offset();
            scratch.allocate(bytes(8)).unwrap();
            scratch.allocate(bytes(8)).unwrap();

            unsafe { scratch.reset() };
            assert_eq!(scratch.tracked_count(), 0);
            assert_eq!(scratch.tracked_bytes(), 0);
            assert_eq!(scratch.tracked_capacity(), INITIAL_CAPACITY);
            // newest first: both blocks above the table are popped, the one
            // beneath it is not on top and stays
            assert_eq!(stack.offset(), table_end);
        }
    }

    #[test]
    fn backing_failure_is_wrapped() {
        let mut buffer = [0u8; 64];
        let arena = ArenaAllocator::new(&mut buffer);
        let scratch = ScratchAllocator::new(&arena);

        let error = scratch.allocate(bytes(128)).unwrap_err();
        assert!(error.is_backing_failure());
        assert!(error.backing_source().is_some_and(AllocError::is_out_of_space));
        assert_eq!(scratch.tracked_count(), 0);
    }

    #[test]
    fn tracking_failure_releases_new_memory() {
        let mut buffer = [0u8; 64];
        let pool = PoolAllocator::new(&mut buffer, 32, 2).unwrap();
        let scratch = ScratchAllocator::new(&pool);

        // the first allocation needs a table of 8 entries, larger than a chunk
        let error = scratch.allocate(bytes(8)).unwrap_err();
        assert!(error.is_out_of_space());
        assert_eq!(pool.free_chunks(), 2);
    }

    #[test]
    fn reallocate_updates_slot() {
        let mut buffer = [0u8; 1024];
        let arena = ArenaAllocator::new(&mut buffer);
        let scratch = ScratchAllocator::new(&arena);
        let first = scratch.allocate(bytes(8)).unwrap();
        scratch.allocate(bytes(8)).unwrap();

        let moved = unsafe { scratch.reallocate(Some(first), 8, bytes(32)) }.unwrap();
        assert_ne!(moved, first);
        assert_eq!(scratch.tracked_count(), 2);
        assert_eq!(scratch.tracked_bytes(), 40);
        assert_eq!(scratch.read_entry(0).map(|entry| entry.ptr), Some(moved.as_ptr()));
    }

    #[test]
    fn reallocate_null_tracks_new_allocation() {
        let mut buffer = [0u8; 512];
        let arena = ArenaAllocator::new(&mut buffer);
        let scratch = ScratchAllocator::new(&arena);

        unsafe { scratch.reallocate(None, 0, bytes(16)) }.unwrap();
        assert_eq!(scratch.tracked_count(), 1);
    }

    #[test]
    fn failed_reallocate_keeps_slot() {
        let mut buffer = [0u8; 256];
        let arena = ArenaAllocator::new(&mut buffer);
        let scratch = ScratchAllocator::new(&arena);
        let first = scratch.allocate(bytes(16)).unwrap();

        let error = unsafe { scratch.reallocate(Some(first), 16, bytes(512)) }.unwrap_err();
        assert!(error.is_backing_failure());
        let entry = scratch.read_entry(0).unwrap();
        assert_eq!(entry.ptr, first.as_ptr());
        assert_eq!(entry.size, 16);
        assert_eq!(scratch.tracked_bytes(), 16);
    }
}
