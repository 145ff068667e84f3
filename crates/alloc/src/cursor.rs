//! Bump cursor shared by the arena and stack allocators
//!
//! Alignment is applied to absolute addresses, so the buffer itself does not
//! need any particular alignment.

use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::{self, NonNull};

use crate::buffer::{RawBuffer, fill_pattern};
use crate::config::AllocatorConfig;
use crate::error::{AllocError, AllocResult};
use crate::stats::OptionalStats;
use crate::utils::{checked_align_up, is_aligned_ptr};

/// Cell-based cursor over a borrowed buffer
pub(crate) struct BumpCursor<'buf> {
    buffer: RawBuffer<'buf>,
    offset: Cell<usize>,
}

impl<'buf> BumpCursor<'buf> {
    pub(crate) fn new(buffer: &'buf mut [u8]) -> Self {
        Self {
            buffer: RawBuffer::new(buffer),
            offset: Cell::new(0),
        }
    }

    #[inline]
    pub(crate) fn buffer(&self) -> &RawBuffer<'buf> {
        &self.buffer
    }

    #[inline]
    pub(crate) fn offset(&self) -> usize {
        self.offset.get()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.capacity() - self.offset()
    }

    /// Moves the cursor; `offset <= capacity`
    #[inline]
    pub(crate) fn set_offset(&self, offset: usize) {
        debug_assert!(offset <= self.capacity());
        self.offset.set(offset);
    }

    /// Carves `layout` out of the remaining space
    pub(crate) fn bump(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        let current = self.offset.get();
        let base = self.buffer.addr();

        let span = checked_align_up(base + current, layout.align())
            .map(|aligned| aligned - base)
            .and_then(|start| Some((start, start.checked_add(layout.size())?)));

        match span {
            Some((start, end)) if end <= self.buffer.len() => {
                self.offset.set(end);
                Ok(self.buffer.ptr_at(start))
            }
            _ => Err(AllocError::out_of_space_for(layout, self.remaining())),
        }
    }

    /// Grows or shrinks the top allocation without moving it
    ///
    /// Succeeds only when `[ptr, ptr + old_size)` ends exactly at the cursor,
    /// `ptr` already satisfies the new alignment and the new size fits.
    pub(crate) fn resize_top(&self, ptr: NonNull<u8>, old_size: usize, new_layout: Layout) -> bool {
        let Some(start) = self.buffer.offset_of(ptr) else {
            return false;
        };
        if start.checked_add(old_size) != Some(self.offset.get())
            || !is_aligned_ptr(ptr.as_ptr(), new_layout.align())
        {
            return false;
        }

        match start.checked_add(new_layout.size()) {
            Some(end) if end <= self.buffer.len() => {
                self.offset.set(end);
                true
            }
            _ => false,
        }
    }

    /// `bump` plus fill pattern and statistics, shared by arena and stack
    pub(crate) fn allocate(
        &self,
        layout: Layout,
        config: &AllocatorConfig,
        stats: &OptionalStats,
    ) -> AllocResult<NonNull<u8>> {
        match self.bump(layout) {
            Ok(ptr) => {
                // SAFETY: fresh span of layout.size() bytes
                unsafe { fill_pattern(ptr, layout.size(), config.alloc_pattern) };
                stats.record_allocation(self.offset());
                Ok(ptr)
            }
            Err(error) => {
                stats.record_failure();
                Err(error)
            }
        }
    }

    /// Resizes the top allocation in place, otherwise allocates and copies
    ///
    /// The old span is never reclaimed by the move.
    ///
    /// # Safety
    /// `ptr`, if present, must be a live allocation of this cursor of
    /// `old_size` bytes.
    pub(crate) unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_layout: Layout,
        config: &AllocatorConfig,
        stats: &OptionalStats,
    ) -> AllocResult<NonNull<u8>> {
        let Some(ptr) = ptr else {
            return self.allocate(new_layout, config, stats);
        };

        let new_size = new_layout.size();
        if self.resize_top(ptr, old_size, new_layout) {
            if new_size > old_size {
                // SAFETY: the grown tail lies between the old and new cursor
                unsafe { fill_pattern(ptr.add(old_size), new_size - old_size, config.alloc_pattern) };
            }
            stats.record_reallocation(true, self.offset());
            return Ok(ptr);
        }

        let new_ptr = self.allocate(new_layout, config, stats)?;
        // SAFETY: the new span lies past the old cursor, the old one before it
        unsafe {
            ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old_size.min(new_size));
        }
        stats.record_reallocation(false, self.offset());
        Ok(new_ptr)
    }

    /// Whether `[ptr, ptr + size)` is the most recent allocation
    #[inline]
    pub(crate) fn is_top(&self, ptr: NonNull<u8>, size: usize) -> bool {
        self.buffer
            .offset_of(ptr)
            .and_then(|start| start.checked_add(size))
            == Some(self.offset.get())
    }
}
