//! Free-block header
//!
//! A free block starts with a [`FreeBlock`] recording the block's total size
//! (header included) and the next block on the chain. Headers are accessed
//! unaligned, so blocks can start at any address.

use core::ptr::{self, NonNull};

/// Bytes a free block needs to describe itself
pub const HEADER_SIZE: usize = size_of::<FreeBlock>();

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(super) struct FreeBlock {
    pub(super) size: usize,
    next: *mut u8,
}

impl FreeBlock {
    pub(super) fn new(size: usize, next: Option<NonNull<u8>>) -> Self {
        debug_assert!(size >= HEADER_SIZE);
        Self {
            size,
            next: next.map_or(ptr::null_mut(), NonNull::as_ptr),
        }
    }

    #[inline]
    pub(super) fn next(&self) -> Option<NonNull<u8>> {
        NonNull::new(self.next)
    }

    #[inline]
    pub(super) fn set_next(&mut self, next: Option<NonNull<u8>>) {
        self.next = next.map_or(ptr::null_mut(), NonNull::as_ptr);
    }

    /// # Safety
    /// `at` must point to `HEADER_SIZE` readable bytes holding a header.
    #[inline]
    pub(super) unsafe fn read(at: NonNull<u8>) -> Self {
        // SAFETY: guaranteed by caller
        unsafe { at.cast::<Self>().read_unaligned() }
    }

    /// # Safety
    /// `at` must point to `HEADER_SIZE` writable bytes owned by the free chain.
    #[inline]
    pub(super) unsafe fn write(self, at: NonNull<u8>) {
        // SAFETY: guaranteed by caller
        unsafe { at.cast::<Self>().write_unaligned(self) };
    }
}
