//! Non-owning handle over a caller-supplied byte buffer
//!
//! Every buffer-backed strategy turns its `&'buf mut [u8]` into a
//! [`RawBuffer`] once, at construction. From then on the strategy hands out
//! raw pointers into the buffer while the `'buf` borrow keeps the caller from
//! touching, moving or freeing it.

use core::marker::PhantomData;
use core::ptr::{self, NonNull};

pub(crate) struct RawBuffer<'buf> {
    start: NonNull<u8>,
    len: usize,
    _borrow: PhantomData<&'buf mut [u8]>,
}

impl<'buf> RawBuffer<'buf> {
    pub(crate) fn new(buffer: &'buf mut [u8]) -> Self {
        let len = buffer.len();
        Self {
            start: NonNull::from(buffer).cast::<u8>(),
            len,
            _borrow: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Address of the first byte
    #[inline]
    pub(crate) fn addr(&self) -> usize {
        self.start.as_ptr().addr()
    }

    /// Pointer `offset` bytes into the buffer, `offset <= len`
    #[inline]
    pub(crate) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.len);
        // SAFETY: offset is within the buffer or one past its end
        unsafe { self.start.add(offset) }
    }

    /// Offset of `ptr` from the start, if it points into `[start, start + len]`
    #[inline]
    pub(crate) fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        ptr.as_ptr()
            .addr()
            .checked_sub(self.addr())
            .filter(|offset| *offset <= self.len)
    }

    /// Whether `[ptr, ptr + size)` lies entirely inside the buffer
    #[inline]
    pub(crate) fn contains(&self, ptr: NonNull<u8>, size: usize) -> bool {
        self.offset_of(ptr)
            .and_then(|offset| offset.checked_add(size))
            .is_some_and(|end| end <= self.len)
    }

    /// Writes `byte` over `[offset, offset + len)`
    ///
    /// # Safety
    /// The range must lie inside the buffer and must not overlap memory that
    /// is currently borrowed by the caller as a Rust reference.
    #[inline]
    pub(crate) unsafe fn fill(&self, offset: usize, len: usize, byte: u8) {
        debug_assert!(offset + len <= self.len);
        // SAFETY: range checked by caller
        unsafe { ptr::write_bytes(self.ptr_at(offset).as_ptr(), byte, len) };
    }
}

/// Writes `pattern` over `len` bytes at `ptr` when a pattern is configured
///
/// # Safety
/// `ptr` must be valid for writes of `len` bytes.
#[inline]
pub(crate) unsafe fn fill_pattern(ptr: NonNull<u8>, len: usize, pattern: Option<u8>) {
    if let Some(byte) = pattern {
        // SAFETY: caller guarantees the range is writable
        unsafe { ptr::write_bytes(ptr.as_ptr(), byte, len) };
    }
}
