//! Platform heap bridge
//!
//! [`SystemAllocator`] forwards to the C heap through `libc`, honouring any
//! power-of-two alignment. Unlike the buffer strategies it needs no sizes on
//! release and is safe to share between threads.

use core::alloc::Layout;
use core::ptr::{self, NonNull};

use crate::error::{AllocError, AllocResult};
use crate::traits::{Allocator, POINTER_ALIGN};

/// Allocator backed by the platform heap
///
/// Zero-sized requests are served as one-byte allocations so every success
/// returns a distinct pointer that can be released.
#[derive(Debug, Clone, Copy)]
pub struct SystemAllocator;

/// The process-wide instance returned by [`system`]
static SYSTEM: SystemAllocator = SystemAllocator::new();

/// Shared platform allocator
///
/// # Examples
/// ```rust
/// use nebula_alloc::prelude::*;
///
/// let heap: &dyn Allocator = system();
/// let numbers = heap.create_array(5, size_of::<i32>())?;
/// unsafe { heap.destroy(Some(numbers), 5 * size_of::<i32>()) };
/// # Ok::<(), nebula_alloc::AllocError>(())
/// ```
#[inline]
pub fn system() -> &'static SystemAllocator {
    &SYSTEM
}

impl SystemAllocator {
    /// Creates a new `SystemAllocator`
    #[inline]
    pub const fn new() -> Self {
        SystemAllocator
    }

    fn raw_allocate(layout: Layout) -> Option<NonNull<u8>> {
        let size = layout.size().max(1);
        let align = layout.align().max(POINTER_ALIGN);
        // SAFETY: align is a power of two and a multiple of pointer size
        NonNull::new(unsafe { heap_alloc(size, align) })
    }
}

#[cfg(not(windows))]
unsafe fn heap_alloc(size: usize, align: usize) -> *mut u8 {
    let mut out = ptr::null_mut();
    // SAFETY: guaranteed by caller
    let rc = unsafe { libc::posix_memalign(&mut out, align, size) };
    if rc == 0 { out.cast() } else { ptr::null_mut() }
}

#[cfg(not(windows))]
unsafe fn heap_free(ptr: NonNull<u8>) {
    // SAFETY: posix_memalign and realloc memory is released with free
    unsafe { libc::free(ptr.as_ptr().cast()) };
}

#[cfg(windows)]
unsafe fn heap_alloc(size: usize, align: usize) -> *mut u8 {
    // SAFETY: guaranteed by caller
    unsafe { libc::aligned_malloc(size, align) }.cast()
}

#[cfg(windows)]
unsafe fn heap_free(ptr: NonNull<u8>) {
    // SAFETY: aligned_malloc memory is released with aligned_free
    unsafe { libc::aligned_free(ptr.as_ptr().cast()) };
}

impl Default for SystemAllocator {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the C heap returns exclusive blocks of at least the requested size
// and alignment, or null, which is mapped to an error
unsafe impl Allocator for SystemAllocator {
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        Self::raw_allocate(layout).ok_or_else(|| AllocError::out_of_space_for(layout, 0))
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

        // aligned_malloc blocks cannot go through realloc
        if cfg!(not(windows)) && new_layout.align() <= POINTER_ALIGN {
            // SAFETY: old is a live heap block; malloc alignment covers POINTER_ALIGN
            let grown = unsafe { libc::realloc(old.as_ptr().cast(), new_layout.size().max(1)) };
            return NonNull::new(grown.cast())
                .ok_or_else(|| AllocError::out_of_space_for(new_layout, 0));
        }

        let new_ptr = self.allocate(new_layout)?;
        // SAFETY: distinct live blocks, each at least min(old, new) bytes
        unsafe {
            ptr::copy_nonoverlapping(
                old.as_ptr(),
                new_ptr.as_ptr(),
                old_size.min(new_layout.size()),
            );
            heap_free(old);
        }
        Ok(new_ptr)
    }

    unsafe fn release(&self, ptr: Option<NonNull<u8>>, _size: usize) {
        if let Some(ptr) = ptr {
            // SAFETY: caller guarantees ptr came from this allocator
            unsafe { heap_free(ptr) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::is_aligned_ptr;

    #[test]
    fn honours_large_alignment() {
        let layout = Layout::from_size_align(100, 256).unwrap();
        let ptr = system().allocate(layout).unwrap();
        assert!(is_aligned_ptr(ptr.as_ptr(), 256));
        unsafe { system().release(Some(ptr), 100) };
    }

    #[test]
    fn zero_sized_requests_are_distinct() {
        let layout = Layout::from_size_align(0, 1).unwrap();
        let a = system().allocate(layout).unwrap();
        let b = system().allocate(layout).unwrap();
        assert_ne!(a, b);
        unsafe {
            system().release(Some(a), 0);
            system().release(Some(b), 0);
        }
    }

    #[test]
    fn reallocate_preserves_contents() {
        let heap = SystemAllocator::new();
        let ptr = heap.create(16).unwrap();
        unsafe { ptr.as_ptr().copy_from_nonoverlapping(b"nebula-allocator".as_ptr(), 16) };

        let grown = unsafe { heap.reallocate(Some(ptr), 16, Layout::from_size_align(4096, 8).unwrap()) }
            .unwrap();
        let aligned = unsafe { heap.reallocate(Some(grown), 4096, Layout::from_size_align(32, 64).unwrap()) }
            .unwrap();

        assert!(is_aligned_ptr(aligned.as_ptr(), 64));
        let bytes = unsafe { core::slice::from_raw_parts(aligned.as_ptr(), 16) };
        assert_eq!(bytes, b"nebula-allocator");
        unsafe { heap.release(Some(aligned), 32) };
    }

    #[test]
    fn release_none_is_no_op() {
        unsafe { system().release(None, 64) };
    }
}
