//! Allocator traits
//!
//! The whole crate is built around one object-safe trait:
//! - [`Allocator`]: allocate / reallocate / release with caller-supplied sizes
//!
//! plus a few companions:
//! - [`TypedAllocator`]: type-safe helpers, blanket-implemented for every allocator
//! - [`MemoryUsage`]: capacity introspection for buffer-backed strategies
//! - [`Resettable`]: bulk invalidation of every live allocation
//!
//! # Safety
//!
//! `Allocator` is an `unsafe trait`: implementors promise that a successful
//! `allocate` returns memory that is valid for `layout.size()` bytes, aligned to
//! `layout.align()` (except where a strategy documents otherwise, see
//! [`PoolAllocator`](crate::PoolAllocator)) and not handed out again until it
//! is released or bulk-invalidated.
//!
//! Blanket impls for `&T` only forward, so they preserve the contract.

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

use crate::error::{AllocError, AllocResult};

/// Alignment assumed by the size-only shorthands
pub const POINTER_ALIGN: usize = size_of::<*const u8>();

/// A pluggable allocation strategy
///
/// The trait is object safe; call sites are expected to hold a
/// `&dyn Allocator` and stay unaware of the strategy behind it.
///
/// Sizes are never recorded on the caller's behalf. Whatever was passed to
/// `allocate` (or the last successful `reallocate`) must be passed back to
/// `release`.
///
/// # Safety
///
/// Implementors must ensure that:
/// - Returned pointers are valid for reads and writes of the requested size
/// - Returned pointers satisfy the requested alignment, unless documented
/// - Live allocations never overlap
/// - A failed `reallocate` leaves the original allocation untouched
pub unsafe trait Allocator {
    /// Allocates `layout.size()` bytes aligned to `layout.align()`
    ///
    /// The memory is uninitialized.
    ///
    /// # Errors
    /// Returns an error when the strategy cannot satisfy the request; no state
    /// is changed in that case.
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>>;

    /// Resizes an allocation, preserving `min(old_size, new_layout.size())` bytes
    ///
    /// With `ptr == None` this behaves exactly like [`allocate`](Self::allocate).
    /// The returned pointer may equal `ptr`.
    ///
    /// # Safety
    /// - `ptr`, if present, must come from this allocator and still be live
    /// - `old_size` must be the size it was last allocated or reallocated with
    /// - On success `ptr` must no longer be used unless it was returned again
    ///
    /// # Errors
    /// On failure `ptr` and its contents remain valid and unchanged.
    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_layout: Layout,
    ) -> AllocResult<NonNull<u8>>;

    /// Gives an allocation back to the strategy
    ///
    /// A `None` pointer is always a no-op. Whether the memory is actually
    /// reclaimed depends on the strategy.
    ///
    /// # Safety
    /// - `ptr`, if present, must come from this allocator and still be live
    /// - `size` must be the size it was last allocated or reallocated with
    /// - `ptr` must not be used afterward
    unsafe fn release(&self, ptr: Option<NonNull<u8>>, size: usize);

    /// Allocates `size` bytes at pointer alignment
    ///
    /// # Errors
    /// Same as [`allocate`](Self::allocate), plus `InvalidLayout` if `size`
    /// cannot form a layout.
    fn create(&self, size: usize) -> AllocResult<NonNull<u8>> {
        let layout = Layout::from_size_align(size, POINTER_ALIGN)
            .map_err(|_| AllocError::invalid_layout(size, POINTER_ALIGN))?;
        self.allocate(layout)
    }

    /// Allocates `count * elem_size` bytes at pointer alignment
    ///
    /// # Errors
    /// `InvalidLayout` if the total size overflows.
    fn create_array(&self, count: usize, elem_size: usize) -> AllocResult<NonNull<u8>> {
        let size = count
            .checked_mul(elem_size)
            .ok_or_else(|| AllocError::invalid_layout(usize::MAX, POINTER_ALIGN))?;
        self.create(size)
    }

    /// Counterpart of [`create`](Self::create) and
    /// [`create_array`](Self::create_array)
    ///
    /// # Safety
    /// Same as [`release`](Self::release).
    unsafe fn destroy(&self, ptr: Option<NonNull<u8>>, size: usize) {
        // SAFETY: forwarded contract
        unsafe { self.release(ptr, size) }
    }
}

// SAFETY: forwards every call to `T`, which upholds the contract
unsafe impl<T: Allocator + ?Sized> Allocator for &T {
    #[inline]
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_layout: Layout,
    ) -> AllocResult<NonNull<u8>> {
        // SAFETY: caller upholds the contract for `T`
        unsafe { (**self).reallocate(ptr, old_size, new_layout) }
    }

    #[inline]
    unsafe fn release(&self, ptr: Option<NonNull<u8>>, size: usize) {
        // SAFETY: caller upholds the contract for `T`
        unsafe { (**self).release(ptr, size) }
    }
}

/// Type-safe allocation helpers
///
/// Implemented for every [`Allocator`], including `dyn Allocator`.
///
/// # Examples
/// ```rust
/// use nebula_alloc::prelude::*;
///
/// let mut buffer = [0u8; 256];
/// let stack = StackAllocator::new(&mut buffer);
///
/// let value = stack.alloc_init(42u64)?;
/// assert_eq!(unsafe { *value.as_ptr() }, 42);
///
/// let values = stack.alloc_array_with::<u32>(4, |i| i as u32 * 10)?;
/// assert_eq!(unsafe { *values.as_ptr().add(3) }, 30);
/// # Ok::<(), nebula_alloc::AllocError>(())
/// ```
pub trait TypedAllocator: Allocator {
    /// Allocates uninitialized memory for one `T`
    ///
    /// # Errors
    /// Propagates the strategy's allocation error.
    #[inline]
    fn alloc_typed<T>(&self) -> AllocResult<NonNull<T>> {
        Ok(self.allocate(Layout::new::<T>())?.cast())
    }

    /// Allocates memory for one `T` and moves `value` into it
    ///
    /// The value is never dropped by the allocator.
    ///
    /// # Errors
    /// Propagates the strategy's allocation error; `value` is dropped then.
    #[inline]
    fn alloc_init<T>(&self, value: T) -> AllocResult<NonNull<T>> {
        let ptr = self.alloc_typed::<T>()?;
        // SAFETY: freshly allocated, valid for writes and aligned for T
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }

    /// Allocates uninitialized memory for `count` values of `T`
    ///
    /// # Errors
    /// `InvalidLayout` when the array size overflows, otherwise the
    /// strategy's allocation error.
    #[inline]
    fn alloc_array<T>(&self, count: usize) -> AllocResult<NonNull<T>> {
        let layout = Layout::array::<T>(count)
            .map_err(|_| AllocError::invalid_layout(usize::MAX, align_of::<T>()))?;
        Ok(self.allocate(layout)?.cast())
    }

    /// Allocates `count` values and initializes each from `init(index)`
    ///
    /// # Errors
    /// Same as [`alloc_array`](Self::alloc_array).
    fn alloc_array_with<T>(
        &self,
        count: usize,
        mut init: impl FnMut(usize) -> T,
    ) -> AllocResult<NonNull<T>> {
        let ptr = self.alloc_array::<T>(count)?;
        for index in 0..count {
            // SAFETY: index < count, inside the fresh allocation
            unsafe { ptr.as_ptr().add(index).write(init(index)) };
        }
        Ok(ptr)
    }

    /// Releases memory obtained from [`alloc_typed`](Self::alloc_typed) or
    /// [`alloc_init`](Self::alloc_init)
    ///
    /// The value is not dropped; call `drop_in_place` first if needed.
    ///
    /// # Safety
    /// `ptr` must come from this allocator as a single `T` and still be live.
    #[inline]
    unsafe fn dealloc_typed<T>(&self, ptr: NonNull<T>) {
        // SAFETY: caller guarantees ptr was allocated as one T
        unsafe { self.release(Some(ptr.cast()), size_of::<T>()) }
    }

    /// Releases memory obtained from [`alloc_array`](Self::alloc_array)
    ///
    /// # Safety
    /// `ptr` must come from this allocator as an array of exactly `count` `T`s.
    #[inline]
    unsafe fn dealloc_array<T>(&self, ptr: NonNull<T>, count: usize) {
        // SAFETY: caller guarantees the count, which already formed a layout
        unsafe { self.release(Some(ptr.cast()), size_of::<T>() * count) }
    }
}

impl<A: Allocator + ?Sized> TypedAllocator for A {}

/// Memory usage tracking trait
///
/// Implemented by the strategies that manage a fixed buffer.
pub trait MemoryUsage {
    /// Get currently used memory in bytes
    fn used_memory(&self) -> usize;

    /// Get available memory in bytes (if known)
    fn available_memory(&self) -> Option<usize>;

    /// Get total memory capacity in bytes (if known)
    fn total_memory(&self) -> Option<usize> {
        self.available_memory()
            .map(|available| self.used_memory() + available)
    }

    /// Returns memory usage as a percentage (0.0 to 100.0)
    ///
    /// Returns `None` if total memory is unknown.
    fn memory_usage_percent(&self) -> Option<f32> {
        self.total_memory().map(|total| {
            if total == 0 {
                0.0
            } else {
                (self.used_memory() as f32 / total as f32) * 100.0
            }
        })
    }

    /// Returns a snapshot of all of the above
    fn memory_usage(&self) -> BasicMemoryUsage {
        BasicMemoryUsage {
            used: self.used_memory(),
            available: self.available_memory(),
            total: self.total_memory(),
            usage_percent: self.memory_usage_percent(),
        }
    }
}

/// Basic memory usage information
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasicMemoryUsage {
    /// Currently used memory in bytes
    pub used: usize,
    /// Available memory in bytes (None if unlimited)
    pub available: Option<usize>,
    /// Total memory capacity in bytes (None if unlimited)
    pub total: Option<usize>,
    /// Memory usage as percentage (None if cannot be calculated)
    pub usage_percent: Option<f32>,
}

impl fmt::Display for BasicMemoryUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "used: {} bytes", self.used)?;

        if let Some(total) = self.total {
            write!(f, ", total: {total} bytes")?;
        }

        if let Some(percent) = self.usage_percent {
            write!(f, " ({percent:.1}%)")?;
        }

        Ok(())
    }
}

/// Allocators that can drop every live allocation at once
pub trait Resettable {
    /// Reset allocator to initial state
    ///
    /// # Safety
    /// - All pointers allocated before reset become invalid immediately
    /// - Using invalidated pointers results in undefined behavior
    unsafe fn reset(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        used: usize,
        available: Option<usize>,
    }

    impl MemoryUsage for Fixed {
        fn used_memory(&self) -> usize {
            self.used
        }

        fn available_memory(&self) -> Option<usize> {
            self.available
        }
    }

    #[test]
    fn usage_percent() {
        let usage = Fixed {
            used: 256,
            available: Some(768),
        }
        .memory_usage();

        assert_eq!(usage.total, Some(1024));
        assert_eq!(usage.usage_percent, Some(25.0));
        assert_eq!(usage.to_string(), "used: 256 bytes, total: 1024 bytes (25.0%)");
    }

    #[test]
    fn unbounded_usage_has_no_percent() {
        let usage = Fixed {
            used: 10,
            available: None,
        }
        .memory_usage();
        assert_eq!(usage.total, None);
        assert_eq!(usage.to_string(), "used: 10 bytes");
    }

    #[test]
    fn empty_capacity_reports_zero() {
        let fixed = Fixed {
            used: 0,
            available: Some(0),
        };
        assert_eq!(fixed.memory_usage_percent(), Some(0.0));
    }
}
