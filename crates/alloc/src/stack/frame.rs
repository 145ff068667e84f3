//! RAII-based stack frame for automatic restoration

use super::{StackAllocator, StackMarker};

/// Scoped region of a [`StackAllocator`]
///
/// Marks the stack on creation and restores to that mark when dropped, so
/// every allocation made through the frame is released at end of scope.
///
/// # Examples
/// ```rust
/// use core::alloc::Layout;
/// use nebula_alloc::prelude::*;
///
/// let mut buffer = [0u8; 128];
/// let stack = StackAllocator::new(&mut buffer);
/// stack.allocate(Layout::new::<u8>())?;
///
/// {
///     let frame = StackFrame::new(&stack);
///     frame.allocator().allocate(Layout::from_size_align(32, 1).unwrap())?;
///     assert_eq!(stack.offset(), 33);
/// }
/// assert_eq!(stack.offset(), 1);
/// # Ok::<(), nebula_alloc::AllocError>(())
/// ```
pub struct StackFrame<'a, 'buf> {
    allocator: &'a StackAllocator<'buf>,
    marker: StackMarker,
}

impl<'a, 'buf> StackFrame<'a, 'buf> {
    /// Opens a frame at the current top of `allocator`
    pub fn new(allocator: &'a StackAllocator<'buf>) -> Self {
        let marker = allocator.mark();
        Self { allocator, marker }
    }

    /// Gets the underlying allocator
    pub fn allocator(&self) -> &'a StackAllocator<'buf> {
        self.allocator
    }

    /// Position the frame will restore to
    pub fn marker(&self) -> StackMarker {
        self.marker
    }

    /// Manually restore and consume this frame
    pub fn restore(self) {
        drop(self);
    }
}

impl Drop for StackFrame<'_, '_> {
    fn drop(&mut self) {
        // An outer frame dropped first has already rolled past this one
        if self.marker.offset() <= self.allocator.offset() {
            // SAFETY: the marker came from this allocator and is not ahead
            // of the cursor
            unsafe { self.allocator.restore(self.marker) };
        }
    }
}
