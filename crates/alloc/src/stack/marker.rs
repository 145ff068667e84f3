//! Stack marker for position tracking

/// Snapshot of a [`StackAllocator`](super::StackAllocator)'s cursor
///
/// Restoring a marker releases every allocation made after it was taken.
/// Markers are only meaningful for the allocator that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StackMarker {
    pub(super) offset: usize,
}

impl StackMarker {
    /// Marker for an empty stack
    pub(super) const START: Self = Self { offset: 0 };

    /// Cursor offset recorded by this marker
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}
