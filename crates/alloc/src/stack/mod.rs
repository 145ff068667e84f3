//! Stack allocator for LIFO memory management
//!
//! Bump allocation like the arena, plus rollback to recorded positions.
//!
//! ## Modules
//! - `allocator` - [`StackAllocator`] with mark/restore and top-only release
//! - `frame` - RAII helper for automatic stack restoration
//! - `marker` - Position markers for scoped deallocation

pub mod allocator;
pub mod frame;
pub mod marker;

pub use allocator::StackAllocator;
pub use frame::StackFrame;
pub use marker::StackMarker;
