//! General purpose first-fit allocator
//!
//! ## Modules
//! - `allocator` - [`FreeListAllocator`] with first-fit search and splitting
//! - `header` - Free-block header stored inside unused memory
//! - `fragmentation` - [`FragmentationStats`] for free-chain analysis
//!
//! Freed blocks are never merged with their neighbours, and `reallocate`
//! always moves. Workloads that alternate small and large blocks will
//! fragment the buffer over time; [`FreeListAllocator::fragmentation`]
//! reports how far that has gone.

pub mod allocator;
pub mod fragmentation;
mod header;

pub use allocator::FreeListAllocator;
pub use fragmentation::FragmentationStats;
pub use header::HEADER_SIZE;
