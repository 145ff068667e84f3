//! # nebula-alloc
//!
//! Pluggable memory allocation strategies for Nebula.
//!
//! Every strategy implements the same object-safe [`Allocator`] trait, so call
//! sites hold a `&dyn Allocator` and never care which discipline sits behind it:
//!
//! - [`ArenaAllocator`]: bump allocation over a borrowed buffer, bulk reset only
//! - [`StackAllocator`]: bump allocation with markers for LIFO rollback
//! - [`PoolAllocator`]: fixed-size chunks threaded on an intrusive free chain
//! - [`ScratchAllocator`]: decorator that remembers everything it hands out
//! - [`FreeListAllocator`]: first-fit general purpose allocator, no coalescing
//! - [`SystemAllocator`]: bridge to the platform heap, reachable via [`system()`]
//!
//! ## Quick Start
//!
//! ```rust
//! use core::alloc::Layout;
//! use nebula_alloc::prelude::*;
//!
//! let mut buffer = [0u8; 1024];
//! let arena = ArenaAllocator::new(&mut buffer);
//!
//! let allocator: &dyn Allocator = &arena;
//! let ptr = allocator.allocate(Layout::new::<u64>())?;
//! unsafe { ptr.cast::<u64>().as_ptr().write(7) };
//! assert!(arena.offset() >= 8);
//!
//! // every allocation is dropped at once
//! unsafe { arena.reset() };
//! assert_eq!(arena.offset(), 0);
//! # Ok::<(), nebula_alloc::AllocError>(())
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured events through `tracing`
//!
//! ## Threading
//!
//! None of the strategies synchronize. They use `Cell` for their state and are
//! therefore `!Sync`; give each thread its own instance.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(missing_docs)]
// Explicit lifetimes are clearer in buffer-borrowing code even when elidable
#![allow(clippy::elidable_lifetime_names)]
// inline(always) on alignment helpers is intentional for hot paths
#![allow(clippy::inline_always)]

pub mod error;

pub mod arena;
mod buffer;
pub mod config;
mod cursor;
pub mod freelist;
pub mod pool;
pub mod scratch;
pub mod stack;
pub mod stats;
pub mod system;
pub mod traits;
pub mod utils;

pub use arena::ArenaAllocator;
pub use config::AllocatorConfig;
pub use error::{AllocError, AllocResult};
pub use freelist::{FragmentationStats, FreeListAllocator};
pub use pool::PoolAllocator;
pub use scratch::ScratchAllocator;
pub use stack::{StackAllocator, StackFrame, StackMarker};
pub use stats::{AllocatorStats, StatisticsProvider};
pub use system::{SystemAllocator, system};
pub use traits::{Allocator, BasicMemoryUsage, MemoryUsage, Resettable, TypedAllocator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::config::AllocatorConfig;
    pub use crate::error::{AllocError, AllocResult};
    pub use crate::stats::{AllocatorStats, StatisticsProvider};
    pub use crate::traits::{Allocator, MemoryUsage, Resettable, TypedAllocator};

    pub use crate::arena::ArenaAllocator;
    pub use crate::freelist::FreeListAllocator;
    pub use crate::pool::PoolAllocator;
    pub use crate::scratch::ScratchAllocator;
    pub use crate::stack::{StackAllocator, StackFrame, StackMarker};
    pub use crate::system::{SystemAllocator, system};
}
