//! Fixed-size chunk pool
//!
//! # Safety
//!
//! The pool keeps its free chain inside the chunks themselves:
//! - The first `size_of::<*mut u8>()` bytes of a free chunk hold the address
//!   of the next free chunk (null terminates the chain)
//! - Links are read and written unaligned, so neither the buffer nor the chunk
//!   size needs pointer alignment
//! - Every address on the chain is `start + i * chunk_size` for some
//!   `i < chunk_count`, as long as callers only release chunks they obtained
//!   from this pool, once
//!
//! ## Alignment
//!
//! Chunks are handed out as they lie in the buffer. The requested alignment is
//! *not* checked: a caller who needs alignment `A` must supply a buffer aligned
//! to `A` and a chunk size that is a multiple of `A`.

use core::alloc::Layout;
use core::cell::Cell;
use core::fmt;
use core::ptr::{self, NonNull};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

use crate::buffer::{RawBuffer, fill_pattern};
use crate::config::AllocatorConfig;
use crate::error::{AllocError, AllocResult};
use crate::stats::{AllocatorStats, OptionalStats, StatisticsProvider};
use crate::traits::{Allocator, MemoryUsage, Resettable};

const LINK_SIZE: usize = size_of::<*mut u8>();

/// Pool allocator for fixed-size chunks
///
/// Allocation pops the head of the free chain and release pushes onto it, so
/// the chunk released last is the next one handed out.
///
/// # Examples
/// ```rust
/// use core::alloc::Layout;
/// use nebula_alloc::prelude::*;
///
/// let mut buffer = [0u8; 256];
/// let pool = PoolAllocator::new(&mut buffer, 32, 8)?;
///
/// let a = pool.allocate(Layout::from_size_align(24, 1).unwrap())?;
/// let b = pool.allocate(Layout::from_size_align(32, 1).unwrap())?;
/// unsafe { pool.release(Some(a), 24) };
///
/// let c = pool.allocate(Layout::from_size_align(8, 1).unwrap())?;
/// assert_eq!(c, a);
/// assert_ne!(c, b);
/// # Ok::<(), nebula_alloc::AllocError>(())
/// ```
pub struct PoolAllocator<'buf> {
    buffer: RawBuffer<'buf>,
    chunk_size: usize,
    chunk_count: usize,
    head: Cell<Option<NonNull<u8>>>,
    free_count: Cell<usize>,
    config: AllocatorConfig,
    stats: OptionalStats,
}

impl<'buf> PoolAllocator<'buf> {
    /// Creates a pool of `chunk_count` chunks of `chunk_size` bytes
    ///
    /// # Errors
    /// `InvalidConfig` when a chunk cannot hold a link, `chunk_count` is zero
    /// or the chunks do not fit in `buffer`.
    pub fn new(buffer: &'buf mut [u8], chunk_size: usize, chunk_count: usize) -> AllocResult<Self> {
        Self::with_config(buffer, chunk_size, chunk_count, AllocatorConfig::default())
    }

    /// Creates a pool with an explicit configuration
    ///
    /// # Errors
    /// Same as [`new`](Self::new).
    pub fn with_config(
        buffer: &'buf mut [u8],
        chunk_size: usize,
        chunk_count: usize,
        config: AllocatorConfig,
    ) -> AllocResult<Self> {
        if chunk_size < LINK_SIZE {
            return Err(AllocError::invalid_config("chunk size smaller than a pointer"));
        }

        if chunk_count == 0 {
            return Err(AllocError::invalid_config("pool needs at least one chunk"));
        }

        if chunk_size
            .checked_mul(chunk_count)
            .is_none_or(|total| total > buffer.len())
        {
            return Err(AllocError::invalid_config("chunks do not fit in the buffer"));
        }

        #[cfg(feature = "logging")]
        debug!(chunk_size, chunk_count, total = chunk_size * chunk_count, "created pool allocator");

        let pool = Self {
            buffer: RawBuffer::new(buffer),
            chunk_size,
            chunk_count,
            head: Cell::new(None),
            free_count: Cell::new(0),
            config,
            stats: OptionalStats::new(config.track_stats),
        };
        pool.thread_all();
        Ok(pool)
    }

    /// Fixed size of every chunk
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks the pool manages
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Chunks currently on the free chain
    #[inline]
    pub fn free_chunks(&self) -> usize {
        self.free_count.get()
    }

    /// Threads every chunk onto the chain, chunk 0 at the head
    fn thread_all(&self) {
        let mut head = None;
        for index in (0..self.chunk_count).rev() {
            let chunk = self.buffer.ptr_at(index * self.chunk_size);
            // SAFETY: chunk lies inside the buffer and is at least LINK_SIZE wide
            unsafe { write_link(chunk, head) };
            head = Some(chunk);
        }
        self.head.set(head);
        self.free_count.set(self.chunk_count);
    }

    fn used_bytes(&self) -> usize {
        (self.chunk_count - self.free_count.get()) * self.chunk_size
    }
}

/// Reads the link stored in a free chunk
///
/// # Safety
/// `chunk` must point to at least `LINK_SIZE` readable bytes.
#[inline]
unsafe fn read_link(chunk: NonNull<u8>) -> Option<NonNull<u8>> {
    // SAFETY: caller guarantees LINK_SIZE readable bytes
    NonNull::new(unsafe { chunk.cast::<*mut u8>().read_unaligned() })
}

/// Stores `next` in the first bytes of `chunk`
///
/// # Safety
/// `chunk` must point to at least `LINK_SIZE` writable bytes.
#[inline]
unsafe fn write_link(chunk: NonNull<u8>, next: Option<NonNull<u8>>) {
    let raw = next.map_or(ptr::null_mut(), NonNull::as_ptr);
    // SAFETY: caller guarantees LINK_SIZE writable bytes
    unsafe { chunk.cast::<*mut u8>().write_unaligned(raw) };
}

// SAFETY: a chunk is either on the free chain or handed out, never both;
// alignment beyond the chunk layout is documented as the caller's concern
unsafe impl Allocator for PoolAllocator<'_> {
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        if layout.size() > self.chunk_size {
            self.stats.record_failure();
            return Err(AllocError::chunk_too_large(layout.size(), self.chunk_size));
        }

        let Some(chunk) = self.head.get() else {
            self.stats.record_failure();
            return Err(AllocError::out_of_space_for(layout, 0));
        };

        // SAFETY: chunk is on the free chain, so it holds a link
        self.head.set(unsafe { read_link(chunk) });
        self.free_count.set(self.free_count.get() - 1);

        // SAFETY: the whole chunk now belongs to the caller
        unsafe { fill_pattern(chunk, layout.size(), self.config.alloc_pattern) };
        self.stats.record_allocation(self.used_bytes());
        Ok(chunk)
    }

    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_layout: Layout,
    ) -> AllocResult<NonNull<u8>> {
        let Some(ptr) = ptr else {
            return self.allocate(new_layout);
        };

        if old_size <= self.chunk_size && new_layout.size() <= self.chunk_size {
            self.stats.record_reallocation(true, self.used_bytes());
            return Ok(ptr);
        }

        let new_ptr = self.allocate(new_layout)?;
        // SAFETY: distinct chunks, each at least min(old, new) bytes
        unsafe {
            ptr::copy_nonoverlapping(
                ptr.as_ptr(),
                new_ptr.as_ptr(),
                old_size.min(new_layout.size()),
            );
            self.release(Some(ptr), old_size);
        }
        self.stats.record_reallocation(false, self.used_bytes());
        Ok(new_ptr)
    }

    unsafe fn release(&self, ptr: Option<NonNull<u8>>, _size: usize) {
        let Some(chunk) = ptr else { return };
        debug_assert!(
            self.buffer.contains(chunk, self.chunk_size),
            "released chunk does not belong to this pool"
        );

        // SAFETY: caller guarantees chunk is a live chunk of this pool
        unsafe {
            fill_pattern(chunk, self.chunk_size, self.config.release_pattern);
            write_link(chunk, self.head.get());
        }
        self.head.set(Some(chunk));
        self.free_count.set(self.free_count.get() + 1);
        self.stats.record_release();
    }
}

impl Resettable for PoolAllocator<'_> {
    unsafe fn reset(&self) {
        if let Some(byte) = self.config.release_pattern {
            // SAFETY: every chunk is being reclaimed
            unsafe { self.buffer.fill(0, self.chunk_size * self.chunk_count, byte) };
        }
        self.thread_all();

        #[cfg(feature = "logging")]
        trace!(chunks = self.chunk_count, "pool reset");
    }
}

impl MemoryUsage for PoolAllocator<'_> {
    fn used_memory(&self) -> usize {
        self.used_bytes()
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.free_count.get() * self.chunk_size)
    }
}

impl StatisticsProvider for PoolAllocator<'_> {
    fn statistics(&self) -> AllocatorStats {
        self.stats.snapshot()
    }

    fn reset_statistics(&self) {
        self.stats.reset();
    }

    fn statistics_enabled(&self) -> bool {
        self.stats.is_enabled()
    }
}

impl fmt::Debug for PoolAllocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_count", &self.chunk_count)
            .field("free_chunks", &self.free_chunks())
            .finish_non_exhaustive()
    }
}
