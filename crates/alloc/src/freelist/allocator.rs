//! First-fit free-list allocator

use core::alloc::Layout;
use core::cell::Cell;
use core::fmt;
use core::ptr::{self, NonNull};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

use super::FragmentationStats;
use super::header::{FreeBlock, HEADER_SIZE};
use crate::buffer::{RawBuffer, fill_pattern};
use crate::config::AllocatorConfig;
use crate::error::{AllocError, AllocResult};
use crate::stats::{AllocatorStats, OptionalStats, StatisticsProvider};
use crate::traits::{Allocator, MemoryUsage, Resettable};
use crate::utils::checked_align_up;

/// General purpose allocator over a borrowed buffer
///
/// Free memory is a singly linked chain of variable-size blocks, most
/// recently freed first. Allocation takes the first block that fits, after
/// aligning its start, and pushes the unused tail back as a new block when
/// the tail can hold a header. Tails too small for a header, and alignment
/// padding in front of an allocation, stay unusable until [`reset`].
///
/// Every block is at least [`HEADER_SIZE`] bytes: smaller requests are
/// rounded up so the block can carry a header once released.
///
/// [`reset`]: Resettable::reset
/// [`HEADER_SIZE`]: super::HEADER_SIZE
///
/// # Examples
/// ```rust
/// use core::alloc::Layout;
/// use nebula_alloc::prelude::*;
///
/// let mut buffer = [0u8; 512];
/// let freelist = FreeListAllocator::new(&mut buffer)?;
///
/// let block = freelist.allocate(Layout::from_size_align(64, 8).unwrap())?;
/// unsafe { freelist.release(Some(block), 64) };
///
/// // the block just freed sits at the head of the chain
/// let again = freelist.allocate(Layout::from_size_align(64, 8).unwrap())?;
/// assert_eq!(again, block);
/// # Ok::<(), nebula_alloc::AllocError>(())
/// ```
pub struct FreeListAllocator<'buf> {
    buffer: RawBuffer<'buf>,
    head: Cell<Option<NonNull<u8>>>,
    free_total: Cell<usize>,
    config: AllocatorConfig,
    stats: OptionalStats,
}

impl<'buf> FreeListAllocator<'buf> {
    /// Creates an allocator whose free chain is one block spanning `buffer`
    ///
    /// # Errors
    /// `InvalidConfig` if `buffer` cannot hold a single free-block header.
    pub fn new(buffer: &'buf mut [u8]) -> AllocResult<Self> {
        Self::with_config(buffer, AllocatorConfig::default())
    }

    /// Creates an allocator with an explicit configuration
    ///
    /// # Errors
    /// Same as [`new`](Self::new).
    pub fn with_config(buffer: &'buf mut [u8], config: AllocatorConfig) -> AllocResult<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(AllocError::invalid_config("buffer smaller than a free-block header"));
        }

        #[cfg(feature = "logging")]
        debug!(capacity = buffer.len(), "created freelist allocator");

        let freelist = Self {
            buffer: RawBuffer::new(buffer),
            head: Cell::new(None),
            free_total: Cell::new(0),
            config,
            stats: OptionalStats::new(config.track_stats),
        };
        freelist.init_single_block();
        Ok(freelist)
    }

    /// Size of the underlying buffer
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Sum of the sizes of all blocks on the free chain
    #[inline]
    pub fn free_bytes(&self) -> usize {
        self.free_total.get()
    }

    /// Walks the free chain and summarizes it
    pub fn fragmentation(&self) -> FragmentationStats {
        let (total, largest, count) = self
            .blocks()
            .fold((0, 0, 0), |(total, largest, count), block| {
                (total + block.size, largest.max(block.size), count + 1)
            });
        FragmentationStats::calculate(total, largest, count)
    }

    fn blocks(&self) -> impl Iterator<Item = FreeBlock> + '_ {
        let mut cursor = self.head.get();
        core::iter::from_fn(move || {
            let node = cursor?;
            // SAFETY: every node on the chain holds a header
            let block = unsafe { FreeBlock::read(node) };
            cursor = block.next();
            Some(block)
        })
    }

    fn init_single_block(&self) {
        let start = self.buffer.ptr_at(0);
        // SAFETY: the buffer is at least HEADER_SIZE bytes
        unsafe { FreeBlock::new(self.buffer.len(), None).write(start) };
        self.head.set(Some(start));
        self.free_total.set(self.buffer.len());
    }

    /// Pushes a block of `size` bytes at `node` onto the chain head
    ///
    /// # Safety
    /// `[node, node + size)` must lie in the buffer, be at least
    /// `HEADER_SIZE` bytes and not overlap any block already on the chain.
    unsafe fn push_block(&self, node: NonNull<u8>, size: usize) {
        // SAFETY: guaranteed by caller
        unsafe { FreeBlock::new(size, self.head.get()).write(node) };
        self.head.set(Some(node));
        self.free_total.set(self.free_total.get() + size);
    }

    /// Removes the block after `prev` (or the head) from the chain
    fn unlink(&self, prev: Option<NonNull<u8>>, next: Option<NonNull<u8>>) {
        match prev {
            None => self.head.set(next),
            Some(prev) => {
                // SAFETY: prev is a node on the chain
                unsafe {
                    let mut block = FreeBlock::read(prev);
                    block.set_next(next);
                    block.write(prev);
                }
            }
        }
    }

    /// First-fit search; splits the chosen block when the tail can hold a header
    fn take_first_fit(&self, layout: Layout) -> Option<NonNull<u8>> {
        let block_size = layout.size().max(HEADER_SIZE);
        let mut prev = None;
        let mut cursor = self.head.get();

        while let Some(node) = cursor {
            // SAFETY: node is on the chain
            let block = unsafe { FreeBlock::read(node) };
            let addr = node.as_ptr().addr();

            let fit = checked_align_up(addr, layout.align())
                .map(|aligned| aligned - addr)
                .and_then(|padding| Some((padding, padding.checked_add(block_size)?)))
                .filter(|(_, needed)| *needed <= block.size);

            if let Some((padding, needed)) = fit {
                self.unlink(prev, block.next());
                self.free_total.set(self.free_total.get() - block.size);

                let remainder = block.size - needed;
                if remainder > HEADER_SIZE {
                    // SAFETY: the tail lies inside the block just unlinked
                    unsafe { self.push_block(node.add(needed), remainder) };
                }

                // SAFETY: padding + block_size <= block.size
                return Some(unsafe { node.add(padding) });
            }

            prev = Some(node);
            cursor = block.next();
        }

        None
    }
}

// SAFETY: blocks handed out are unlinked from the chain and never overlap
// the tails pushed back; alignment is applied to the absolute address
unsafe impl Allocator for FreeListAllocator<'_> {
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        let Some(ptr) = self.take_first_fit(layout) else {
            self.stats.record_failure();
            return Err(AllocError::out_of_space_for(layout, self.free_bytes()));
        };

        // SAFETY: fresh block of at least layout.size() bytes
        unsafe { fill_pattern(ptr, layout.size(), self.config.alloc_pattern) };
        self.stats.record_allocation(self.used_memory());
        Ok(ptr)
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

        let new_ptr = self.allocate(new_layout)?;
        // SAFETY: the new block was on the free chain, so it is disjoint from
        // the live block at ptr
        unsafe {
            ptr::copy_nonoverlapping(
                ptr.as_ptr(),
                new_ptr.as_ptr(),
                old_size.min(new_layout.size()),
            );
            self.release(Some(ptr), old_size);
        }
        self.stats.record_reallocation(false, self.used_memory());
        Ok(new_ptr)
    }

    unsafe fn release(&self, ptr: Option<NonNull<u8>>, size: usize) {
        let Some(node) = ptr else { return };
        let block_size = size.max(HEADER_SIZE);
        debug_assert!(
            self.buffer.contains(node, block_size),
            "released block does not belong to this allocator"
        );

        // SAFETY: caller guarantees a live block of `size` bytes, which was
        // carved at least HEADER_SIZE wide
        unsafe {
            fill_pattern(node, block_size, self.config.release_pattern);
            self.push_block(node, block_size);
        }
        self.stats.record_release();
    }
}

impl Resettable for FreeListAllocator<'_> {
    unsafe fn reset(&self) {
        if let Some(byte) = self.config.release_pattern {
            // SAFETY: the whole buffer is being reclaimed
            unsafe { self.buffer.fill(0, self.buffer.len(), byte) };
        }
        self.init_single_block();

        #[cfg(feature = "logging")]
        trace!(capacity = self.buffer.len(), "freelist reset");
    }
}

impl MemoryUsage for FreeListAllocator<'_> {
    /// Bytes not on the free chain, including padding and unsplit tails
    fn used_memory(&self) -> usize {
        self.capacity() - self.free_bytes()
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.free_bytes())
    }
}

impl StatisticsProvider for FreeListAllocator<'_> {
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

impl fmt::Debug for FreeListAllocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreeListAllocator")
            .field("capacity", &self.capacity())
            .field("free_bytes", &self.free_bytes())
            .finish_non_exhaustive()
    }
}
