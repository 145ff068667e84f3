//! Integration tests for statistics shared by every strategy

mod common;

use common::{AlignedBuffer, layout};
use nebula_alloc::prelude::*;

/// Allocates a block, pins it with a second one, then grows the first so it
/// has to move
fn moving_reallocate<A: Allocator + StatisticsProvider>(allocator: &A) -> AllocatorStats {
    let first = allocator.allocate(layout(8, 8)).expect("first");
    allocator.allocate(layout(8, 8)).expect("blocker");

    let moved = unsafe { allocator.reallocate(Some(first), 8, layout(64, 8)) }.expect("move");
    assert_ne!(moved, first);
    allocator.statistics()
}

#[test]
fn test_moving_reallocate_counts_alike() {
    let mut arena_buffer = AlignedBuffer::<512>::new();
    let arena = ArenaAllocator::with_config(&mut arena_buffer.0, AllocatorConfig::debug());

    let mut stack_buffer = AlignedBuffer::<512>::new();
    let stack = StackAllocator::with_config(&mut stack_buffer.0, AllocatorConfig::debug());

    let mut freelist_buffer = AlignedBuffer::<512>::new();
    let freelist =
        FreeListAllocator::with_config(&mut freelist_buffer.0, AllocatorConfig::debug())
            .expect("freelist");

    for (name, stats) in [
        ("arena", moving_reallocate(&arena)),
        ("stack", moving_reallocate(&stack)),
        ("freelist", moving_reallocate(&freelist)),
    ] {
        assert_eq!(stats.allocation_count, 3, "{name}");
        assert_eq!(stats.reallocation_count, 1, "{name}");
        assert_eq!(stats.in_place_count, 0, "{name}");
        assert_eq!(stats.failed_allocations, 0, "{name}");
    }
}

#[test]
fn test_failed_moving_reallocate_counts_one_failure() {
    let mut arena_buffer = AlignedBuffer::<32>::new();
    let arena = ArenaAllocator::with_config(&mut arena_buffer.0, AllocatorConfig::debug());

    let mut freelist_buffer = AlignedBuffer::<64>::new();
    let freelist =
        FreeListAllocator::with_config(&mut freelist_buffer.0, AllocatorConfig::debug())
            .expect("freelist");

    for (name, allocator) in [
        ("arena", &arena as &dyn Allocator),
        ("freelist", &freelist as &dyn Allocator),
    ] {
        let first = allocator.allocate(layout(8, 8)).expect("first");
        allocator.allocate(layout(8, 8)).expect("blocker");
        let error = unsafe { allocator.reallocate(Some(first), 8, layout(128, 8)) }
            .expect_err(name);
        assert!(error.is_out_of_space(), "{name}");
    }

    for stats in [arena.statistics(), freelist.statistics()] {
        assert_eq!(stats.allocation_count, 2);
        assert_eq!(stats.reallocation_count, 0);
        assert_eq!(stats.failed_allocations, 1);
    }
}
