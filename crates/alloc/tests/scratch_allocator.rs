//! Integration tests for Scratch allocator

mod common;

use common::{AlignedBuffer, layout};
use nebula_alloc::prelude::*;
use nebula_alloc::scratch::INITIAL_CAPACITY;

#[test]
fn test_scratch_over_system_allocator() {
    let scratch = ScratchAllocator::new(system());

    for i in 0..20 {
        let ptr = scratch.allocate(layout(64 + i, 8)).expect("system allocation");
        unsafe { ptr.as_ptr().write_bytes(i as u8, 64 + i) };
    }
    assert_eq!(scratch.tracked_count(), 20);
    assert_eq!(scratch.tracked_capacity(), INITIAL_CAPACITY * 4);

    unsafe { scratch.reset() };
    assert_eq!(scratch.tracked_count(), 0);
    assert_eq!(scratch.tracked_capacity(), INITIAL_CAPACITY * 4);

    scratch.allocate(layout(16, 8)).expect("reuse after reset");
    scratch.destroy();
}

#[test]
fn test_scratch_release_through_freelist() {
    let mut buffer = AlignedBuffer::<2048>::new();
    let freelist = FreeListAllocator::new(&mut buffer.0).expect("freelist");
    let initial_free = freelist.free_bytes();

    {
        let scratch = ScratchAllocator::new(&freelist);
        for _ in 0..10 {
            scratch.allocate(layout(48, 8)).expect("scratch allocation");
        }
        assert!(freelist.free_bytes() < initial_free - 480);

        unsafe { scratch.reset() };
        assert_eq!(scratch.tracked_bytes(), 0);
    }

    // every block and the tracking table went back to the freelist
    assert_eq!(freelist.fragmentation().total_free, initial_free);
}

#[test]
fn test_scratch_reallocate_tracks_new_pointer() {
    let mut buffer = AlignedBuffer::<1024>::new();
    let stack = StackAllocator::new(&mut buffer.0);
    let scratch = ScratchAllocator::new(&stack);

    let first = scratch.allocate(layout(8, 8)).expect("first");
    unsafe { first.cast::<u64>().as_ptr().write(0xFEED) };
    let second = unsafe { scratch.reallocate(Some(first), 8, layout(128, 8)) }.expect("grow");

    assert_eq!(scratch.tracked_count(), 1);
    assert_eq!(scratch.tracked_bytes(), 128);
    assert_eq!(unsafe { second.cast::<u64>().as_ptr().read() }, 0xFEED);
}

#[test]
fn test_scratch_failure_leaves_state() {
    let mut buffer = AlignedBuffer::<256>::new();
    let arena = ArenaAllocator::new(&mut buffer.0);
    let scratch = ScratchAllocator::with_config(&arena, AllocatorConfig::debug());

    scratch.allocate(layout(16, 8)).expect("fits");
    let error = scratch.allocate(layout(512, 8)).expect_err("too large");
    assert!(error.is_backing_failure());
    assert_eq!(error.code(), "ALLOC:BACKING_FAILURE");
    assert_eq!(scratch.tracked_count(), 1);
    assert_eq!(scratch.statistics().failed_allocations, 1);
}

#[test]
fn test_scratch_failed_reallocate_keeps_original() {
    let mut buffer = AlignedBuffer::<256>::new();
    let arena = ArenaAllocator::new(&mut buffer.0);
    let scratch = ScratchAllocator::with_config(&arena, AllocatorConfig::debug());

    let first = scratch.allocate(layout(16, 8)).expect("first");
    unsafe { first.as_ptr().write_bytes(0x42, 16) };
    let used = arena.offset();

    let error = unsafe { scratch.reallocate(Some(first), 16, layout(512, 8)) }
        .expect_err("backing cannot grow");
    assert!(error.is_backing_failure());
    assert!(error.backing_source().is_some_and(AllocError::is_out_of_space));

    assert_eq!(scratch.tracked_count(), 1);
    assert_eq!(scratch.tracked_bytes(), 16);
    assert_eq!(scratch.statistics().failed_allocations, 1);
    assert_eq!(scratch.statistics().reallocation_count, 0);
    assert_eq!(arena.offset(), used);
    let bytes = unsafe { std::slice::from_raw_parts(first.as_ptr(), 16) };
    assert_eq!(bytes, &[0x42; 16]);
}

#[test]
fn test_scratch_release_is_no_op() {
    let scratch = ScratchAllocator::new(system());
    let ptr = scratch.allocate(layout(32, 8)).expect("alloc");

    unsafe { scratch.release(Some(ptr), 32) };
    unsafe { scratch.release(None, 0) };
    assert_eq!(scratch.tracked_count(), 1);
}
