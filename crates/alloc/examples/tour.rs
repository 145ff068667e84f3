//! A walk through every allocation strategy
//!
//! Run with `RUST_LOG=debug cargo run --example tour` to also see the
//! allocator's own events.

use nebula_alloc::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn heap() -> AllocResult<()> {
    let heap = system();
    let numbers = heap.alloc_array_with::<i32>(5, |i| i as i32 * 10)?;

    // SAFETY: five initialized values
    let values = unsafe { core::slice::from_raw_parts(numbers.as_ptr(), 5) };
    info!(?values, "system allocator");

    // SAFETY: allocated above as five i32s
    unsafe { heap.dealloc_array(numbers, 5) };
    Ok(())
}

fn arena() -> AllocResult<()> {
    let mut buffer = [0u8; 1024];
    let arena = ArenaAllocator::new(&mut buffer);

    let a = arena.alloc_init(42i32)?;
    let b = arena.alloc_init(99i32)?;
    // SAFETY: both initialized and live
    let (a, b) = unsafe { (*a.as_ptr(), *b.as_ptr()) };
    info!(a, b, used = arena.offset(), "arena allocator");

    // SAFETY: a and b are not used past this point
    unsafe { arena.reset() };
    info!(offset = arena.offset(), "arena reset");
    Ok(())
}

fn pool() -> AllocResult<()> {
    let mut buffer = [0u8; 256];
    let pool = PoolAllocator::new(&mut buffer, 32, 8)?;
    let chunk = core::alloc::Layout::from_size_align(32, 1)
        .map_err(|_| AllocError::invalid_layout(32, 1))?;

    let p1 = pool.allocate(chunk)?;
    let p2 = pool.allocate(chunk)?;
    let p3 = pool.allocate(chunk)?;
    info!(?p1, ?p2, ?p3, "allocated three chunks");

    // SAFETY: p2 is a live chunk of this pool
    unsafe { pool.release(Some(p2), 32) };
    let p4 = pool.allocate(chunk)?;
    info!(?p4, reused = p4 == p2, "freed the middle chunk and allocated again");
    Ok(())
}

fn stack() -> AllocResult<()> {
    let mut buffer = [0u8; 512];
    let stack = StackAllocator::new(&mut buffer);

    let x = stack.alloc_init(123i32)?;
    let marker = stack.mark();
    let y = stack.alloc_init(456i32)?;
    let z = stack.alloc_init(789i32)?;
    // SAFETY: all three initialized and live
    let (x, y, z) = unsafe { (*x.as_ptr(), *y.as_ptr(), *z.as_ptr()) };
    info!(x, y, z, offset = stack.offset(), "stack allocator");

    // SAFETY: y and z are not used past this point
    unsafe { stack.restore(marker) };
    info!(offset = stack.offset(), "restored to marker");

    {
        let _frame = StackFrame::new(&stack);
        stack.alloc_array::<u64>(16)?;
        info!(offset = stack.offset(), "inside a frame");
    }
    info!(offset = stack.offset(), "frame dropped");
    Ok(())
}

fn scratch() -> AllocResult<()> {
    let scratch = ScratchAllocator::new(system());

    scratch.alloc_array::<i32>(10)?;
    scratch.alloc_array::<i32>(20)?;
    info!(
        allocations = scratch.tracked_count(),
        bytes = scratch.tracked_bytes(),
        "scratch allocator"
    );

    // SAFETY: neither array is used past this point
    unsafe { scratch.reset() };
    info!(allocations = scratch.tracked_count(), "scratch reset, everything freed");

    scratch.destroy();
    Ok(())
}

fn freelist() -> AllocResult<()> {
    let mut buffer = [0u8; 1024];
    let freelist = FreeListAllocator::new(&mut buffer)?;
    let layout = |size| {
        core::alloc::Layout::from_size_align(size, 8)
            .map_err(|_| AllocError::invalid_layout(size, 8))
    };

    let _f1 = freelist.allocate(layout(64)?)?;
    let f2 = freelist.allocate(layout(128)?)?;
    let _f3 = freelist.allocate(layout(64)?)?;
    info!(fragmentation = %freelist.fragmentation(), "allocated three blocks");

    // SAFETY: f2 is a live 128-byte block of this allocator
    unsafe { freelist.release(Some(f2), 128) };
    info!(fragmentation = %freelist.fragmentation(), "freed the middle block");

    let f4 = freelist.allocate(layout(100)?)?;
    info!(reused = f4 == f2, "allocated a block into the freed space");
    Ok(())
}

fn main() -> Result<(), AllocError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    heap()?;
    arena()?;
    pool()?;
    stack()?;
    scratch()?;
    freelist()?;
    Ok(())
}
