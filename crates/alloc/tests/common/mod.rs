//! Shared helpers for the integration tests
#![allow(dead_code)]

use std::alloc::Layout;
use std::ptr::NonNull;

/// Byte buffer with a known alignment, so offsets in tests are predictable
#[repr(C, align(16))]
pub struct AlignedBuffer<const N: usize>(pub [u8; N]);

impl<const N: usize> AlignedBuffer<N> {
    pub fn new() -> Self {
        Self([0; N])
    }

    pub fn base(&self) -> usize {
        self.0.as_ptr() as usize
    }
}

/// Offset of `ptr` from `base`
pub fn offset(base: usize, ptr: NonNull<u8>) -> usize {
    ptr.as_ptr() as usize - base
}

pub fn layout(size: usize, align: usize) -> Layout {
    Layout::from_size_align(size, align).expect("valid layout")
}

/// Installs a test subscriber so `logging` events show up with `--nocapture`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
