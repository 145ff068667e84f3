//! Error types for nebula-alloc
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.
//!
//! Only conditions a correct caller can run into are reported here. Contract
//! violations (wrong size on release, foreign pointers, out-of-order marker
//! restores) are undefined behaviour and never surface as an error value.

use core::alloc::Layout;
use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Allocation errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The buffer, chunk chain or free chain cannot satisfy the request
    #[error("out of space: requested {size} bytes with {align} byte alignment, {available} bytes available")]
    OutOfSpace {
        size: usize,
        align: usize,
        available: usize,
    },

    /// A pool request larger than the pool's fixed chunk size
    #[error("requested {size} bytes exceeds pool chunk size of {chunk_size} bytes")]
    ChunkTooLarge { size: usize, chunk_size: usize },

    /// The allocator wrapped by a decorator failed
    #[error("backing allocator failed: {source}")]
    BackingFailure {
        #[source]
        source: Box<AllocError>,
    },

    /// Size and alignment do not form a valid layout
    #[error("invalid layout: {size} bytes with {align} byte alignment")]
    InvalidLayout { size: usize, align: usize },

    /// Allocator construction parameters are unusable
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl AllocError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutOfSpace { .. } => "ALLOC:OUT_OF_SPACE",
            Self::ChunkTooLarge { .. } => "ALLOC:CHUNK_TOO_LARGE",
            Self::BackingFailure { .. } => "ALLOC:BACKING_FAILURE",
            Self::InvalidLayout { .. } => "ALLOC:INVALID_LAYOUT",
            Self::InvalidConfig { .. } => "ALLOC:INVALID_CONFIG",
        }
    }

    // ========================================================================
    // Convenience Constructors
    // ========================================================================

    /// Create out of space error
    pub fn out_of_space(size: usize, align: usize, available: usize) -> Self {
        #[cfg(feature = "logging")]
        debug!(size, align, available, "allocation request exceeds available space");

        Self::OutOfSpace {
            size,
            align,
            available,
        }
    }

    /// Create out of space error from layout
    pub fn out_of_space_for(layout: Layout, available: usize) -> Self {
        Self::out_of_space(layout.size(), layout.align(), available)
    }

    /// Create chunk too large error
    pub fn chunk_too_large(size: usize, chunk_size: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(size, chunk_size, "pool request larger than chunk size");

        Self::ChunkTooLarge { size, chunk_size }
    }

    /// Wrap an error reported by a backing allocator
    pub fn backing_failure(source: AllocError) -> Self {
        #[cfg(feature = "logging")]
        debug!(code = source.code(), "backing allocator failed");

        Self::BackingFailure {
            source: Box::new(source),
        }
    }

    /// Create invalid layout error
    pub fn invalid_layout(size: usize, align: usize) -> Self {
        Self::InvalidLayout { size, align }
    }

    /// Create invalid configuration error
    pub fn invalid_config(reason: &str) -> Self {
        #[cfg(feature = "logging")]
        warn!(reason, "rejected allocator configuration");

        Self::InvalidConfig {
            reason: reason.to_string(),
        }
    }

    // ========================================================================
    // Kind checks
    // ========================================================================

    /// Check if this is an out of space error
    #[must_use]
    pub fn is_out_of_space(&self) -> bool {
        matches!(self, Self::OutOfSpace { .. })
    }

    /// Check if this is a chunk too large error
    #[must_use]
    pub fn is_chunk_too_large(&self) -> bool {
        matches!(self, Self::ChunkTooLarge { .. })
    }

    /// Check if this is a backing failure
    #[must_use]
    pub fn is_backing_failure(&self) -> bool {
        matches!(self, Self::BackingFailure { .. })
    }

    /// The error a backing allocator reported, if this wraps one
    #[must_use]
    pub fn backing_source(&self) -> Option<&AllocError> {
        match self {
            Self::BackingFailure { source } => Some(&**source),
            _ => None,
        }
    }
}

/// Result type for allocation operations
pub type AllocResult<T> = Result<T, AllocError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn out_of_space_mentions_request() {
        let error = AllocError::out_of_space(1024, 8, 16);
        let message = error.to_string();
        assert!(message.contains("1024"));
        assert!(message.contains("16 bytes available"));
        assert!(error.is_out_of_space());
    }

    #[test]
    fn out_of_space_from_layout() {
        let layout = Layout::new::<u64>();
        let error = AllocError::out_of_space_for(layout, 0);
        assert_eq!(
            error,
            AllocError::OutOfSpace {
                size: 8,
                align: 8,
                available: 0
            }
        );
    }

    #[test]
    fn backing_failure_keeps_source() {
        let inner = AllocError::chunk_too_large(64, 32);
        let error = AllocError::backing_failure(inner.clone());

        assert!(error.is_backing_failure());
        assert_eq!(error.backing_source(), Some(&inner));
        assert!(error.source().is_some());
        assert!(error.to_string().contains("chunk size"));
    }

    #[test]
    fn error_codes() {
        assert_eq!(AllocError::out_of_space(1, 1, 0).code(), "ALLOC:OUT_OF_SPACE");
        assert_eq!(AllocError::chunk_too_large(64, 32).code(), "ALLOC:CHUNK_TOO_LARGE");
        assert_eq!(AllocError::invalid_layout(8, 3).code(), "ALLOC:INVALID_LAYOUT");
        assert_eq!(AllocError::invalid_config("zero").code(), "ALLOC:INVALID_CONFIG");
    }
}
