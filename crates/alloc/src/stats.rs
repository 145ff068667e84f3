//! Allocator statistics tracking
//!
//! Counters live in a `Cell`, matching the single-threaded model of every
//! strategy in this crate. Collection is opt-in through
//! [`AllocatorConfig::track_stats`](crate::AllocatorConfig::track_stats).

use core::cell::Cell;
use core::fmt;

/// Statistics snapshot for an allocator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Successful allocations, including those made on behalf of `reallocate`
    pub allocation_count: usize,
    /// Calls to `release` with a non-null pointer
    pub release_count: usize,
    /// Successful reallocations
    pub reallocation_count: usize,
    /// Reallocations that kept the original address
    pub in_place_count: usize,
    /// Requests the allocator could not satisfy
    pub failed_allocations: usize,
    /// Highest number of bytes in use at once
    pub peak_used: usize,
}

impl AllocatorStats {
    /// Creates a new empty stats object
    pub const fn new() -> Self {
        Self {
            allocation_count: 0,
            release_count: 0,
            reallocation_count: 0,
            in_place_count: 0,
            failed_allocations: 0,
            peak_used: 0,
        }
    }

    /// Fraction of requests that succeeded (0.0 to 1.0)
    #[must_use]
    pub fn allocation_efficiency(&self) -> f64 {
        let attempts = self.allocation_count + self.failed_allocations;
        if attempts > 0 {
            self.allocation_count as f64 / attempts as f64
        } else {
            1.0
        }
    }

    /// Fraction of reallocations served without moving
    #[must_use]
    pub fn in_place_ratio(&self) -> Option<f64> {
        (self.reallocation_count > 0)
            .then(|| self.in_place_count as f64 / self.reallocation_count as f64)
    }
}

impl fmt::Display for AllocatorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Allocator Statistics:")?;
        writeln!(f, "  Allocations: {}", self.allocation_count)?;
        writeln!(f, "  Releases: {}", self.release_count)?;
        writeln!(
            f,
            "  Reallocations: {} ({} in place)",
            self.reallocation_count, self.in_place_count
        )?;
        writeln!(f, "  Failed allocations: {}", self.failed_allocations)?;
        write!(f, "  Peak used: {} bytes", self.peak_used)
    }
}

/// Trait for allocators that support statistics collection
pub trait StatisticsProvider {
    /// Get current statistics
    fn statistics(&self) -> AllocatorStats;

    /// Reset statistics
    fn reset_statistics(&self);

    /// Check if statistics collection is enabled
    fn statistics_enabled(&self) -> bool {
        true
    }
}

/// Helper for conditional statistics collection
#[derive(Debug)]
pub(crate) struct OptionalStats {
    stats: Option<Cell<AllocatorStats>>,
}

impl OptionalStats {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            stats: enabled.then(|| Cell::new(AllocatorStats::new())),
        }
    }

    #[inline]
    fn update(&self, f: impl FnOnce(&mut AllocatorStats)) {
        if let Some(cell) = &self.stats {
            let mut stats = cell.get();
            f(&mut stats);
            cell.set(stats);
        }
    }

    #[inline]
    pub(crate) fn record_allocation(&self, used: usize) {
        self.update(|stats| {
            stats.allocation_count += 1;
            stats.peak_used = stats.peak_used.max(used);
        });
    }

    #[inline]
    pub(crate) fn record_release(&self) {
        self.update(|stats| stats.release_count += 1);
    }

    #[inline]
    pub(crate) fn record_reallocation(&self, in_place: bool, used: usize) {
        self.update(|stats| {
            stats.reallocation_count += 1;
            if in_place {
                stats.in_place_count += 1;
            }
            stats.peak_used = stats.peak_used.max(used);
        });
    }

    #[inline]
    pub(crate) fn record_failure(&self) {
        self.update(|stats| stats.failed_allocations += 1);
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.stats.is_some()
    }

    pub(crate) fn snapshot(&self) -> AllocatorStats {
        self.stats.as_ref().map(Cell::get).unwrap_or_default()
    }

    pub(crate) fn reset(&self) {
        if let Some(cell) = &self.stats {
            cell.set(AllocatorStats::new());
        }
    }
}
