//! Free-chain fragmentation metrics

use core::fmt;

/// Snapshot of a free chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FragmentationStats {
    /// Total free memory across all fragments (bytes)
    pub total_free: usize,

    /// Size of the largest free block (bytes)
    pub largest_block: usize,

    /// Number of blocks on the free chain
    pub fragment_count: usize,

    /// External fragmentation ratio (0-100)
    ///
    /// Calculated as: `100 * (1 - largest_block / total_free)`
    pub fragmentation_percent: u8,
}

impl FragmentationStats {
    /// Calculate fragmentation percentage from free space metrics
    #[must_use]
    pub fn calculate(total_free: usize, largest_block: usize, fragment_count: usize) -> Self {
        let fragmentation_percent = if total_free > 0 {
            let ratio = 1.0 - (largest_block as f64 / total_free as f64);
            (ratio * 100.0).clamp(0.0, 100.0) as u8
        } else {
            0
        };

        Self {
            total_free,
            largest_block,
            fragment_count,
            fragmentation_percent,
        }
    }

    /// Check if fragmentation is concerning (>50%)
    #[inline]
    #[must_use]
    pub fn is_fragmented(&self) -> bool {
        self.fragmentation_percent > 50
    }
}

impl fmt::Display for FragmentationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes free in {} blocks, largest {} bytes ({}% fragmented)",
            self.total_free, self.fragment_count, self.largest_block, self.fragmentation_percent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_block_is_not_fragmented() {
        let stats = FragmentationStats::calculate(1024, 1024, 1);
        assert_eq!(stats.fragmentation_percent, 0);
        assert!(!stats.is_fragmented());
    }

    #[test]
    fn scattered_blocks() {
        let stats = FragmentationStats::calculate(400, 100, 4);
        assert_eq!(stats.fragmentation_percent, 75);
        assert!(stats.is_fragmented());
        assert_eq!(
            stats.to_string(),
            "400 bytes free in 4 blocks, largest 100 bytes (75% fragmented)"
        );
    }

    #[test]
    fn empty_chain() {
        assert_eq!(FragmentationStats::calculate(0, 0, 0), FragmentationStats::default());
    }
}
