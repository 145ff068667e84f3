//! Alignment helpers shared by every buffer-backed strategy
//!
//! All alignments must be powers of two. `core::alloc::Layout` already
//! guarantees that for requests coming through [`crate::Allocator`].

/// Aligns a value up to the nearest multiple of alignment
///
/// # Examples
/// ```
/// use nebula_alloc::utils::align_up;
///
/// assert_eq!(align_up(7, 8), 8);
/// assert_eq!(align_up(8, 8), 8);
/// assert_eq!(align_up(9, 8), 16);
/// ```
#[inline(always)]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Aligns a value up, returning `None` instead of wrapping
///
/// Used on absolute addresses, where the rounding can cross `usize::MAX`.
///
/// # Examples
/// ```
/// use nebula_alloc::utils::checked_align_up;
///
/// assert_eq!(checked_align_up(9, 8), Some(16));
/// assert_eq!(checked_align_up(usize::MAX, 8), None);
/// ```
#[inline(always)]
pub const fn checked_align_up(value: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());
    match value.checked_add(alignment - 1) {
        Some(bumped) => Some(bumped & !(alignment - 1)),
        None => None,
    }
}

/// Checks if a value is aligned to the given alignment
///
/// # Examples
/// ```
/// use nebula_alloc::utils::is_aligned;
///
/// assert!(is_aligned(16, 8));
/// assert!(!is_aligned(17, 8));
/// ```
#[inline(always)]
pub const fn is_aligned(value: usize, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    value & (alignment - 1) == 0
}

/// Calculates padding needed to align a value
///
/// # Examples
/// ```
/// use nebula_alloc::utils::padding_needed;
///
/// assert_eq!(padding_needed(7, 8), 1);
/// assert_eq!(padding_needed(8, 8), 0);
/// ```
#[inline(always)]
pub const fn padding_needed(value: usize, alignment: usize) -> usize {
    align_up(value, alignment) - value
}

/// Check if a pointer is properly aligned
#[inline(always)]
pub fn is_aligned_ptr<T>(ptr: *const T, alignment: usize) -> bool {
    is_aligned(ptr.addr(), alignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 1, 0)]
    #[case(0, 8, 0)]
    #[case(1, 4, 4)]
    #[case(4, 4, 4)]
    #[case(5, 4, 8)]
    #[case(17, 16, 32)]
    #[case(4095, 4096, 4096)]
    fn align_up_rounds_to_next_multiple(
        #[case] value: usize,
        #[case] align: usize,
        #[case] expected: usize,
    ) {
        assert_eq!(align_up(value, align), expected);
        assert_eq!(checked_align_up(value, align), Some(expected));
        assert!(is_aligned(expected, align));
    }

    #[test]
    fn checked_align_up_detects_overflow() {
        assert_eq!(checked_align_up(usize::MAX - 2, 4), None);
        assert_eq!(checked_align_up(usize::MAX, 1), Some(usize::MAX));
    }

    #[test]
    fn padding() {
        assert_eq!(padding_needed(0, 16), 0);
        assert_eq!(padding_needed(1, 16), 15);
        assert_eq!(padding_needed(12, 8), 4);
    }

    #[test]
    fn pointer_alignment() {
        let value = 0u64;
        assert!(is_aligned_ptr(&raw const value, align_of::<u64>()));
    }
}
