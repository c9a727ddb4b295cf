//! Helper functions that don't belong to any concrete module of the allocator.

/// Rounds `to_be_aligned` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two. Arena mappings are rounded to the
/// page size returned by [`crate::kernel::page_size`] because the kernel hands
/// out memory in whole pages anyway. Returns `None` if the rounded value does
/// not fit in a `usize`.
pub(crate) fn align(to_be_aligned: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());

    to_be_aligned
        .checked_add(alignment - 1)
        .map(|padded| padded & !(alignment - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn align_pointer_size() {
        let alignments = vec![(1..8, 8), (9..16, 16), (17..24, 24), (25..32, 32)];

        for (sizes, expected) in alignments {
            for size in sizes {
                assert_eq!(Some(expected), align(size, mem::size_of::<u64>()));
            }
        }
    }

    #[test]
    fn align_page_size() {
        let alignments = vec![(1..4096, 4096), (4097..8192, 8192)];

        for (sizes, expected) in alignments {
            for size in sizes {
                assert_eq!(Some(expected), align(size, 4096));
            }
        }
    }

    #[test]
    fn align_overflow_is_none() {
        assert_eq!(None, align(usize::MAX, 4096));
        assert_eq!(Some(0), align(0, 4096));
    }
}
