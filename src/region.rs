/// A contiguous sub-range of a pool's arena.
///
/// Regions are the nodes of the [`crate::ledger::RegionLedger`] chain. Every
/// byte of the arena belongs to exactly one region, so walking the chain from
/// the head visits consecutive offsets:
///
/// ```text
/// offset 0                                                      total_size
/// +-----------------+----------+------------------------+-----------+
/// | Region (used)   | Gap      | Region (used)          | Gap       |
/// +-----------------+----------+------------------------+-----------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Region {
    /// Start of the region, relative to the beginning of the arena.
    pub offset: usize,
    /// Size of the region in bytes.
    pub size: usize,
    /// The region is a live slot handed out to a caller.
    pub allocated: bool,
    /// The region is occupied. A region with `used == false` is a gap.
    pub used: bool,
    /// Serial number of the allocation living in this region, zero for gaps.
    pub ticket: u64,
}

impl Region {
    pub fn gap(offset: usize, size: usize) -> Self {
        Self {
            offset,
            size,
            allocated: false,
            used: false,
            ticket: 0,
        }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        !self.used
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Read-only view of one region, as reported by pool inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub size: usize,
    pub allocated: bool,
}

impl From<&Region> for Segment {
    fn from(region: &Region) -> Self {
        Self {
            size: region.size,
            allocated: region.allocated,
        }
    }
}
