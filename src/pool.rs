use crate::{
    arena::Arena,
    config::Config,
    error::{Error, Result},
    gap_index::GapIndex,
    ledger::RegionLedger,
    list::NodeId,
    region::{Region, Segment},
    registry::PoolHandle,
};

/// Placement policy of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Policy {
    /// First gap in address order that is large enough.
    #[default]
    FirstFit,
    /// Smallest gap that is large enough.
    BestFit,
}

/// Opaque reference to one live allocation.
///
/// The handle stays `Copy` and cheap, but it is checked on every use: once the
/// allocation is freed the handle is rejected, even if the same bytes were
/// handed out again in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocationHandle {
    pool: PoolHandle,
    region: NodeId,
    ticket: u64,
    offset: usize,
    size: usize,
}

impl AllocationHandle {
    /// Pool this allocation was made from.
    #[inline]
    pub fn pool(&self) -> PoolHandle {
        self.pool
    }

    /// Start of the allocation, relative to the beginning of the pool.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Counters of one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub policy: Policy,
    pub total_size: usize,
    /// Bytes currently handed out, gaps excluded.
    pub alloc_size: usize,
    /// Live allocations.
    pub num_allocs: usize,
    /// Free regions.
    pub num_gaps: usize,
}

/// Owner of one arena and of the two structures describing it.
///
/// Every allocate and deallocate drives the [`RegionLedger`] and the
/// [`GapIndex`] together, so that the set of gaps in the ledger and the
/// entries of the index are always the same:
///
/// ```text
///  ledger:  [ A:16 ] -> [ gap:8 ] -> [ B:24 ] -> [ gap:16 ]
///                          ^                        ^
///  index:   [ 8 | 16 ] ----+------------------------+
/// ```
///
/// Storage for the remainder of a split and for the re-added gap is reserved
/// before anything changes, so a failed operation leaves the pool untouched.
pub(crate) struct PoolManager {
    handle: PoolHandle,
    policy: Policy,
    arena: Arena,
    ledger: RegionLedger,
    gaps: GapIndex,
    num_allocs: usize,
    alloc_size: usize,
    next_ticket: u64,
}

impl PoolManager {
    /// Maps a new arena of `total_size` bytes and covers it with a single gap.
    ///
    /// Whatever was acquired before a failure is released on the way out.
    pub fn open(
        handle: PoolHandle,
        total_size: usize,
        policy: Policy,
        config: &Config,
    ) -> Result<Self> {
        let arena = Arena::new(total_size)?;
        let ledger = RegionLedger::new(total_size, config.node_heap)?;
        let mut gaps = GapIndex::new(config.gap_index)?;

        if let Some(first) = ledger.first() {
            gaps.insert(total_size, first)?;
        }

        Ok(Self {
            handle,
            policy,
            arena,
            ledger,
            gaps,
            num_allocs: 0,
            alloc_size: 0,
            next_ticket: 1,
        })
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            policy: self.policy,
            total_size: self.arena.size(),
            alloc_size: self.alloc_size,
            num_allocs: self.num_allocs,
            num_gaps: self.gaps.len(),
        }
    }

    /// A pool can only be closed once it is back to one gap spanning the
    /// whole arena.
    pub fn ensure_closable(&self) -> Result<()> {
        if self.num_allocs != 0 || !self.ledger.is_pristine() {
            return Err(Error::PoolNotEmpty);
        }

        Ok(())
    }

    /// Carves `size` bytes out of a gap chosen by the pool's policy.
    pub fn allocate(&mut self, size: usize) -> Result<AllocationHandle> {
        if size == 0 {
            return Err(Error::InvalidSize);
        }

        if self.gaps.is_empty() {
            return Err(Error::NoCapacity);
        }

        let region = self
            .gaps
            .find(self.policy, size, &self.ledger)
            .ok_or(Error::NoCapacity)?;

        self.ledger.reserve()?;
        self.gaps.reserve()?;

        self.gaps.remove(region)?;

        let ticket = self.next_ticket;
        self.next_ticket += 1;

        if let Some(rest) = self.ledger.split(region, size, ticket)? {
            let rest_size = self.region(rest)?.size;
            self.gaps.insert(rest_size, rest)?;
        }

        self.num_allocs += 1;
        self.alloc_size += size;

        let offset = self.region(region)?.offset;

        tracing::debug!(
            pool = self.handle.slot(),
            offset,
            size,
            num_allocs = self.num_allocs,
            num_gaps = self.gaps.len(),
            "allocated"
        );

        Ok(AllocationHandle {
            pool: self.handle,
            region,
            ticket,
            offset,
            size,
        })
    }

    /// Returns the allocation to the pool, merging it with free neighbours.
    pub fn deallocate(&mut self, alloc: AllocationHandle) -> Result<()> {
        let size = self.lookup(&alloc)?.size;

        self.gaps.reserve()?;

        let merged = self.ledger.release(alloc.region, &mut self.gaps)?;
        let merged_size = self.region(merged)?.size;
        self.gaps.insert(merged_size, merged)?;

        self.num_allocs -= 1;
        self.alloc_size -= size;

        tracing::debug!(
            pool = self.handle.slot(),
            offset = alloc.offset,
            size,
            gap = merged_size,
            num_allocs = self.num_allocs,
            num_gaps = self.gaps.len(),
            "deallocated"
        );

        Ok(())
    }

    /// Bytes of a live allocation.
    pub fn memory(&self, alloc: &AllocationHandle) -> Result<&[u8]> {
        let region = *self.lookup(alloc)?;

        self.arena
            .bytes(region.offset, region.size)
            .ok_or(Error::InvalidAllocation)
    }

    /// Mutable bytes of a live allocation.
    pub fn memory_mut(&mut self, alloc: &AllocationHandle) -> Result<&mut [u8]> {
        let region = *self.lookup(alloc)?;

        self.arena
            .bytes_mut(region.offset, region.size)
            .ok_or(Error::InvalidAllocation)
    }

    /// Every region of the arena, in address order.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.ledger.iter().map(Segment::from)
    }

    pub fn inspect(&self) -> Vec<Segment> {
        self.segments().collect()
    }

    fn region(&self, id: NodeId) -> Result<&Region> {
        self.ledger.region(id).ok_or(Error::InvalidAllocation)
    }

    /// Region of a live allocation made by this pool.
    fn lookup(&self, alloc: &AllocationHandle) -> Result<&Region> {
        if alloc.pool != self.handle {
            return Err(Error::InvalidAllocation);
        }

        self.ledger
            .region(alloc.region)
            .filter(|region| region.allocated && region.ticket == alloc.ticket)
            .ok_or(Error::InvalidAllocation)
    }

    /// Asserts every structural invariant of the pool.
    #[cfg(test)]
    pub fn check_invariants(&self) {
        let regions: Vec<Region> = self.ledger.iter().copied().collect();

        // The chain tiles the arena.
        let mut offset = 0;
        for region in &regions {
            assert_eq!(region.offset, offset);
            assert_eq!(region.used, region.allocated);
            offset += region.size;
        }
        assert_eq!(offset, self.arena.size());
        assert_eq!(regions.len(), self.ledger.len());

        // No two neighbouring gaps.
        for pair in regions.windows(2) {
            assert!(pair[0].used || pair[1].used, "adjacent gaps {pair:?}");
        }

        // Counters mirror the chain.
        let allocated: Vec<&Region> = regions.iter().filter(|r| r.allocated).collect();
        assert_eq!(self.num_allocs, allocated.len());
        assert_eq!(self.alloc_size, allocated.iter().map(|r| r.size).sum::<usize>());

        // The index holds exactly the gaps of the chain, in ascending order.
        let free = regions.iter().filter(|r| !r.used).count();
        assert_eq!(self.gaps.len(), free);
        assert_eq!(self.stats().num_gaps, free);
        for gap in self.gaps.iter() {
            let region = self.ledger.region(gap.region).unwrap();
            assert!(!region.used);
            assert_eq!(region.size, gap.size);
        }
        let sizes: Vec<usize> = self.gaps.iter().map(|gap| gap.size).collect();
        assert!(sizes.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}
