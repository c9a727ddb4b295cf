use crate::{
    config::GrowthConfig,
    error::{Error, Result},
    gap_index::GapIndex,
    list::{List, NodeId},
    region::Region,
};

/// Address ordered chain of every [`Region`] of one arena.
///
/// The chain always tiles the arena: the head starts at offset 0, each region
/// starts where its predecessor ends and the sizes add up to the arena size.
/// Two free regions are never neighbours, because [`RegionLedger::release`]
/// merges a freed region with both sides right away. That is why looking one
/// step left and one step right is enough.
///
/// ```text
///            release(B)
/// +------+------+------+      +--------------------+
/// | Gap  |  B   | Gap  |  ->  |        Gap         |
/// +------+------+------+      +--------------------+
/// ```
pub(crate) struct RegionLedger {
    regions: List<Region>,
}

impl RegionLedger {
    /// Creates the chain of a fresh arena: one gap covering all of it.
    pub fn new(total_size: usize, growth: GrowthConfig) -> Result<Self> {
        let mut regions = List::new(growth)?;
        regions.push_back(Region::gap(0, total_size))?;

        Ok(Self { regions })
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn first(&self) -> Option<NodeId> {
        self.regions.first()
    }

    #[inline]
    pub fn region(&self, id: NodeId) -> Option<&Region> {
        self.regions.get(id)
    }

    #[inline]
    pub fn iter(&self) -> crate::list::Iter<'_, Region> {
        self.regions.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.regions.ids()
    }

    /// Makes sure the next [`RegionLedger::split`] can create its remainder.
    pub fn reserve(&mut self) -> Result<()> {
        self.regions.reserve()
    }

    /// The arena is back to a single gap spanning all of it.
    pub fn is_pristine(&self) -> bool {
        self.regions.len() == 1 && self.regions.iter().all(Region::is_free)
    }

    /// Returns the first gap in address order that can hold `size` bytes.
    pub fn first_fit(&self, size: usize) -> Option<NodeId> {
        self.ids().find(|id| {
            self.region(*id)
                .is_some_and(|region| region.is_free() && region.size >= size)
        })
    }

    /// Turns the gap `id` into an allocated region of exactly `size` bytes.
    ///
    /// If the gap is larger than `size`, the remainder becomes a new gap
    /// placed right after the allocated region, and its id is returned.
    pub fn split(&mut self, id: NodeId, size: usize, ticket: u64) -> Result<Option<NodeId>> {
        let (offset, remainder) = match self.regions.get(id) {
            Some(region) if region.is_free() && region.size >= size => {
                (region.offset, region.size - size)
            }
            _ => return Err(Error::NoCapacity),
        };

        // Acquire the slot for the remainder before touching the chain.
        if remainder > 0 {
            self.regions.reserve()?;
        }

        if let Some(region) = self.regions.get_mut(id) {
            region.size = size;
            region.allocated = true;
            region.used = true;
            region.ticket = ticket;
        }

        if remainder == 0 {
            return Ok(None);
        }

        self.regions
            .insert_after(id, Region::gap(offset + size, remainder))
    }

    /// Absorbs gap `b` into gap `a`. `b` must directly follow `a`.
    fn merge(&mut self, a: NodeId, b: NodeId) -> bool {
        if self.regions.next(a) != Some(b) {
            return false;
        }

        let Some(absorbed) = self.regions.remove(b) else {
            return false;
        };

        if let Some(region) = self.regions.get_mut(a) {
            debug_assert_eq!(region.end(), absorbed.offset);
            region.size += absorbed.size;
        }

        tracing::trace!(
            into = a.index(),
            absorbed = b.index(),
            size = absorbed.size,
            "regions merged"
        );

        true
    }

    /// Merges `node` with the following region if that one is a gap.
    fn merge_with_next(&mut self, node: NodeId, gaps: &mut GapIndex) -> Result<()> {
        if let Some(next) = self.regions.next(node) {
            if self.region(next).is_some_and(Region::is_free) {
                // The neighbour disappears, so it must leave the index first.
                gaps.remove(next)?;
                self.merge(node, next);
            }
        }

        Ok(())
    }

    /// Merges `node` into the preceding region if that one is a gap. On
    /// success `node` is updated to point to the surviving region.
    fn merge_with_prev(&mut self, node: &mut NodeId, gaps: &mut GapIndex) -> Result<()> {
        if let Some(prev) = self.regions.prev(*node) {
            if self.region(prev).is_some_and(Region::is_free) {
                gaps.remove(prev)?;
                if self.merge(prev, *node) {
                    *node = prev;
                }
            }
        }

        Ok(())
    }

    /// Turns the allocated region `id` back into a gap and coalesces it with
    /// its free neighbours, right side first.
    ///
    /// Neighbours that get absorbed are removed from `gaps`. The returned
    /// region is the surviving gap, which is not in `gaps` yet.
    pub fn release(&mut self, id: NodeId, gaps: &mut GapIndex) -> Result<NodeId> {
        let region = self
            .regions
            .get_mut(id)
            .filter(|region| region.allocated)
            .ok_or(Error::InvalidAllocation)?;

        region.allocated = false;
        region.used = false;
        region.ticket = 0;

        let mut node = id;
        self.merge_with_next(node, gaps)?;
        self.merge_with_prev(&mut node, gaps)?;

        Ok(node)
    }
}
