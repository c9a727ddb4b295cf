use crate::{
    config::GrowthConfig,
    error::{Error, Result},
    growable::Growable,
    ledger::RegionLedger,
    list::NodeId,
    pool::Policy,
};

/// Entry of the [`GapIndex`]. `region` refers to a gap owned by the
/// [`RegionLedger`]; the index never owns regions itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Gap {
    pub size: usize,
    pub region: NodeId,
}

/// Index over the free regions of a pool, sorted by size in ascending order.
///
/// Entries are appended one at a time and bubbled towards the front until the
/// order is restored. Equal sizes keep their insertion order.
///
/// ```text
///  insert(12)
///  [ 4 | 10 | 16 | 40 | 12 ]  ->  [ 4 | 10 | 12 | 16 | 40 ]
/// ```
pub(crate) struct GapIndex {
    entries: Growable<Gap>,
}

impl GapIndex {
    pub fn new(growth: GrowthConfig) -> Result<Self> {
        Ok(Self {
            entries: Growable::new(growth)?,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &Gap> {
        self.entries.iter()
    }

    /// Makes sure the next [`GapIndex::insert`] can not fail.
    pub fn reserve(&mut self) -> Result<()> {
        self.entries.reserve()
    }

    pub fn insert(&mut self, size: usize, region: NodeId) -> Result<()> {
        self.entries.push(Gap { size, region })?;
        self.sort();

        Ok(())
    }

    /// Moves the trailing entry to its place. Only the last entry can be out
    /// of order, since every insertion sorts right away.
    fn sort(&mut self) {
        let entries = self.entries.as_mut_slice();
        let mut i = entries.len().saturating_sub(1);

        while i > 0 && entries[i].size < entries[i - 1].size {
            entries.swap(i, i - 1);
            i -= 1;
        }
    }

    /// Removes the entry referring to `region`. Regions are matched by
    /// identity since several gaps may share a size.
    pub fn remove(&mut self, region: NodeId) -> Result<Gap> {
        let position = self
            .entries
            .iter()
            .position(|gap| gap.region == region)
            .ok_or(Error::GapNotFound)?;

        self.entries.remove(position).ok_or(Error::GapNotFound)
    }

    /// Smallest gap that can hold `size` bytes.
    pub fn best_fit(&self, size: usize) -> Option<NodeId> {
        self.entries
            .iter()
            .find(|gap| gap.size >= size)
            .map(|gap| gap.region)
    }

    /// Picks a gap for `size` bytes according to `policy`. `None` means no
    /// gap is large enough.
    pub fn find(&self, policy: Policy, size: usize, ledger: &RegionLedger) -> Option<NodeId> {
        match policy {
            Policy::FirstFit => ledger.first_fit(size),
            Policy::BestFit => self.best_fit(size),
        }
    }
}
