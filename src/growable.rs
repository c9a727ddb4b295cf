use std::slice;

use crate::{
    config::GrowthConfig,
    error::{Error, Result},
};

/// Append-only array with explicit growth policy.
///
/// The storage keeps a logical `capacity` that only changes when the
/// occupancy ratio crosses [`GrowthConfig::fill_factor`]. Growth multiplies it
/// by [`GrowthConfig::expand_factor`] and reserves the backing memory with
/// [`Vec::try_reserve_exact`], so a failed growth leaves the contents exactly
/// as they were.
///
/// ```text
///  capacity = 8, fill_factor = 0.75
/// +---+---+---+---+---+---+---+---+
/// | a | b | c | d | e | f | g |   |   7 / 8 > 0.75 -> grow to 16 before the push
/// +---+---+---+---+---+---+---+---+
/// ```
pub(crate) struct Growable<T> {
    items: Vec<T>,
    capacity: usize,
    growth: GrowthConfig,
}

impl<T> Growable<T> {
    /// Creates empty storage with `growth.init_capacity` slots reserved.
    pub fn new(growth: GrowthConfig) -> Result<Self> {
        let capacity = growth.init_capacity;
        let mut items = Vec::new();
        items.try_reserve_exact(capacity)?;

        Ok(Self {
            items,
            capacity,
            growth,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    fn needs_growth(&self) -> bool {
        self.items.len() >= self.capacity
            || (self.items.len() as f64 / self.capacity as f64) > f64::from(self.growth.fill_factor)
    }

    /// Grows the storage if the next [`Growable::push`] would cross the fill
    /// factor. After this returns `Ok`, one push is guaranteed not to
    /// reallocate.
    pub fn reserve(&mut self) -> Result<()> {
        if !self.needs_growth() {
            return Ok(());
        }

        let capacity = self
            .capacity
            .checked_mul(self.growth.expand_factor)
            .ok_or(Error::AllocationFailure)?
            .max(self.items.len() + 1);

        self.items.try_reserve_exact(capacity - self.items.len())?;

        tracing::trace!(from = self.capacity, to = capacity, "growable storage expanded");
        self.capacity = capacity;

        Ok(())
    }

    /// Appends `value` and returns its position.
    pub fn push(&mut self, value: T) -> Result<usize> {
        self.reserve()?;
        self.items.push(value);

        Ok(self.items.len() - 1)
    }

    /// Removes the element at `position`, shifting every later element one
    /// slot earlier.
    pub fn remove(&mut self, position: usize) -> Option<T> {
        (position < self.items.len()).then(|| self.items.remove(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_storage_is_empty() {
        let storage: Growable<u8> = Growable::new(GrowthConfig::new(4, 0.75, 2)).unwrap();

        assert!(storage.is_empty());
        assert_eq!(storage.capacity(), 4);
        assert!(storage.iter().next().is_none());
    }

    #[test]
    fn grows_only_past_fill_factor() {
        let mut storage = Growable::new(GrowthConfig::new(4, 0.75, 2)).unwrap();

        // 0/4, 1/4, 2/4 and 3/4 are all at or below the fill factor.
        for i in 0..4 {
            storage.push(i).unwrap();
        }
        assert_eq!(storage.capacity(), 4);

        // 4/4 > 0.75
        storage.push(4).unwrap();
        assert_eq!(storage.capacity(), 8);
        assert_eq!(storage.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn full_fill_factor_still_grows_when_full() {
        let mut storage = Growable::new(GrowthConfig::new(2, 1.0, 3)).unwrap();

        storage.push('a').unwrap();
        storage.push('b').unwrap();
        assert_eq!(storage.capacity(), 2);

        storage.push('c').unwrap();
        assert_eq!(storage.capacity(), 6);
        assert_eq!(storage.len(), 3);
    }

    #[test]
    fn failed_growth_keeps_contents() {
        let mut storage = Growable::new(GrowthConfig::new(1, 0.75, usize::MAX)).unwrap();
        storage.push(7u64).unwrap();

        assert_eq!(storage.push(8), Err(Error::AllocationFailure));
        assert_eq!(storage.reserve(), Err(Error::AllocationFailure));
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.capacity(), 1);
        assert_eq!(storage.get(0), Some(&7));
    }

    #[test]
    fn capacity_overflow_is_an_allocation_failure() {
        let mut storage = Growable::new(GrowthConfig::new(2, 1.0, usize::MAX)).unwrap();
        storage.push(1u8).unwrap();
        storage.push(2).unwrap();

        // 2 * usize::MAX does not fit.
        assert_eq!(storage.push(3), Err(Error::AllocationFailure));
        assert_eq!(storage.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(storage.capacity(), 2);
    }

    #[test]
    fn zero_initial_capacity_grows_on_first_push() {
        let mut storage = Growable::new(GrowthConfig::new(0, 0.75, 2)).unwrap();

        assert_eq!(storage.push('x'), Ok(0));
        assert_eq!(storage.capacity(), 1);
    }

    #[test]
    fn remove_shifts_later_elements() {
        let mut storage = Growable::new(GrowthConfig::default()).unwrap();
        for i in 0..5 {
            storage.push(i).unwrap();
        }

        assert_eq!(storage.remove(1), Some(1));
        assert_eq!(storage.remove(10), None);
        assert_eq!(storage.iter().copied().collect::<Vec<_>>(), vec![0, 2, 3, 4]);
        assert_eq!(storage.get(1), Some(&2));
    }
}
