use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    config::Config,
    error::{Error, Result},
    growable::Growable,
    pool::{AllocationHandle, Policy, PoolManager, PoolStats},
    region::Segment,
};

/// Source of registry epochs. Every [`Registry::init`] takes a fresh one, so
/// handles never outlive the registry generation that issued them.
static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

/// Opaque reference to an open pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    epoch: u64,
    slot: usize,
}

impl PoolHandle {
    pub(crate) const fn new(epoch: u64, slot: usize) -> Self {
        Self { epoch, slot }
    }

    /// Position of the pool in its registry, in opening order.
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// Storage of an initialized registry. Slots of closed pools are emptied but
/// never removed, so a slot index identifies one pool for the whole epoch.
struct PoolStore {
    epoch: u64,
    pools: Growable<Option<PoolManager>>,
}

/// Collection of open pools and entry point of the library.
///
/// A registry is an explicit context object: it must be initialized before
/// opening pools and torn down once they are all closed. Several registries
/// can coexist, and handles from one are rejected by the others.
///
/// ```
/// use mempool::{Policy, Registry};
///
/// let mut registry = Registry::default();
/// registry.init()?;
///
/// let pool = registry.open_pool(1024, Policy::BestFit)?;
/// let alloc = registry.allocate(pool, 100)?;
/// registry.memory_mut(pool, &alloc)?.fill(1);
/// registry.deallocate(pool, alloc)?;
///
/// registry.close_pool(pool)?;
/// registry.teardown()?;
/// # Ok::<(), mempool::Error>(())
/// ```
pub struct Registry {
    config: Config,
    store: Option<PoolStore>,
}

impl Registry {
    /// Creates an uninitialized registry with the given tunables. They are
    /// validated by [`Registry::init`].
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.store.is_some()
    }

    pub fn init(&mut self) -> Result<()> {
        if self.store.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        self.config.validate()?;

        let pools = Growable::new(self.config.pool_store)?;
        let epoch = NEXT_EPOCH.fetch_add(1, Ordering::Relaxed);
        self.store = Some(PoolStore { epoch, pools });

        tracing::debug!(epoch, "registry initialized");

        Ok(())
    }

    pub fn teardown(&mut self) -> Result<()> {
        let store = self.store.as_ref().ok_or(Error::NotInitialized)?;

        if store.pools.iter().any(Option::is_some) {
            return Err(Error::PoolsStillOpen);
        }

        tracing::debug!(epoch = store.epoch, "registry torn down");
        self.store = None;

        Ok(())
    }

    /// Number of pools currently open.
    pub fn open_pools(&self) -> usize {
        self.store
            .as_ref()
            .map_or(0, |store| store.pools.iter().flatten().count())
    }

    pub fn open_pool(&mut self, total_size: usize, policy: Policy) -> Result<PoolHandle> {
        let store = self.store.as_mut().ok_or(Error::NotInitialized)?;

        store.pools.reserve()?;
        let handle = PoolHandle::new(store.epoch, store.pools.len());

        let manager = PoolManager::open(handle, total_size, policy, &self.config)?;
        store.pools.push(Some(manager))?;

        tracing::debug!(pool = handle.slot, total_size, ?policy, "pool opened");

        Ok(handle)
    }

    pub fn close_pool(&mut self, handle: PoolHandle) -> Result<()> {
        let slot = self.slot_mut(handle)?;

        match slot {
            Some(pool) => pool.ensure_closable()?,
            None => return Err(Error::InvalidHandle),
        }

        *slot = None;
        tracing::debug!(pool = handle.slot, "pool closed");

        Ok(())
    }

    pub fn allocate(&mut self, handle: PoolHandle, size: usize) -> Result<AllocationHandle> {
        self.pool_mut(handle)?.allocate(size)
    }

    pub fn deallocate(&mut self, handle: PoolHandle, alloc: AllocationHandle) -> Result<()> {
        self.pool_mut(handle)?.deallocate(alloc)
    }

    /// Size and state of every region of the pool, in address order.
    pub fn inspect(&self, handle: PoolHandle) -> Result<Vec<Segment>> {
        Ok(self.pool(handle)?.inspect())
    }

    /// Lazy version of [`Registry::inspect`].
    pub fn segments(&self, handle: PoolHandle) -> Result<impl Iterator<Item = Segment> + '_> {
        Ok(self.pool(handle)?.segments())
    }

    pub fn stats(&self, handle: PoolHandle) -> Result<PoolStats> {
        Ok(self.pool(handle)?.stats())
    }

    /// Bytes of a live allocation.
    pub fn memory(&self, handle: PoolHandle, alloc: &AllocationHandle) -> Result<&[u8]> {
        self.pool(handle)?.memory(alloc)
    }

    /// Mutable bytes of a live allocation.
    pub fn memory_mut(
        &mut self,
        handle: PoolHandle,
        alloc: &AllocationHandle,
    ) -> Result<&mut [u8]> {
        self.pool_mut(handle)?.memory_mut(alloc)
    }

    fn pool(&self, handle: PoolHandle) -> Result<&PoolManager> {
        let store = self.store.as_ref().ok_or(Error::NotInitialized)?;

        if store.epoch != handle.epoch {
            return Err(Error::InvalidHandle);
        }

        store
            .pools
            .get(handle.slot)
            .and_then(Option::as_ref)
            .ok_or(Error::InvalidHandle)
    }

    fn pool_mut(&mut self, handle: PoolHandle) -> Result<&mut PoolManager> {
        self.slot_mut(handle)?.as_mut().ok_or(Error::InvalidHandle)
    }

    fn slot_mut(&mut self, handle: PoolHandle) -> Result<&mut Option<PoolManager>> {
        let store = self.store.as_mut().ok_or(Error::NotInitialized)?;

        if store.epoch != handle.epoch {
            return Err(Error::InvalidHandle);
        }

        store.pools.get_mut(handle.slot).ok_or(Error::InvalidHandle)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let open = self.open_pools();
        if open > 0 {
            tracing::warn!(open, "registry dropped with open pools, releasing their arenas");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GrowthConfig;
    use pretty_assertions::assert_eq;

    fn registry() -> Registry {
        let mut registry = Registry::default();
        registry.init().unwrap();
        registry
    }

    fn seg(size: usize, allocated: bool) -> Segment {
        Segment { size, allocated }
    }

    #[test]
    fn init_twice_fails() {
        let mut registry = registry();

        assert_eq!(registry.init(), Err(Error::AlreadyInitialized));
        assert!(registry.is_initialized());
    }

    #[test]
    fn teardown_requires_init() {
        let mut registry = Registry::default();

        assert_eq!(registry.teardown(), Err(Error::NotInitialized));
        assert_eq!(registry.open_pool(10, Policy::FirstFit), Err(Error::NotInitialized));
    }

    #[test]
    fn init_teardown_cycle() {
        let mut registry = registry();

        registry.teardown().unwrap();
        assert!(!registry.is_initialized());
        registry.init().unwrap();
        registry.teardown().unwrap();
    }

    #[test]
    fn invalid_config_is_reported_by_init() {
        let mut registry = Registry::new(Config {
            node_heap: GrowthConfig::new(10, 0.75, 1),
            ..Config::default()
        });

        assert!(matches!(registry.init(), Err(Error::InvalidConfig(_))));
        assert!(!registry.is_initialized());
    }

    #[test]
    fn teardown_with_open_pools_fails() {
        let mut registry = registry();
        let pool = registry.open_pool(100, Policy::FirstFit).unwrap();

        assert_eq!(registry.teardown(), Err(Error::PoolsStillOpen));
        assert!(registry.is_initialized());

        registry.close_pool(pool).unwrap();
        registry.teardown().unwrap();
    }

    #[test]
    fn close_on_nonempty_pool_fails() {
        let mut registry = registry();
        let pool = registry.open_pool(100, Policy::FirstFit).unwrap();
        let alloc = registry.allocate(pool, 10).unwrap();

        assert_eq!(registry.close_pool(pool), Err(Error::PoolNotEmpty));
        assert_eq!(registry.open_pools(), 1);
        assert_eq!(registry.inspect(pool).unwrap(), vec![seg(10, true), seg(90, false)]);

        registry.deallocate(pool, alloc).unwrap();
        registry.close_pool(pool).unwrap();
        assert_eq!(registry.open_pools(), 0);
    }

    #[test]
    fn closed_pool_handle_is_invalid() {
        let mut registry = registry();
        let pool = registry.open_pool(64, Policy::BestFit).unwrap();
        registry.close_pool(pool).unwrap();

        assert_eq!(registry.close_pool(pool), Err(Error::InvalidHandle));
        assert_eq!(registry.allocate(pool, 1), Err(Error::InvalidHandle));
        assert_eq!(registry.inspect(pool), Err(Error::InvalidHandle));
    }

    #[test]
    fn slots_are_never_reused() {
        let mut registry = registry();
        let a = registry.open_pool(16, Policy::FirstFit).unwrap();
        registry.close_pool(a).unwrap();
        let b = registry.open_pool(16, Policy::FirstFit).unwrap();

        assert_eq!(a.slot(), 0);
        assert_eq!(b.slot(), 1);
        assert_eq!(registry.stats(a), Err(Error::InvalidHandle));
    }

    #[test]
    fn handles_do_not_cross_registries_or_epochs() {
        let mut first = registry();
        let mut second = registry();
        let pool = first.open_pool(32, Policy::FirstFit).unwrap();
        let _other = second.open_pool(32, Policy::FirstFit).unwrap();

        assert_eq!(second.allocate(pool, 1), Err(Error::InvalidHandle));

        first.close_pool(pool).unwrap();
        first.teardown().unwrap();
        first.init().unwrap();
        let fresh = first.open_pool(32, Policy::FirstFit).unwrap();

        assert_eq!(fresh.slot(), pool.slot());
        assert_eq!(first.allocate(pool, 1), Err(Error::InvalidHandle));
    }

    #[test]
    fn allocation_from_another_pool_is_invalid() {
        let mut registry = registry();
        let a = registry.open_pool(32, Policy::FirstFit).unwrap();
        let b = registry.open_pool(32, Policy::FirstFit).unwrap();
        let alloc = registry.allocate(a, 8).unwrap();

        assert_eq!(alloc.pool(), a);
        assert_eq!(registry.deallocate(b, alloc), Err(Error::InvalidAllocation));
        assert_eq!(registry.memory(b, &alloc), Err(Error::InvalidAllocation));
        registry.deallocate(a, alloc).unwrap();
    }

    #[test]
    fn failed_open_registers_nothing() {
        let mut registry = registry();

        assert_eq!(registry.open_pool(0, Policy::FirstFit), Err(Error::InvalidSize));
        assert_eq!(
            registry.open_pool(usize::MAX, Policy::FirstFit),
            Err(Error::AllocationFailure)
        );
        assert_eq!(registry.open_pools(), 0);
        registry.teardown().unwrap();
    }

    #[test]
    fn open_failing_after_mapping_registers_nothing() {
        let mut registry = Registry::new(Config {
            gap_index: GrowthConfig::new(usize::MAX, 0.75, 2),
            ..Config::default()
        });
        registry.init().unwrap();

        assert_eq!(registry.open_pool(64, Policy::FirstFit), Err(Error::AllocationFailure));
        assert_eq!(registry.open_pools(), 0);
        registry.teardown().unwrap();
    }

    #[test]
    fn pool_store_grows_past_initial_capacity() {
        let mut registry = Registry::new(Config {
            pool_store: GrowthConfig::new(2, 0.75, 2),
            ..Config::default()
        });
        registry.init().unwrap();

        let pools: Vec<PoolHandle> = (0..10)
            .map(|_| registry.open_pool(8, Policy::BestFit).unwrap())
            .collect();
        assert_eq!(registry.open_pools(), 10);

        for pool in pools {
            assert_eq!(registry.stats(pool).unwrap().total_size, 8);
            registry.close_pool(pool).unwrap();
        }
        registry.teardown().unwrap();
    }

    #[test]
    fn memory_round_trips_through_registry() {
        let mut registry = registry();
        let pool = registry.open_pool(256, Policy::FirstFit).unwrap();
        let alloc = registry.allocate(pool, 5).unwrap();

        registry.memory_mut(pool, &alloc).unwrap().copy_from_slice(b"hello");
        assert_eq!(registry.memory(pool, &alloc).unwrap(), b"hello");

        let stats = registry.stats(pool).unwrap();
        assert_eq!((stats.num_allocs, stats.alloc_size, stats.num_gaps), (1, 5, 1));
        assert_eq!(registry.segments(pool).unwrap().count(), 2);

        registry.deallocate(pool, alloc).unwrap();
        assert_eq!(registry.memory(pool, &alloc), Err(Error::InvalidAllocation));
        registry.close_pool(pool).unwrap();
    }
}
