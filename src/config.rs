//! Tunables for the three growable structures of the library.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Growth parameters of one [`crate::growable::Growable`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Occupancy ratio above which the storage grows before the next append.
    pub fill_factor: f32,
    /// Multiplier applied to the capacity when growing.
    pub expand_factor: usize,
    /// Slots reserved when the storage is created.
    pub init_capacity: usize,
}

impl GrowthConfig {
    pub const fn new(init_capacity: usize, fill_factor: f32, expand_factor: usize) -> Self {
        Self {
            fill_factor,
            expand_factor,
            init_capacity,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.fill_factor > 0.0 && self.fill_factor <= 1.0) {
            return Err(Error::InvalidConfig("fill_factor must be in (0, 1]"));
        }
        if self.expand_factor < 2 {
            return Err(Error::InvalidConfig("expand_factor must be at least 2"));
        }
        if self.init_capacity == 0 {
            return Err(Error::InvalidConfig("init_capacity must be at least 1"));
        }

        Ok(())
    }
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self::new(40, 0.75, 2)
    }
}

/// Library configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry storage holding the open pools.
    pub pool_store: GrowthConfig,
    /// Region storage of every pool.
    pub node_heap: GrowthConfig,
    /// Free region index of every pool.
    pub gap_index: GrowthConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.pool_store.validate()?;
        self.node_heap.validate()?;
        self.gap_index.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_store: GrowthConfig::new(20, 0.75, 2),
            node_heap: GrowthConfig::new(40, 0.75, 2),
            gap_index: GrowthConfig::new(40, 0.75, 2),
        }
    }
}
