//! User space memory pools.
//!
//! Each pool owns one arena mapped from the kernel and hands out byte ranges
//! of it using a first-fit or best-fit policy. Internally a pool keeps three
//! views of the same memory in sync:
//!
//! ```text
//!  arena:   |  A (16)  | gap (8) |     B (24)     |   gap (16)   |
//!
//!  ledger:  [ A ] <-> [ gap ] <-> [ B ] <-> [ gap ]     address order
//!
//!  gaps:    [ 8 | 16 ]                                  size order
//! ```
//!
//! The region ledger chain tiles the arena and is spliced on every split and
//! merge, while the gap index answers placement queries. Pools are created
//! and destroyed through a [`Registry`].

mod arena;
mod config;
mod error;
mod gap_index;
mod growable;
mod kernel;
mod ledger;
mod list;
mod pool;
mod region;
mod registry;
mod utils;

pub use config::{Config, GrowthConfig};
pub use error::{Error, Result};
pub use pool::{AllocationHandle, Policy, PoolStats};
pub use region::Segment;
pub use registry::{PoolHandle, Registry};
