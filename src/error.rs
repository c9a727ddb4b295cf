use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the library reports. Nothing here is fatal: the registry and
/// all open pools stay usable after any of these is returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("registry is already initialized")]
    AlreadyInitialized,

    #[error("registry is not initialized")]
    NotInitialized,

    #[error("memory could not be obtained")]
    AllocationFailure,

    #[error("pool still has live allocations")]
    PoolNotEmpty,

    #[error("no free region is large enough")]
    NoCapacity,

    #[error("allocation does not belong to this pool or was already freed")]
    InvalidAllocation,

    #[error("pool handle does not denote an open pool")]
    InvalidHandle,

    #[error("pools are still open")]
    PoolsStillOpen,

    #[error("size must be greater than zero")]
    InvalidSize,

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("free region is missing from the gap index")]
    GapNotFound,
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::AllocationFailure
    }
}
