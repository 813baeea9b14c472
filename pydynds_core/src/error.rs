//! Error types for the DynDCOP model.

use thiserror::Error;

/// Errors raised while building or loading a DynDCOP.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A DynDCOP needs at least one snapshot.
    #[error("DynDCOP has no snapshots")]
    EmptyDynDcop,

    /// Start cycles must be strictly increasing.
    #[error("Snapshot {index} starts at cycle {start_cycle}, not after previous start {previous}")]
    UnorderedStartCycle {
        index: usize,
        start_cycle: u64,
        previous: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
