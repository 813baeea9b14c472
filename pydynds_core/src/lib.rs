//! PyDynDS Core - the dynamic DCOP model
//!
//! Runtime-free building blocks used by the simulation workers:
//! 1. **DynDCOP**: ordered snapshot sequence with active-snapshot lookup
//! 2. **Cycle clock**: advances simulated time from message/computation costs
//! 3. **Stats recorder**: lock-guarded algorithm statistics with copy-out reads

pub mod cycle;
pub mod dyndcop;
pub mod error;
pub mod ids;
pub mod stats;

// Re-export key types for convenience
pub use cycle::{find_latest_start, Advance, CycleClock, Timed};
pub use dyndcop::{Activation, DynDcop, DynDcopEntry};
pub use error::CoreError;
pub use ids::IdGenerator;
pub use stats::StatsRecorder;
