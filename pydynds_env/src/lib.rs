//! PyDynDS Control Plane
//!
//! Shared plumbing for the three PyDynDS workers (Algorithm, Model,
//! Simulator):
//! - Value types exchanged between workers (messages, stats, snapshots)
//! - The closed control protocol (START, STOP, PAUSE, RESUME, queries)
//! - Duplex channels with sequence-matched, timeout-bounded round trips
//! - A wake signal per control channel
//! - The pause gate and the supervised worker runtime
//!
//! # Example
//!
//! ```ignore
//! use pydynds_env::{control_channel, spawn_worker, ControlRequest, SupervisorConfig};
//!
//! let (link, port) = control_channel("model");
//! let handle = spawn_worker(worker, Some(port), SupervisorConfig::default());
//! link.round_trip(ControlRequest::Start, timeout).await?.into_ack()?;
//! ```

mod channel;
mod error;
mod gate;
mod protocol;
mod types;
mod wake;
mod worker;

pub use channel::{
    control_channel, duplex, view_channel, ControlLink, ControlPort, Envelope, RequestLink,
    RequestPort, ViewLink, ViewPort,
};
pub use error::EnvError;
pub use gate::{Checkpoint, GateState, PauseGate, Suspension};
pub use protocol::{ControlRequest, ControlResponse};
pub use types::{
    Computation, CycleStatus, DcopSnapshot, Message, ModelProgress, NodeId, StatsSnapshot,
    ViewUpdate, ViewUpdateRequest,
};
pub use wake::WakeSignal;
pub use worker::{spawn_worker, SupervisorConfig, Worker, WorkerHandle};
