//! PyDynDS Simulation
//!
//! Runs a pluggable DCOP algorithm against a dynamic DCOP whose constraint
//! graph changes over simulated cycles.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────── SimulationController ──────────────────────┐
//! │   setup / start / pause / resume / stop / get_current_stats      │
//! └───────┬───────────────────────┬────────────────────────┬─────────┘
//!         │ control               │ control                │ control
//!    ┌────▼─────┐  QUERY_STATS ┌──▼────────┐ ViewUpdate ┌──▼────────┐
//!    │  Model   │─────────────►│ Algorithm │───────────►│ Simulator │
//!    │ (clock)  │              │ (solver)  │            │  (world)  │
//!    └────┬─────┘              └───────────┘            └─────▲─────┘
//!         └──────────────── CycleStatus feed ─────────────────┘
//! ```
//!
//! - **Model** owns simulated time. It polls the Algorithm's stats, advances
//!   the cycle by message delay and computation cost, and activates the
//!   matching DynDCOP snapshot.
//! - **Simulator** answers the Algorithm's view requests with the snapshot
//!   active at the Model's cycle.
//! - **Algorithm** runs the solver step by step and records every message
//!   and computation.
//!
//! # Usage
//!
//! ```ignore
//! use pydynds_sim::{AlgorithmRegistry, SimConfig, SimulationController};
//!
//! let dyn_dcop = pydynds_core::DynDcop::from_json_file("dyndcop.json")?;
//! let mut controller = SimulationController::new(AlgorithmRegistry::with_builtin(), SimConfig::default());
//! controller.setup("sample_algorithm", dyn_dcop, 1, 1).await?;
//! controller.start().await?;
//! let stats = controller.get_current_stats().await?;
//! controller.stop().await?;
//! ```

mod algorithm;
pub mod algorithms;
mod config;
mod controller;
mod error;
mod model;
mod registry;
mod simulator;
mod summary;

pub use algorithm::{Algorithm, AlgorithmArgs, AlgorithmContext, AlgorithmState, AlgorithmWorker};
pub use config::SimConfig;
pub use controller::{transition, Command, ControllerState, SimulationController};
pub use error::SimError;
pub use model::{ModelSettings, ModelWorker};
pub use registry::{AlgorithmFactory, AlgorithmRegistry};
pub use simulator::SimulatorWorker;
pub use summary::RunSummary;
