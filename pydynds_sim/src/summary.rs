//! JSON run summary.
//!
//! Collected by the CLI once a run is over and printed or written to disk.

use pydynds_env::{ModelProgress, StatsSnapshot};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Outcome of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Id of the setup the run belonged to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// Registered algorithm name
    pub algorithm: String,

    pub seed: u64,
    pub message_delay: u64,
    pub computation_cost: u64,

    /// Simulated cycle reached
    pub final_cycle: u64,

    /// Start cycle of the last active snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_start_cycle: Option<u64>,

    /// Whether the DynDCOP was exhausted
    pub finished: bool,

    pub algorithm_cycles: u64,
    pub total_messages: u64,
    pub total_computations: u64,

    /// Wall-clock duration in seconds
    pub elapsed_secs: f64,
}

impl RunSummary {
    /// Creates an empty summary for `algorithm`.
    pub fn new(algorithm: &str, seed: u64, message_delay: u64, computation_cost: u64) -> Self {
        Self {
            run_id: None,
            algorithm: algorithm.to_string(),
            seed,
            message_delay,
            computation_cost,
            final_cycle: 0,
            active_start_cycle: None,
            finished: false,
            algorithm_cycles: 0,
            total_messages: 0,
            total_computations: 0,
            elapsed_secs: 0.0,
        }
    }

    pub fn record_progress(&mut self, progress: &ModelProgress) {
        self.final_cycle = progress.current_cycle;
        self.active_start_cycle = progress.active_start_cycle;
        self.finished = progress.finished;
    }

    pub fn record_stats(&mut self, stats: &StatsSnapshot) {
        self.total_messages = stats.total_messages;
        self.total_computations = stats.total_computations;
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
