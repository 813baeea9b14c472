//! Simulation configuration.

use pydynds_env::SupervisorConfig;
use std::time::Duration;

/// Timing and seeding knobs shared by the controller and its workers.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Bound on each control-loop wake wait
    pub control_wait: Duration,

    /// Bound on any cross-worker round trip
    pub round_trip_timeout: Duration,

    /// Bound on waiting for a domain loop to park after PAUSE
    pub pause_ack_timeout: Duration,

    /// How long `stop` waits for a worker to exit before aborting it
    pub stop_grace: Duration,

    /// Pause between two Model updates
    pub model_poll_interval: Duration,

    /// Pause between two Algorithm cycles (zero = just yield)
    pub algorithm_cycle_interval: Duration,

    /// Seed handed to randomized algorithms
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            control_wait: Duration::from_secs(1),
            round_trip_timeout: Duration::from_secs(2),
            pause_ack_timeout: Duration::from_secs(2),
            stop_grace: Duration::from_secs(1),
            model_poll_interval: Duration::from_millis(5),
            algorithm_cycle_interval: Duration::from_millis(1),
            seed: 42,
        }
    }
}

impl SimConfig {
    /// Sets the control-loop wake wait.
    pub fn with_control_wait(mut self, wait: Duration) -> Self {
        self.control_wait = wait;
        self
    }

    /// Sets the round-trip timeout.
    pub fn with_round_trip_timeout(mut self, timeout: Duration) -> Self {
        self.round_trip_timeout = timeout;
        self
    }

    /// Sets the pause acknowledgement timeout.
    pub fn with_pause_ack_timeout(mut self, timeout: Duration) -> Self {
        self.pause_ack_timeout = timeout;
        self
    }

    /// Sets the stop grace period.
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Sets the Model poll interval.
    pub fn with_model_poll_interval(mut self, interval: Duration) -> Self {
        self.model_poll_interval = interval;
        self
    }

    /// Sets the Algorithm cycle interval.
    pub fn with_algorithm_cycle_interval(mut self, interval: Duration) -> Self {
        self.algorithm_cycle_interval = interval;
        self
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Supervisor settings derived from this config.
    pub fn supervisor(&self) -> SupervisorConfig {
        SupervisorConfig {
            control_wait: self.control_wait,
            pause_ack_timeout: self.pause_ack_timeout,
        }
    }

    /// Short timeouts for tests and interactive runs.
    pub fn fast() -> Self {
        Self::default()
            .with_control_wait(Duration::from_millis(20))
            .with_round_trip_timeout(Duration::from_millis(500))
            .with_pause_ack_timeout(Duration::from_millis(500))
            .with_stop_grace(Duration::from_millis(200))
            .with_model_poll_interval(Duration::from_millis(2))
    }
}
