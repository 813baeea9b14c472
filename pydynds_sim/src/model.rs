//! Model worker - owns simulated time and the active DCOP snapshot.
//!
//! Each update polls the Algorithm for stats, advances the [`CycleClock`]
//! by the new messages/computations, re-activates the DynDCOP and
//! publishes the result on a watch feed the Simulator reads.

use async_trait::async_trait;
use pydynds_core::{Advance, CycleClock, DynDcop};
use pydynds_env::{
    ControlLink, ControlRequest, ControlResponse, CycleStatus, DcopSnapshot, EnvError,
    ModelProgress, PauseGate, StatsSnapshot, Worker,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Cost parameters and polling knobs of a Model.
#[derive(Debug, Clone, Copy)]
pub struct ModelSettings {
    /// Cycles a message takes to be delivered
    pub message_delay: u64,

    /// Cycles a computation takes
    pub computation_cost: u64,

    /// Pause between two updates
    pub poll_interval: Duration,

    /// Bound on the stats round trip
    pub round_trip_timeout: Duration,
}

impl ModelSettings {
    pub fn new(message_delay: u64, computation_cost: u64) -> Self {
        Self {
            message_delay,
            computation_cost,
            poll_interval: Duration::from_millis(5),
            round_trip_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug)]
struct ModelState {
    clock: CycleClock,
    active_index: Option<usize>,
    finished: bool,
}

/// The Model worker.
pub struct ModelWorker {
    dyn_dcop: Arc<DynDcop>,
    algorithm: Option<ControlLink>,
    settings: ModelSettings,
    state: Mutex<ModelState>,
    cycle_feed: watch::Sender<CycleStatus>,
}

impl ModelWorker {
    /// Creates a Model at cycle 0. `algorithm` is the Algorithm's control
    /// link used for stats polling.
    pub fn new(dyn_dcop: Arc<DynDcop>, algorithm: Option<ControlLink>, settings: ModelSettings) -> Self {
        let activation = dyn_dcop.activate(0);
        let status = CycleStatus {
            cycle: 0,
            finished: activation.finished,
        };
        let state = ModelState {
            clock: CycleClock::new(settings.message_delay, settings.computation_cost),
            active_index: activation.index,
            finished: activation.finished,
        };
        let (cycle_feed, _) = watch::channel(status);

        Self {
            dyn_dcop,
            algorithm,
            settings,
            state: Mutex::new(state),
            cycle_feed,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ModelState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribes to the cycle feed.
    pub fn subscribe(&self) -> watch::Receiver<CycleStatus> {
        self.cycle_feed.subscribe()
    }

    pub fn progress(&self) -> ModelProgress {
        let state = self.lock();
        ModelProgress {
            current_cycle: state.clock.current_cycle(),
            active_start_cycle: state
                .active_index
                .map(|index| self.dyn_dcop.entries()[index].start_cycle),
            finished: state.finished,
        }
    }

    pub fn current_cycle(&self) -> u64 {
        self.lock().clock.current_cycle()
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Deep copy of the active snapshot.
    pub fn current_dcop(&self) -> Option<DcopSnapshot> {
        let state = self.lock();
        state
            .active_index
            .map(|index| self.dyn_dcop.entries()[index].dcop.clone())
    }

    /// Advances the clock by `stats` and re-activates the DynDCOP.
    pub fn apply_stats(&self, stats: &StatsSnapshot) -> Advance {
        let (advance, status) = {
            let mut state = self.lock();
            let advance = state.clock.advance(stats);
            let activation = self.dyn_dcop.activate(advance.to);
            state.active_index = activation.index;
            state.finished = activation.finished;
            (
                advance,
                CycleStatus {
                    cycle: advance.to,
                    finished: activation.finished,
                },
            )
        };

        if advance.elapsed() > 0 {
            debug!("Cycle {} -> {}", advance.from, advance.to);
        }
        self.cycle_feed.send_replace(status);
        advance
    }

    /// One update step: poll the Algorithm's stats and apply them.
    pub async fn update(&self) -> Result<Advance, EnvError> {
        let algorithm = self
            .algorithm
            .as_ref()
            .ok_or_else(|| EnvError::ChannelUnavailable("algorithm control".to_string()))?;
        let stats = algorithm
            .round_trip(ControlRequest::QueryStats, self.settings.round_trip_timeout)
            .await?
            .into_stats()?;
        Ok(self.apply_stats(&stats))
    }
}

#[async_trait]
impl Worker for ModelWorker {
    fn name(&self) -> &str {
        "model"
    }

    async fn run(&self, gate: PauseGate) {
        if self.algorithm.is_none() {
            warn!("No algorithm control link; model clock will not advance");
        }

        while !gate.checkpoint().await.is_halt() {
            if self.algorithm.is_some() {
                if let Err(err) = self.update().await {
                    warn!("Model update failed: {}", err);
                }
            }
            if self.is_finished() {
                info!("DynDCOP exhausted at cycle {}", self.current_cycle());
                return;
            }

            if gate.checkpoint().await.is_halt() {
                break;
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn special_control(&self, request: ControlRequest) -> Option<ControlResponse> {
        match request {
            ControlRequest::QueryCurrentState => Some(ControlResponse::CurrentState(self.current_dcop())),
            ControlRequest::QueryProgress => Some(ControlResponse::Progress(self.progress())),
            _ => None,
        }
    }
}
