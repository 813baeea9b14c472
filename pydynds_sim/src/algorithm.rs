//! Algorithm worker - runs a pluggable DCOP solver cycle by cycle.
//!
//! A solver implements [`Algorithm`]; everything else (control channel,
//! pause/stop, view updates, statistics) comes from [`AlgorithmWorker`].
//!
//! ```text
//!        ┌────────────────────── one cycle ───────────────────────┐
//!  ──► checkpoint ► run_setup ► checkpoint ► ready ► checkpoint ► Run ► checkpoint ► teardown ──┐
//!  ▲     (Halt?)   check_input             (Simulator round trip)                               │
//!  └─────────────────────────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::config::SimConfig;

use async_trait::async_trait;
use pydynds_core::StatsRecorder;
use pydynds_env::{
    Computation, ControlLink, ControlRequest, ControlResponse, DcopSnapshot, Message, NodeId,
    PauseGate, StatsSnapshot, ViewLink, ViewUpdate, ViewUpdateRequest, Worker,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hook surface a concrete DCOP solver implements.
///
/// All control-plane behavior is inherited from the worker.
#[async_trait]
pub trait Algorithm: Send + Sync + 'static {
    /// Registry name of the solver.
    fn name(&self) -> &str;

    /// Verifies the current view is usable. A failed check ends the run.
    fn check_input(&self, ctx: &AlgorithmContext) -> bool {
        ctx.has_view()
    }

    /// Runs before every cycle (e.g. building a pseudo-tree).
    async fn preprocessing(&self, _ctx: &AlgorithmContext) {}

    /// One solver step against the current view.
    async fn run(&self, ctx: &AlgorithmContext);

    /// Post-processing before the next cycle.
    async fn run_teardown(&self, _ctx: &AlgorithmContext) {}

    /// Called on the control loop when STOP arrives.
    async fn on_stop(&self) {}
}

/// Lifecycle of the Algorithm domain loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmState {
    Idle,
    Running,
    /// The view became unusable; the loop has ended for good.
    Done,
}

/// What a solver sees: the current view and the stats it writes to.
pub struct AlgorithmContext {
    stats: StatsRecorder,
    view: Mutex<Option<DcopSnapshot>>,
    view_cycle: AtomicU64,
}

impl AlgorithmContext {
    pub fn new(initial_view: Option<DcopSnapshot>) -> Self {
        Self {
            stats: StatsRecorder::new(),
            view: Mutex::new(initial_view),
            view_cycle: AtomicU64::new(0),
        }
    }

    fn lock_view(&self) -> MutexGuard<'_, Option<DcopSnapshot>> {
        self.view.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a message from `source` to `destination`.
    ///
    /// Always succeeds; delivery is up to the solver.
    pub fn send_message(
        &self,
        source: impl Into<NodeId>,
        destination: impl Into<NodeId>,
        payload: Value,
    ) -> Message {
        self.stats
            .record_message(source.into(), destination.into(), self.view_cycle(), payload)
    }

    /// Records a local computation at `node`.
    pub fn record_computation(&self, node: impl Into<NodeId>, payload: Value) -> Computation {
        self.stats
            .record_computation(node.into(), self.view_cycle(), payload)
    }

    /// Copy of the current view.
    pub fn view(&self) -> Option<DcopSnapshot> {
        self.lock_view().clone()
    }

    pub fn has_view(&self) -> bool {
        self.lock_view().is_some()
    }

    /// Cycle of the last successful view update.
    pub fn view_cycle(&self) -> u64 {
        self.view_cycle.load(Ordering::SeqCst)
    }

    /// Independent copy of the stats.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn apply_view(&self, update: ViewUpdate) {
        *self.lock_view() = update.snapshot;
        self.view_cycle.fetch_max(update.cycle, Ordering::SeqCst);
    }
}

/// Construction arguments handed to every algorithm factory.
#[derive(Clone)]
pub struct AlgorithmArgs {
    /// Snapshot obtained from the Model at setup.
    pub initial_dcop: Option<DcopSnapshot>,

    /// Link to the Simulator's view channel.
    pub simulator: Option<ViewLink>,

    /// Link to the Model's control channel, shared with the controller.
    pub model: Option<ControlLink>,

    pub seed: u64,
    pub round_trip_timeout: Duration,
    pub cycle_interval: Duration,
}

impl AlgorithmArgs {
    /// Arguments for a worker with no Simulator attached.
    pub fn standalone(initial_dcop: Option<DcopSnapshot>) -> Self {
        let config = SimConfig::default();
        Self {
            initial_dcop,
            simulator: None,
            model: None,
            seed: config.seed,
            round_trip_timeout: config.round_trip_timeout,
            cycle_interval: config.algorithm_cycle_interval,
        }
    }

    pub(crate) fn from_config(
        config: &SimConfig,
        initial_dcop: Option<DcopSnapshot>,
        simulator: Option<ViewLink>,
        model: Option<ControlLink>,
    ) -> Self {
        Self {
            initial_dcop,
            simulator,
            model,
            seed: config.seed,
            round_trip_timeout: config.round_trip_timeout,
            cycle_interval: config.algorithm_cycle_interval,
        }
    }
}

/// Supervised worker wrapping a solver.
pub struct AlgorithmWorker {
    algorithm: Box<dyn Algorithm>,
    context: AlgorithmContext,
    simulator: Option<ViewLink>,
    state: Mutex<AlgorithmState>,
    cycles: AtomicU64,
    round_trip_timeout: Duration,
    cycle_interval: Duration,
}

impl AlgorithmWorker {
    pub fn new(algorithm: Box<dyn Algorithm>, args: AlgorithmArgs) -> Self {
        info!("Setting up algorithm {}", algorithm.name());
        Self {
            algorithm,
            context: AlgorithmContext::new(args.initial_dcop),
            simulator: args.simulator,
            state: Mutex::new(AlgorithmState::Idle),
            cycles: AtomicU64::new(0),
            round_trip_timeout: args.round_trip_timeout,
            cycle_interval: args.cycle_interval,
        }
    }

    pub fn algorithm_name(&self) -> &str {
        self.algorithm.name()
    }

    pub fn state(&self) -> AlgorithmState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: AlgorithmState) {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }

    /// Number of fully completed cycles.
    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn context(&self) -> &AlgorithmContext {
        &self.context
    }

    /// See [`AlgorithmContext::send_message`].
    pub fn send_message(
        &self,
        source: impl Into<NodeId>,
        destination: impl Into<NodeId>,
        payload: Value,
    ) -> Message {
        self.context.send_message(source, destination, payload)
    }

    /// Full independent copy of the stats; safe alongside `send_message`.
    pub fn get_stats(&self) -> StatsSnapshot {
        self.context.stats()
    }

    /// Validates the view and runs preprocessing. False ends the run.
    async fn run_setup(&self) -> bool {
        self.set_state(AlgorithmState::Running);
        if !self.algorithm.check_input(&self.context) {
            return false;
        }
        self.algorithm.preprocessing(&self.context).await;
        true
    }

    /// Requests the current view from the Simulator and waits for it.
    ///
    /// Transport failures keep the previous view.
    async fn ready(&self) {
        let Some(simulator) = &self.simulator else {
            return;
        };
        let request = ViewUpdateRequest::new(self.context.view_cycle());
        match simulator.round_trip(request, self.round_trip_timeout).await {
            Ok(update) => {
                debug!("View update for cycle {}", update.cycle);
                self.context.apply_view(update);
            }
            Err(err) => warn!("View update failed, keeping stale view: {}", err),
        }
    }
}

#[async_trait]
impl Worker for AlgorithmWorker {
    fn name(&self) -> &str {
        self.algorithm.name()
    }

    async fn run(&self, gate: PauseGate) {
        loop {
            if gate.checkpoint().await.is_halt() {
                break;
            }
            if !self.run_setup().await {
                warn!("{}: no valid DCOP view; algorithm done", self.algorithm.name());
                self.set_state(AlgorithmState::Done);
                return;
            }

            if gate.checkpoint().await.is_halt() {
                break;
            }
            self.ready().await;

            if gate.checkpoint().await.is_halt() {
                break;
            }
            self.algorithm.run(&self.context).await;

            if gate.checkpoint().await.is_halt() {
                break;
            }
            self.algorithm.run_teardown(&self.context).await;
            self.cycles.fetch_add(1, Ordering::SeqCst);

            if self.cycle_interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.cycle_interval).await;
            }
        }
        self.set_state(AlgorithmState::Idle);
        debug!("{} finished after {} cycles", self.algorithm.name(), self.cycles_completed());
    }

    async fn special_control(&self, request: ControlRequest) -> Option<ControlResponse> {
        match request {
            ControlRequest::QueryStats => Some(ControlResponse::Stats(self.get_stats())),
            _ => None,
        }
    }

    async fn pre_stop(&self) {
        self.algorithm.on_stop().await;
    }
}
