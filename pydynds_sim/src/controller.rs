//! Simulation controller - the single external entry point.
//!
//! Wires the three workers together, drives their lifecycle with broadcast
//! control requests and proxies state queries.
//!
//! ```text
//!                 ┌────────── SimulationController ──────────┐
//!                 │  STOPPED ─setup─► SETUP ─start─► RUNNING │
//!                 │     ▲               │     pause ▲  │     │
//!                 │     └─────stop──────┘    resume │  ▼     │
//!                 │                               PAUSED     │
//!                 └──────┬──────────────┬──────────────┬─────┘
//!                  control│        control│        control│
//!                     ┌───▼───┐  stats ┌──▼────┐  view ┌──▼──────┐
//!                     │ Model │◄───────│ Algo  │──────►│Simulator│
//!                     └───┬───┘        └───────┘       └────▲────┘
//!                         └────────── cycle feed ───────────┘
//! ```

use crate::algorithm::{AlgorithmArgs, AlgorithmWorker};
use crate::config::SimConfig;
use crate::error::SimError;
use crate::model::{ModelSettings, ModelWorker};
use crate::registry::AlgorithmRegistry;
use crate::simulator::SimulatorWorker;

use pydynds_core::DynDcop;
use pydynds_env::{
    control_channel, spawn_worker, view_channel, ControlLink, ControlPort, ControlRequest,
    DcopSnapshot, ModelProgress, StatsSnapshot, ViewLink, ViewPort, WorkerHandle,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Span};
use uuid::Uuid;

/// Lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    Stopped,
    Setup,
    Running,
    Paused,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Stopped => "STOPPED",
            ControllerState::Setup => "SETUP",
            ControllerState::Running => "RUNNING",
            ControllerState::Paused => "PAUSED",
        };
        f.write_str(name)
    }
}

/// Lifecycle calls accepted by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Setup,
    Start,
    Stop,
    Pause,
    Resume,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Setup => "setup",
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Pause => "pause",
            Command::Resume => "resume",
        }
    }

    pub fn all() -> [Command; 5] {
        [
            Command::Setup,
            Command::Start,
            Command::Stop,
            Command::Pause,
            Command::Resume,
        ]
    }
}

/// The lifecycle transition table. `None` means the call is illegal.
pub fn transition(state: ControllerState, command: Command) -> Option<ControllerState> {
    use Command as C;
    use ControllerState as S;

    match (state, command) {
        (S::Stopped, C::Setup) => Some(S::Setup),
        (S::Setup, C::Start) => Some(S::Running),
        (_, C::Stop) => Some(S::Stopped),
        (S::Running, C::Pause) => Some(S::Paused),
        (S::Paused, C::Resume) => Some(S::Running),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Model,
    Simulator,
    Algorithm,
}

impl Role {
    fn name(self) -> &'static str {
        match self {
            Role::Model => "model",
            Role::Simulator => "simulator",
            Role::Algorithm => "algorithm",
        }
    }
}

const START_ORDER: [Role; 3] = [Role::Model, Role::Simulator, Role::Algorithm];
const PAUSE_ORDER: [Role; 3] = [Role::Algorithm, Role::Model, Role::Simulator];
const RESUME_ORDER: [Role; 3] = [Role::Simulator, Role::Model, Role::Algorithm];
const STOP_ORDER: [Role; 3] = [Role::Algorithm, Role::Model, Role::Simulator];

/// Worker-side ends of one generation of channels, consumed by `setup`.
struct Ports {
    model: ControlPort,
    simulator: ControlPort,
    algorithm: ControlPort,
    view_link: ViewLink,
    view_port: ViewPort,
}

/// One generation of channels. Recreated on every stop.
struct Wiring {
    generation: u64,
    model: ControlLink,
    simulator: ControlLink,
    algorithm: ControlLink,
    ports: Option<Ports>,
}

impl Wiring {
    fn new(generation: u64) -> Self {
        let (model, model_port) = control_channel("model");
        let (simulator, simulator_port) = control_channel("simulator");
        let (algorithm, algorithm_port) = control_channel("algorithm");
        let (view_link, view_port) = view_channel("view");

        Self {
            generation,
            model,
            simulator,
            algorithm,
            ports: Some(Ports {
                model: model_port,
                simulator: simulator_port,
                algorithm: algorithm_port,
                view_link,
                view_port,
            }),
        }
    }

    fn link(&self, role: Role) -> &ControlLink {
        match role {
            Role::Model => &self.model,
            Role::Simulator => &self.simulator,
            Role::Algorithm => &self.algorithm,
        }
    }
}

/// Workers of one setup, kept alive until the next stop.
struct Session {
    algorithm_name: String,
    model: Arc<ModelWorker>,
    simulator: Arc<SimulatorWorker>,
    algorithm: Arc<AlgorithmWorker>,
    handles: Vec<WorkerHandle>,
    span: Span,
}

impl Drop for Session {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.halt();
        }
    }
}

/// Drives one simulation at a time through its lifecycle.
pub struct SimulationController {
    registry: AlgorithmRegistry,
    config: SimConfig,
    state: ControllerState,
    wiring: Wiring,
    session: Option<Session>,
    run_id: Option<Uuid>,
}

impl SimulationController {
    pub fn new(registry: AlgorithmRegistry, config: SimConfig) -> Self {
        Self {
            registry,
            config,
            state: ControllerState::Stopped,
            wiring: Wiring::new(0),
            session: None,
            run_id: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Channel generation; bumped each time channels are recreated.
    pub fn generation(&self) -> u64 {
        self.wiring.generation
    }

    /// Id of the current setup, `None` while stopped.
    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn algorithm_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.algorithm_name.as_str())
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    fn check(&self, command: Command) -> Result<ControllerState, SimError> {
        transition(self.state, command).ok_or(SimError::InvalidState {
            operation: command.name(),
            state: self.state,
        })
    }

    /// Worker-side channel ends of the current generation, rewiring if a
    /// previous setup already consumed them.
    fn take_ports(&mut self) -> Ports {
        loop {
            if let Some(ports) = self.wiring.ports.take() {
                return ports;
            }
            self.rewire();
        }
    }

    fn rewire(&mut self) {
        self.wiring = Wiring::new(self.wiring.generation + 1);
        debug!("Channels recreated (generation {})", self.wiring.generation);
    }

    /// Builds and wires Model, Simulator and Algorithm.
    ///
    /// The Model is spawned first and asked for the initial snapshot, which
    /// the Algorithm is constructed with.
    pub async fn setup(
        &mut self,
        algorithm_name: &str,
        dyn_dcop: DynDcop,
        message_delay: u64,
        computation_cost: u64,
    ) -> Result<(), SimError> {
        let next = self.check(Command::Setup)?;
        if !self.registry.contains(algorithm_name) {
            return Err(SimError::UnknownVariant(algorithm_name.to_string()));
        }
        let ports = self.take_ports();

        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, algorithm = algorithm_name);
        let supervisor = self.config.supervisor();
        let dyn_dcop = Arc::new(dyn_dcop);

        let settings = ModelSettings {
            poll_interval: self.config.model_poll_interval,
            round_trip_timeout: self.config.round_trip_timeout,
            ..ModelSettings::new(message_delay, computation_cost)
        };
        let model = Arc::new(ModelWorker::new(
            Arc::clone(&dyn_dcop),
            Some(self.wiring.algorithm.clone()),
            settings,
        ));
        let model_handle = {
            let _enter = span.enter();
            spawn_worker(Arc::clone(&model), Some(ports.model), supervisor)
        };

        let initial = match self
            .wiring
            .model
            .round_trip(ControlRequest::QueryCurrentState, self.config.round_trip_timeout)
            .await
            .and_then(|response| response.into_current_state())
        {
            Ok(initial) => initial,
            Err(err) => {
                warn!("Model handshake failed: {}", err);
                model_handle.shutdown(self.config.stop_grace).await;
                self.rewire();
                return Err(SimError::Handshake(err));
            }
        };

        let simulator = Arc::new(SimulatorWorker::new(
            Arc::clone(&dyn_dcop),
            Some(ports.view_port),
            model.subscribe(),
            self.config.model_poll_interval,
        ));
        let args = AlgorithmArgs::from_config(
            &self.config,
            initial,
            Some(ports.view_link),
            Some(self.wiring.model.clone()),
        );
        let algorithm = match self.registry.build(algorithm_name, args) {
            Ok(algorithm) => algorithm,
            Err(err) => {
                model_handle.shutdown(self.config.stop_grace).await;
                self.rewire();
                return Err(err);
            }
        };

        let handles = {
            let _enter = span.enter();
            vec![
                model_handle,
                spawn_worker(Arc::clone(&simulator), Some(ports.simulator), supervisor),
                spawn_worker(Arc::clone(&algorithm), Some(ports.algorithm), supervisor),
            ]
        };

        self.session = Some(Session {
            algorithm_name: algorithm_name.to_string(),
            model,
            simulator,
            algorithm,
            handles,
            span,
        });
        self.run_id = Some(run_id);
        self.state = next;
        info!(
            "Setup {} (run {}, {} snapshots, message_delay={}, computation_cost={})",
            algorithm_name,
            run_id,
            dyn_dcop.len(),
            message_delay,
            computation_cost
        );
        Ok(())
    }

    /// Sends `request` to each role in order. Returns how many failed.
    async fn broadcast(&self, request: ControlRequest, order: [Role; 3]) -> usize {
        let mut failures = 0;
        for role in order {
            let result = self
                .wiring
                .link(role)
                .round_trip(request, self.config.round_trip_timeout)
                .await
                .and_then(|response| response.into_ack());
            if let Err(err) = result {
                warn!("{} to {} failed: {}", request, role.name(), err);
                failures += 1;
            }
        }
        failures
    }

    fn log_in_session(&self, message: &str) {
        match &self.session {
            Some(session) => session.span.in_scope(|| info!("{}", message)),
            None => info!("{}", message),
        }
    }

    pub async fn start(&mut self) -> Result<(), SimError> {
        let next = self.check(Command::Start)?;
        self.broadcast(ControlRequest::Start, START_ORDER).await;
        self.state = next;
        self.log_in_session("Simulation running");
        Ok(())
    }

    pub async fn pause(&mut self) -> Result<(), SimError> {
        let next = self.check(Command::Pause)?;
        self.broadcast(ControlRequest::Pause, PAUSE_ORDER).await;
        self.state = next;
        self.log_in_session("Simulation paused");
        Ok(())
    }

    pub async fn resume(&mut self) -> Result<(), SimError> {
        let next = self.check(Command::Resume)?;
        self.broadcast(ControlRequest::Resume, RESUME_ORDER).await;
        self.state = next;
        self.log_in_session("Simulation resumed");
        Ok(())
    }

    /// Stops every worker and recreates all channels.
    ///
    /// Acknowledgements are not required: workers that do not exit within
    /// the grace period are aborted. All stats and state are discarded.
    /// From STOPPED this is a no-op.
    pub async fn stop(&mut self) -> Result<(), SimError> {
        let next = self.check(Command::Stop)?;
        if self.state == ControllerState::Stopped {
            return Ok(());
        }

        let unacknowledged = self.broadcast(ControlRequest::Stop, STOP_ORDER).await;
        if let Some(mut session) = self.session.take() {
            debug!(
                "Run ended at model cycle {} (simulator saw {})",
                session.model.current_cycle(),
                session.simulator.model_cycle()
            );
            for handle in session.handles.drain(..) {
                let name = handle.name().to_string();
                if !handle.shutdown(self.config.stop_grace).await {
                    warn!("{} aborted during stop", name);
                }
            }
        }

        self.rewire();
        self.run_id = None;
        self.state = next;
        info!(
            "Simulation stopped ({} unacknowledged), generation {}",
            unacknowledged, self.wiring.generation
        );
        Ok(())
    }

    fn require_session(&self, operation: &'static str) -> Result<(), SimError> {
        if self.session.is_none() {
            return Err(SimError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Algorithm stats. Costs a round trip to the Algorithm worker.
    pub async fn get_current_stats(&self) -> Result<StatsSnapshot, SimError> {
        self.require_session("query stats")?;
        let stats = self
            .wiring
            .algorithm
            .round_trip(ControlRequest::QueryStats, self.config.round_trip_timeout)
            .await?
            .into_stats()?;
        Ok(stats)
    }

    /// Copy of the Model's active snapshot.
    pub async fn get_current_state(&self) -> Result<Option<DcopSnapshot>, SimError> {
        self.require_session("query state")?;
        let state = self
            .wiring
            .model
            .round_trip(ControlRequest::QueryCurrentState, self.config.round_trip_timeout)
            .await?
            .into_current_state()?;
        Ok(state)
    }

    pub async fn get_progress(&self) -> Result<ModelProgress, SimError> {
        self.require_session("query progress")?;
        let progress = self
            .wiring
            .model
            .round_trip(ControlRequest::QueryProgress, self.config.round_trip_timeout)
            .await?
            .into_progress()?;
        Ok(progress)
    }

    /// Cycles completed by the Algorithm so far.
    pub fn algorithm_cycles(&self) -> u64 {
        self.session
            .as_ref()
            .map_or(0, |session| session.algorithm.cycles_completed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{Algorithm, AlgorithmContext};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use pydynds_core::DynDcopEntry;
    use pydynds_env::ViewUpdateRequest;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    fn staged(starts: &[u64]) -> DynDcop {
        let entries = starts
            .iter()
            .map(|&start| {
                DynDcopEntry::new(
                    start,
                    DcopSnapshot::new(json!({ "stage": start, "variables": ["v1", "v2", "v3"] })),
                )
            })
            .collect();
        DynDcop::new(entries).unwrap()
    }

    fn controller() -> SimulationController {
        SimulationController::new(AlgorithmRegistry::with_builtin(), SimConfig::fast())
    }

    /// Never returns from its stop hook.
    struct Stubborn;

    #[async_trait]
    impl Algorithm for Stubborn {
        fn name(&self) -> &str {
            "stubborn"
        }

        async fn run(&self, ctx: &AlgorithmContext) {
            ctx.send_message("v1", "v2", json!(null));
        }

        async fn on_stop(&self) {
            std::future::pending::<()>().await;
        }
    }

    #[test]
    fn test_state_names() {
        assert_eq!(ControllerState::Stopped.to_string(), "STOPPED");
        assert_eq!(ControllerState::Paused.to_string(), "PAUSED");
        let err = SimError::InvalidState {
            operation: "start",
            state: ControllerState::Stopped,
        };
        assert_eq!(err.to_string(), "Cannot start while STOPPED");
    }

    #[test]
    fn test_transition_table() {
        use Command as C;
        use ControllerState as S;

        assert_eq!(transition(S::Stopped, C::Setup), Some(S::Setup));
        assert_eq!(transition(S::Stopped, C::Stop), Some(S::Stopped));
        assert_eq!(transition(S::Setup, C::Start), Some(S::Running));
        assert_eq!(transition(S::Running, C::Pause), Some(S::Paused));
        assert_eq!(transition(S::Paused, C::Resume), Some(S::Running));

        assert_eq!(transition(S::Stopped, C::Start), None);
        assert_eq!(transition(S::Setup, C::Pause), None);
        assert_eq!(transition(S::Running, C::Setup), None);
        assert_eq!(transition(S::Running, C::Resume), None);
        assert_eq!(transition(S::Paused, C::Pause), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stats_are_zero_after_setup() {
        let mut controller = controller();
        controller
            .setup("sample_algorithm", staged(&[0, 10]), 1, 1)
            .await
            .unwrap();

        assert_eq!(controller.state(), ControllerState::Setup);
        assert!(controller.run_id().is_some());
        assert_eq!(controller.get_current_stats().await.unwrap(), StatsSnapshot::default());
        assert_eq!(
            controller.get_current_state().await.unwrap(),
            staged(&[0]).active_at(0).cloned()
        );

        controller.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_full_lifecycle() {
        let mut controller = controller();
        controller
            .setup("sample_algorithm", staged(&[0, 1000]), 1, 1)
            .await
            .unwrap();
        controller.start().await.unwrap();
        assert_eq!(controller.state(), ControllerState::Running);

        tokio::time::sleep(Duration::from_millis(50)).await;
        controller.pause().await.unwrap();
        assert_eq!(controller.state(), ControllerState::Paused);

        let stats = controller.get_current_stats().await.unwrap();
        assert!(stats.total_messages > 0);
        assert_eq!(stats.last_message.unwrap().payload(), &json!([[1, 2, 3], [4, 5, 6], [7, 8, 9]]));

        controller.resume().await.unwrap();
        assert_eq!(controller.state(), ControllerState::Running);

        controller.stop().await.unwrap();
        assert_eq!(controller.state(), ControllerState::Stopped);
        assert_eq!(controller.generation(), 1);
        assert!(controller.run_id().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_illegal_calls_leave_state_unchanged() {
        let mut controller = controller();

        let err = controller.start().await.unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(err.to_string(), "Cannot start while STOPPED");
        assert!(controller.pause().await.unwrap_err().is_invalid_state());
        assert!(controller.resume().await.unwrap_err().is_invalid_state());
        assert!(controller.get_current_stats().await.unwrap_err().is_invalid_state());

        // Stop from STOPPED: no-op, channels untouched.
        controller.stop().await.unwrap();
        assert_eq!(controller.state(), ControllerState::Stopped);
        assert_eq!(controller.generation(), 0);

        controller.setup("sample_algorithm", staged(&[0]), 1, 1).await.unwrap();
        let err = controller
            .setup("sample_algorithm", staged(&[0]), 1, 1)
            .await
            .unwrap_err();
        assert!(err.is_invalid_state());
        assert!(controller.pause().await.unwrap_err().is_invalid_state());
        assert_eq!(controller.state(), ControllerState::Setup);

        controller.start().await.unwrap();
        assert!(controller.start().await.unwrap_err().is_invalid_state());
        assert!(controller.resume().await.unwrap_err().is_invalid_state());
        assert_eq!(controller.state(), ControllerState::Running);

        controller.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_variant() {
        let mut controller = controller();
        let err = controller
            .setup("no_such_algorithm", staged(&[0]), 1, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, SimError::UnknownVariant(ref name) if name == "no_such_algorithm"));
        assert_eq!(controller.state(), ControllerState::Stopped);
        assert!(controller.run_id().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_with_unresponsive_worker() {
        let mut registry = AlgorithmRegistry::with_builtin();
        registry.register("stubborn", |_args: &AlgorithmArgs| -> Box<dyn Algorithm> {
            Box::new(Stubborn)
        });
        let mut controller = SimulationController::new(registry, SimConfig::fast());

        controller.setup("stubborn", staged(&[0, 1000]), 1, 1).await.unwrap();
        controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let began = Instant::now();
        controller.stop().await.unwrap();
        assert!(began.elapsed() < Duration::from_secs(5));
        assert_eq!(controller.state(), ControllerState::Stopped);
        assert_eq!(controller.generation(), 1);

        // Fresh channels: a new run works normally.
        controller.setup("sample_algorithm", staged(&[0]), 1, 1).await.unwrap();
        assert_eq!(controller.get_current_stats().await.unwrap(), StatsSnapshot::default());
        controller.stop().await.unwrap();
        assert_eq!(controller.generation(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_factory_receives_model_link() {
        let captured: Arc<std::sync::Mutex<Option<ControlLink>>> = Default::default();
        let slot = Arc::clone(&captured);
        let mut registry = AlgorithmRegistry::new();
        registry.register("watcher", move |args: &AlgorithmArgs| -> Box<dyn Algorithm> {
            *slot.lock().unwrap() = args.model.clone();
            crate::algorithms::SampleAlgorithm::build(args)
        });
        let mut controller = SimulationController::new(registry, SimConfig::fast());
        controller.setup("watcher", staged(&[0, 1000]), 1, 1).await.unwrap();

        let model = captured.lock().unwrap().clone().expect("model link handed to factory");
        let progress = model
            .round_trip(ControlRequest::QueryProgress, Duration::from_secs(1))
            .await
            .unwrap()
            .into_progress()
            .unwrap();
        assert_eq!(progress, controller.get_progress().await.unwrap());
        assert_eq!(progress.current_cycle, 0);

        controller.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_model_and_simulator_agree_while_paused() {
        let mut controller = controller();
        controller
            .setup("sample_algorithm", staged(&[0, 3, 6, 9, 1000]), 1, 1)
            .await
            .unwrap();
        controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        controller.pause().await.unwrap();

        let progress = controller.get_progress().await.unwrap();
        let model_view = controller.get_current_state().await.unwrap();
        let session = controller.session.as_ref().unwrap();
        let simulator_view = session.simulator.view_for(ViewUpdateRequest::new(0));

        assert_eq!(simulator_view.cycle, progress.current_cycle);
        assert_eq!(simulator_view.snapshot, model_view);
        assert_eq!(session.model.current_cycle(), progress.current_cycle);

        controller.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_runs_until_finished() {
        let mut controller = controller();
        controller
            .setup("random_exchange", staged(&[0, 4, 8]), 1, 2)
            .await
            .unwrap();
        controller.start().await.unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut progress = controller.get_progress().await.unwrap();
        while !progress.finished && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
            progress = controller.get_progress().await.unwrap();
        }

        assert!(progress.finished);
        assert_eq!(progress.active_start_cycle, Some(8));
        assert!(progress.current_cycle >= 8);
        assert!(controller.algorithm_cycles() > 0);

        controller.stop().await.unwrap();
    }

    fn any_command() -> impl Strategy<Value = Command> {
        prop::sample::select(Command::all().to_vec())
    }

    fn any_state() -> impl Strategy<Value = ControllerState> {
        prop::sample::select(vec![
            ControllerState::Stopped,
            ControllerState::Setup,
            ControllerState::Running,
            ControllerState::Paused,
        ])
    }

    proptest! {
        #[test]
        fn prop_stop_always_reaches_stopped(state in any_state()) {
            prop_assert_eq!(transition(state, Command::Stop), Some(ControllerState::Stopped));
        }

        #[test]
        fn prop_each_state_has_one_forward_move(state in any_state()) {
            let legal: Vec<_> = Command::all()
                .into_iter()
                .filter(|&command| command != Command::Stop)
                .filter(|&command| transition(state, command).is_some())
                .collect();
            prop_assert_eq!(legal.len(), 1);
        }

        #[test]
        fn prop_sequences_stay_in_table(commands in prop::collection::vec(any_command(), 0..40)) {
            let mut state = ControllerState::Stopped;
            for command in commands {
                match transition(state, command) {
                    Some(next) => {
                        // Setup is only reachable from STOPPED, pause/resume only toggle.
                        match command {
                            Command::Setup => prop_assert_eq!(state, ControllerState::Stopped),
                            Command::Start => prop_assert_eq!(state, ControllerState::Setup),
                            Command::Pause => prop_assert_eq!(next, ControllerState::Paused),
                            Command::Resume => prop_assert_eq!(state, ControllerState::Paused),
                            Command::Stop => prop_assert_eq!(next, ControllerState::Stopped),
                        }
                        state = next;
                    }
                    None => prop_assert_ne!(command, Command::Stop),
                }
            }
        }
    }
}
