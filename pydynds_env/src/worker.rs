//! Supervised worker runtime shared by the Algorithm, Model and Simulator.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────── spawn_worker() ─────────────────────────┐
//! │                                                                 │
//! │   ControlPort ──► control loop ──────────┐                      │
//! │   (wake.wait)     START ► spawn ─────────┼──► domain loop       │
//! │                   STOP  ► gate.close()   │    (Worker::run)     │
//! │                   PAUSE ► gate.suspend() │      checkpoint()    │
//! │                   RESUME► gate.release() │      checkpoint()    │
//! │                   other ► special_control│        ...           │
//! │                                     PauseGate                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The control loop is spawned immediately; the domain loop only on START.

use crate::channel::{ControlPort, Envelope};
use crate::error::EnvError;
use crate::gate::{PauseGate, Suspension};
use crate::protocol::{ControlRequest, ControlResponse};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

/// A long-running unit of work driven by a control channel.
///
/// Implementors provide the domain loop and optionally override the
/// lifecycle hooks. Hooks run on the control loop, so they must not block
/// for long.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Name used in logs and rejections.
    fn name(&self) -> &str;

    /// The domain work loop.
    ///
    /// Must call [`PauseGate::checkpoint`] between externally visible side
    /// effects and return once it reports `Halt`.
    async fn run(&self, gate: PauseGate);

    /// Offered every request before lifecycle dispatch. Return `None` to
    /// fall through.
    async fn special_control(&self, _request: ControlRequest) -> Option<ControlResponse> {
        None
    }

    async fn pre_start(&self) {}
    async fn post_start(&self) {}

    /// Runs before the gate closes. Domain loops with extra exit flags set
    /// them here.
    async fn pre_stop(&self) {}
    async fn post_stop(&self) {}

    async fn pre_pause(&self) {}
    async fn post_pause(&self) {}
    async fn pre_resume(&self) {}
    async fn post_resume(&self) {}
}

/// Timing knobs for a supervised worker.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    /// Bound on each wake-signal wait, so an external halt is observed.
    pub control_wait: Duration,

    /// Bound on waiting for the domain loop to park after PAUSE.
    pub pause_ack_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            control_wait: Duration::from_secs(1),
            pause_ack_timeout: Duration::from_secs(2),
        }
    }
}

type DomainSlot = Arc<Mutex<Option<JoinHandle<()>>>>;

fn lock_slot(slot: &DomainSlot) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to a spawned worker's tasks.
pub struct WorkerHandle {
    name: String,
    gate: PauseGate,
    halt: Arc<AtomicBool>,
    control_task: JoinHandle<()>,
    domain_task: DomainSlot,
}

impl WorkerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gate(&self) -> &PauseGate {
        &self.gate
    }

    /// Returns true once the domain loop has been launched.
    pub fn is_started(&self) -> bool {
        lock_slot(&self.domain_task).is_some()
    }

    /// Returns true when neither loop is running any more.
    pub fn is_finished(&self) -> bool {
        let domain_done = lock_slot(&self.domain_task)
            .as_ref()
            .map_or(true, |task| task.is_finished());
        self.control_task.is_finished() && domain_done
    }

    /// Raises the external stop flag and closes the gate.
    pub fn halt(&self) {
        self.halt.store(true, Ordering::SeqCst);
        self.gate.close();
    }

    /// Halts the worker and waits up to `grace` for both loops to exit,
    /// aborting whatever is still running afterwards.
    ///
    /// Returns true if both loops exited on their own.
    pub async fn shutdown(self, grace: Duration) -> bool {
        self.halt();
        let domain = lock_slot(&self.domain_task).take();

        let mut clean = true;
        for (label, task) in [("control", Some(self.control_task)), ("domain", domain)] {
            let Some(mut task) = task else { continue };
            if tokio::time::timeout(grace, &mut task).await.is_err() {
                warn!("{}: {} loop did not exit within {:?}; aborting", self.name, label, grace);
                task.abort();
                clean = false;
            }
        }
        clean
    }
}

/// Spawns the control loop for `worker`.
///
/// Without a control port the worker runs untethered: the domain loop
/// starts at once and only [`WorkerHandle::halt`] can stop it.
pub fn spawn_worker<W: Worker>(
    worker: Arc<W>,
    port: Option<ControlPort>,
    config: SupervisorConfig,
) -> WorkerHandle {
    let name = worker.name().to_string();
    let gate = PauseGate::new();
    let halt = Arc::new(AtomicBool::new(false));
    let domain_task: DomainSlot = Arc::new(Mutex::new(None));

    let supervisor = Supervisor {
        worker,
        gate: gate.clone(),
        halt: Arc::clone(&halt),
        domain_task: Arc::clone(&domain_task),
        config,
    };

    let span = info_span!("control", worker = %name);
    let control_task = tokio::spawn(supervisor.control_loop(port).instrument(span));

    WorkerHandle {
        name,
        gate,
        halt,
        control_task,
        domain_task,
    }
}

struct Supervisor<W: Worker> {
    worker: Arc<W>,
    gate: PauseGate,
    halt: Arc<AtomicBool>,
    domain_task: DomainSlot,
    config: SupervisorConfig,
}

impl<W: Worker> Supervisor<W> {
    async fn control_loop(self, port: Option<ControlPort>) {
        let Some(mut port) = port else {
            let err = EnvError::ChannelUnavailable(format!("{} control", self.worker.name()));
            warn!("{}; running without a control surface", err);
            self.launch_domain_loop();
            return;
        };
        let Some(wake) = port.wake().cloned() else {
            warn!("{} has no wake signal; running without a control surface", port.name());
            self.launch_domain_loop();
            return;
        };

        debug!("Starting control loop");
        while !self.halt.load(Ordering::SeqCst) {
            // A timed-out wait still polls once so a dropped link is noticed.
            if wake.wait(self.config.control_wait).await {
                wake.clear();
            }

            let Envelope { seq, body: request } = match port.try_recv() {
                Ok(Some(envelope)) => {
                    // More requests may be queued behind this one.
                    wake.set();
                    envelope
                }
                Ok(None) => continue,
                Err(err) => {
                    warn!("{}; control loop exiting", err);
                    break;
                }
            };

            debug!("Got request {}", request);
            let (response, stop) = self.dispatch(request).await;
            if let Err(err) = port.reply(seq, response) {
                debug!("Reply to {} dropped: {}", request, err);
            }
            if stop {
                break;
            }
        }
        debug!("Done with control loop");
    }

    async fn dispatch(&self, request: ControlRequest) -> (ControlResponse, bool) {
        if let Some(response) = self.worker.special_control(request).await {
            return (response, false);
        }

        match request {
            ControlRequest::Start => {
                if lock_slot(&self.domain_task).is_some() {
                    let reason = format!("{} already started", self.worker.name());
                    return (ControlResponse::Rejected(reason), false);
                }
                self.worker.pre_start().await;
                self.launch_domain_loop();
                self.worker.post_start().await;
                (ControlResponse::Success, false)
            }
            ControlRequest::Stop => {
                info!("Stopping {}", self.worker.name());
                self.worker.pre_stop().await;
                self.gate.close();
                self.halt.store(true, Ordering::SeqCst);
                self.worker.post_stop().await;
                (ControlResponse::Success, true)
            }
            ControlRequest::Pause => {
                self.worker.pre_pause().await;
                if self.gate.suspend(self.config.pause_ack_timeout).await == Suspension::Pending {
                    warn!(
                        "{} did not reach a checkpoint within {:?}; it will pause at the next one",
                        self.worker.name(),
                        self.config.pause_ack_timeout
                    );
                }
                self.worker.post_pause().await;
                (ControlResponse::Success, false)
            }
            ControlRequest::Resume => {
                self.worker.pre_resume().await;
                self.gate.release();
                self.worker.post_resume().await;
                (ControlResponse::Success, false)
            }
            other => {
                warn!("{} does not handle {}", self.worker.name(), other);
                let reason = format!("{} not supported by {}", other, self.worker.name());
                (ControlResponse::Rejected(reason), false)
            }
        }
    }

    fn launch_domain_loop(&self) {
        let worker = Arc::clone(&self.worker);
        let gate = self.gate.clone();
        let span = info_span!("domain", worker = %worker.name());

        gate.set_loop_active(true);
        let task = tokio::spawn(
            async move {
                debug!("Domain loop started");
                worker.run(gate.clone()).await;
                gate.set_loop_active(false);
                debug!("Domain loop exited");
            }
            .instrument(span),
        );
        *lock_slot(&self.domain_task) = Some(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{control_channel, ControlLink};
    use std::sync::atomic::AtomicU64;

    const RT: Duration = Duration::from_secs(2);

    /// Counts loop iterations and answers QUERY_STATS with nothing useful.
    struct Counter {
        ticks: AtomicU64,
        stop_hook_ran: AtomicBool,
    }

    impl Counter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                ticks: AtomicU64::new(0),
                stop_hook_ran: AtomicBool::new(false),
            })
        }

        fn ticks(&self) -> u64 {
            self.ticks.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Worker for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        async fn run(&self, gate: PauseGate) {
            while !gate.checkpoint().await.is_halt() {
                self.ticks.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }

        async fn special_control(&self, request: ControlRequest) -> Option<ControlResponse> {
            match request {
                ControlRequest::QueryProgress => Some(ControlResponse::Progress(Default::default())),
                _ => None,
            }
        }

        async fn pre_stop(&self) {
            self.stop_hook_ran.store(true, Ordering::SeqCst);
        }
    }

    fn spawn_counter() -> (Arc<Counter>, ControlLink, WorkerHandle) {
        let worker = Counter::new();
        let (link, port) = control_channel("counter");
        let config = SupervisorConfig {
            control_wait: Duration::from_millis(20),
            pause_ack_timeout: Duration::from_secs(1),
        };
        let handle = spawn_worker(Arc::clone(&worker), Some(port), config);
        (worker, link, handle)
    }

    async fn ack(link: &ControlLink, request: ControlRequest) {
        link.round_trip(request, RT).await.unwrap().into_ack().unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_domain_loop_waits_for_start() {
        let (worker, link, handle) = spawn_counter();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(worker.ticks(), 0);
        assert!(!handle.is_started());

        ack(&link, ControlRequest::Start).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(worker.ticks() > 0);

        ack(&link, ControlRequest::Stop).await;
        assert!(handle.shutdown(RT).await);
        assert!(worker.stop_hook_ran.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pause_freezes_and_resume_continues() {
        let (worker, link, handle) = spawn_counter();
        ack(&link, ControlRequest::Start).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        ack(&link, ControlRequest::Pause).await;
        assert!(handle.gate().is_parked());
        let frozen = worker.ticks();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(worker.ticks(), frozen);

        ack(&link, ControlRequest::Resume).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(worker.ticks() > frozen);

        ack(&link, ControlRequest::Stop).await;
        assert!(handle.shutdown(RT).await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_while_paused_exits() {
        let (_worker, link, handle) = spawn_counter();
        ack(&link, ControlRequest::Start).await;
        ack(&link, ControlRequest::Pause).await;
        ack(&link, ControlRequest::Stop).await;
        assert!(handle.shutdown(RT).await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_start_is_rejected() {
        let (_worker, link, handle) = spawn_counter();
        ack(&link, ControlRequest::Start).await;

        let response = link.round_trip(ControlRequest::Start, RT).await.unwrap();
        assert!(matches!(response, ControlResponse::Rejected(_)));

        handle.shutdown(RT).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_special_and_unknown_requests() {
        let (_worker, link, handle) = spawn_counter();

        let progress = link.round_trip(ControlRequest::QueryProgress, RT).await.unwrap();
        assert!(progress.into_progress().is_ok());

        // Unknown requests are reported back and the worker stays reachable.
        let err = link
            .round_trip(ControlRequest::QueryStats, RT)
            .await
            .unwrap()
            .into_stats()
            .unwrap_err();
        assert!(matches!(err, EnvError::Rejected(_)));
        ack(&link, ControlRequest::Start).await;

        handle.shutdown(RT).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_untethered_worker_runs_until_halted() {
        let worker = Counter::new();
        let handle = spawn_worker(Arc::clone(&worker), None, SupervisorConfig::default());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(worker.ticks() > 0);
        assert!(handle.shutdown(RT).await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dropped_link_ends_control_loop() {
        let (_worker, link, handle) = spawn_counter();
        drop(link);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished());
    }
}
