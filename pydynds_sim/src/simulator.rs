//! Simulator worker - answers Algorithm view requests.
//!
//! The view for a request is the snapshot active at
//! `max(request timestamp, latest cycle published by the Model)`, looked up
//! with the same [`DynDcop::active_at`] rule the Model uses.

use async_trait::async_trait;
use pydynds_core::DynDcop;
use pydynds_env::{CycleStatus, PauseGate, ViewPort, ViewUpdate, ViewUpdateRequest, Worker};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

pub struct SimulatorWorker {
    dyn_dcop: Arc<DynDcop>,
    port: Mutex<Option<ViewPort>>,
    cycle_feed: watch::Receiver<CycleStatus>,
    poll_interval: Duration,
}

impl SimulatorWorker {
    pub fn new(
        dyn_dcop: Arc<DynDcop>,
        port: Option<ViewPort>,
        cycle_feed: watch::Receiver<CycleStatus>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            dyn_dcop,
            port: Mutex::new(port),
            cycle_feed,
            poll_interval,
        }
    }

    /// Latest cycle published by the Model.
    pub fn model_cycle(&self) -> u64 {
        self.cycle_feed.borrow().cycle
    }

    /// Builds the answer to `request`.
    pub fn view_for(&self, request: ViewUpdateRequest) -> ViewUpdate {
        let cycle = request.timestamp.max(self.model_cycle());
        ViewUpdate {
            cycle,
            snapshot: self.dyn_dcop.active_at(cycle).cloned(),
        }
    }
}

#[async_trait]
impl Worker for SimulatorWorker {
    fn name(&self) -> &str {
        "simulator"
    }

    async fn run(&self, gate: PauseGate) {
        let mut slot = self.port.lock().await;
        let Some(port) = slot.as_mut() else {
            warn!("No view channel; simulator idle");
            while !gate.checkpoint().await.is_halt() {
                tokio::time::sleep(self.poll_interval).await;
            }
            return;
        };

        while !gate.checkpoint().await.is_halt() {
            let request = match port.recv_timeout(self.poll_interval).await {
                Ok(Some(request)) => request,
                Ok(None) => continue,
                Err(err) => {
                    warn!("{}; simulator idle", err);
                    // Stay reachable for STOP without spinning.
                    while !gate.checkpoint().await.is_halt() {
                        tokio::time::sleep(self.poll_interval).await;
                    }
                    return;
                }
            };

            let update = self.view_for(request.body);
            debug!("Serving view for cycle {}", update.cycle);
            if let Err(err) = port.reply(request.seq, update) {
                debug!("View reply dropped: {}", err);
            }
        }
    }
}
