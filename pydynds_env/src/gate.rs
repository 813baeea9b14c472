//! Checkpoint-granular pause/stop gate shared by a worker's control loop
//! and its domain loop.
//!
//! The domain loop calls [`PauseGate::checkpoint`] between externally
//! visible side effects and never holds anything across a blocking call.
//! The control loop flips the gate with [`suspend`](PauseGate::suspend),
//! [`release`](PauseGate::release) and [`close`](PauseGate::close).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// State published by the control side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Open,
    Suspended,
    Closed,
}

/// What the domain loop should do after a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Proceed,
    Halt,
}

impl Checkpoint {
    pub fn is_halt(self) -> bool {
        self == Checkpoint::Halt
    }
}

/// Outcome of a suspend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspension {
    /// The domain loop is parked at a checkpoint.
    Parked,
    /// No domain loop is running; nothing to wait for.
    Idle,
    /// The domain loop did not reach a checkpoint in time. It will park at
    /// its next one.
    Pending,
}

/// Shared pause/stop gate. Clones refer to the same gate.
#[derive(Clone)]
pub struct PauseGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    state: watch::Sender<GateState>,
    parked: watch::Sender<bool>,
    loop_active: AtomicBool,
}

impl PauseGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(GateState::Open);
        let (parked, _) = watch::channel(false);
        Self {
            inner: Arc::new(GateInner {
                state,
                parked,
                loop_active: AtomicBool::new(false),
            }),
        }
    }

    pub fn state(&self) -> GateState {
        *self.inner.state.borrow()
    }

    /// Returns true while the domain loop is parked at a checkpoint.
    pub fn is_parked(&self) -> bool {
        *self.inner.parked.borrow()
    }

    /// Marks whether a domain loop is currently running behind this gate.
    pub fn set_loop_active(&self, active: bool) {
        self.inner.loop_active.store(active, Ordering::SeqCst);
        if !active {
            self.inner.parked.send_replace(false);
        }
    }

    pub fn is_loop_active(&self) -> bool {
        self.inner.loop_active.load(Ordering::SeqCst)
    }

    /// Domain-loop checkpoint. Returns at once while the gate is open,
    /// parks while it is suspended, and reports `Halt` once closed.
    pub async fn checkpoint(&self) -> Checkpoint {
        let mut state = self.inner.state.subscribe();
        loop {
            let current = *state.borrow_and_update();
            match current {
                GateState::Open => {
                    self.inner.parked.send_replace(false);
                    return Checkpoint::Proceed;
                }
                GateState::Closed => {
                    self.inner.parked.send_replace(false);
                    return Checkpoint::Halt;
                }
                GateState::Suspended => {
                    self.inner.parked.send_replace(true);
                }
            }
            if state.changed().await.is_err() {
                return Checkpoint::Halt;
            }
        }
    }

    /// Suspends the domain loop and waits, bounded by `timeout`, until it
    /// parks at its next checkpoint.
    pub async fn suspend(&self, timeout: Duration) -> Suspension {
        let mut parked = self.inner.parked.subscribe();
        self.inner.state.send_if_modified(|state| {
            if *state == GateState::Open {
                *state = GateState::Suspended;
                true
            } else {
                false
            }
        });

        if !self.is_loop_active() {
            return Suspension::Idle;
        }
        let acknowledged = tokio::time::timeout(timeout, parked.wait_for(|parked| *parked))
            .await
            .map(|waited| waited.is_ok());
        match acknowledged {
            Ok(true) => Suspension::Parked,
            Ok(false) | Err(_) => {
                if self.is_loop_active() {
                    Suspension::Pending
                } else {
                    Suspension::Idle
                }
            }
        }
    }

    /// Reopens a suspended gate.
    pub fn release(&self) {
        self.inner.state.send_if_modified(|state| {
            if *state == GateState::Suspended {
                *state = GateState::Open;
                true
            } else {
                false
            }
        });
    }

    /// Closes the gate for good; a parked domain loop wakes with `Halt`.
    pub fn close(&self) {
        self.inner.state.send_replace(GateState::Closed);
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[tokio::test]
    async fn test_open_gate_proceeds() {
        let gate = PauseGate::new();
        assert_eq!(gate.checkpoint().await, Checkpoint::Proceed);
        assert!(!gate.is_parked());
    }

    #[tokio::test]
    async fn test_suspend_without_loop_is_idle() {
        let gate = PauseGate::new();
        assert_eq!(gate.suspend(Duration::from_millis(10)).await, Suspension::Idle);
        assert_eq!(gate.state(), GateState::Suspended);

        gate.release();
        assert_eq!(gate.state(), GateState::Open);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pause_then_resume_does_not_deadlock() {
        let gate = PauseGate::new();
        let steps = Arc::new(AtomicU64::new(0));

        gate.set_loop_active(true);
        let domain = {
            let gate = gate.clone();
            let steps = Arc::clone(&steps);
            tokio::spawn(async move {
                while !gate.checkpoint().await.is_halt() {
                    steps.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                gate.set_loop_active(false);
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(gate.suspend(Duration::from_secs(1)).await, Suspension::Parked);

        // Parked: no progress while suspended.
        let frozen = steps.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(steps.load(Ordering::SeqCst), frozen);

        gate.release();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(steps.load(Ordering::SeqCst) > frozen);

        gate.close();
        domain.await.unwrap();
        assert!(!gate.is_loop_active());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_close_wakes_parked_loop() {
        let gate = PauseGate::new();
        gate.set_loop_active(true);
        gate.suspend(Duration::from_millis(1)).await;

        let domain = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.checkpoint().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(gate.is_parked());
        gate.close();
        assert_eq!(domain.await.unwrap(), Checkpoint::Halt);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_suspend_acknowledged_by_parked_loop() {
        let gate = PauseGate::new();
        gate.set_loop_active(true);
        let domain = {
            let gate = gate.clone();
            tokio::spawn(async move {
                while !gate.checkpoint().await.is_halt() {
                    tokio::task::yield_now().await;
                }
            })
        };

        assert_eq!(gate.suspend(Duration::from_secs(1)).await, Suspension::Parked);
        assert!(gate.is_parked());
        gate.close();
        domain.await.unwrap();
    }

    #[tokio::test]
    async fn test_slow_checkpoint_reports_pending() {
        let gate = PauseGate::new();
        gate.set_loop_active(true);
        // Loop "active" but never reaches a checkpoint.
        assert_eq!(gate.suspend(Duration::from_millis(10)).await, Suspension::Pending);
    }

    #[tokio::test]
    async fn test_release_does_not_reopen_closed_gate() {
        let gate = PauseGate::new();
        gate.close();
        gate.release();
        assert_eq!(gate.state(), GateState::Closed);
        assert_eq!(gate.checkpoint().await, Checkpoint::Halt);
    }
}
