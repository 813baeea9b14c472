//! Duplex request/response channels between workers.
//!
//! ```text
//! Caller (RequestLink)                    Worker (RequestPort)
//!   |-- Envelope{seq, request} ------------->|
//!   |   wake.set()                           |-- try_recv()
//!   |<------------- Envelope{seq, response} -|-- reply(seq, ..)
//! ```
//!
//! Every request carries a sequence number that the reply echoes. A link
//! keeps exactly one round trip in flight and drops replies whose sequence
//! number belongs to an earlier, timed-out request.

use crate::error::EnvError;
use crate::protocol::{ControlRequest, ControlResponse};
use crate::types::{ViewUpdate, ViewUpdateRequest};
use crate::wake::WakeSignal;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// A request or reply tagged with its round-trip sequence number.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub seq: u64,
    pub body: T,
}

/// Caller side of a duplex channel. Cheap to clone; clones share the
/// reply queue and take turns.
pub struct RequestLink<Req, Resp> {
    inner: Arc<LinkInner<Req, Resp>>,
}

struct LinkInner<Req, Resp> {
    name: String,
    requests: mpsc::UnboundedSender<Envelope<Req>>,
    replies: Mutex<mpsc::UnboundedReceiver<Envelope<Resp>>>,
    next_seq: AtomicU64,
    wake: Option<Arc<WakeSignal>>,
}

impl<Req, Resp> Clone for RequestLink<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Req, Resp> RequestLink<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    /// Returns the channel name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns true once the worker side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.inner.requests.is_closed()
    }

    /// Sends a request and waits for its matching reply.
    ///
    /// The whole exchange, including waiting for a concurrent round trip on
    /// a cloned link to finish, is bounded by `timeout`.
    pub async fn round_trip(&self, body: Req, timeout: Duration) -> Result<Resp, EnvError> {
        let deadline = Instant::now() + timeout;
        let mut replies = tokio::time::timeout_at(deadline, self.inner.replies.lock())
            .await
            .map_err(|_| EnvError::timeout(timeout))?;

        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        self.inner
            .requests
            .send(Envelope { seq, body })
            .map_err(|_| EnvError::closed(self.inner.name.clone()))?;
        if let Some(wake) = &self.inner.wake {
            wake.set();
        }

        loop {
            match tokio::time::timeout_at(deadline, replies.recv()).await {
                Err(_) => return Err(EnvError::timeout(timeout)),
                Ok(None) => return Err(EnvError::closed(self.inner.name.clone())),
                Ok(Some(reply)) if reply.seq == seq => return Ok(reply.body),
                Ok(Some(stale)) => {
                    debug!(
                        "{}: dropping stale reply seq={} (waiting for {})",
                        self.inner.name, stale.seq, seq
                    );
                }
            }
        }
    }
}

/// Worker side of a duplex channel.
pub struct RequestPort<Req, Resp> {
    name: String,
    requests: mpsc::UnboundedReceiver<Envelope<Req>>,
    replies: mpsc::UnboundedSender<Envelope<Resp>>,
    wake: Option<Arc<WakeSignal>>,
}

impl<Req, Resp> RequestPort<Req, Resp> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the wake signal shared with the caller side, if any.
    pub fn wake(&self) -> Option<&Arc<WakeSignal>> {
        self.wake.as_ref()
    }

    /// Pops one pending request without blocking.
    pub fn try_recv(&mut self) -> Result<Option<Envelope<Req>>, EnvError> {
        match self.requests.try_recv() {
            Ok(envelope) => Ok(Some(envelope)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(EnvError::closed(self.name.clone())),
        }
    }

    /// Waits up to `timeout` for the next request.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Envelope<Req>>, EnvError> {
        match tokio::time::timeout(timeout, self.requests.recv()).await {
            Err(_) => Ok(None),
            Ok(Some(envelope)) => Ok(Some(envelope)),
            Ok(None) => Err(EnvError::closed(self.name.clone())),
        }
    }

    /// Sends the reply for request `seq`.
    pub fn reply(&self, seq: u64, body: Resp) -> Result<(), EnvError> {
        self.replies
            .send(Envelope { seq, body })
            .map_err(|_| EnvError::closed(self.name.clone()))
    }
}

/// Creates a connected link/port pair.
pub fn duplex<Req, Resp>(
    name: impl Into<String>,
    wake: Option<Arc<WakeSignal>>,
) -> (RequestLink<Req, Resp>, RequestPort<Req, Resp>) {
    let name = name.into();
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();

    let link = RequestLink {
        inner: Arc::new(LinkInner {
            name: name.clone(),
            requests: request_tx,
            replies: Mutex::new(reply_rx),
            next_seq: AtomicU64::new(0),
            wake: wake.clone(),
        }),
    };
    let port = RequestPort {
        name,
        requests: request_rx,
        replies: reply_tx,
        wake,
    };
    (link, port)
}

/// Caller side of a worker's control channel.
pub type ControlLink = RequestLink<ControlRequest, ControlResponse>;

/// Worker side of a control channel.
pub type ControlPort = RequestPort<ControlRequest, ControlResponse>;

/// Algorithm side of the Algorithm → Simulator view channel.
pub type ViewLink = RequestLink<ViewUpdateRequest, ViewUpdate>;

/// Simulator side of the view channel.
pub type ViewPort = RequestPort<ViewUpdateRequest, ViewUpdate>;

/// Creates a control channel pair sharing one wake signal.
pub fn control_channel(name: impl Into<String>) -> (ControlLink, ControlPort) {
    duplex(name, Some(WakeSignal::shared()))
}

/// Creates an Algorithm → Simulator view channel pair.
pub fn view_channel(name: impl Into<String>) -> (ViewLink, ViewPort) {
    duplex(name, None)
}
