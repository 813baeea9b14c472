//! Value types exchanged between PyDynDS workers.
//!
//! Everything here is plain data: cloning is a deep copy, so a value handed
//! across a channel never aliases the sender's storage.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a node (variable/agent) in the constraint graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Creates a NodeId from any string-like name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the node name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for NodeId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message sent between two nodes by a solver.
///
/// Immutable once constructed: fields are only readable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: u64,
    source: NodeId,
    destination: NodeId,
    start_cycle: u64,
    payload: Value,
}

impl Message {
    /// Creates a new message.
    pub fn new(
        id: u64,
        source: NodeId,
        destination: NodeId,
        start_cycle: u64,
        payload: Value,
    ) -> Self {
        Self {
            id,
            source,
            destination,
            start_cycle,
            payload,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source(&self) -> &NodeId {
        &self.source
    }

    pub fn destination(&self) -> &NodeId {
        &self.destination
    }

    /// Cycle of the view under which the message was sent.
    pub fn start_cycle(&self) -> u64 {
        self.start_cycle
    }

    /// Opaque solver payload (usually a hypercube or similar).
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// A unit of local computation performed by a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Computation {
    id: u64,
    node: NodeId,
    start_cycle: u64,
    payload: Value,
}

impl Computation {
    /// Creates a new computation record.
    pub fn new(id: u64, node: NodeId, start_cycle: u64, payload: Value) -> Self {
        Self {
            id,
            node,
            start_cycle,
            payload,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn start_cycle(&self) -> u64 {
        self.start_cycle
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// Message and computation statistics of an Algorithm worker.
///
/// `unread_*` buffers are append-only; readers track their own offsets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_messages: u64,
    pub total_computations: u64,
    pub last_message: Option<Message>,
    pub last_computation: Option<Computation>,
    pub unread_messages: Vec<Message>,
    pub unread_computations: Vec<Computation>,
}

impl StatsSnapshot {
    /// Returns true when nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.total_messages == 0 && self.total_computations == 0
    }
}

/// One instance of the constraint problem.
///
/// The content is opaque to the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DcopSnapshot(Value);

impl DcopSnapshot {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the snapshot and returns the JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Request from an Algorithm to the Simulator for a fresh view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewUpdateRequest {
    /// Last cycle the requester knows about.
    pub timestamp: u64,
}

impl ViewUpdateRequest {
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }
}

/// Simulator's answer to a [`ViewUpdateRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewUpdate {
    /// Cycle the view is valid for.
    pub cycle: u64,

    /// Active snapshot at `cycle`, if any.
    pub snapshot: Option<DcopSnapshot>,
}

/// Simulated time as published by the Model after each update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStatus {
    pub cycle: u64,
    pub finished: bool,
}

/// Model progress returned by a progress query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProgress {
    pub current_cycle: u64,

    /// Start cycle of the active snapshot, `None` before the first one.
    pub active_start_cycle: Option<u64>,

    pub finished: bool,
}
