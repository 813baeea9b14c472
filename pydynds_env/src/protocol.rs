//! The closed control protocol spoken on every worker's control channel.

use crate::error::EnvError;
use crate::types::{DcopSnapshot, ModelProgress, StatsSnapshot};
use serde::{Deserialize, Serialize};

/// Requests a worker's control loop understands.
///
/// Lifecycle requests are handled by every worker; queries are offered to
/// the worker's domain hook and rejected if it does not handle them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlRequest {
    Start,
    Stop,
    Pause,
    Resume,
    /// Model: current DCOP snapshot.
    QueryCurrentState,
    /// Algorithm: message/computation statistics.
    QueryStats,
    /// Model: current cycle and finished flag.
    QueryProgress,
}

impl ControlRequest {
    /// Returns the protocol name of the request.
    pub fn name(&self) -> &'static str {
        match self {
            ControlRequest::Start => "START",
            ControlRequest::Stop => "STOP",
            ControlRequest::Pause => "PAUSE",
            ControlRequest::Resume => "RESUME",
            ControlRequest::QueryCurrentState => "QUERY_CURRENT_STATE",
            ControlRequest::QueryStats => "QUERY_STATS",
            ControlRequest::QueryProgress => "QUERY_PROGRESS",
        }
    }

    /// Returns true for START/STOP/PAUSE/RESUME.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            ControlRequest::Start | ControlRequest::Stop | ControlRequest::Pause | ControlRequest::Resume
        )
    }
}

impl std::fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Replies sent back on a worker's outbound control channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlResponse {
    /// Acknowledges a lifecycle request (the protocol's SUCCESS).
    Success,
    Stats(StatsSnapshot),
    CurrentState(Option<DcopSnapshot>),
    Progress(ModelProgress),
    /// The request was not handled; the worker keeps running.
    Rejected(String),
}

impl ControlResponse {
    /// Returns the protocol name of the response.
    pub fn name(&self) -> &'static str {
        match self {
            ControlResponse::Success => "SUCCESS",
            ControlResponse::Stats(_) => "STATS",
            ControlResponse::CurrentState(_) => "CURRENT_STATE",
            ControlResponse::Progress(_) => "PROGRESS",
            ControlResponse::Rejected(_) => "REJECTED",
        }
    }

    /// Interprets the response as a lifecycle acknowledgement.
    pub fn into_ack(self) -> Result<(), EnvError> {
        match self {
            ControlResponse::Success => Ok(()),
            other => Err(other.mismatch("SUCCESS")),
        }
    }

    /// Interprets the response as a stats snapshot.
    pub fn into_stats(self) -> Result<StatsSnapshot, EnvError> {
        match self {
            ControlResponse::Stats(stats) => Ok(stats),
            other => Err(other.mismatch("STATS")),
        }
    }

    /// Interprets the response as a DCOP snapshot.
    pub fn into_current_state(self) -> Result<Option<DcopSnapshot>, EnvError> {
        match self {
            ControlResponse::CurrentState(snapshot) => Ok(snapshot),
            other => Err(other.mismatch("CURRENT_STATE")),
        }
    }

    /// Interprets the response as model progress.
    pub fn into_progress(self) -> Result<ModelProgress, EnvError> {
        match self {
            ControlResponse::Progress(progress) => Ok(progress),
            other => Err(other.mismatch("PROGRESS")),
        }
    }

    fn mismatch(self, expected: &str) -> EnvError {
        match self {
            ControlResponse::Rejected(reason) => EnvError::Rejected(reason),
            other => EnvError::UnexpectedResponse(format!(
                "expected {}, got {}",
                expected,
                other.name()
            )),
        }
    }
}
