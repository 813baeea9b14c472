//! Errors surfaced by the simulation controller.

use crate::controller::ControllerState;

use pydynds_core::CoreError;
use pydynds_env::EnvError;
use thiserror::Error;

/// Errors returned synchronously from controller and registry calls.
#[derive(Debug, Error)]
pub enum SimError {
    /// Lifecycle call not allowed from the current state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ControllerState,
    },

    /// No algorithm registered under this name.
    #[error("Unknown algorithm: {0}")]
    UnknownVariant(String),

    /// The Model did not hand over the initial snapshot.
    #[error("Model handshake failed: {0}")]
    Handshake(EnvError),

    /// A query round trip failed.
    #[error("Channel error: {0}")]
    Channel(#[from] EnvError),

    /// The DynDCOP could not be loaded.
    #[error("Load error: {0}")]
    Load(#[from] CoreError),
}

impl SimError {
    /// Returns true for lifecycle-state violations.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, SimError::InvalidState { .. })
    }
}
