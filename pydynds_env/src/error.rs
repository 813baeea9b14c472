//! Error types for the PyDynDS control plane.

use thiserror::Error;

/// Errors that can occur while talking to a worker over its channels.
///
/// None of these are fatal to a worker: control loops log them and keep
/// serving, domain loops treat them as "nothing changed this round".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// The peer dropped its end of the channel.
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// The channel was never wired (worker running untethered).
    #[error("Channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// Round trip did not complete in time.
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// The peer answered with a response of the wrong kind.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The peer understood the request and refused it.
    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl EnvError {
    /// Creates a channel-closed error.
    pub fn closed(channel: impl Into<String>) -> Self {
        Self::ChannelClosed(channel.into())
    }

    /// Creates a timeout error from a duration.
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::Timeout(after.as_millis() as u64)
    }

    /// Returns true for errors caused by a missing or closed channel.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::ChannelClosed(_) | Self::ChannelUnavailable(_))
    }
}
