//! Error types for the notification layer.

use std::time::Duration;

use gomoku_protocol::ProtocolError;

/// Errors a [`NotificationGateway`](crate::NotificationGateway) may report.
///
/// Callers treat every one of these as non-fatal: notifications are a
/// convenience layer and the stored room stays authoritative.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The message could not be encoded.
    #[error(transparent)]
    Encode(#[from] ProtocolError),

    /// The gateway did not answer in time.
    #[error("gateway call timed out after {0:?}")]
    Timeout(Duration),

    /// The hub or remote service refused or could not be reached.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}
