//! Error types for the session layer.

use pinpoint_transport::ConnectionId;

/// Errors that can occur during identity resolution and connection
/// bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The credential was invalid, expired, or rejected by the upstream
    /// identity provider.
    #[error("authentication failed: {0}")]
    Unauthenticated(String),

    /// An operation referenced a connection the registry does not know.
    /// Usually a race with a disconnect; safe to drop.
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),
}
