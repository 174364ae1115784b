//! Unified error type for the Pinpoint server.

use pinpoint_protocol::ProtocolError;
use pinpoint_room::RoomError;
use pinpoint_session::SessionError;
use pinpoint_transport::TransportError;

/// Top-level error that wraps all layer-specific errors.
///
/// The `#[from]` attributes generate the `From` impls, so `?` converts a
/// layer error into this one automatically at the server boundary.
#[derive(Debug, thiserror::Error)]
pub enum PinpointError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (authentication, connection bookkeeping).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, game rules).
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let top: PinpointError = err.into();
        assert!(matches!(top, PinpointError::Transport(_)));
        assert!(top.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let top: PinpointError = err.into();
        assert!(matches!(top, PinpointError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::Unauthenticated("nope".into());
        let top: PinpointError = err.into();
        assert!(matches!(top, PinpointError::Session(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(pinpoint_protocol::RoomId(1));
        let top: PinpointError = err.into();
        assert!(matches!(top, PinpointError::Room(_)));
    }
}
