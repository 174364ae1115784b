//! The authentication hook.
//!
//! Pinpoint trusts whatever identity the [`Authenticator`] returns. In
//! production that means validating a JWT or calling the account service;
//! in tests it can be a parser that accepts anything. The framework only
//! cares that the same credential always maps to the same player id.

use pinpoint_protocol::PlayerId;

use crate::SessionError;

/// An authenticated player identity, as issued upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable player id; the key for scores and room membership.
    pub player_id: PlayerId,
    /// Name shown to other players in standings and join notices.
    pub display_name: String,
}

/// Validates a client's credential and returns their identity.
///
/// Called once per connection, with the token from the `authenticate`
/// message. `Send + Sync + 'static` because one authenticator instance is
/// shared by every connection-handler task.
pub trait Authenticator: Send + Sync + 'static {
    /// Validates `token` and returns who it belongs to.
    ///
    /// # Errors
    /// [`SessionError::Unauthenticated`] when the credential is invalid,
    /// expired, or rejected upstream.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Identity, SessionError>> + Send;
}
