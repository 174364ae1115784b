//! Identity and connection tracking for Pinpoint.
//!
//! Two concerns live here:
//!
//! 1. **Who is this?** — the [`Authenticator`] trait turns a credential
//!    into a stable [`Identity`]. Pinpoint never validates credentials
//!    itself; that is the upstream auth system's job.
//! 2. **How do I reach them?** — the [`ConnectionRegistry`] maps each live
//!    connection to its identity and current room, and owns the outbound
//!    channel used for unicast and room broadcast.
//!
//! Reconnection is handled by replacement, not by a session state machine:
//! when a player opens a second connection into the same room, the new one
//! takes over the mapping and the old one is dropped. Game state (the
//! player's score, their guesses) lives in the room layer and is never
//! affected by connection churn.

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod registry;

pub use auth::{Authenticator, Identity};
pub use error::SessionError;
pub use registry::{ConnectionRegistry, OutboundSender};
