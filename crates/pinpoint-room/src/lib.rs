//! Room life-cycle and session coordination for Pinpoint.
//!
//! Each room runs as an isolated Tokio task (actor model) owning its
//! players, rounds, and scores. All mutations — joins, guesses, the round
//! deadline firing — arrive through one mpsc channel, so the game rules
//! are straight-line sequential code with no locks.
//!
//! # Key types
//!
//! - [`Coordinator`] — process-wide room registry and the single dispatch
//!   point for inbound player actions
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomConfig`] / [`RoomStatus`] — settings and the life-cycle state
//!   machine
//! - [`Round`] / [`Guess`] — one target-guessing challenge and its entries
//! - [`TargetProvider`] / [`PersistenceSink`] — the external collaborators
//!   (where targets come from, where history goes)

#![allow(async_fn_in_trait)]

mod config;
mod coordinator;
mod error;
mod providers;
mod room;
mod round;

pub use config::{RoomConfig, RoomStatus};
pub use coordinator::Coordinator;
pub use error::{DispatchError, RoomError};
pub use providers::{
    FixedTargets, NullSink, PersistenceSink, RandomTargets, TargetProvider,
};
pub use room::{RoomHandle, RoomInfo};
pub use round::{Guess, Round, RoundStatus};
