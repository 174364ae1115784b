//! External collaborators of the room layer.
//!
//! The coordinator is deliberately ignorant of where targets come from and
//! where finished rounds go. Both concerns sit behind traits so a curated
//! location pool or a real database can be plugged in without touching the
//! game logic. The implementations here are the ones the demo server and
//! the test suites use.

use std::convert::Infallible;

use pinpoint_geo::Coordinate;
use pinpoint_protocol::RoomId;
use rand::Rng;

use crate::{Guess, Round};

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// Supplies the hidden target for each round.
///
/// Called from inside the room's serialized command path when a round
/// starts, so implementations should answer quickly; a provider that needs
/// slow I/O should pre-fetch into a pool.
pub trait TargetProvider: Send + Sync + 'static {
    /// Returns the target for `round_index` of `room_id`.
    fn next_target(
        &self,
        room_id: RoomId,
        round_index: u32,
    ) -> impl std::future::Future<Output = Coordinate> + Send;
}

/// A fixed list of targets, cycled by round index. Deterministic, which
/// makes it the provider of choice for tests and scripted games.
pub struct FixedTargets {
    targets: Vec<Coordinate>,
}

impl FixedTargets {
    /// # Panics
    /// Panics if `targets` is empty — a provider with nothing to provide
    /// is a configuration bug, not a runtime condition.
    pub fn new(targets: Vec<Coordinate>) -> Self {
        assert!(!targets.is_empty(), "FixedTargets needs at least one target");
        Self { targets }
    }
}

impl TargetProvider for FixedTargets {
    async fn next_target(&self, _room_id: RoomId, round_index: u32) -> Coordinate {
        self.targets[round_index as usize % self.targets.len()]
    }
}

/// Uniform random targets over the globe.
///
/// Latitude is drawn as `asin` of a uniform value so points are uniform
/// over the sphere's surface, not bunched at the poles the way uniform
/// degrees would be.
pub struct RandomTargets;

impl TargetProvider for RandomTargets {
    async fn next_target(&self, _room_id: RoomId, _round_index: u32) -> Coordinate {
        let mut rng = rand::rng();
        let lat = rng.random_range(-1.0f64..=1.0).asin().to_degrees();
        let lng = rng.random_range(-180.0f64..180.0);
        Coordinate::new(lat, lng).expect("sampled within valid range")
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Receives finished rounds and resolved guesses for durable storage.
///
/// Invoked fire-and-forget on a spawned task after the in-memory state has
/// already moved on: a failure is logged and the game continues. A crash
/// before the next successful write loses unsaved history — that is the
/// documented trade-off, not a bug.
pub trait PersistenceSink: Send + Sync + 'static {
    /// The sink's failure type. Only ever logged.
    type Error: std::error::Error + Send + Sync;

    /// Records a closed round (including its guesses).
    fn record_round(
        &self,
        room_id: RoomId,
        round: Round,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;

    /// Records a single resolved guess.
    fn record_guess(
        &self,
        room_id: RoomId,
        round_index: u32,
        guess: Guess,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;
}

/// A sink that discards everything. For demos and tests where durable
/// history is irrelevant.
pub struct NullSink;

impl PersistenceSink for NullSink {
    type Error = Infallible;

    async fn record_round(
        &self,
        room_id: RoomId,
        round: Round,
    ) -> Result<(), Infallible> {
        tracing::trace!(%room_id, round = round.index, "discarding round record");
        Ok(())
    }

    async fn record_guess(
        &self,
        room_id: RoomId,
        round_index: u32,
        guess: Guess,
    ) -> Result<(), Infallible> {
        tracing::trace!(
            %room_id,
            round = round_index,
            player_id = %guess.player_id,
            "discarding guess record"
        );
        Ok(())
    }
}
