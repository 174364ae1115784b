//! Round and guess value objects.
//!
//! A `Round` is owned exclusively by one room actor, so nothing here needs
//! synchronization. Guesses are scored at submission time against the
//! round's target; that is what lets the server answer the guesser
//! immediately instead of waiting for the round to close.

use std::time::{Duration, Instant};

use pinpoint_geo::{Coordinate, ScoringConfig, distance_meters};
use pinpoint_protocol::PlayerId;

use crate::RoomError;

/// Whether a round is still accepting guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    /// Running: guesses accepted until the deadline.
    Active,
    /// Closed and archived; immutable from here on.
    Scored,
}

/// One player's submission for one round.
#[derive(Debug, Clone)]
pub struct Guess {
    pub player_id: PlayerId,
    pub coordinate: Coordinate,
    /// Server-side receipt time, also the tie-break for equal points.
    pub submitted_at: Instant,
    pub distance_meters: f64,
    pub points: u32,
}

/// One target-guessing challenge within a room.
#[derive(Debug, Clone)]
pub struct Round {
    /// 0-based, strictly increasing within a room.
    pub index: u32,
    /// The hidden location. Revealed to players only when the round ends.
    pub target: Coordinate,
    pub started_at: Instant,
    pub deadline: Instant,
    pub duration: Duration,
    pub status: RoundStatus,
    /// In server receipt order; at most one entry per player.
    pub guesses: Vec<Guess>,
}

impl Round {
    /// Creates a round that is live immediately, with its deadline at
    /// `started_at + duration`.
    pub fn new(
        index: u32,
        target: Coordinate,
        started_at: Instant,
        duration: Duration,
    ) -> Self {
        Self {
            index,
            target,
            started_at,
            deadline: started_at + duration,
            duration,
            status: RoundStatus::Active,
            guesses: Vec::new(),
        }
    }

    /// Returns `true` while the round accepts guesses.
    pub fn is_active(&self) -> bool {
        self.status == RoundStatus::Active
    }

    /// The guess a player made this round, if any.
    pub fn guess_of(&self, player: PlayerId) -> Option<&Guess> {
        self.guesses.iter().find(|g| g.player_id == player)
    }

    /// Position of a player's guess in receipt order.
    pub fn submission_order(&self, player: PlayerId) -> Option<usize> {
        self.guesses.iter().position(|g| g.player_id == player)
    }

    /// Validates and records a guess, scoring it against the target.
    ///
    /// `now` is the server receipt time at the room's serialization point;
    /// a guess at or past the deadline is rejected rather than scored at
    /// zero, so the client can tell "too slow" from "too far".
    ///
    /// # Errors
    /// [`RoomError::NoActiveRound`] if the round already closed,
    /// [`RoomError::RoundExpired`] past the deadline,
    /// [`RoomError::DuplicateGuess`] on a second submission — the first
    /// guess stands, never overwritten.
    pub fn record_guess(
        &mut self,
        player: PlayerId,
        coordinate: Coordinate,
        now: Instant,
        scoring: &ScoringConfig,
    ) -> Result<&Guess, RoomError> {
        if !self.is_active() {
            return Err(RoomError::NoActiveRound);
        }
        if now >= self.deadline {
            return Err(RoomError::RoundExpired);
        }
        if self.guess_of(player).is_some() {
            return Err(RoomError::DuplicateGuess(player));
        }

        let distance = distance_meters(coordinate, self.target);
        let points = scoring.score(distance);
        self.guesses.push(Guess {
            player_id: player,
            coordinate,
            submitted_at: now,
            distance_meters: distance,
            points,
        });
        Ok(self.guesses.last().expect("just pushed"))
    }

    /// Closes the round. Guesses are frozen from here on.
    pub fn close(&mut self) {
        self.status = RoundStatus::Scored;
    }
}
