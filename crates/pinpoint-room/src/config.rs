//! Room configuration and the life-cycle state machine.

use std::time::Duration;

use pinpoint_geo::ScoringConfig;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings for one room.
///
/// `total_rounds` and `round_duration` come from the create-room request;
/// the rest are server-side defaults the operator can override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Maximum players that can join the lobby.
    pub max_players: usize,

    /// Number of rounds in a full game.
    pub total_rounds: u32,

    /// Time players have to guess once a round starts.
    pub round_duration: Duration,

    /// How long a room with zero connected players survives before the
    /// eviction sweep may remove it, regardless of game state.
    pub idle_grace: Duration,

    /// Distance-to-points curve parameters.
    pub scoring: ScoringConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            total_rounds: 5,
            round_duration: Duration::from_secs(60),
            idle_grace: Duration::from_secs(600),
            scoring: ScoringConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// The life-cycle state of a room.
///
/// ```text
/// Lobby → RoundActive ⇄ RoundScored → Finished
/// ```
///
/// - **Lobby**: room exists, players can join, no round played yet.
/// - **RoundActive**: exactly one round is running and accepting guesses.
/// - **RoundScored**: the last round closed; waiting for the owner to
///   start the next one.
/// - **Finished**: terminal. Reached when the final round is scored or
///   the owner ends the game early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Lobby,
    RoundActive,
    RoundScored,
    Finished,
}

impl RoomStatus {
    /// Returns `true` if the owner may start a round from this state.
    pub fn can_start_round(self) -> bool {
        matches!(self, Self::Lobby | Self::RoundScored)
    }

    /// Returns `true` if a round is currently accepting guesses.
    pub fn in_round(self) -> bool {
        matches!(self, Self::RoundActive)
    }

    /// Returns `true` for the terminal state.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::RoundActive => write!(f, "RoundActive"),
            Self::RoundScored => write!(f, "RoundScored"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}
