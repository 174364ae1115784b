//! Message types for the Pinpoint wire format.
//!
//! Every message is a JSON object with a snake_case `"type"` tag, matching
//! what a browser client naturally produces. Field names are snake_case
//! too; identity newtypes serialize as bare numbers.

use pinpoint_geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable player identity, issued by the upstream authentication system.
///
/// Newtype over `u64` so a player id can never be confused with a room id
/// in a signature. `#[serde(transparent)]` keeps the wire form a plain
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player-{}", self.0)
    }
}

/// Identifier of one game room. Allocated by the coordinator, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Machine-readable reason attached to every [`ServerMessage::Error`].
///
/// Clients branch on the code; the accompanying message string is for
/// humans and logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The connection has not completed (or failed) authentication.
    Unauthenticated,
    /// No room with that id, or the connection is not attached to a room.
    RoomNotFound,
    /// The room's player capacity is exhausted.
    RoomFull,
    /// The room no longer accepts this action (finished, or joining
    /// mid-game as a non-member).
    RoomFinished,
    /// The action is reserved for the room owner.
    NotOwner,
    /// All configured rounds have been played, or the game was ended.
    GameAlreadyFinished,
    /// A round is still running; it must close before the next starts.
    RoundInProgress,
    /// There is no round to guess in right now.
    NoActiveRound,
    /// The player already guessed in this round.
    DuplicateGuess,
    /// The guess arrived at or after the round deadline.
    RoundExpired,
    /// Latitude or longitude outside the valid range.
    InvalidCoordinate,
}

impl ErrorCode {
    /// The snake_case wire spelling, for logs and assertions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::RoomNotFound => "room_not_found",
            Self::RoomFull => "room_full",
            Self::RoomFinished => "room_finished",
            Self::NotOwner => "not_owner",
            Self::GameAlreadyFinished => "game_already_finished",
            Self::RoundInProgress => "round_in_progress",
            Self::NoActiveRound => "no_active_round",
            Self::DuplicateGuess => "duplicate_guess",
            Self::RoundExpired => "round_expired",
            Self::InvalidCoordinate => "invalid_coordinate",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

/// One row of a `round_ended` leaderboard.
///
/// Members who never guessed still appear, with zero points and no
/// distance, so every client renders the same complete table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundStanding {
    pub player_id: PlayerId,
    pub display_name: String,
    /// Absent when the player did not guess this round.
    pub distance_meters: Option<f64>,
    /// Points earned this round.
    pub points: u32,
    /// Accumulated score across all rounds so far.
    pub total_score: u32,
}

/// One row of a `game_ended` leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalStanding {
    pub player_id: PlayerId,
    pub display_name: String,
    pub total_score: u32,
}

// ---------------------------------------------------------------------------
// Inbound messages
// ---------------------------------------------------------------------------

/// Everything a client can send.
///
/// `#[serde(tag = "type", rename_all = "snake_case")]` produces the
/// internally tagged form, e.g. `{"type": "submit_guess", "lat": 48.8,
/// "lng": 2.3}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Must be the first message on a connection. `token` is whatever
    /// credential the upstream identity provider understands.
    Authenticate { token: String },

    /// Keep-alive. `client_time` is echoed back for RTT estimation.
    Heartbeat { client_time: u64 },

    /// Creates a new room owned by the sender.
    CreateRoom {
        total_rounds: u32,
        duration_seconds: u64,
    },

    /// Joins (or re-joins after a disconnect) the given room.
    JoinRoom { room_id: RoomId },

    /// Starts the next round. Owner only.
    StartRound,

    /// Submits a coordinate guess for the active round. Raw degrees —
    /// range validation happens server-side so the client gets a proper
    /// `invalid_coordinate` error instead of a decode failure.
    SubmitGuess { lat: f64, lng: f64 },

    /// Ends the game immediately. Owner only.
    EndGame,
}

// ---------------------------------------------------------------------------
// Outbound messages
// ---------------------------------------------------------------------------

/// Everything the server can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication succeeded; this is who the server thinks you are.
    Authenticated {
        player_id: PlayerId,
        display_name: String,
    },

    /// Reply to a heartbeat. Both timestamps are milliseconds on their
    /// respective clocks.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Your `create_room` succeeded.
    RoomCreated { room_id: RoomId },

    /// Your `join_room` succeeded.
    RoomJoined { room_id: RoomId },

    /// Someone else joined the room you are in.
    PlayerJoined {
        player_id: PlayerId,
        display_name: String,
    },

    /// A round began. The target is deliberately not included; it is
    /// revealed only by `round_ended`.
    RoundStarted {
        round_index: u32,
        duration_seconds: u64,
    },

    /// Your guess was accepted and scored. Sent only to the guesser —
    /// a broadcast would leak distance hints about the hidden target.
    GuessResult {
        distance_meters: f64,
        points: u32,
        cumulative_score: u32,
    },

    /// The round closed: target revealed, per-round leaderboard.
    RoundEnded {
        round_index: u32,
        target: Coordinate,
        standings: Vec<RoundStanding>,
    },

    /// The game is over: final leaderboard.
    GameEnded { standings: Vec<FinalStanding> },

    /// An action of yours was rejected. Sent only to the acting
    /// connection; other members never see it.
    Error { code: ErrorCode, message: String },
}

// =========================================================================
// Tests
// =========================================================================
