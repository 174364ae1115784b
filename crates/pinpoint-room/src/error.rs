//! Error types for the room layer.
//!
//! Every variant maps onto a wire [`ErrorCode`] via [`RoomError::code`];
//! the Display string becomes the human-readable half of the `error`
//! message sent back to the acting connection.

use pinpoint_geo::GeoError;
use pinpoint_protocol::{ErrorCode, PlayerId, RoomId};
use pinpoint_session::SessionError;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist (never created, or already evicted).
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room's player capacity is exhausted.
    #[error("room {0} is full")]
    Full(RoomId),

    /// The room does not accept this join: it is finished, or the game
    /// already started and the caller was never a member.
    #[error("room {0} no longer accepts players")]
    Finished(RoomId),

    /// An owner-only action was attempted by somebody else.
    #[error("player {0} is not the room owner")]
    NotOwner(PlayerId),

    /// No rounds remain, or the game was already ended.
    #[error("the game is already finished")]
    GameAlreadyFinished,

    /// A round is still running; it must close before the next starts.
    #[error("a round is already in progress")]
    RoundInProgress,

    /// There is no round accepting guesses right now.
    #[error("no round is currently active")]
    NoActiveRound,

    /// The player already has a guess recorded for the current round.
    #[error("player {0} already guessed this round")]
    DuplicateGuess(PlayerId),

    /// The guess arrived at or after the round deadline. Distinct from
    /// scoring zero: the client is told it was too slow, not too far.
    #[error("the round deadline has passed")]
    RoundExpired,

    /// The acting player is not a member of the room.
    #[error("player {0} is not a member of room {1}")]
    NotInRoom(PlayerId, RoomId),

    /// The acting connection is not attached to any room.
    #[error("player {0} has not joined a room")]
    NoRoomJoined(PlayerId),

    /// The guess coordinate is outside the valid latitude/longitude range.
    #[error(transparent)]
    InvalidCoordinate(#[from] GeoError),

    /// The room's command channel is closed; the actor is gone.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    /// The wire code clients branch on.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::RoomNotFound,
            Self::Full(_) => ErrorCode::RoomFull,
            Self::Finished(_) => ErrorCode::RoomFinished,
            Self::NotOwner(_) => ErrorCode::NotOwner,
            Self::GameAlreadyFinished => ErrorCode::GameAlreadyFinished,
            Self::RoundInProgress => ErrorCode::RoundInProgress,
            Self::NoActiveRound => ErrorCode::NoActiveRound,
            Self::DuplicateGuess(_) => ErrorCode::DuplicateGuess,
            Self::RoundExpired => ErrorCode::RoundExpired,
            Self::NotInRoom(..) => ErrorCode::RoomNotFound,
            Self::NoRoomJoined(_) => ErrorCode::RoomNotFound,
            Self::InvalidCoordinate(_) => ErrorCode::InvalidCoordinate,
            Self::Unavailable(_) => ErrorCode::RoomNotFound,
        }
    }
}

/// Failure surfaced at the coordinator's dispatch boundary: either a room
/// rule was violated or the connection's identity could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl DispatchError {
    /// The wire code clients branch on.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Room(e) => e.code(),
            Self::Session(_) => ErrorCode::Unauthenticated,
        }
    }
}
