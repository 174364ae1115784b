//! Wire protocol for Pinpoint.
//!
//! Everything a client and the coordinator say to each other is defined
//! here: identity newtypes, the inbound [`ClientMessage`] and outbound
//! [`ServerMessage`] enums, standings entries, the [`ErrorCode`] taxonomy,
//! and the [`Codec`] trait that turns messages into bytes.
//!
//! The protocol layer is deliberately dumb. It knows the shape of every
//! message but nothing about rooms, timers, or scoring; validation of
//! meaning happens in the room layer. One consequence worth noting: there
//! is no "acting player" field anywhere in [`ClientMessage`] — identity is
//! always derived from the connection a message arrived on, so a client
//! cannot speak as someone else.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, ErrorCode, FinalStanding, PlayerId, RoomId, RoundStanding,
    ServerMessage,
};
