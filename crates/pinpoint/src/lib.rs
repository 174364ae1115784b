//! # Pinpoint
//!
//! The real-time session coordinator for a browser-based geography
//! guessing game. Players connect over WebSocket, join a room, and race
//! to drop a pin closest to a hidden target before the round deadline.
//!
//! The crate ties the layers together: transport accepts connections, the
//! protocol layer decodes messages, the session layer binds connections to
//! identities, and the room layer runs the games. Plug in the three
//! collaborators the coordinator does not implement itself — an
//! [`Authenticator`](pinpoint_session::Authenticator), a
//! [`TargetProvider`](pinpoint_room::TargetProvider), and a
//! [`PersistenceSink`](pinpoint_room::PersistenceSink) — and run it:
//!
//! ```rust,no_run
//! use pinpoint::prelude::*;
//!
//! # struct MyAuth;
//! # impl Authenticator for MyAuth {
//! #     async fn authenticate(&self, t: &str) -> Result<Identity, SessionError> {
//! #         Ok(Identity { player_id: PlayerId(1), display_name: t.into() })
//! #     }
//! # }
//! # async fn run() -> Result<(), PinpointError> {
//! let server = ServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(MyAuth, RandomTargets, NullSink)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::PinpointError;
pub use server::{Server, ServerBuilder};

/// The commonly needed imports in one place.
pub mod prelude {
    pub use crate::{PinpointError, Server, ServerBuilder};
    pub use pinpoint_geo::{Coordinate, ScoringConfig};
    pub use pinpoint_protocol::{
        ClientMessage, ErrorCode, FinalStanding, JsonCodec, PlayerId, RoomId,
        RoundStanding, ServerMessage,
    };
    pub use pinpoint_room::{
        Coordinator, FixedTargets, NullSink, PersistenceSink, RandomTargets,
        RoomConfig, RoomStatus, TargetProvider,
    };
    pub use pinpoint_session::{Authenticator, Identity, SessionError};
}
