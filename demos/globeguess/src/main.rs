//! A runnable Pinpoint game server with random targets.
//!
//! Players authenticate with a `<id>:<name>` token (development only —
//! swap [`TokenAuth`] for a real validator before exposing this anywhere),
//! create or join rooms, and guess away. Rounds draw uniform random
//! targets across the globe.
//!
//! ```text
//! RUST_LOG=info cargo run -p globeguess
//! ```

use pinpoint::prelude::*;
use tracing_subscriber::EnvFilter;

/// Parses `<id>:<name>` tokens. The id becomes the player id, the name is
/// shown on leaderboards.
struct TokenAuth;

impl Authenticator for TokenAuth {
    async fn authenticate(&self, token: &str) -> Result<Identity, SessionError> {
        let (id, name) = token.split_once(':').ok_or_else(|| {
            SessionError::Unauthenticated("token must be <id>:<name>".into())
        })?;
        let id: u64 = id.parse().map_err(|_| {
            SessionError::Unauthenticated("token id must be a number".into())
        })?;
        if name.is_empty() {
            return Err(SessionError::Unauthenticated("name must not be empty".into()));
        }
        Ok(Identity {
            player_id: PlayerId(id),
            display_name: name.to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), PinpointError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server = ServerBuilder::new()
        .bind("0.0.0.0:8080")
        .build(TokenAuth, RandomTargets, NullSink)
        .await?;

    if let Ok(addr) = server.local_addr() {
        tracing::info!(%addr, "globeguess listening");
    }
    server.run().await
}
