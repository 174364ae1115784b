//! End-to-end tests: a real server on loopback, real WebSocket clients,
//! JSON frames all the way through.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pinpoint::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Test authenticator
// =========================================================================

/// Accepts tokens of the form `<id>:<name>`.
struct TestAuth;

impl Authenticator for TestAuth {
    async fn authenticate(&self, token: &str) -> Result<Identity, SessionError> {
        let (id, name) = token
            .split_once(':')
            .ok_or_else(|| SessionError::Unauthenticated("want <id>:<name>".into()))?;
        let id: u64 = id
            .parse()
            .map_err(|_| SessionError::Unauthenticated("id must be a number".into()))?;
        Ok(Identity {
            player_id: PlayerId(id),
            display_name: name.to_string(),
        })
    }
}

// =========================================================================
// Helpers
// =========================================================================

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

fn paris() -> Coordinate {
    Coordinate::new(48.8566, 2.3522).unwrap()
}

/// Starts a server on a random port and returns its address.
async fn start_server() -> String {
    let server = ServerBuilder::new()
        .bind("127.0.0.1:0")
        .build(TestAuth, FixedTargets::new(vec![paris()]), NullSink)
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("bound").to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> Ws {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("client should connect");
    ws
}

async fn send(ws: &mut Ws, msg: &ClientMessage) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

async fn recv(ws: &mut Ws) -> ServerMessage {
    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .expect("websocket error");
    serde_json::from_slice(&frame.into_data()).expect("valid server message")
}

/// Connects and authenticates as `<id>:<name>`.
async fn login(addr: &str, id: u64, name: &str) -> Ws {
    let mut ws = connect(addr).await;
    send(&mut ws, &ClientMessage::Authenticate {
        token: format!("{id}:{name}"),
    })
    .await;
    match recv(&mut ws).await {
        ServerMessage::Authenticated { player_id, .. } => {
            assert_eq!(player_id, PlayerId(id))
        }
        other => panic!("expected authenticated, got {other:?}"),
    }
    ws
}

// =========================================================================
// Authentication
// =========================================================================

#[tokio::test]
async fn test_authenticate_success() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, &ClientMessage::Authenticate {
        token: "7:ada".into(),
    })
    .await;

    match recv(&mut ws).await {
        ServerMessage::Authenticated {
            player_id,
            display_name,
        } => {
            assert_eq!(player_id, PlayerId(7));
            assert_eq!(display_name, "ada");
        }
        other => panic!("expected authenticated, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bad_token_is_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, &ClientMessage::Authenticate {
        token: "no-colon-here".into(),
    })
    .await;

    match recv(&mut ws).await {
        ServerMessage::Error { code, .. } => {
            assert_eq!(code, ErrorCode::Unauthenticated)
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_first_message_must_be_authenticate() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, &ClientMessage::StartRound).await;

    match recv(&mut ws).await {
        ServerMessage::Error { code, .. } => {
            assert_eq!(code, ErrorCode::Unauthenticated)
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_heartbeat_round_trip() {
    let addr = start_server().await;
    let mut ws = login(&addr, 1, "ada").await;

    send(&mut ws, &ClientMessage::Heartbeat { client_time: 12345 }).await;

    match recv(&mut ws).await {
        ServerMessage::HeartbeatAck { client_time, .. } => {
            assert_eq!(client_time, 12345)
        }
        other => panic!("expected heartbeat_ack, got {other:?}"),
    }
}

// =========================================================================
// Game flow over the wire
// =========================================================================

#[tokio::test]
async fn test_two_player_game_end_to_end() {
    let addr = start_server().await;
    let mut p1 = login(&addr, 1, "ada").await;
    let mut p2 = login(&addr, 2, "brian").await;

    // Ada creates and joins a single-round game.
    send(&mut p1, &ClientMessage::CreateRoom {
        total_rounds: 1,
        duration_seconds: 30,
    })
    .await;
    let room_id = match recv(&mut p1).await {
        ServerMessage::RoomCreated { room_id } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };
    send(&mut p1, &ClientMessage::JoinRoom { room_id }).await;
    assert!(matches!(recv(&mut p1).await, ServerMessage::RoomJoined { .. }));

    // Brian joins; ada sees him arrive.
    send(&mut p2, &ClientMessage::JoinRoom { room_id }).await;
    assert!(matches!(recv(&mut p2).await, ServerMessage::RoomJoined { .. }));
    match recv(&mut p1).await {
        ServerMessage::PlayerJoined { player_id, .. } => {
            assert_eq!(player_id, PlayerId(2))
        }
        other => panic!("expected player_joined, got {other:?}"),
    }

    // Round starts for both.
    send(&mut p1, &ClientMessage::StartRound).await;
    for ws in [&mut p1, &mut p2] {
        match recv(ws).await {
            ServerMessage::RoundStarted { round_index, .. } => {
                assert_eq!(round_index, 0)
            }
            other => panic!("expected round_started, got {other:?}"),
        }
    }

    // Ada nails it; brian drops his pin on Sydney.
    send(&mut p1, &ClientMessage::SubmitGuess {
        lat: 48.8566,
        lng: 2.3522,
    })
    .await;
    match recv(&mut p1).await {
        ServerMessage::GuessResult {
            distance_meters,
            points,
            cumulative_score,
        } => {
            assert_eq!(distance_meters, 0.0);
            assert_eq!(points, 5_000);
            assert_eq!(cumulative_score, 5_000);
        }
        other => panic!("expected guess_result, got {other:?}"),
    }

    send(&mut p2, &ClientMessage::SubmitGuess {
        lat: -33.8688,
        lng: 151.2093,
    })
    .await;
    let brian_points = match recv(&mut p2).await {
        ServerMessage::GuessResult { points, .. } => points,
        other => panic!("expected guess_result, got {other:?}"),
    };
    assert!(brian_points < 5_000);

    // Everyone guessed: the round closes and, it being the only round,
    // the game ends. Both clients get the same reveal and leaderboard.
    for ws in [&mut p1, &mut p2] {
        match recv(ws).await {
            ServerMessage::RoundEnded {
                target, standings, ..
            } => {
                assert_eq!(target, paris());
                assert_eq!(standings.len(), 2);
                assert_eq!(standings[0].player_id, PlayerId(1));
                assert_eq!(standings[0].points, 5_000);
                assert_eq!(standings[1].player_id, PlayerId(2));
                assert_eq!(standings[1].points, brian_points);
            }
            other => panic!("expected round_ended, got {other:?}"),
        }
        match recv(ws).await {
            ServerMessage::GameEnded { standings } => {
                assert_eq!(standings[0].player_id, PlayerId(1));
                assert_eq!(standings[0].total_score, 5_000);
            }
            other => panic!("expected game_ended, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_non_owner_start_rejected_over_wire() {
    let addr = start_server().await;
    let mut p1 = login(&addr, 1, "ada").await;
    let mut p2 = login(&addr, 2, "brian").await;

    send(&mut p1, &ClientMessage::CreateRoom {
        total_rounds: 1,
        duration_seconds: 30,
    })
    .await;
    let room_id = match recv(&mut p1).await {
        ServerMessage::RoomCreated { room_id } => room_id,
        other => panic!("expected room_created, got {other:?}"),
    };
    send(&mut p1, &ClientMessage::JoinRoom { room_id }).await;
    let _ = recv(&mut p1).await; // room_joined
    send(&mut p2, &ClientMessage::JoinRoom { room_id }).await;
    let _ = recv(&mut p2).await; // room_joined

    send(&mut p2, &ClientMessage::StartRound).await;
    match recv(&mut p2).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, ErrorCode::NotOwner),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_unknown_room_over_wire() {
    let addr = start_server().await;
    let mut ws = login(&addr, 1, "ada").await;

    send(&mut ws, &ClientMessage::JoinRoom {
        room_id: RoomId(424_242),
    })
    .await;

    match recv(&mut ws).await {
        ServerMessage::Error { code, .. } => {
            assert_eq!(code, ErrorCode::RoomNotFound)
        }
        other => panic!("expected error, got {other:?}"),
    }
}
