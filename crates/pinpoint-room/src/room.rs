//! Room actor: an isolated Tokio task that owns one game.
//!
//! Every mutation of a room — joins, disconnects, guesses, the deadline
//! firing — goes through this actor's single command channel, so no two
//! operations on the same room ever interleave and the game rules below
//! are plain sequential code. The deadline is just another branch of the
//! actor's `select!` loop: a timer firing and a guess arriving at the same
//! instant are ordered by whichever the loop picks up first, and the loser
//! sees the state the winner left behind.
//!
//! Outbound traffic is handed to the [`ConnectionRegistry`], which
//! enqueues per-connection; the actor never waits on a socket.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pinpoint_geo::Coordinate;
use pinpoint_protocol::{
    FinalStanding, PlayerId, RoomId, RoundStanding, ServerMessage,
};
use pinpoint_session::ConnectionRegistry;
use pinpoint_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant as TokioInstant;

use crate::round::Round;
use crate::{PersistenceSink, RoomConfig, RoomError, RoomStatus, TargetProvider};

/// Commands sent to a room actor through its channel.
///
/// Operations that can fail carry a oneshot reply; the coordinator awaits
/// it and converts an `Err` into an `error` unicast to the acting
/// connection.
pub(crate) enum RoomCommand {
    /// Add a player, or re-point an existing member's connection.
    Join {
        player_id: PlayerId,
        display_name: String,
        conn: ConnectionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// A member's connection went away. The player stays.
    Disconnect {
        player_id: PlayerId,
        conn: ConnectionId,
    },

    /// Start the next round (owner only).
    StartRound {
        actor: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Submit a guess for the active round.
    SubmitGuess {
        actor: PlayerId,
        conn: ConnectionId,
        lat: f64,
        lng: f64,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// End the game immediately (owner only).
    EndGame {
        actor: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Request a metadata snapshot.
    Info { reply: oneshot::Sender<RoomInfo> },

    /// Stop the actor.
    Shutdown,
}

/// A snapshot of room metadata (not the game state itself).
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub owner: PlayerId,
    pub status: RoomStatus,
    pub player_count: usize,
    pub connected_count: usize,
    /// Rounds created so far; never decreases.
    pub rounds_played: u32,
    /// `rounds_played - 1` once the first round starts.
    pub current_round_index: Option<u32>,
    /// How long the room has had zero connected players.
    pub idle_for: Option<Duration>,
    /// Set when `idle_for` exceeds the configured grace period.
    pub idle_expired: bool,
}

/// Handle to a running room actor. Cheap to clone; the coordinator holds
/// one per room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// The room's unique id.
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Adds a player, or re-attaches a returning member's connection.
    pub async fn join(
        &self,
        player_id: PlayerId,
        display_name: String,
        conn: ConnectionId,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            player_id,
            display_name,
            conn,
            reply: reply_tx,
        })
        .await?;
        self.recv(reply_rx).await?
    }

    /// Tells the room a member's connection is gone (fire-and-forget).
    pub async fn disconnect(
        &self,
        player_id: PlayerId,
        conn: ConnectionId,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Disconnect { player_id, conn }).await
    }

    /// Starts the next round on behalf of `actor`.
    pub async fn start_round(&self, actor: PlayerId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::StartRound {
            actor,
            reply: reply_tx,
        })
        .await?;
        self.recv(reply_rx).await?
    }

    /// Submits a guess on behalf of `actor`.
    pub async fn submit_guess(
        &self,
        actor: PlayerId,
        conn: ConnectionId,
        lat: f64,
        lng: f64,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::SubmitGuess {
            actor,
            conn,
            lat,
            lng,
            reply: reply_tx,
        })
        .await?;
        self.recv(reply_rx).await?
    }

    /// Ends the game on behalf of `actor`.
    pub async fn end_game(&self, actor: PlayerId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::EndGame {
            actor,
            reply: reply_tx,
        })
        .await?;
        self.recv(reply_rx).await?
    }

    /// Requests a metadata snapshot.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Info { reply: reply_tx }).await?;
        self.recv(reply_rx).await
    }

    /// Tells the actor to stop.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    async fn recv<R>(&self, reply: oneshot::Receiver<R>) -> Result<R, RoomError> {
        reply.await.map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

/// A member of the room. Survives disconnects; only `connection` changes.
struct Player {
    id: PlayerId,
    display_name: String,
    connection: Option<ConnectionId>,
    /// Score accumulated across all rounds of this room.
    score: u32,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<T: TargetProvider, S: PersistenceSink> {
    room_id: RoomId,
    owner: PlayerId,
    status: RoomStatus,
    config: RoomConfig,
    /// Vector order is join order, which is the last leaderboard tie-break.
    players: Vec<Player>,
    /// Append-only round history; the last entry is the current round.
    rounds: Vec<Round>,
    /// Armed while a round is active; cleared on close/end.
    deadline: Option<TokioInstant>,
    /// Set whenever the room has zero connected players.
    idle_since: Option<Instant>,
    registry: Arc<ConnectionRegistry>,
    targets: Arc<T>,
    sink: Arc<S>,
    receiver: mpsc::Receiver<RoomCommand>,
}

/// Resolves when the deadline passes; pends forever while no round is
/// active so the `select!` loop only ever reacts to commands.
async fn deadline_elapsed(deadline: Option<TokioInstant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

impl<T: TargetProvider, S: PersistenceSink> RoomActor<T, S> {
    /// Runs the actor loop until shutdown or the last handle drops.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, owner = %self.owner, "room actor started");

        loop {
            let deadline = self.deadline;
            tokio::select! {
                cmd = self.receiver.recv() => {
                    match cmd {
                        Some(RoomCommand::Shutdown) | None => break,
                        Some(cmd) => self.handle(cmd).await,
                    }
                }
                _ = deadline_elapsed(deadline) => {
                    self.close_round("deadline elapsed");
                }
            }
        }

        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    async fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                player_id,
                display_name,
                conn,
                reply,
            } => {
                let result = self.handle_join(player_id, display_name, conn);
                let _ = reply.send(result);
            }
            RoomCommand::Disconnect { player_id, conn } => {
                self.handle_disconnect(player_id, conn);
            }
            RoomCommand::StartRound { actor, reply } => {
                let result = self.handle_start_round(actor).await;
                let _ = reply.send(result);
            }
            RoomCommand::SubmitGuess {
                actor,
                conn,
                lat,
                lng,
                reply,
            } => {
                let result = self.handle_submit_guess(actor, conn, lat, lng);
                let _ = reply.send(result);
            }
            RoomCommand::EndGame { actor, reply } => {
                let result = self.handle_end_game(actor);
                let _ = reply.send(result);
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            // Handled in `run`.
            RoomCommand::Shutdown => {}
        }
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        display_name: String,
        conn: ConnectionId,
    ) -> Result<(), RoomError> {
        // Returning member: allowed in any non-finished state. Their
        // score and guesses are untouched; only the delivery path moves.
        if let Some(pos) = self.position(player_id) {
            if self.status.is_finished() {
                return Err(RoomError::Finished(self.room_id));
            }
            self.players[pos].connection = Some(conn);
            self.idle_since = None;
            tracing::info!(
                room_id = %self.room_id, %player_id, %conn,
                "player reconnected"
            );
            return Ok(());
        }

        // New members only join from the lobby.
        if self.status != RoomStatus::Lobby {
            return Err(RoomError::Finished(self.room_id));
        }
        if self.players.len() >= self.config.max_players {
            return Err(RoomError::Full(self.room_id));
        }

        self.players.push(Player {
            id: player_id,
            display_name: display_name.clone(),
            connection: Some(conn),
            score: 0,
        });
        self.idle_since = None;
        tracing::info!(
            room_id = %self.room_id, %player_id,
            players = self.players.len(),
            "player joined"
        );

        // The joiner gets a room_joined ack instead; everyone already
        // attached learns who arrived.
        self.registry.broadcast(
            self.room_id,
            &ServerMessage::PlayerJoined {
                player_id,
                display_name,
            },
            Some(conn),
        );
        Ok(())
    }

    fn handle_disconnect(&mut self, player_id: PlayerId, conn: ConnectionId) {
        let Some(pos) = self.position(player_id) else {
            return;
        };
        // Only clear if this is still the player's current connection; a
        // reconnect may already have replaced it.
        if self.players[pos].connection != Some(conn) {
            return;
        }
        self.players[pos].connection = None;
        tracing::info!(room_id = %self.room_id, %player_id, "player disconnected");

        if self.connected_count() == 0 {
            self.idle_since = Some(Instant::now());
        } else {
            // The departed player may have been the last holdout.
            self.maybe_close_all_guessed();
        }
    }

    async fn handle_start_round(&mut self, actor: PlayerId) -> Result<(), RoomError> {
        if actor != self.owner {
            return Err(RoomError::NotOwner(actor));
        }
        match self.status {
            RoomStatus::Finished => return Err(RoomError::GameAlreadyFinished),
            RoomStatus::RoundActive => return Err(RoomError::RoundInProgress),
            RoomStatus::Lobby | RoomStatus::RoundScored => {}
        }
        if self.rounds.len() as u32 >= self.config.total_rounds {
            return Err(RoomError::GameAlreadyFinished);
        }

        let index = self.rounds.len() as u32;
        let target = self.targets.next_target(self.room_id, index).await;
        let duration = self.config.round_duration;

        self.rounds.push(Round::new(index, target, Instant::now(), duration));
        self.deadline = Some(TokioInstant::now() + duration);
        self.status = RoomStatus::RoundActive;

        tracing::info!(
            room_id = %self.room_id,
            round = index,
            duration_secs = duration.as_secs(),
            "round started"
        );

        // The target stays server-side; clients learn it from round_ended.
        self.registry.broadcast(
            self.room_id,
            &ServerMessage::RoundStarted {
                round_index: index,
                duration_seconds: duration.as_secs(),
            },
            None,
        );
        Ok(())
    }

    fn handle_submit_guess(
        &mut self,
        actor: PlayerId,
        conn: ConnectionId,
        lat: f64,
        lng: f64,
    ) -> Result<(), RoomError> {
        let Some(pos) = self.position(actor) else {
            return Err(RoomError::NotInRoom(actor, self.room_id));
        };
        if self.status != RoomStatus::RoundActive {
            return Err(RoomError::NoActiveRound);
        }
        let coordinate = Coordinate::new(lat, lng)?;

        let scoring = self.config.scoring.clone();
        let Some(round) = self.rounds.last_mut() else {
            return Err(RoomError::NoActiveRound);
        };
        let round_index = round.index;
        let guess = round
            .record_guess(actor, coordinate, Instant::now(), &scoring)?
            .clone();

        self.players[pos].score += guess.points;
        let cumulative_score = self.players[pos].score;

        tracing::debug!(
            room_id = %self.room_id,
            player_id = %actor,
            round = round_index,
            distance_m = guess.distance_meters,
            points = guess.points,
            "guess recorded"
        );

        // Result goes to the guesser only; a broadcast would leak how far
        // everyone is from the still-hidden target.
        self.registry.unicast(
            conn,
            ServerMessage::GuessResult {
                distance_meters: guess.distance_meters,
                points: guess.points,
                cumulative_score,
            },
        );

        self.persist_guess(round_index, guess);
        self.maybe_close_all_guessed();
        Ok(())
    }

    fn handle_end_game(&mut self, actor: PlayerId) -> Result<(), RoomError> {
        if actor != self.owner {
            return Err(RoomError::NotOwner(actor));
        }
        if self.status.is_finished() {
            return Err(RoomError::GameAlreadyFinished);
        }

        self.deadline = None;
        // Archive a half-played round without a round_ended reveal; its
        // points are already in the accumulators.
        let had_open_round = match self.rounds.last_mut() {
            Some(round) if round.is_active() => {
                round.close();
                true
            }
            _ => false,
        };
        if had_open_round {
            self.persist_round();
        }

        self.status = RoomStatus::Finished;
        tracing::info!(room_id = %self.room_id, %actor, "game ended by owner");
        self.broadcast_game_ended();
        Ok(())
    }

    /// Closes the active round if every connected member has guessed.
    /// A room with zero connected members waits for the deadline instead.
    fn maybe_close_all_guessed(&mut self) {
        if self.status != RoomStatus::RoundActive {
            return;
        }
        let Some(round) = self.rounds.last() else {
            return;
        };
        let mut connected = self
            .players
            .iter()
            .filter(|p| p.connection.is_some())
            .peekable();
        if connected.peek().is_none() {
            return;
        }
        if connected.all(|p| round.guess_of(p.id).is_some()) {
            self.close_round("all connected players guessed");
        }
    }

    /// The single exit path for an active round: freeze it, reveal the
    /// target and standings, persist, and advance the room state.
    fn close_round(&mut self, reason: &str) {
        if self.status != RoomStatus::RoundActive {
            return;
        }
        self.deadline = None;

        let Some(round) = self.rounds.last_mut() else {
            return;
        };
        round.close();
        let round_index = round.index;
        let target = round.target;

        tracing::info!(
            room_id = %self.room_id,
            round = round_index,
            reason,
            "round ended"
        );

        let standings = self.round_standings();
        let was_last = self.rounds.len() as u32 >= self.config.total_rounds;
        self.status = if was_last {
            RoomStatus::Finished
        } else {
            RoomStatus::RoundScored
        };

        self.registry.broadcast(
            self.room_id,
            &ServerMessage::RoundEnded {
                round_index,
                target,
                standings,
            },
            None,
        );
        self.persist_round();

        if was_last {
            tracing::info!(room_id = %self.room_id, "all rounds played, game finished");
            self.broadcast_game_ended();
        }
    }

    /// Per-round leaderboard: points descending, ties by earlier receipt,
    /// then join order. Members without a guess rank last among equals.
    fn round_standings(&self) -> Vec<RoundStanding> {
        let Some(round) = self.rounds.last() else {
            return Vec::new();
        };

        let mut rows: Vec<(usize, usize, RoundStanding)> = self
            .players
            .iter()
            .enumerate()
            .map(|(join_order, p)| {
                let (receipt, distance, points) =
                    match round.submission_order(p.id) {
                        Some(i) => {
                            let g = &round.guesses[i];
                            (i, Some(g.distance_meters), g.points)
                        }
                        None => (usize::MAX, None, 0),
                    };
                let standing = RoundStanding {
                    player_id: p.id,
                    display_name: p.display_name.clone(),
                    distance_meters: distance,
                    points,
                    total_score: p.score,
                };
                (join_order, receipt, standing)
            })
            .collect();

        rows.sort_by(|(join_a, receipt_a, a), (join_b, receipt_b, b)| {
            b.points
                .cmp(&a.points)
                .then(receipt_a.cmp(receipt_b))
                .then(join_a.cmp(join_b))
        });
        rows.into_iter().map(|(_, _, standing)| standing).collect()
    }

    /// Final leaderboard: total score descending; the stable sort keeps
    /// join order as the tie-break.
    fn final_standings(&self) -> Vec<FinalStanding> {
        let mut players: Vec<&Player> = self.players.iter().collect();
        players.sort_by(|a, b| b.score.cmp(&a.score));
        players
            .into_iter()
            .map(|p| FinalStanding {
                player_id: p.id,
                display_name: p.display_name.clone(),
                total_score: p.score,
            })
            .collect()
    }

    fn broadcast_game_ended(&self) {
        self.registry.broadcast(
            self.room_id,
            &ServerMessage::GameEnded {
                standings: self.final_standings(),
            },
            None,
        );
    }

    /// Hands the latest round to the sink off-task. Failures are logged;
    /// the in-memory game never waits for storage.
    fn persist_round(&self) {
        let Some(round) = self.rounds.last() else {
            return;
        };
        let sink = Arc::clone(&self.sink);
        let room_id = self.room_id;
        let round = round.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.record_round(room_id, round).await {
                tracing::warn!(%room_id, error = %e, "failed to record round");
            }
        });
    }

    fn persist_guess(&self, round_index: u32, guess: crate::Guess) {
        let sink = Arc::clone(&self.sink);
        let room_id = self.room_id;
        tokio::spawn(async move {
            if let Err(e) = sink.record_guess(room_id, round_index, guess).await {
                tracing::warn!(%room_id, error = %e, "failed to record guess");
            }
        });
    }

    fn position(&self, player_id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connection.is_some()).count()
    }

    fn info(&self) -> RoomInfo {
        let idle_for = self.idle_since.map(|t| t.elapsed());
        RoomInfo {
            room_id: self.room_id,
            owner: self.owner,
            status: self.status,
            player_count: self.players.len(),
            connected_count: self.connected_count(),
            rounds_played: self.rounds.len() as u32,
            current_round_index: (self.rounds.len() as u32).checked_sub(1),
            idle_for,
            idle_expired: idle_for.is_some_and(|d| d >= self.config.idle_grace),
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// `channel_size` bounds the command queue; senders wait when it fills,
/// which back-pressures a flooding client instead of growing memory.
pub(crate) fn spawn_room<T: TargetProvider, S: PersistenceSink>(
    room_id: RoomId,
    owner: PlayerId,
    config: RoomConfig,
    registry: Arc<ConnectionRegistry>,
    targets: Arc<T>,
    sink: Arc<S>,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        room_id,
        owner,
        status: RoomStatus::Lobby,
        config,
        players: Vec::new(),
        rounds: Vec::new(),
        deadline: None,
        // A freshly created room has nobody connected yet; the idle clock
        // runs until the first join.
        idle_since: Some(Instant::now()),
        registry,
        targets,
        sink,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
