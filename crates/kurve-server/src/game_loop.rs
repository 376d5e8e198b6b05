use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use kurve_core::curve::SteerSide;
use kurve_core::net::messages::{JoinedRoom, ServerMessage};
use kurve_core::net::protocol::encode_server_message;
use kurve_core::room::{JoinError, Room, RoomSummary};

/// Per-player sender for outbound WebSocket binary messages.
/// Bounded so a slow client cannot grow memory without limit.
/// Uses `Bytes` for zero-copy cloning when broadcasting to multiple players.
pub type PlayerSender = mpsc::Sender<Bytes>;

/// Commands sent from connections to a room task.
///
/// `conn_id` identifies the connection that owns a nickname, so a stale
/// connection cannot act on a player who has since rejoined elsewhere.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        nickname: String,
        conn_id: u64,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<JoinedRoom, JoinError>>,
    },
    Leave {
        nickname: String,
        conn_id: u64,
    },
    Steer {
        nickname: String,
        conn_id: u64,
        side: SteerSide,
        pressed: bool,
    },
    Status {
        reply: oneshot::Sender<RoomSummary>,
    },
    Stop,
}

struct Member {
    conn_id: u64,
    sender: PlayerSender,
}

/// Timers for the room's current phase. Rebuilt whenever the room's epoch
/// moves, which drops any interval armed for a phase that has ended.
struct PhaseTimers {
    countdown: Option<Interval>,
    tick: Option<Interval>,
    snapshot: Option<Interval>,
}

impl PhaseTimers {
    fn for_room(room: &Room) -> Self {
        let game = room.game_config();
        let simulating = room.is_simulating();
        Self {
            countdown: room
                .countdown_active()
                .then(|| delayed_interval(Duration::from_secs(1))),
            tick: simulating.then(|| delayed_interval(Duration::from_secs_f32(game.tick_dt()))),
            snapshot: simulating.then(|| {
                delayed_interval(Duration::from_secs_f32(1.0 / game.snapshot_rate_hz))
            }),
        }
    }
}

/// An interval whose first tick is one full period away.
fn delayed_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Wait for the next tick of an optional interval; never resolves for `None`.
async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        },
        None => std::future::pending::<()>().await,
    }
}

/// Spawn the task that owns `room`. Returns its command sender and handle.
pub fn spawn_room(room: Room) -> (mpsc::UnboundedSender<RoomCommand>, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_room(room, cmd_rx));
    (cmd_tx, handle)
}

/// The room's event loop. All room state lives here; nothing is shared.
async fn run_room(mut room: Room, mut cmd_rx: mpsc::UnboundedReceiver<RoomCommand>) {
    let mut members: HashMap<String, Member> = HashMap::new();
    let mut timers = PhaseTimers::for_room(&room);
    let mut epoch = room.epoch();

    tracing::info!(room = %room.id(), "Room task started");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(RoomCommand::Stop) | None => break,
                Some(cmd) => handle_command(&mut room, &mut members, cmd),
            },
            _ = next_tick(&mut timers.countdown) => room.countdown_tick(),
            _ = next_tick(&mut timers.tick) => room.tick(),
            _ = next_tick(&mut timers.snapshot) => room.snapshot(),
        }

        broadcast_events(&mut room, &mut members);

        if room.epoch() != epoch {
            epoch = room.epoch();
            timers = PhaseTimers::for_room(&room);
            tracing::debug!(room = %room.id(), state = %room.state(), "Room timers rebuilt");
        }
    }

    tracing::info!(room = %room.id(), "Room task stopped");
}

fn handle_command(room: &mut Room, members: &mut HashMap<String, Member>, cmd: RoomCommand) {
    match cmd {
        RoomCommand::Join {
            nickname,
            conn_id,
            sender,
            reply,
        } => {
            let result = match room.add_player(&nickname) {
                Ok(_) => {
                    members.insert(nickname.clone(), Member { conn_id, sender });
                    Ok(joined_view(room))
                },
                Err(e) => {
                    tracing::debug!(room = %room.id(), nickname = %nickname, error = %e, "Join refused");
                    Err(e)
                },
            };
            if reply.send(result).is_err() {
                // The connection went away while waiting; undo the join.
                if members.remove(&nickname).is_some() {
                    room.remove_player(&nickname);
                }
            }
        },
        RoomCommand::Leave { nickname, conn_id } => {
            if members.get(&nickname).is_some_and(|m| m.conn_id == conn_id) {
                members.remove(&nickname);
                room.remove_player(&nickname);
            }
        },
        RoomCommand::Steer {
            nickname,
            conn_id,
            side,
            pressed,
        } => {
            if members.get(&nickname).is_some_and(|m| m.conn_id == conn_id) {
                room.set_steering(&nickname, side, pressed);
            }
        },
        RoomCommand::Status { reply } => {
            let _ = reply.send(room.summary());
        },
        RoomCommand::Stop => {},
    }
}

fn joined_view(room: &Room) -> JoinedRoom {
    let game = room.game_config();
    JoinedRoom {
        room_id: room.id().to_string(),
        state: room.state(),
        round: room.round(),
        score_limit: room.score_limit(),
        width: game.arena_width,
        height: game.arena_height,
        players: room.players().to_vec(),
    }
}

/// Encode each pending room event once and fan it out to every member.
///
/// Snapshots are volatile: a member whose channel is full misses that one.
/// Any other frame that cannot be queued evicts the member, which counts as
/// a leave, so this runs until the room's outbox stays empty. The room never
/// waits on a client.
fn broadcast_events(room: &mut Room, members: &mut HashMap<String, Member>) {
    loop {
        let events = room.drain_events();
        if events.is_empty() {
            return;
        }
        for event in events {
            let msg = ServerMessage::from(event);
            let volatile = matches!(msg, ServerMessage::Snapshot(_));
            let data = match encode_server_message(&msg) {
                Ok(data) => Bytes::from(data),
                Err(e) => {
                    tracing::error!(room = %room.id(), error = %e, "Failed to encode room event");
                    continue;
                },
            };

            let mut evicted = Vec::new();
            for (nickname, member) in members.iter() {
                match member.sender.try_send(data.clone()) {
                    Ok(()) => {},
                    Err(e) if volatile => {
                        tracing::debug!(
                            room = %room.id(), nickname = %nickname, error = %e,
                            "Skipping snapshot for slow client"
                        );
                    },
                    Err(e) => {
                        tracing::warn!(
                            room = %room.id(), nickname = %nickname, error = %e,
                            "Evicting client that missed a room event"
                        );
                        evicted.push(nickname.clone());
                    },
                }
            }
            // Dropping the member drops its sender, which ends the
            // connection's writer.
            for nickname in evicted {
                members.remove(&nickname);
                room.remove_player(&nickname);
            }
        }
    }
}
