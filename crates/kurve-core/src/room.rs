use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::curve::SteerSide;
use crate::player::{ColorPool, Player, PlayerColor};
use crate::simulation::{GameSimulation, SimEvent, Snapshot};

/// Per-room limits and lifecycle timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub max_players: usize,
    /// Players needed before a countdown starts.
    pub min_players: usize,
    pub round_countdown_secs: u32,
    pub game_over_countdown_secs: u32,
    /// Longest accepted nickname, in characters.
    pub max_nickname_len: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 6,
            min_players: 2,
            round_countdown_secs: 5,
            game_over_countdown_secs: 10,
            max_nickname_len: 20,
        }
    }
}

impl RoomConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_players > PlayerColor::PALETTE.len() {
            return Err(format!(
                "rooms.max_players must be <= {} (one color per player)",
                PlayerColor::PALETTE.len()
            ));
        }
        if self.min_players < 2 {
            return Err("rooms.min_players must be >= 2".to_string());
        }
        if self.max_players < self.min_players {
            return Err("rooms.max_players must be >= rooms.min_players".to_string());
        }
        if self.round_countdown_secs == 0 || self.game_over_countdown_secs == 0 {
            return Err("rooms countdowns must be >= 1 second".to_string());
        }
        if self.max_nickname_len == 0 {
            return Err("rooms.max_nickname_len must be > 0".to_string());
        }
        Ok(())
    }
}

/// Lifecycle phase of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomState {
    /// Waiting for enough players.
    Pregame,
    /// Counting down to the next round.
    Preround,
    Round,
    /// Someone reached the score limit; counting down to a fresh game.
    Postgame,
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pregame => "pregame",
            Self::Preround => "preround",
            Self::Round => "round",
            Self::Postgame => "postgame",
        };
        f.write_str(s)
    }
}

/// Why a join was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    RoomNotFound(String),
    NicknameTaken(String),
    RoomFull(String),
    NicknameTooLong(usize),
    NicknameEmpty,
}

impl std::fmt::Display for JoinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoomNotFound(id) => write!(f, "Room {id} does not exist"),
            Self::NicknameTaken(name) => write!(f, "Nickname {name} is already in use"),
            Self::RoomFull(id) => write!(f, "Room {id} is full"),
            Self::NicknameTooLong(max) => {
                write!(f, "Nickname must be at most {max} characters")
            },
            Self::NicknameEmpty => write!(f, "Nickname must not be empty"),
        }
    }
}

impl std::error::Error for JoinError {}

/// Something every member of a room must hear about. Lifecycle variants
/// carry the room state as it was when the event happened.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    PlayerJoined(Player),
    PlayerLeft(Player),
    RoundStarting {
        state: RoomState,
        countdown: u32,
    },
    Countdown {
        seconds_left: u32,
    },
    RoundStarted {
        state: RoomState,
        round: u32,
        score_limit: u32,
    },
    PlayerDead {
        nickname: String,
        points: u32,
    },
    RoundEnded {
        state: RoomState,
        winner: String,
        points: u32,
    },
    GameEnded {
        state: RoomState,
        winner: String,
    },
    Reset {
        state: RoomState,
    },
    Snapshot(Snapshot),
}

/// Public view of a room, for listings and join responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub state: RoomState,
    pub round: u32,
    pub score_limit: u32,
    pub max_players: usize,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountdownKind {
    Round,
    GameOver,
}

#[derive(Debug, Clone, Copy)]
struct Countdown {
    kind: CountdownKind,
    remaining: u32,
}

/// One named room: roster, scores, lifecycle, and the simulation.
///
/// A room is driven entirely from outside. The runtime calls
/// [`countdown_tick`](Room::countdown_tick) once a second while
/// [`countdown_active`](Room::countdown_active) holds, and
/// [`tick`](Room::tick) / [`snapshot`](Room::snapshot) on their own
/// intervals while [`is_simulating`](Room::is_simulating) holds. Each of
/// these is a no-op outside its phase, so a late timer firing after a
/// transition does nothing. [`epoch`](Room::epoch) changes on every phase
/// transition; the runtime rebuilds its timers whenever it moves.
///
/// Results accumulate in an outbox read with
/// [`drain_events`](Room::drain_events).
pub struct Room {
    id: String,
    config: RoomConfig,
    players: Vec<Player>,
    colors: ColorPool,
    state: RoomState,
    round: u32,
    score_limit: u32,
    players_at_round_start: usize,
    countdown: Option<Countdown>,
    simulation: GameSimulation,
    rng: StdRng,
    epoch: u64,
    outbox: Vec<RoomEvent>,
}

impl Room {
    pub fn new(id: impl Into<String>, config: RoomConfig, game: GameConfig) -> Self {
        let rng = StdRng::from_rng(&mut rand::rng());
        Self::with_rng(id, config, game, rng)
    }

    pub fn with_rng(
        id: impl Into<String>,
        config: RoomConfig,
        game: GameConfig,
        rng: StdRng,
    ) -> Self {
        let colors = ColorPool::new(config.max_players);
        Self {
            id: id.into(),
            config,
            players: Vec::new(),
            colors,
            state: RoomState::Pregame,
            round: 0,
            score_limit: 0,
            players_at_round_start: 0,
            countdown: None,
            simulation: GameSimulation::new(game),
            rng,
            epoch: 0,
            outbox: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn game_config(&self) -> &GameConfig {
        self.simulation.config()
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn score_limit(&self) -> u32 {
        self.score_limit
    }

    /// Roster in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, nickname: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.nickname == nickname)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.config.max_players
    }

    pub fn colors(&self) -> &ColorPool {
        &self.colors
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn countdown_active(&self) -> bool {
        self.countdown.is_some()
    }

    /// Seconds left on the running countdown, if any.
    pub fn countdown_remaining(&self) -> Option<u32> {
        self.countdown.map(|c| c.remaining)
    }

    pub fn is_simulating(&self) -> bool {
        self.state == RoomState::Round && self.simulation.is_running()
    }

    pub fn simulation(&self) -> &GameSimulation {
        &self.simulation
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.id.clone(),
            state: self.state,
            round: self.round,
            score_limit: self.score_limit,
            max_players: self.config.max_players,
            players: self.players.clone(),
        }
    }

    /// Take everything emitted since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<RoomEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Enroll a player. Late joiners sit out the round in progress and play
    /// from the next one.
    pub fn add_player(&mut self, nickname: &str) -> Result<Player, JoinError> {
        if nickname.trim().is_empty() {
            return Err(JoinError::NicknameEmpty);
        }
        if self.player(nickname).is_some() {
            return Err(JoinError::NicknameTaken(nickname.to_string()));
        }
        if self.is_full() {
            return Err(JoinError::RoomFull(self.id.clone()));
        }
        if nickname.chars().count() > self.config.max_nickname_len {
            return Err(JoinError::NicknameTooLong(self.config.max_nickname_len));
        }
        let color = self
            .colors
            .take()
            .ok_or_else(|| JoinError::RoomFull(self.id.clone()))?;

        let player = Player::new(nickname, color);
        self.players.push(player.clone());
        self.outbox.push(RoomEvent::PlayerJoined(player.clone()));
        tracing::info!(
            room = %self.id,
            nickname,
            players = self.players.len(),
            "Player joined room"
        );

        if self.state == RoomState::Pregame && self.players.len() >= self.config.min_players {
            self.start_preround();
        }
        Ok(player)
    }

    /// Drop a player, returning their color to the pool. Falling below the
    /// minimum outside pregame resets the room. A round left with no curve
    /// alive goes back to preround without awarding points.
    pub fn remove_player(&mut self, nickname: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.nickname == nickname)?;
        let player = self.players.remove(index);
        self.colors.give_back(player.color);
        self.simulation.remove_curve(nickname);
        self.outbox.push(RoomEvent::PlayerLeft(player.clone()));
        tracing::info!(
            room = %self.id,
            nickname,
            players = self.players.len(),
            "Player left room"
        );

        if self.players.len() < self.config.min_players && self.state != RoomState::Pregame {
            self.reset();
        } else if self.state == RoomState::Round && self.simulation.alive_count() == 0 {
            // Only late joiners remain; nobody can win this round.
            self.simulation.stop();
            tracing::info!(
                room = %self.id,
                round = self.round,
                "Round abandoned without survivors"
            );
            self.start_preround();
        }
        Some(player)
    }

    /// Forward a steering change. Ignored outside a round.
    pub fn set_steering(&mut self, nickname: &str, side: SteerSide, pressed: bool) {
        if self.state == RoomState::Round {
            self.simulation.set_steering(nickname, side, pressed);
        }
    }

    /// Advance the running countdown by one second.
    pub fn countdown_tick(&mut self) {
        let Some(countdown) = self.countdown.as_mut() else {
            return;
        };
        countdown.remaining = countdown.remaining.saturating_sub(1);
        if countdown.remaining > 0 {
            let seconds_left = countdown.remaining;
            self.outbox.push(RoomEvent::Countdown { seconds_left });
            return;
        }

        let kind = countdown.kind;
        self.countdown = None;
        match kind {
            CountdownKind::Round => self.begin_round(),
            CountdownKind::GameOver => {
                for player in &mut self.players {
                    player.score = 0;
                    player.is_playing = false;
                }
                self.round = 0;
                self.start_preround();
            },
        }
    }

    /// Advance the simulation one step and settle deaths and the winner.
    pub fn tick(&mut self) {
        if !self.is_simulating() {
            return;
        }
        for event in self.simulation.tick() {
            match event {
                SimEvent::PlayerDead {
                    nickname,
                    alive_after,
                } => {
                    let points = self.players_at_round_start.saturating_sub(alive_after) as u32;
                    if let Some(player) = self.players.iter_mut().find(|p| p.nickname == nickname) {
                        player.is_dead = true;
                        player.score += points;
                    }
                    tracing::debug!(room = %self.id, nickname = %nickname, points, "Player died");
                    self.outbox.push(RoomEvent::PlayerDead { nickname, points });
                },
                SimEvent::Winner { nickname } => self.end_round(nickname),
            }
        }
    }

    /// Queue a snapshot of every curve. Ignored outside a running round.
    pub fn snapshot(&mut self) {
        if !self.is_simulating() {
            return;
        }
        let snapshot = self.simulation.snapshot();
        self.outbox.push(RoomEvent::Snapshot(snapshot));
    }

    fn start_preround(&mut self) {
        for player in &mut self.players {
            player.is_dead = false;
        }
        let countdown = self.config.round_countdown_secs;
        self.state = RoomState::Preround;
        self.countdown = Some(Countdown {
            kind: CountdownKind::Round,
            remaining: countdown,
        });
        self.bump_epoch();
        self.outbox.push(RoomEvent::RoundStarting {
            state: self.state,
            countdown,
        });
    }

    fn begin_round(&mut self) {
        for player in &mut self.players {
            player.is_dead = false;
            player.is_playing = true;
        }
        let nicknames: Vec<String> = self.players.iter().map(|p| p.nickname.clone()).collect();
        self.players_at_round_start = nicknames.len();
        let opponents = nicknames.len().saturating_sub(1) as u32;
        self.score_limit = self.simulation.config().score_limit_per_opponent * opponents;
        self.round += 1;
        self.simulation.start(&nicknames, &mut self.rng);
        self.state = RoomState::Round;
        self.bump_epoch();
        tracing::info!(
            room = %self.id,
            round = self.round,
            players = self.players_at_round_start,
            score_limit = self.score_limit,
            "Round started"
        );
        self.outbox.push(RoomEvent::RoundStarted {
            state: self.state,
            round: self.round,
            score_limit: self.score_limit,
        });
    }

    fn end_round(&mut self, winner: String) {
        self.simulation.stop();
        let points = self.players_at_round_start as u32;
        if let Some(player) = self.players.iter_mut().find(|p| p.nickname == winner) {
            player.score += points;
        }
        tracing::info!(room = %self.id, round = self.round, winner = %winner, points, "Round ended");
        self.outbox.push(RoomEvent::RoundEnded {
            state: self.state,
            winner,
            points,
        });

        let top = self.players.iter().map(|p| p.score).max().unwrap_or(0);
        let mut leaders = self.players.iter().filter(|p| p.score == top);
        let champion = match (leaders.next(), leaders.next()) {
            (Some(only), None) if top >= self.score_limit => Some(only.nickname.clone()),
            _ => None,
        };

        match champion {
            Some(winner) => {
                self.state = RoomState::Postgame;
                self.countdown = Some(Countdown {
                    kind: CountdownKind::GameOver,
                    remaining: self.config.game_over_countdown_secs,
                });
                self.bump_epoch();
                tracing::info!(room = %self.id, winner = %winner, score = top, "Game ended");
                self.outbox.push(RoomEvent::GameEnded {
                    state: self.state,
                    winner,
                });
            },
            None => self.start_preround(),
        }
    }

    fn reset(&mut self) {
        self.simulation.stop();
        self.countdown = None;
        for player in &mut self.players {
            player.score = 0;
            player.is_playing = false;
            player.is_dead = false;
        }
        self.round = 0;
        self.players_at_round_start = 0;
        self.state = RoomState::Pregame;
        self.bump_epoch();
        tracing::info!(room = %self.id, "Room reset, waiting for players");
        self.outbox.push(RoomEvent::Reset { state: self.state });
    }

    fn bump_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Room {
    pub fn simulation_mut(&mut self) -> &mut GameSimulation {
        &mut self.simulation
    }

    pub fn player_mut(&mut self, nickname: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.nickname == nickname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{fill_room, make_room, nicknames, run_countdown};

    /// Spread curves apart so nothing dies by accident.
    fn park_all(room: &mut Room) {
        let names: Vec<String> = room.players().iter().map(|p| p.nickname.clone()).collect();
        for (i, name) in names.iter().enumerate() {
            let y = 40.0 + 60.0 * i as f32;
            room.simulation_mut().place_curve(name, 100.0, y, 90.0);
        }
    }

    fn kill(room: &mut Room, nickname: &str) -> Vec<RoomEvent> {
        room.simulation_mut().block_next_cell(nickname);
        room.tick();
        room.drain_events()
    }

    fn in_round(n: usize) -> Room {
        let mut room = make_room("room1");
        fill_room(&mut room, n);
        run_countdown(&mut room);
        assert_eq!(room.state(), RoomState::Round);
        park_all(&mut room);
        room.drain_events();
        room
    }

    #[test]
    fn new_room_is_empty_pregame() {
        let room = make_room("room1");
        assert_eq!(room.state(), RoomState::Pregame);
        assert_eq!(room.player_count(), 0);
        assert_eq!(room.colors().len(), 6);
        assert_eq!(room.round(), 0);
        assert!(!room.countdown_active());
    }

    #[test]
    fn first_player_gets_red_and_waits() {
        let mut room = make_room("room1");
        let player = room.add_player("Alice").unwrap();
        assert_eq!(player.color.to_hex(), "#ff0000");
        assert_eq!(player.score, 0);
        assert_eq!(room.state(), RoomState::Pregame);
        assert_eq!(room.drain_events(), vec![RoomEvent::PlayerJoined(player)]);
    }

    #[test]
    fn second_player_starts_countdown() {
        let mut room = make_room("room1");
        room.add_player("Alice").unwrap();
        let bob = room.add_player("Bob").unwrap();
        assert_eq!(bob.color.to_hex(), "#00ff00");
        assert_eq!(room.state(), RoomState::Preround);
        let events = room.drain_events();
        assert_eq!(
            events.last(),
            Some(&RoomEvent::RoundStarting {
                state: RoomState::Preround,
                countdown: 5,
            })
        );
    }

    #[test]
    fn countdown_reaches_round() {
        let mut room = make_room("room1");
        fill_room(&mut room, 2);
        let epoch = room.epoch();

        let events = run_countdown(&mut room);
        let seconds: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                RoomEvent::Countdown { seconds_left } => Some(*seconds_left),
                _ => None,
            })
            .collect();
        assert_eq!(seconds, vec![4, 3, 2, 1]);
        assert_eq!(
            events.last(),
            Some(&RoomEvent::RoundStarted {
                state: RoomState::Round,
                round: 1,
                score_limit: 10,
            })
        );
        assert!(room.is_simulating());
        assert!(!room.countdown_active());
        assert_ne!(room.epoch(), epoch);
        assert!(room.players().iter().all(|p| p.is_playing));
    }

    #[test]
    fn duplicate_nickname_rejected() {
        let mut room = make_room("room1");
        room.add_player("Alice").unwrap();
        assert_eq!(
            room.add_player("Alice"),
            Err(JoinError::NicknameTaken("Alice".to_string()))
        );
    }

    #[test]
    fn nickname_length_limit() {
        let mut room = make_room("room1");
        assert!(room.add_player(&"a".repeat(20)).is_ok());
        assert_eq!(
            room.add_player(&"b".repeat(21)),
            Err(JoinError::NicknameTooLong(20))
        );
        assert_eq!(room.add_player("  "), Err(JoinError::NicknameEmpty));
    }

    #[test]
    fn full_room_rejects_join() {
        let mut room = make_room("room1");
        fill_room(&mut room, 6);
        assert!(room.colors().is_empty());
        assert_eq!(
            room.add_player("Late"),
            Err(JoinError::RoomFull("room1".to_string()))
        );
    }

    #[test]
    fn leaving_returns_color_to_front() {
        let mut room = make_room("room1");
        fill_room(&mut room, 3);
        let green = room.player("Player2").unwrap().color;
        room.remove_player("Player2").unwrap();
        assert_eq!(room.colors().peek(), Some(green));
        let again = room.add_player("Again").unwrap();
        assert_eq!(again.color, green);
    }

    #[test]
    fn remove_unknown_is_none() {
        let mut room = make_room("room1");
        assert!(room.remove_player("ghost").is_none());
        assert!(room.drain_events().is_empty());
    }

    #[test]
    fn underpopulated_preround_resets_once() {
        let mut room = make_room("room1");
        fill_room(&mut room, 2);
        room.remove_player("Player2");
        let events = room.drain_events();
        let resets = events
            .iter()
            .filter(|e| matches!(e, RoomEvent::Reset { .. }))
            .count();
        assert_eq!(resets, 1);
        assert_eq!(room.state(), RoomState::Pregame);
        assert!(!room.countdown_active());

        room.remove_player("Player1");
        assert!(
            !room
                .drain_events()
                .iter()
                .any(|e| matches!(e, RoomEvent::Reset { .. }))
        );
    }

    #[test]
    fn underpopulated_round_stops_simulation() {
        let mut room = in_round(2);
        room.player_mut("Player1").unwrap().score = 7;
        room.remove_player("Player2");
        assert_eq!(room.state(), RoomState::Pregame);
        assert!(!room.simulation().is_running());
        assert!(!room.is_simulating());
        assert_eq!(room.player("Player1").unwrap().score, 0);
        assert_eq!(room.round(), 0);

        let events = room.drain_events();
        assert!(matches!(events.first(), Some(RoomEvent::PlayerLeft(p)) if p.nickname == "Player2"));
        let resets = events
            .iter()
            .filter(|e| matches!(e, RoomEvent::Reset { .. }))
            .count();
        assert_eq!(resets, 1);
        assert!(room.players().iter().all(|p| p.score == 0));

        // Stale timers are harmless.
        room.tick();
        room.snapshot();
        room.countdown_tick();
        assert!(room.drain_events().is_empty());
    }

    #[test]
    fn round_without_enrolled_players_returns_to_preround() {
        let mut room = make_room("room1");
        fill_room(&mut room, 2);
        run_countdown(&mut room);
        room.add_player("Late1").unwrap();
        room.add_player("Late2").unwrap();
        room.drain_events();

        room.remove_player("Player1");
        assert_eq!(room.state(), RoomState::Round);
        room.remove_player("Player2");
        assert_eq!(room.state(), RoomState::Preround);
        assert!(room.countdown_active());
        assert!(!room.is_simulating());

        let events = room.drain_events();
        assert!(!events.iter().any(|e| matches!(e, RoomEvent::RoundEnded { .. })));
        assert!(matches!(
            events.last(),
            Some(RoomEvent::RoundStarting {
                state: RoomState::Preround,
                ..
            })
        ));

        run_countdown(&mut room);
        assert_eq!(room.state(), RoomState::Round);
        assert_eq!(room.round(), 2);
        assert!(room.simulation().curve("Late1").is_some());
        assert!(room.simulation().curve("Late2").is_some());
    }

    #[test]
    fn scoring_follows_death_order() {
        let mut room = in_round(3);
        assert_eq!(room.score_limit(), 20);

        let events = kill(&mut room, "Player1");
        assert_eq!(
            events,
            vec![RoomEvent::PlayerDead {
                nickname: "Player1".to_string(),
                points: 1,
            }]
        );
        assert!(room.player("Player1").unwrap().is_dead);

        let events = kill(&mut room, "Player2");
        assert_eq!(
            events[0],
            RoomEvent::PlayerDead {
                nickname: "Player2".to_string(),
                points: 2,
            }
        );
        assert_eq!(
            events[1],
            RoomEvent::RoundEnded {
                state: RoomState::Round,
                winner: "Player3".to_string(),
                points: 3,
            }
        );
        assert_eq!(
            events[2],
            RoomEvent::RoundStarting {
                state: RoomState::Preround,
                countdown: 5,
            }
        );

        let total: u32 = room.players().iter().map(|p| p.score).sum();
        assert_eq!(total, 1 + 2 + 3);
        assert_eq!(room.state(), RoomState::Preround);
        assert!(room.players().iter().all(|p| !p.is_dead));
    }

    #[test]
    fn reaching_limit_ends_game_then_restarts() {
        let mut room = in_round(2);
        room.player_mut("Player2").unwrap().score = 9;

        let events = kill(&mut room, "Player1");
        assert!(events.contains(&RoomEvent::GameEnded {
            state: RoomState::Postgame,
            winner: "Player2".to_string(),
        }));
        assert_eq!(room.state(), RoomState::Postgame);
        assert_eq!(room.countdown_remaining(), Some(10));

        for _ in 0..9 {
            room.countdown_tick();
        }
        assert_eq!(room.state(), RoomState::Postgame);
        room.countdown_tick();
        assert_eq!(room.state(), RoomState::Preround);
        assert_eq!(room.round(), 0);
        assert!(room.players().iter().all(|p| p.score == 0));
    }

    #[test]
    fn tie_at_limit_plays_on() {
        let mut room = in_round(2);
        room.player_mut("Player1").unwrap().score = 11;
        room.player_mut("Player2").unwrap().score = 10;

        // Player2 wins 2 points, Player1 gets 1: 12 vs 12.
        let events = kill(&mut room, "Player1");
        assert!(!events.iter().any(|e| matches!(e, RoomEvent::GameEnded { .. })));
        assert_eq!(room.state(), RoomState::Preround);
        assert_eq!(room.player("Player1").unwrap().score, 12);
        assert_eq!(room.player("Player2").unwrap().score, 12);
    }

    #[test]
    fn late_joiner_waits_for_next_round() {
        let mut room = in_round(2);
        let late = room.add_player("Late").unwrap();
        assert!(!late.is_playing);
        assert!(room.simulation().curve("Late").is_none());

        kill(&mut room, "Player1");
        run_countdown(&mut room);
        assert!(room.simulation().curve("Late").is_some());
        assert_eq!(room.score_limit(), 20);
    }

    #[test]
    fn steering_ignored_outside_round() {
        let mut room = make_room("room1");
        fill_room(&mut room, 2);
        room.set_steering("Player1", SteerSide::Left, true);
        run_countdown(&mut room);
        assert!(!room.simulation().curve("Player1").unwrap().steering_left);

        room.set_steering("Player1", SteerSide::Left, true);
        assert!(room.simulation().curve("Player1").unwrap().steering_left);
    }

    #[test]
    fn snapshot_only_during_round() {
        let mut room = make_room("room1");
        fill_room(&mut room, 2);
        room.snapshot();
        assert!(room.drain_events().is_empty());

        run_countdown(&mut room);
        room.snapshot();
        match room.drain_events().as_slice() {
            [RoomEvent::Snapshot(snap)] => {
                for name in nicknames(2) {
                    assert!(snap.contains_key(&name));
                }
            },
            other => panic!("expected one snapshot, got {other:?}"),
        }
    }

    #[test]
    fn leaving_mid_round_hands_win_to_survivor() {
        let mut room = in_round(3);
        room.remove_player("Player1");
        assert_eq!(room.state(), RoomState::Round);
        kill(&mut room, "Player2");
        assert_eq!(room.player("Player3").unwrap().score, 3);
    }

    #[test]
    fn config_validation() {
        assert!(RoomConfig::default().validate().is_ok());
        let too_many = RoomConfig {
            max_players: 9,
            ..RoomConfig::default()
        };
        assert!(too_many.validate().is_err());
        let solo = RoomConfig {
            min_players: 1,
            ..RoomConfig::default()
        };
        assert!(solo.validate().is_err());
    }
}
