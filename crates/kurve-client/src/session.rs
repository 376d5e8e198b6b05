use kurve_core::net::messages::{JoinedRoom, ServerMessage};
use kurve_core::player::Player;
use kurve_core::room::RoomState;

use crate::reconcile::{ClientGame, ReconcileConfig};
use crate::trail::TrailCanvas;

/// Everything a client knows about the room it sits in.
///
/// Built from the join response, then kept current by feeding it every
/// server message in arrival order.
pub struct ClientSession {
    nickname: String,
    room_id: String,
    state: RoomState,
    round: u32,
    score_limit: u32,
    players: Vec<Player>,
    countdown: Option<u32>,
    round_winner: Option<String>,
    game_winner: Option<String>,
    game: ClientGame,
}

impl ClientSession {
    pub fn new(nickname: impl Into<String>, joined: JoinedRoom) -> Self {
        Self::with_config(nickname, joined, ReconcileConfig::default())
    }

    pub fn with_config(
        nickname: impl Into<String>,
        joined: JoinedRoom,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            room_id: joined.room_id,
            state: joined.state,
            round: joined.round,
            score_limit: joined.score_limit,
            players: joined.players,
            countdown: None,
            round_winner: None,
            game_winner: None,
            game: ClientGame::with_config(joined.width, joined.height, config),
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
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

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, nickname: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.nickname == nickname)
    }

    /// Seconds left on the countdown currently shown, if any.
    pub fn countdown(&self) -> Option<u32> {
        self.countdown
    }

    pub fn round_winner(&self) -> Option<&str> {
        self.round_winner.as_deref()
    }

    pub fn game_winner(&self) -> Option<&str> {
        self.game_winner.as_deref()
    }

    pub fn game(&self) -> &ClientGame {
        &self.game
    }

    /// Players ordered by score, highest first. Ties keep join order.
    pub fn standings(&self) -> Vec<&Player> {
        let mut ranked: Vec<&Player> = self.players.iter().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    /// Fold one server message into the session.
    pub fn handle(&mut self, msg: ServerMessage, canvas: &mut impl TrailCanvas) {
        match msg {
            ServerMessage::JoinRoomResponse(_) => {
                tracing::debug!(room = %self.room_id, "Ignoring JoinRoomResponse after join");
            },
            ServerMessage::PlayerJoined(m) => {
                if self.player(&m.player.nickname).is_none() {
                    self.players.push(m.player);
                }
            },
            ServerMessage::PlayerLeft(m) => {
                let nickname = m.player.nickname;
                self.players.retain(|p| p.nickname != nickname);
                self.game.set_player_dead(&nickname);
            },
            ServerMessage::RoundStarting(m) => {
                if self.state == RoomState::Postgame {
                    // The server zeroes the scoreboard when a finished game
                    // rolls over into a new one.
                    self.clear_scores();
                    self.game_winner = None;
                }
                self.state = m.state;
                self.countdown = Some(m.countdown);
                for player in &mut self.players {
                    player.is_dead = false;
                }
            },
            ServerMessage::Countdown(m) => self.countdown = Some(m.seconds_left),
            ServerMessage::RoundStarted(m) => {
                self.state = m.state;
                self.round = m.round;
                self.score_limit = m.score_limit;
                self.countdown = None;
                self.round_winner = None;
                for player in &mut self.players {
                    player.is_playing = true;
                    player.is_dead = false;
                }
                self.game.start(&self.players, canvas);
            },
            ServerMessage::PlayerDead(m) => {
                if let Some(player) = self.player_mut(&m.nickname) {
                    player.is_dead = true;
                    player.score += m.points;
                }
                self.game.set_player_dead(&m.nickname);
            },
            ServerMessage::RoundEnded(m) => {
                self.state = m.state;
                if let Some(player) = self.player_mut(&m.winner) {
                    player.score += m.points;
                }
                self.round_winner = Some(m.winner);
                self.game.stop();
            },
            ServerMessage::GameEnded(m) => {
                self.state = m.state;
                self.game_winner = Some(m.winner);
            },
            ServerMessage::Reset(m) => {
                self.state = m.state;
                self.clear_scores();
                self.countdown = None;
                self.round_winner = None;
                self.game_winner = None;
                self.game.stop();
            },
            ServerMessage::Snapshot(m) => self.game.apply_snapshot(&m.curves, canvas),
        }
    }

    /// Advance local prediction by one render frame.
    pub fn advance(&mut self, dt: f32, canvas: &mut impl TrailCanvas) {
        self.game.advance(dt, canvas);
    }

    fn player_mut(&mut self, nickname: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.nickname == nickname)
    }

    fn clear_scores(&mut self) {
        self.round = 0;
        for player in &mut self.players {
            player.score = 0;
            player.is_playing = false;
            player.is_dead = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trail::RecordingCanvas;
    use kurve_core::net::messages::{
        CountdownMsg, GameEndedMsg, PlayerDeadMsg, PlayerJoinedMsg, PlayerLeftMsg, ResetMsg,
        RoundEndedMsg, RoundStartedMsg, RoundStartingMsg, SnapshotMsg,
    };
    use kurve_core::player::PlayerColor;
    use kurve_core::simulation::{CurveSnapshot, Snapshot};

    fn player(nickname: &str, color: usize) -> Player {
        Player::new(nickname, PlayerColor::PALETTE[color])
    }

    fn session() -> ClientSession {
        ClientSession::new(
            "Alice",
            JoinedRoom {
                room_id: "room1".to_string(),
                state: RoomState::Pregame,
                round: 0,
                score_limit: 0,
                width: 770.0,
                height: 480.0,
                players: vec![player("Alice", 0)],
            },
        )
    }

    fn joined(session: &mut ClientSession, canvas: &mut RecordingCanvas, nickname: &str) {
        let color = session.players().len();
        session.handle(
            ServerMessage::PlayerJoined(PlayerJoinedMsg {
                player: player(nickname, color),
            }),
            canvas,
        );
    }

    fn round_started(session: &mut ClientSession, canvas: &mut RecordingCanvas, round: u32) {
        session.handle(
            ServerMessage::RoundStarted(RoundStartedMsg {
                state: RoomState::Round,
                round,
                score_limit: 10,
            }),
            canvas,
        );
    }

    #[test]
    fn roster_tracks_joins_and_leaves() {
        let mut canvas = RecordingCanvas::new();
        let mut s = session();
        // Our own PlayerJoined follows the join response; no duplicate.
        joined(&mut s, &mut canvas, "Alice");
        joined(&mut s, &mut canvas, "Bob");
        assert_eq!(s.players().len(), 2);

        s.handle(
            ServerMessage::PlayerLeft(PlayerLeftMsg {
                player: player("Bob", 1),
            }),
            &mut canvas,
        );
        assert_eq!(s.players().len(), 1);
        assert!(s.player("Bob").is_none());
    }

    #[test]
    fn countdown_then_round_start() {
        let mut canvas = RecordingCanvas::new();
        let mut s = session();
        joined(&mut s, &mut canvas, "Bob");

        s.handle(
            ServerMessage::RoundStarting(RoundStartingMsg {
                state: RoomState::Preround,
                countdown: 5,
            }),
            &mut canvas,
        );
        assert_eq!(s.state(), RoomState::Preround);
        assert_eq!(s.countdown(), Some(5));

        s.handle(ServerMessage::Countdown(CountdownMsg { seconds_left: 2 }), &mut canvas);
        assert_eq!(s.countdown(), Some(2));

        round_started(&mut s, &mut canvas, 1);
        assert_eq!(s.state(), RoomState::Round);
        assert_eq!(s.round(), 1);
        assert_eq!(s.score_limit(), 10);
        assert_eq!(s.countdown(), None);
        assert!(s.game().is_running());
        assert_eq!(s.game().curves().len(), 2);
        assert!(s.players().iter().all(|p| p.is_playing));
        assert_eq!(canvas.clears(), 1);
    }

    #[test]
    fn deaths_and_round_end_score() {
        let mut canvas = RecordingCanvas::new();
        let mut s = session();
        joined(&mut s, &mut canvas, "Bob");
        joined(&mut s, &mut canvas, "Carol");
        round_started(&mut s, &mut canvas, 1);

        s.handle(
            ServerMessage::PlayerDead(PlayerDeadMsg {
                nickname: "Bob".to_string(),
                points: 1,
            }),
            &mut canvas,
        );
        s.handle(
            ServerMessage::PlayerDead(PlayerDeadMsg {
                nickname: "Carol".to_string(),
                points: 2,
            }),
            &mut canvas,
        );
        s.handle(
            ServerMessage::RoundEnded(RoundEndedMsg {
                state: RoomState::Round,
                winner: "Alice".to_string(),
                points: 3,
            }),
            &mut canvas,
        );

        assert!(s.player("Bob").unwrap().is_dead);
        assert!(s.game().curve("Carol").unwrap().is_dead);
        assert!(!s.game().is_running());
        assert_eq!(s.round_winner(), Some("Alice"));
        let scores: Vec<(&str, u32)> = s
            .standings()
            .iter()
            .map(|p| (p.nickname.as_str(), p.score))
            .collect();
        assert_eq!(scores, vec![("Alice", 3), ("Carol", 2), ("Bob", 1)]);
    }

    #[test]
    fn snapshots_reach_the_game() {
        let mut canvas = RecordingCanvas::new();
        let mut s = session();
        joined(&mut s, &mut canvas, "Bob");
        round_started(&mut s, &mut canvas, 1);

        let curves = Snapshot::from([(
            "Bob".to_string(),
            CurveSnapshot {
                x: 40.0,
                y: 60.0,
                heading: 180.0,
                thickness: 3.0,
                speed: 88.0,
                steer_rate: 245.0,
                gap: false,
                gap_line: None,
            },
        )]);
        s.handle(ServerMessage::Snapshot(SnapshotMsg { curves }), &mut canvas);
        assert!(s.game().curve("Bob").unwrap().is_observed());

        s.advance(0.1, &mut canvas);
        assert_eq!(canvas.strokes().len(), 1);
    }

    #[test]
    fn game_over_rolls_into_fresh_scores() {
        let mut canvas = RecordingCanvas::new();
        let mut s = session();
        joined(&mut s, &mut canvas, "Bob");
        round_started(&mut s, &mut canvas, 7);
        s.handle(
            ServerMessage::RoundEnded(RoundEndedMsg {
                state: RoomState::Round,
                winner: "Alice".to_string(),
                points: 2,
            }),
            &mut canvas,
        );
        s.handle(
            ServerMessage::GameEnded(GameEndedMsg {
                state: RoomState::Postgame,
                winner: "Alice".to_string(),
            }),
            &mut canvas,
        );
        assert_eq!(s.game_winner(), Some("Alice"));
        assert_eq!(s.state(), RoomState::Postgame);

        s.handle(
            ServerMessage::RoundStarting(RoundStartingMsg {
                state: RoomState::Preround,
                countdown: 5,
            }),
            &mut canvas,
        );
        assert_eq!(s.game_winner(), None);
        assert_eq!(s.round(), 0);
        assert!(s.players().iter().all(|p| p.score == 0));
    }

    #[test]
    fn reset_clears_scores_and_stops() {
        let mut canvas = RecordingCanvas::new();
        let mut s = session();
        joined(&mut s, &mut canvas, "Bob");
        round_started(&mut s, &mut canvas, 2);
        s.handle(
            ServerMessage::PlayerDead(PlayerDeadMsg {
                nickname: "Bob".to_string(),
                points: 1,
            }),
            &mut canvas,
        );

        s.handle(
            ServerMessage::Reset(ResetMsg {
                state: RoomState::Pregame,
            }),
            &mut canvas,
        );
        assert_eq!(s.state(), RoomState::Pregame);
        assert_eq!(s.round(), 0);
        assert!(!s.game().is_running());
        assert!(
            s.players()
                .iter()
                .all(|p| p.score == 0 && !p.is_playing && !p.is_dead)
        );
    }
}
