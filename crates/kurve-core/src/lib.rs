pub mod config;
pub mod curve;
pub mod grid;
pub mod net;
pub mod player;
pub mod room;
pub mod simulation;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::config::GameConfig;
    use crate::room::{Room, RoomConfig, RoomEvent};

    /// `"Player1"` through `"Player{n}"`.
    pub fn nicknames(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("Player{i}")).collect()
    }

    /// Deterministic RNG for spawn positions.
    pub fn seeded_rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    /// A room with default tuning and a fixed spawn seed.
    pub fn make_room(id: &str) -> Room {
        Room::with_rng(
            id,
            RoomConfig::default(),
            GameConfig::default(),
            seeded_rng(11),
        )
    }

    /// Join `n` players named by [`nicknames`] and discard the resulting events.
    pub fn fill_room(room: &mut Room, n: usize) {
        for name in nicknames(n) {
            if let Err(e) = room.add_player(&name) {
                panic!("join {name} failed: {e}");
            }
        }
        room.drain_events();
    }

    /// Run countdown ticks until the round starts, returning every event seen.
    pub fn run_countdown(room: &mut Room) -> Vec<RoomEvent> {
        let mut events = Vec::new();
        for _ in 0..=room.config().round_countdown_secs {
            if room.is_simulating() {
                break;
            }
            room.countdown_tick();
            events.extend(room.drain_events());
        }
        events
    }
}
