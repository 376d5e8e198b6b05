use serde::Deserialize;

use kurve_core::config::GameConfig;
use kurve_core::room::RoomConfig;

/// Top-level server configuration, loaded from `kurve.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub game: GameConfig,
    pub rooms: RoomsConfig,
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            web_root: "web".to_string(),
            game: GameConfig::default(),
            rooms: RoomsConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// The fixed set of rooms. Every room shares the limits in `room`, which
/// sit alongside `names` in the `[rooms]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    /// Room ids, created at startup in this order.
    pub names: Vec<String>,
    #[serde(flatten)]
    pub room: RoomConfig,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            names: vec![
                "room1".to_string(),
                "room2".to_string(),
                "room3".to_string(),
            ],
            room: RoomConfig::default(),
        }
    }
}

/// Infrastructure limits: connection cap, outbound buffering and the
/// inbound frame allowance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    /// Inbound frames accepted per connection per second.
    pub ws_frames_per_sec: u32,
    /// Outbound frames buffered per player before new ones are dropped.
    pub player_message_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            ws_frames_per_sec: 50,
            player_message_buffer: 256,
        }
    }
}

impl ServerConfig {
    /// Check every section. Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            ));
        }

        if self.rooms.names.is_empty() {
            return Err("rooms.names must list at least one room".to_string());
        }
        for (i, name) in self.rooms.names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err("rooms.names must not contain empty names".to_string());
            }
            if self.rooms.names[..i].contains(name) {
                return Err(format!("rooms.names lists {name} twice"));
            }
        }
        self.rooms.room.validate()?;
        self.game.validate()?;

        if self.limits.max_ws_connections == 0 {
            return Err("limits.max_ws_connections must be > 0".to_string());
        }
        if self.limits.ws_frames_per_sec == 0 {
            return Err("limits.ws_frames_per_sec must be > 0".to_string());
        }
        if self.limits.player_message_buffer == 0 {
            return Err("limits.player_message_buffer must be > 0".to_string());
        }
        Ok(())
    }

    /// Load config from `kurve.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("kurve.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from kurve.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse kurve.toml, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No kurve.toml found, using defaults");
                ServerConfig::default()
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `KURVE_*` overrides read through `lookup`. Empty or unparsable
    /// values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("KURVE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }
        if let Some(root) = lookup("KURVE_WEB_ROOT")
            && !root.is_empty()
        {
            self.web_root = root;
        }
        if let Some(rooms) = lookup("KURVE_ROOMS") {
            let names: Vec<String> = rooms
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !names.is_empty() {
                self.rooms.names = names;
            }
        }
        if let Some(val) = lookup("KURVE_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_ws_connections = n;
        }
        if let Some(val) = lookup("KURVE_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<u32>()
        {
            self.limits.ws_frames_per_sec = n;
        }
        if let Some(val) = lookup("KURVE_TICK_RATE")
            && let Ok(n) = val.parse::<f32>()
        {
            self.game.tick_rate_hz = n;
        }
        if let Some(val) = lookup("KURVE_SNAPSHOT_RATE")
            && let Ok(n) = val.parse::<f32>()
        {
            self.game.snapshot_rate_hz = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
        assert_eq!(cfg.web_root, "web");
        assert_eq!(cfg.rooms.names, vec!["room1", "room2", "room3"]);
        assert_eq!(cfg.rooms.room, RoomConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
listen_addr = "127.0.0.1:9090"

[game]
tick_rate_hz = 30.0

[rooms]
names = ["lobby"]
max_players = 8
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:9090");
        assert_eq!(cfg.web_root, "web");
        assert_eq!(cfg.game.tick_rate_hz, 30.0);
        assert_eq!(cfg.game.arena_width, 770.0);
        assert_eq!(cfg.rooms.names, vec!["lobby"]);
        assert_eq!(cfg.rooms.room.max_players, 8);
        assert_eq!(cfg.rooms.room.round_countdown_secs, 5);
        assert_eq!(cfg.rooms.room.min_players, 2);
        assert_eq!(cfg.limits.player_message_buffer, 256);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("KURVE_LISTEN_ADDR", "127.0.0.1:7000"),
            ("KURVE_ROOMS", " a, b ,,c"),
            ("KURVE_MAX_WS_CONNECTIONS", "12"),
            ("KURVE_WS_RATE_LIMIT", "20"),
            ("KURVE_TICK_RATE", "not-a-number"),
            ("KURVE_SNAPSHOT_RATE", "10"),
        ]
        .into_iter()
        .collect();

        let mut cfg = ServerConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.listen_addr, "127.0.0.1:7000");
        assert_eq!(cfg.rooms.names, vec!["a", "b", "c"]);
        assert_eq!(cfg.limits.max_ws_connections, 12);
        assert_eq!(cfg.limits.ws_frames_per_sec, 20);
        assert_eq!(cfg.game.tick_rate_hz, 60.0);
        assert_eq!(cfg.game.snapshot_rate_hz, 10.0);
    }

    #[test]
    fn invalid_values_rejected() {
        let bad_addr = ServerConfig {
            listen_addr: "nowhere".to_string(),
            ..ServerConfig::default()
        };
        assert!(bad_addr.validate().unwrap_err().contains("listen_addr"));

        let mut dup = ServerConfig::default();
        dup.rooms.names = vec!["x".to_string(), "x".to_string()];
        assert!(dup.validate().unwrap_err().contains("twice"));

        let mut crowded = ServerConfig::default();
        crowded.rooms.room.max_players = 9;
        assert!(crowded.validate().is_err());

        let mut no_ticks = ServerConfig::default();
        no_ticks.game.tick_rate_hz = 0.0;
        assert!(no_ticks.validate().is_err());

        let mut silenced = ServerConfig::default();
        silenced.limits.ws_frames_per_sec = 0;
        assert!(silenced.validate().unwrap_err().contains("ws_frames_per_sec"));

        let mut no_buffer = ServerConfig::default();
        no_buffer.limits.player_message_buffer = 0;
        assert!(no_buffer.validate().is_err());
    }
}
