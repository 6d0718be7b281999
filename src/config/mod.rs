//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::room::valid_room_name;
use crate::game::{ArenaConfig, ArenaConfigError};
use crate::util::time::DEFAULT_TICK_INTERVAL_MS;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Allowed client origins for CORS, comma-separated. `*` allows any.
    pub client_origin: String,

    /// Period of every room's tick loop
    pub tick_interval: Duration,
    /// Room used by the bare `/ws` endpoint
    pub default_room: String,
    /// Upper bound on simultaneously open rooms
    pub max_rooms: usize,

    /// Simulation constants applied to every room
    pub arena: ArenaConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port.trim()),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8008".to_string()),
        };

        let tick_ms: u64 = parse_or(&lookup, "TICK_INTERVAL_MS", DEFAULT_TICK_INTERVAL_MS)?;
        if tick_ms == 0 {
            return Err(ConfigError::Invalid("TICK_INTERVAL_MS"));
        }

        let default_room = lookup("DEFAULT_ROOM").unwrap_or_else(|| "main".to_string());
        if !valid_room_name(&default_room) {
            return Err(ConfigError::Invalid("DEFAULT_ROOM"));
        }

        let max_rooms: usize = parse_or(&lookup, "MAX_ROOMS", 64)?;
        if max_rooms == 0 {
            return Err(ConfigError::Invalid("MAX_ROOMS"));
        }

        let arena = arena_from_lookup(&lookup)?;
        arena.validate()?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: log_json(&lookup)?,
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),

            tick_interval: Duration::from_millis(tick_ms),
            default_room,
            max_rooms,
            arena,
        })
    }
}

fn arena_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<ArenaConfig, ConfigError> {
    let defaults = ArenaConfig::default();
    let mut area = defaults.area;
    area.end_x = area.start_x + parse_or(lookup, "ARENA_WIDTH", defaults.area.width())?;
    area.end_y = area.start_y + parse_or(lookup, "ARENA_HEIGHT", defaults.area.height())?;

    let seed = match lookup("ARENA_SEED") {
        Some(raw) => Some(
            raw.trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("ARENA_SEED"))?,
        ),
        None => defaults.seed,
    };

    Ok(ArenaConfig {
        user_width: parse_or(lookup, "ARENA_USER_WIDTH", defaults.user_width)?,
        move_speed: parse_or(lookup, "ARENA_MOVE_SPEED", defaults.move_speed)?,
        shoot_interval: parse_or(lookup, "ARENA_SHOOT_INTERVAL", defaults.shoot_interval)?,
        bullet_speed: parse_or(lookup, "ARENA_BULLET_SPEED", defaults.bullet_speed)?,
        wait_shrink_steps: parse_or(lookup, "ARENA_WAIT_SHRINK_STEPS", defaults.wait_shrink_steps)?,
        shrink_steps: parse_or(lookup, "ARENA_SHRINK_STEPS", defaults.shrink_steps)?,
        min_area_extent: parse_or(lookup, "ARENA_MIN_EXTENT", defaults.min_area_extent)?,
        area,
        seat_columns: parse_or(lookup, "ARENA_SEAT_COLUMNS", defaults.seat_columns)?,
        seat_rows: parse_or(lookup, "ARENA_SEAT_ROWS", defaults.seat_rows)?,
        seed,
    })
}

fn log_json(lookup: &impl Fn(&str) -> Option<String>) -> Result<bool, ConfigError> {
    match lookup("LOG_FORMAT").as_deref().map(str::trim) {
        None | Some("text") => Ok(false),
        Some("json") => Ok(true),
        Some(_) => Err(ConfigError::Invalid("LOG_FORMAT")),
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid arena configuration: {0}")]
    Arena(#[from] ArenaConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = assert_ok!(load(&[]));
        assert_eq!(config.server_addr, "0.0.0.0:8008".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.client_origin, "*");
        assert_eq!(config.tick_interval, Duration::from_millis(200));
        assert_eq!(config.default_room, "main");
        assert_eq!(config.max_rooms, 64);
        assert_eq!(config.arena, ArenaConfig::default());
    }

    #[test]
    fn test_port_wins_over_server_addr() {
        let config = assert_ok!(load(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]));
        assert_eq!(config.server_addr, "0.0.0.0:9000".parse().unwrap());

        let config = assert_ok!(load(&[("SERVER_ADDR", "127.0.0.1:7000")]));
        assert_eq!(config.server_addr, "127.0.0.1:7000".parse().unwrap());
    }

    #[test]
    fn test_arena_overrides() {
        let config = assert_ok!(load(&[
            ("ARENA_USER_WIDTH", "10"),
            ("ARENA_WIDTH", "500"),
            ("ARENA_HEIGHT", "300"),
            ("ARENA_SEAT_COLUMNS", "5"),
            ("ARENA_SEAT_ROWS", "3"),
            ("ARENA_SEED", "42"),
            ("TICK_INTERVAL_MS", "50"),
        ]));
        assert_eq!(config.arena.user_width, 10.0);
        assert_eq!(config.arena.area.width(), 500.0);
        assert_eq!(config.arena.area.height(), 300.0);
        assert_eq!(config.arena.seat_capacity(), 15);
        assert_eq!(config.arena.seed, Some(42));
        assert_eq!(config.tick_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            assert_err!(load(&[("ARENA_MOVE_SPEED", "fast")])),
            ConfigError::Invalid("ARENA_MOVE_SPEED")
        ));
        assert!(matches!(
            assert_err!(load(&[("LOG_FORMAT", "xml")])),
            ConfigError::Invalid("LOG_FORMAT")
        ));
        assert!(matches!(
            assert_err!(load(&[("TICK_INTERVAL_MS", "0")])),
            ConfigError::Invalid("TICK_INTERVAL_MS")
        ));
        assert!(matches!(
            assert_err!(load(&[("DEFAULT_ROOM", "no spaces")])),
            ConfigError::Invalid("DEFAULT_ROOM")
        ));
        assert!(matches!(
            assert_err!(load(&[("SERVER_ADDR", "nowhere")])),
            ConfigError::InvalidAddress
        ));
        assert!(matches!(
            assert_err!(load(&[("ARENA_USER_WIDTH", "0")])),
            ConfigError::Arena(_)
        ));
    }
}
