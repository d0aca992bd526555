//! Application-level configuration loading for room defaults.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::room::model::{DEFAULT_MAX_PLAYERS, DEFAULT_TIMER_SECONDS, RoomConfig};

/// Default location on disk where the JSON configuration is looked up.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_ROOMS_CONFIG_PATH";

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    room: RoomConfig,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    if let Err(err) = config.room.validate() {
                        warn!(
                            path = %path.display(),
                            error = %err,
                            "config out of bounds; falling back to defaults"
                        );
                        return Self::default();
                    }
                    info!(
                        path = %path.display(),
                        max_players = config.room.max_players,
                        timer = config.room.default_timer_seconds,
                        "loaded room defaults from config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Room defaults handed to room creation.
    pub fn room_config(&self) -> RoomConfig {
        self.room.clone()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            room: RoomConfig {
                max_players: DEFAULT_MAX_PLAYERS,
                default_timer_seconds: DEFAULT_TIMER_SECONDS,
            },
        }
    }
}

/// JSON representation of the configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_max_players")]
    max_players: u32,
    #[serde(default = "default_timer_seconds")]
    default_timer_seconds: u32,
}

fn default_max_players() -> u32 {
    DEFAULT_MAX_PLAYERS
}

fn default_timer_seconds() -> u32 {
    DEFAULT_TIMER_SECONDS
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            room: RoomConfig {
                max_players: value.max_players,
                default_timer_seconds: value.default_timer_seconds,
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_room_constants() {
        let config = AppConfig::default();
        assert_eq!(config.room_config().max_players, DEFAULT_MAX_PLAYERS);
        assert_eq!(
            config.room_config().default_timer_seconds,
            DEFAULT_TIMER_SECONDS
        );
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"max_players": 4}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.room_config().max_players, 4);
        assert_eq!(
            config.room_config().default_timer_seconds,
            DEFAULT_TIMER_SECONDS
        );
    }
}
