//! Server configuration from `server.toml`.

use chess_session::{SessionConfig, DEFAULT_MAX_PLIES, DEFAULT_STRATEGY};
use chess_strategies::{StrategyConfig, StrategyRegistry};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

fn default_port() -> u16 {
    3000
}

fn default_database() -> PathBuf {
    PathBuf::from("data/sessions.db")
}

fn default_max_plies() -> u32 {
    DEFAULT_MAX_PLIES
}

fn default_strategy() -> String {
    DEFAULT_STRATEGY.to_string()
}

/// Contents of `server.toml`.
///
/// ```toml
/// port = 3000
/// database = "data/sessions.db"
/// max_plies = 300
/// default_strategy = "stockfish"
///
/// [strategies.stockfish]
/// kind = "uci"
/// path = "/usr/bin/stockfish"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// SQLite file holding session checkpoints.
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default = "default_max_plies")]
    pub max_plies: u32,
    /// Profile used by sessions that do not name one.
    #[serde(default = "default_strategy")]
    pub default_strategy: String,
    #[serde(default)]
    pub strategies: HashMap<String, StrategyConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            database: default_database(),
            max_plies: default_max_plies(),
            default_strategy: default_strategy(),
            strategies: HashMap::new(),
        }
    }
}

impl ServerConfig {
    pub fn registry(&self) -> StrategyRegistry {
        StrategyRegistry::new(self.strategies.clone())
    }

    /// Defaults applied to new sessions.
    pub fn session_defaults(&self) -> SessionConfig {
        SessionConfig {
            max_plies: self.max_plies,
            strategy: self.default_strategy.clone(),
            ..SessionConfig::default()
        }
    }
}
