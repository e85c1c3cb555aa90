//! Configuration loaded from `chess.toml`.
//!
//! ```toml
//! [session]
//! strategy = "stockfish"
//! max_plies = 300
//!
//! [strategies.stockfish]
//! kind = "uci"
//! path = "/usr/bin/stockfish"
//! ```

use chess_session::SessionConfig;
use chess_strategies::{StrategyConfig, StrategyRegistry};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    /// Defaults for new games; flags override them.
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub strategies: HashMap<String, StrategyConfig>,
}

impl CliConfig {
    pub fn registry(&self) -> StrategyRegistry {
        StrategyRegistry::new(self.strategies.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_session::MoverKind;

    #[test]
    fn test_parse_cli_config() {
        let config: CliConfig = toml::from_str(
            r#"
[session]
strategy = "engine"
max_plies = 80
sides = { white = "ai", black = "human" }

[strategies.engine]
kind = "uci"
path = "stockfish"
"#,
        )
        .unwrap();
        assert_eq!(config.session.strategy, "engine");
        assert_eq!(config.session.max_plies, 80);
        assert_eq!(config.session.sides.white, MoverKind::Automated);
        assert_eq!(config.session.sides.black, MoverKind::Human);
        assert_eq!(config.session.max_attempts, 5);

        let registry = config.registry();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["engine", "random"]);
    }

    #[test]
    fn test_empty_config() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config.session, SessionConfig::default());
        assert!(config.strategies.is_empty());
    }
}
