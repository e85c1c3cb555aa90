//! Named strategy profiles turned into live strategies.

use std::collections::BTreeMap;

use chess_session::{Strategy, StrategyError, StrategyFactory};
use tracing::info;

use crate::config::{ConfigError, StrategyConfig};
use crate::llm::LlmAgent;
use crate::random::RandomMover;
use crate::uci::UciEngine;

/// Profile that is always available.
pub const RANDOM_PROFILE: &str = "random";

/// Builds strategies from the `[strategies.<name>]` profiles of a
/// configuration file.
///
/// [`SessionController`](chess_session::SessionController) builds a fresh
/// strategy for every automated ply it plays, so a `uci` profile starts,
/// initialises and stops its engine process once per ply. The local game
/// in `chess-cli` builds each strategy once per game.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    profiles: BTreeMap<String, StrategyConfig>,
}

impl StrategyRegistry {
    /// Creates a registry; a `random` profile is added if none is given.
    pub fn new<I>(profiles: I) -> Self
    where
        I: IntoIterator<Item = (String, StrategyConfig)>,
    {
        let mut profiles: BTreeMap<String, StrategyConfig> = profiles.into_iter().collect();
        profiles
            .entry(RANDOM_PROFILE.to_string())
            .or_insert_with(StrategyConfig::default);
        StrategyRegistry { profiles }
    }

    /// Profile names in alphabetical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Retrieves a profile by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::StrategyNotFound`] if no profile with the given name exists.
    pub fn get(&self, name: &str) -> Result<&StrategyConfig, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::StrategyNotFound(name.to_string()))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}

impl StrategyFactory for StrategyRegistry {
    fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    fn build(&self, name: &str) -> Result<Box<dyn Strategy>, StrategyError> {
        let profile = self
            .get(name)
            .map_err(|_| StrategyError::Unknown(name.to_string()))?;
        let strategy: Box<dyn Strategy> = match profile {
            StrategyConfig::Random { seed } => Box::new(RandomMover::new(name, *seed)),
            StrategyConfig::Uci {
                path,
                args,
                time_control,
            } => {
                let engine = UciEngine::start(name, path, args, time_control.clone())
                    .map_err(|e| StrategyError::Unavailable(e.to_string()))?;
                info!(profile = name, engine = engine.engine_name(), "UCI engine started");
                Box::new(engine)
            }
            StrategyConfig::Llm(settings) => Box::new(LlmAgent::new(name, settings.clone())?),
        };
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_random_profile_always_exists() {
        let registry = StrategyRegistry::default();
        assert!(registry.contains("random"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["random"]);
        assert_eq!(registry.build("random").unwrap().name(), "random");
    }

    #[test]
    fn test_configured_random_profile_is_kept() {
        let registry = StrategyRegistry::new([(
            "random".to_string(),
            StrategyConfig::Random { seed: Some(3) },
        )]);
        assert_eq!(
            registry.get("random").unwrap(),
            &StrategyConfig::Random { seed: Some(3) }
        );
    }

    #[test]
    fn test_unknown_profile() {
        let registry = StrategyRegistry::default();
        assert!(!registry.contains("oracle"));
        assert!(matches!(
            registry.get("oracle"),
            Err(ConfigError::StrategyNotFound(_))
        ));
        assert!(matches!(
            registry.build("oracle"),
            Err(StrategyError::Unknown(_))
        ));
    }

    #[test]
    fn test_broken_engine_is_unavailable() {
        let registry = StrategyRegistry::new([(
            "broken".to_string(),
            StrategyConfig::Uci {
                path: PathBuf::from("/nonexistent/engine"),
                args: Vec::new(),
                time_control: "movetime 10".to_string(),
            },
        )]);
        assert!(registry.contains("broken"));
        assert!(matches!(
            registry.build("broken"),
            Err(StrategyError::Unavailable(_))
        ));
    }
}
