//! Strategy profiles as read from TOML configuration.
//!
//! Profiles live in `[strategies.<name>]` tables and are tagged by `kind`:
//!
//! ```toml
//! [strategies.random]
//! kind = "random"
//!
//! [strategies.stockfish]
//! kind = "uci"
//! path = "/usr/bin/stockfish"
//! time_control = "movetime 200"
//!
//! [strategies.gpt]
//! kind = "llm"
//! model = "gpt-4o-mini"
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Requested strategy profile was not found in the configuration.
    #[error("Strategy not found: {0}")]
    StrategyNotFound(String),
}

/// Reads a TOML file, or returns the default configuration if it does not
/// exist.
///
/// # Errors
///
/// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
/// or [`ConfigError::ParseError`] if it contains invalid TOML.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    } else {
        Ok(T::default())
    }
}

fn default_time_control() -> String {
    "movetime 500".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout_secs() -> u64 {
    60
}

/// Settings for a chat-completion backed strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// OpenAI-compatible chat completions URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key. No key is sent if unset,
    /// which suits local servers.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        LlmSettings {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// One named strategy profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Uniformly random legal moves, optionally seeded.
    Random {
        #[serde(default)]
        seed: Option<u64>,
    },
    /// A UCI engine subprocess.
    Uci {
        path: PathBuf,
        #[serde(default)]
        args: Vec<String>,
        /// Time control string (e.g., "movetime 500").
        #[serde(default = "default_time_control")]
        time_control: String,
    },
    /// A language model behind a chat-completion endpoint.
    Llm(LlmSettings),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::Random { seed: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Default, Deserialize)]
    struct Profiles {
        #[serde(default)]
        strategies: HashMap<String, StrategyConfig>,
    }

    #[test]
    fn test_parse_profiles() {
        let toml_content = r#"
[strategies.random]
kind = "random"
seed = 7

[strategies.stockfish]
kind = "uci"
path = "/usr/bin/stockfish"
time_control = "depth 12"

[strategies.local]
kind = "llm"
endpoint = "http://localhost:11434/v1/chat/completions"
model = "llama3.1"
"#;
        let config: Profiles = toml::from_str(toml_content).unwrap();
        assert_eq!(config.strategies.len(), 3);
        assert_eq!(
            config.strategies["random"],
            StrategyConfig::Random { seed: Some(7) }
        );
        assert_eq!(
            config.strategies["stockfish"],
            StrategyConfig::Uci {
                path: PathBuf::from("/usr/bin/stockfish"),
                args: Vec::new(),
                time_control: "depth 12".to_string(),
            }
        );
        match &config.strategies["local"] {
            StrategyConfig::Llm(settings) => {
                assert_eq!(settings.model, "llama3.1");
                assert_eq!(settings.api_key_env, "OPENAI_API_KEY");
                assert_eq!(settings.timeout_secs, 60);
            }
            other => panic!("expected llm profile, got {other:?}"),
        }
    }

    #[test]
    fn test_uci_profile_defaults() {
        let config: Profiles = toml::from_str(
            r#"
[strategies.engine]
kind = "uci"
path = "engine"
"#,
        )
        .unwrap();
        match &config.strategies["engine"] {
            StrategyConfig::Uci { time_control, .. } => assert_eq!(time_control, "movetime 500"),
            other => panic!("expected uci profile, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: Result<Profiles, _> = toml::from_str(
            r#"
[strategies.oracle]
kind = "telepathy"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file_gives_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let config: Profiles = load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert!(config.strategies.is_empty());
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[strategies.x\nkind=").unwrap();
        let result: Result<Profiles, _> = load_or_default(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
