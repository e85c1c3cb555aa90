//! Automated move strategies for chess sessions.
//!
//! Each strategy implements [`chess_session::Strategy`]:
//! - [`RandomMover`] picks a uniformly random legal move
//! - [`UciEngine`] asks a UCI engine subprocess such as Stockfish
//! - [`LlmAgent`] asks a language model behind an OpenAI-compatible
//!   chat-completion endpoint
//!
//! [`StrategyRegistry`] builds them by name from `[strategies.<name>]`
//! TOML profiles and serves as the session controller's
//! [`StrategyFactory`](chess_session::StrategyFactory).

pub mod config;
pub mod llm;
pub mod random;
pub mod registry;
pub mod uci;

pub use config::{load_or_default, ConfigError, LlmSettings, StrategyConfig};
pub use llm::LlmAgent;
pub use random::RandomMover;
pub use registry::{StrategyRegistry, RANDOM_PROFILE};
pub use uci::{UciClient, UciEngine, UciError};
