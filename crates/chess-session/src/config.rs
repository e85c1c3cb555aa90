//! Per-session settings, fixed when the session is created.

use chess_rules::Side;
use serde::{Deserialize, Serialize};

use crate::ply::MoverKind;

/// Safety limit on game length in plies.
pub const DEFAULT_MAX_PLIES: u32 = 500;

/// Strategy profile used when none is named.
pub const DEFAULT_STRATEGY: &str = "random";

fn default_max_plies() -> u32 {
    DEFAULT_MAX_PLIES
}

fn default_strategy() -> String {
    DEFAULT_STRATEGY.to_string()
}

fn default_max_attempts() -> u32 {
    crate::source::AutomatedSource::DEFAULT_MAX_ATTEMPTS
}

fn default_white() -> MoverKind {
    MoverKind::Human
}

fn default_black() -> MoverKind {
    MoverKind::Automated
}

/// Which kind of mover plays each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideAssignment {
    #[serde(default = "default_white")]
    pub white: MoverKind,
    #[serde(default = "default_black")]
    pub black: MoverKind,
}

impl SideAssignment {
    pub fn new(white: MoverKind, black: MoverKind) -> Self {
        SideAssignment { white, black }
    }

    pub fn get(&self, side: Side) -> MoverKind {
        match side {
            Side::White => self.white,
            Side::Black => self.black,
        }
    }

    /// True if any side is played by a human.
    pub fn has_human(&self) -> bool {
        self.white == MoverKind::Human || self.black == MoverKind::Human
    }
}

impl Default for SideAssignment {
    fn default() -> Self {
        SideAssignment {
            white: default_white(),
            black: default_black(),
        }
    }
}

/// Settings of one game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub sides: SideAssignment,
    /// Draw the game once more than this many plies have been played.
    #[serde(default = "default_max_plies")]
    pub max_plies: u32,
    /// Name of the strategy profile for automated moves.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Proposals asked from a strategy before giving up on a turn.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            sides: SideAssignment::default(),
            max_plies: default_max_plies(),
            strategy: default_strategy(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.max_plies, 500);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.strategy, "random");
        assert_eq!(config.sides.get(Side::White), MoverKind::Human);
        assert_eq!(config.sides.get(Side::Black), MoverKind::Automated);
    }

    #[test]
    fn legacy_player_tags() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"sides":{"white":"ai","black":"user"},"max_plies":40}"#)
                .unwrap();
        assert_eq!(config.sides.white, MoverKind::Automated);
        assert_eq!(config.sides.black, MoverKind::Human);
        assert!(config.sides.has_human());
        assert_eq!(config.max_plies, 40);
    }
}
