//! A single recorded half-move.

use chess_rules::{NotationError, Position, Side, UciMove};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who produces moves for a side.
///
/// The legacy configuration tags `user` and `ai` are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoverKind {
    #[serde(alias = "user")]
    Human,
    #[serde(alias = "ai")]
    Automated,
}

impl fmt::Display for MoverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoverKind::Human => write!(f, "human"),
            MoverKind::Automated => write!(f, "automated"),
        }
    }
}

impl FromStr for MoverKind {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "user" => Ok(MoverKind::Human),
            "automated" | "ai" => Ok(MoverKind::Automated),
            _ => Err(NotationError::InvalidSide(format!("unknown player kind '{s}'"))),
        }
    }
}

/// The side that moved and how the move was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mover {
    pub side: Side,
    pub kind: MoverKind,
}

/// One applied move with its resulting position and commentary.
///
/// Plies are created by the turn loop once a legal move has been applied
/// and are never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ply {
    /// The move in long algebraic form.
    pub notation: UciMove,
    /// The move in standard algebraic notation.
    pub san: String,
    /// Position after the move.
    pub position: Position,
    /// Rationale from the mover; always empty for human moves.
    #[serde(default)]
    pub comment: String,
    /// Side and kind of the mover.
    pub mover: Mover,
    /// Illegal human input that was replaced by an automated move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_input: Option<String>,
}

impl Ply {
    /// Side that made this move.
    pub fn side(&self) -> Side {
        self.mover.side
    }

    /// True if an automated mover stood in for rejected human input.
    pub fn is_fallback(&self) -> bool {
        self.rejected_input.is_some()
    }
}
