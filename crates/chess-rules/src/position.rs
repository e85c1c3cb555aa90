//! Immutable FEN position snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{NotationError, Side};

/// A complete snapshot of game state, held as a FEN string.
///
/// The FEN carries everything needed to resume play from this point: board
/// layout, side to move, castling rights, en passant square and both move
/// counters. Construction only checks the six-field structure; full
/// validation is done by [`RuleEngine::parse_position`](crate::RuleEngine::parse_position).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Position {
    fen: String,
}

impl Position {
    /// FEN of the standard starting position.
    pub const STARTING_FEN: &'static str =
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// The standard starting position.
    pub fn starting() -> Self {
        Position {
            fen: Self::STARTING_FEN.to_string(),
        }
    }

    /// Wraps a FEN string after a structural check.
    pub fn from_fen(fen: &str) -> Result<Self, NotationError> {
        let fen = fen.split_whitespace().collect::<Vec<_>>().join(" ");
        let fields: Vec<&str> = fen.split(' ').collect();
        if fields.len() != 6 {
            return Err(NotationError::InvalidFen(format!(
                "expected 6 fields, got {}",
                fields.len()
            )));
        }
        if Side::from_fen_field(fields[1]).is_none() {
            return Err(NotationError::InvalidFen(format!(
                "invalid active color '{}'",
                fields[1]
            )));
        }
        for (name, field) in [("halfmove clock", fields[4]), ("fullmove number", fields[5])] {
            if field.parse::<u32>().is_err() {
                return Err(NotationError::InvalidFen(format!("invalid {name} '{field}'")));
            }
        }
        Ok(Position { fen })
    }

    /// The FEN text.
    pub fn fen(&self) -> &str {
        &self.fen
    }

    fn field(&self, index: usize) -> &str {
        self.fen.split(' ').nth(index).unwrap_or_default()
    }

    /// Side whose turn it is.
    pub fn side_to_move(&self) -> Side {
        Side::from_fen_field(self.field(1)).unwrap_or(Side::White)
    }

    /// Key identifying the position for repetition counting: placement,
    /// side to move, castling rights and en passant square.
    pub fn repetition_key(&self) -> &str {
        let mut end = 0;
        for (i, part) in self.fen.split(' ').take(4).enumerate() {
            end += part.len() + usize::from(i > 0);
        }
        &self.fen[..end]
    }

    /// Half-moves since the last capture or pawn move.
    pub fn halfmove_clock(&self) -> u32 {
        self.field(4).parse().unwrap_or(0)
    }

    /// Full-move number, starting at 1.
    pub fn fullmove_number(&self) -> u32 {
        self.field(5).parse().unwrap_or(1)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fen)
    }
}

impl TryFrom<String> for Position {
    type Error = NotationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_fen(&value)
    }
}

impl From<Position> for String {
    fn from(position: Position) -> Self {
        position.fen
    }
}
