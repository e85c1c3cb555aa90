//! Square names and the long-form (UCI) move codec.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when text cannot be read as a square, move, side or FEN.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("invalid square: '{0}'")]
    InvalidSquare(String),

    #[error("invalid move notation: '{0}'")]
    InvalidMove(String),

    #[error("invalid side: '{0}'")]
    InvalidSide(String),

    #[error("invalid FEN: {0}")]
    InvalidFen(String),
}

/// A board square in algebraic naming (`a1` .. `h8`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    /// Creates a square from 0-based file and rank indices.
    pub const fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Square { file, rank })
        } else {
            None
        }
    }

    /// Parses an algebraic square name such as `e4`.
    pub fn from_algebraic(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].to_ascii_lowercase().checked_sub(b'a')?;
        let rank = bytes[1].checked_sub(b'1')?;
        Self::new(file, rank)
    }

    /// 0-based file index (a = 0).
    pub const fn file(self) -> u8 {
        self.file
    }

    /// 0-based rank index (rank 1 = 0).
    pub const fn rank(self) -> u8 {
        self.rank
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

impl FromStr for Square {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_algebraic(s.trim()).ok_or_else(|| NotationError::InvalidSquare(s.to_string()))
    }
}

impl TryFrom<String> for Square {
    type Error = NotationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        square.to_string()
    }
}

/// Piece a pawn promotes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Promotion {
    Knight,
    Bishop,
    Rook,
    Queen,
}

impl Promotion {
    /// Parses the trailing promotion letter of a UCI move.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'n' => Some(Promotion::Knight),
            'b' => Some(Promotion::Bishop),
            'r' => Some(Promotion::Rook),
            'q' => Some(Promotion::Queen),
            _ => None,
        }
    }

    /// Lowercase letter used in UCI notation.
    pub const fn to_char(self) -> char {
        match self {
            Promotion::Knight => 'n',
            Promotion::Bishop => 'b',
            Promotion::Rook => 'r',
            Promotion::Queen => 'q',
        }
    }
}

/// A move in long algebraic (UCI) form, e.g. `e2e4` or `e7e8q`.
///
/// Parsing only checks the shape of the text. Whether the move is legal
/// is decided by a [`RuleEngine`](crate::RuleEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UciMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Promotion>,
}

impl UciMove {
    /// Builds a move from its two squares, as received from a board UI.
    pub const fn from_squares(from: Square, to: Square, promotion: Option<Promotion>) -> Self {
        UciMove {
            from,
            to,
            promotion,
        }
    }
}

impl fmt::Display for UciMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.to_char())?;
        }
        Ok(())
    }
}

impl FromStr for UciMove {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let malformed = || NotationError::InvalidMove(s.to_string());

        if !text.is_ascii() || text.len() < 4 || text.len() > 5 {
            return Err(malformed());
        }
        let from = Square::from_algebraic(&text[0..2]).ok_or_else(malformed)?;
        let to = Square::from_algebraic(&text[2..4]).ok_or_else(malformed)?;
        if from == to {
            return Err(malformed());
        }
        let promotion = match text[4..].chars().next() {
            Some(c) => Some(Promotion::from_char(c).ok_or_else(malformed)?),
            None => None,
        };
        Ok(UciMove {
            from,
            to,
            promotion,
        })
    }
}

impl TryFrom<String> for UciMove {
    type Error = NotationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UciMove> for String {
    fn from(mv: UciMove) -> Self {
        mv.to_string()
    }
}
