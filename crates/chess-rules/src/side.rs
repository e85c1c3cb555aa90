//! Player side representation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::NotationError;

/// The two players in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// Both sides, white first.
    pub const ALL: [Side; 2] = [Side::White, Side::Black];

    /// Returns the opposite side.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Returns the active-color character used in FEN (`w` or `b`).
    #[inline]
    pub const fn fen_char(self) -> char {
        match self {
            Side::White => 'w',
            Side::Black => 'b',
        }
    }

    /// Parses the active-color field of a FEN string.
    pub fn from_fen_field(field: &str) -> Option<Self> {
        match field {
            "w" => Some(Side::White),
            "b" => Some(Side::Black),
            _ => None,
        }
    }

    /// Capitalised name for transcript lines.
    pub const fn title(self) -> &'static str {
        match self {
            Side::White => "White",
            Side::Black => "Black",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => write!(f, "white"),
            Side::Black => write!(f, "black"),
        }
    }
}

impl FromStr for Side {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "white" | "w" => Ok(Side::White),
            "black" | "b" => Ok(Side::Black),
            _ => Err(NotationError::InvalidSide(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_side() {
        assert_eq!(Side::White.opposite(), Side::Black);
        assert_eq!(Side::Black.opposite(), Side::White);
    }

    #[test]
    fn fen_field_round_trip() {
        for side in Side::ALL {
            let field = side.fen_char().to_string();
            assert_eq!(Side::from_fen_field(&field), Some(side));
        }
        assert_eq!(Side::from_fen_field("x"), None);
    }

    #[test]
    fn display_and_parse() {
        assert_eq!(Side::White.to_string(), "white");
        assert_eq!(Side::Black.to_string(), "black");
        assert_eq!("Black".parse::<Side>().unwrap(), Side::Black);
        assert!("purple".parse::<Side>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Side::White).unwrap(), "\"white\"");
        let side: Side = serde_json::from_str("\"black\"").unwrap();
        assert_eq!(side, Side::Black);
    }
}
