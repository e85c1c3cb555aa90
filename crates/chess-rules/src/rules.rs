//! Rule engine abstraction.
//!
//! A session never touches board internals. It hands a [`Position`] to the
//! active [`RuleEngine`] and receives a new [`Position`] back, so the engine
//! can be swapped (variants, a remote service, a test double) without
//! changing the turn loop.

use thiserror::Error;

use crate::{Position, Side, UciMove};

/// Errors reported by a rule engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RulesError {
    /// The position could not be loaded by the engine.
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// The move is well-formed but not legal in the position.
    #[error("illegal move {notation} in {fen}")]
    IllegalMove { notation: String, fen: String },
}

/// Reason for a draw detected by the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    /// No legal moves but not in check.
    Stalemate,
    /// Neither side can deliver mate.
    InsufficientMaterial,
    /// 150 half-moves without a capture or pawn move.
    SeventyFiveMoveRule,
    /// The same position occurred five times.
    FivefoldRepetition,
}

/// Terminal classification of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The side to move has at least one legal move and no draw applies.
    Ongoing,
    /// The side to move is mated.
    Checkmate { winner: Side },
    /// The game is drawn.
    Draw(DrawReason),
}

impl Status {
    /// Returns true if the game cannot continue.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Ongoing)
    }
}

/// Result of applying a legal move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    /// Position after the move.
    pub position: Position,
    /// The move in standard algebraic notation, relative to the old position.
    pub san: String,
}

/// Legality, move application and terminal-state detection for one game.
///
/// Implementations must be stateless with respect to positions: every call
/// receives the position it is about.
pub trait RuleEngine: Send + Sync {
    /// Returns the initial position of the game.
    fn starting_position(&self) -> Position;

    /// Fully validates a FEN string and returns it in normalised form.
    fn parse_position(&self, fen: &str) -> Result<Position, RulesError>;

    /// All legal moves for the side to move.
    fn legal_moves(&self, position: &Position) -> Result<Vec<UciMove>, RulesError>;

    /// Applies a move, failing with [`RulesError::IllegalMove`] if it is not legal.
    fn apply(&self, position: &Position, mv: &UciMove) -> Result<AppliedMove, RulesError>;

    /// Classifies `position`.
    ///
    /// `history` lists every position of the game so far in order and ends
    /// with `position`; it is used for repetition detection.
    fn status(&self, position: &Position, history: &[Position]) -> Result<Status, RulesError>;

    /// Returns true if the move is legal in the position.
    fn is_legal(&self, position: &Position, mv: &UciMove) -> bool {
        self.apply(position, mv).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!Status::Ongoing.is_terminal());
        assert!(Status::Checkmate { winner: Side::Black }.is_terminal());
        assert!(Status::Draw(DrawReason::Stalemate).is_terminal());
    }

    #[test]
    fn illegal_move_display() {
        let err = RulesError::IllegalMove {
            notation: "e2e5".to_string(),
            fen: Position::STARTING_FEN.to_string(),
        };
        assert!(err.to_string().starts_with("illegal move e2e5 in rnbqkbnr"));
    }
}
