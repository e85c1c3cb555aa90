//! Append-only game history.

use chess_rules::{DrawReason, Position, RuleEngine, RulesError, Side, Status, UciMove};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::ply::Ply;

/// Final or current result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    InProgress,
    WhiteWins,
    BlackWins,
    Draw,
}

impl Outcome {
    /// Outcome in which `side` won.
    pub fn win_for(side: Side) -> Self {
        match side {
            Side::White => Outcome::WhiteWins,
            Side::Black => Outcome::BlackWins,
        }
    }

    /// Returns true once the game has ended.
    pub fn is_terminal(self) -> bool {
        self != Outcome::InProgress
    }

    /// The winning side, if any.
    pub fn winner(self) -> Option<Side> {
        match self {
            Outcome::WhiteWins => Some(Side::White),
            Outcome::BlackWins => Some(Side::Black),
            _ => None,
        }
    }

    /// Result in PGN form.
    pub fn result_str(self) -> &'static str {
        match self {
            Outcome::InProgress => "*",
            Outcome::WhiteWins => "1-0",
            Outcome::BlackWins => "0-1",
            Outcome::Draw => "1/2-1/2",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Outcome::InProgress => "in progress",
            Outcome::WhiteWins => "white wins",
            Outcome::BlackWins => "black wins",
            Outcome::Draw => "draw",
        };
        f.write_str(text)
    }
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    SeventyFiveMoveRule,
    FivefoldRepetition,
    /// The session's ply limit was exceeded.
    PlyLimit,
}

impl From<DrawReason> for Termination {
    fn from(reason: DrawReason) -> Self {
        match reason {
            DrawReason::Stalemate => Termination::Stalemate,
            DrawReason::InsufficientMaterial => Termination::InsufficientMaterial,
            DrawReason::SeventyFiveMoveRule => Termination::SeventyFiveMoveRule,
            DrawReason::FivefoldRepetition => Termination::FivefoldRepetition,
        }
    }
}

impl Termination {
    fn phrase(self) -> &'static str {
        match self {
            Termination::Checkmate => "checkmate",
            Termination::Stalemate => "stalemate",
            Termination::InsufficientMaterial => "insufficient material",
            Termination::SeventyFiveMoveRule => "the 75-move rule",
            Termination::FivefoldRepetition => "fivefold repetition",
            Termination::PlyLimit => "ply limit",
        }
    }
}

/// Errors raised when a ledger is extended, rewound or verified.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger already finished ({0})")]
    Finished(Outcome),

    #[error("ply {index} was played by {found} but {expected} was to move")]
    WrongSide {
        index: usize,
        expected: Side,
        found: Side,
    },

    #[error("ply {index} ({notation}) cannot be replayed: {source}")]
    Illegal {
        index: usize,
        notation: UciMove,
        #[source]
        source: RulesError,
    },

    #[error("ply {index} records '{recorded}' but replay gives '{replayed}'")]
    PositionMismatch {
        index: usize,
        recorded: String,
        replayed: String,
    },

    #[error("ply {index} was played after the game had ended")]
    PlayedAfterEnd { index: usize },

    #[error("recorded outcome {recorded} does not match replayed outcome {replayed}")]
    OutcomeMismatch { recorded: Outcome, replayed: Outcome },

    #[error("cannot rewind to ply {requested}, ledger holds {available}")]
    OutOfRange { requested: usize, available: usize },

    #[error(transparent)]
    Rules(#[from] RulesError),
}

/// Ordered record of a game: the initial position and every ply since.
///
/// The position history is the initial position followed by each ply's
/// resulting position, so it is always exactly one longer than the move
/// history. Only the turn loop appends; once the outcome is terminal the
/// ledger is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnLedger {
    initial: Position,
    #[serde(default)]
    plies: Vec<Ply>,
    outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    termination: Option<Termination>,
}

impl TurnLedger {
    /// Creates an empty, in-progress ledger.
    pub fn new(initial: Position) -> Self {
        TurnLedger {
            initial,
            plies: Vec::new(),
            outcome: Outcome::InProgress,
            termination: None,
        }
    }

    pub fn initial(&self) -> &Position {
        &self.initial
    }

    pub fn plies(&self) -> &[Ply] {
        &self.plies
    }

    /// Number of plies played.
    pub fn len(&self) -> usize {
        self.plies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plies.is_empty()
    }

    pub fn last(&self) -> Option<&Ply> {
        self.plies.last()
    }

    /// Position after the last ply, or the initial position.
    pub fn current_position(&self) -> &Position {
        self.plies
            .last()
            .map(|ply| &ply.position)
            .unwrap_or(&self.initial)
    }

    pub fn side_to_move(&self) -> Side {
        self.current_position().side_to_move()
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_terminal()
    }

    /// Every position of the game in order, starting with the initial one.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        std::iter::once(&self.initial).chain(self.plies.iter().map(|ply| &ply.position))
    }

    /// Owned copy of [`positions`](Self::positions), as the rule engine wants it.
    pub fn position_history(&self) -> Vec<Position> {
        self.positions().cloned().collect()
    }

    /// Moves in the order they were played.
    pub fn moves(&self) -> impl Iterator<Item = &UciMove> {
        self.plies.iter().map(|ply| &ply.notation)
    }

    /// Human-readable closing line, once the game has ended.
    pub fn summary(&self) -> Option<String> {
        let termination = self.termination?;
        let line = match (self.outcome, termination) {
            (Outcome::InProgress, _) => return None,
            (Outcome::Draw, Termination::PlyLimit) => {
                format!("Draw: ply limit reached after {} plies.", self.plies.len())
            }
            (Outcome::Draw, reason) => format!("Draw by {}.", reason.phrase()),
            (won, reason) => {
                let winner = won.winner().map(Side::title).unwrap_or("Nobody");
                format!("{winner} wins by {}.", reason.phrase())
            }
        };
        Some(line)
    }

    pub(crate) fn append(&mut self, ply: Ply) -> Result<(), LedgerError> {
        if self.is_finished() {
            return Err(LedgerError::Finished(self.outcome));
        }
        let expected = self.side_to_move();
        if ply.side() != expected {
            return Err(LedgerError::WrongSide {
                index: self.plies.len(),
                expected,
                found: ply.side(),
            });
        }
        self.plies.push(ply);
        Ok(())
    }

    pub(crate) fn finish(
        &mut self,
        outcome: Outcome,
        termination: Termination,
    ) -> Result<(), LedgerError> {
        if self.is_finished() {
            return Err(LedgerError::Finished(self.outcome));
        }
        self.outcome = outcome;
        self.termination = Some(termination);
        Ok(())
    }

    /// Forks an in-progress ledger holding the first `plies` plies.
    pub fn rewind(&self, plies: usize) -> Result<TurnLedger, LedgerError> {
        if plies > self.plies.len() {
            return Err(LedgerError::OutOfRange {
                requested: plies,
                available: self.plies.len(),
            });
        }
        Ok(TurnLedger {
            initial: self.initial.clone(),
            plies: self.plies[..plies].to_vec(),
            outcome: Outcome::InProgress,
            termination: None,
        })
    }

    /// Replays every move through `rules` and checks the recorded history.
    ///
    /// Fails if a move is illegal, a recorded position differs from the
    /// replayed one, a move follows a terminal position, or a recorded
    /// rules outcome disagrees with the final position.
    pub fn verify(&self, rules: &dyn RuleEngine) -> Result<(), LedgerError> {
        let mut history = vec![self.initial.clone()];

        for (index, ply) in self.plies.iter().enumerate() {
            let Some(current) = history.last() else {
                break;
            };
            if rules.status(current, &history)?.is_terminal() {
                return Err(LedgerError::PlayedAfterEnd { index });
            }
            if ply.side() != current.side_to_move() {
                return Err(LedgerError::WrongSide {
                    index,
                    expected: current.side_to_move(),
                    found: ply.side(),
                });
            }
            let applied = rules
                .apply(current, &ply.notation)
                .map_err(|source| LedgerError::Illegal {
                    index,
                    notation: ply.notation,
                    source,
                })?;
            if applied.position != ply.position {
                return Err(LedgerError::PositionMismatch {
                    index,
                    recorded: ply.position.fen().to_string(),
                    replayed: applied.position.fen().to_string(),
                });
            }
            history.push(applied.position);
        }

        if self.termination == Some(Termination::PlyLimit) {
            return Ok(());
        }
        let replayed = match rules.status(self.current_position(), &history)? {
            Status::Ongoing => Outcome::InProgress,
            Status::Checkmate { winner } => Outcome::win_for(winner),
            Status::Draw(_) => Outcome::Draw,
        };
        if self.is_finished() && replayed != self.outcome {
            return Err(LedgerError::OutcomeMismatch {
                recorded: self.outcome,
                replayed,
            });
        }
        Ok(())
    }
}
