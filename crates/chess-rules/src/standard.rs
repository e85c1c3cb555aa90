//! Standard chess rules backed by `shakmaty`.

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::uci::UciMove as ShakmatyUci;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position as _};

use crate::rules::{AppliedMove, DrawReason, RuleEngine, RulesError, Status};
use crate::{Position, Side, UciMove};

/// Half-moves without capture or pawn move after which the game is drawn.
const SEVENTY_FIVE_MOVE_PLIES: u32 = 150;

/// Occurrences of one position after which the game is drawn.
const FIVEFOLD: usize = 5;

/// Standard chess (FIDE rules, standard castling).
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl StandardRules {
    fn load(&self, position: &Position) -> Result<Chess, RulesError> {
        let fen: Fen = position
            .fen()
            .parse()
            .map_err(|e| RulesError::InvalidPosition(format!("{e}")))?;
        fen.into_position(CastlingMode::Standard)
            .map_err(|e| RulesError::InvalidPosition(format!("{e}")))
    }

    fn store(chess: Chess) -> Result<Position, RulesError> {
        let fen = Fen::from_position(chess, EnPassantMode::Legal).to_string();
        Position::from_fen(&fen).map_err(|e| RulesError::InvalidPosition(e.to_string()))
    }

    fn illegal(position: &Position, mv: &UciMove) -> RulesError {
        RulesError::IllegalMove {
            notation: mv.to_string(),
            fen: position.fen().to_string(),
        }
    }
}

fn side_of(color: Color) -> Side {
    match color {
        Color::White => Side::White,
        Color::Black => Side::Black,
    }
}

impl RuleEngine for StandardRules {
    fn starting_position(&self) -> Position {
        Position::starting()
    }

    fn parse_position(&self, fen: &str) -> Result<Position, RulesError> {
        let structural =
            Position::from_fen(fen).map_err(|e| RulesError::InvalidPosition(e.to_string()))?;
        let chess = self.load(&structural)?;
        Self::store(chess)
    }

    fn legal_moves(&self, position: &Position) -> Result<Vec<UciMove>, RulesError> {
        let chess = self.load(position)?;
        chess
            .legal_moves()
            .iter()
            .map(|m| {
                ShakmatyUci::from_move(m, CastlingMode::Standard)
                    .to_string()
                    .parse::<UciMove>()
                    .map_err(|e| RulesError::InvalidPosition(e.to_string()))
            })
            .collect()
    }

    fn apply(&self, position: &Position, mv: &UciMove) -> Result<AppliedMove, RulesError> {
        let chess = self.load(position)?;
        let uci: ShakmatyUci = mv
            .to_string()
            .parse()
            .map_err(|_| Self::illegal(position, mv))?;
        let m = uci
            .to_move(&chess)
            .map_err(|_| Self::illegal(position, mv))?;
        let san = San::from_move(&chess, &m).to_string();
        let next = chess.play(&m).map_err(|_| Self::illegal(position, mv))?;
        Ok(AppliedMove {
            position: Self::store(next)?,
            san,
        })
    }

    fn status(&self, position: &Position, history: &[Position]) -> Result<Status, RulesError> {
        let chess = self.load(position)?;

        if chess.is_checkmate() {
            return Ok(Status::Checkmate {
                winner: side_of(chess.turn()).opposite(),
            });
        }
        if chess.is_stalemate() {
            return Ok(Status::Draw(DrawReason::Stalemate));
        }
        if chess.is_insufficient_material() {
            return Ok(Status::Draw(DrawReason::InsufficientMaterial));
        }
        if chess.halfmoves() >= SEVENTY_FIVE_MOVE_PLIES {
            return Ok(Status::Draw(DrawReason::SeventyFiveMoveRule));
        }

        let key = position.repetition_key();
        let occurrences = history
            .iter()
            .filter(|p| p.repetition_key() == key)
            .count()
            .max(1);
        if occurrences >= FIVEFOLD {
            return Ok(Status::Draw(DrawReason::FivefoldRepetition));
        }

        Ok(Status::Ongoing)
    }
}
