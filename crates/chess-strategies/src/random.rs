//! Random move strategy - plays a random legal move.
//!
//! The simplest possible automated mover, useful as a default opponent
//! and as the fallback for rejected human moves.

use chess_session::{MoveRequest, Proposal, Strategy, StrategyError};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

pub struct RandomMover {
    name: String,
    rng: StdRng,
}

impl RandomMover {
    /// Creates a mover; a seed makes its choices repeatable.
    pub fn new(name: impl Into<String>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        RandomMover {
            name: name.into(),
            rng,
        }
    }
}

impl Strategy for RandomMover {
    fn name(&self) -> &str {
        &self.name
    }

    fn propose(&mut self, request: &MoveRequest<'_>) -> Result<Proposal, StrategyError> {
        let mv = request
            .legal_moves
            .choose(&mut self.rng)
            .ok_or_else(|| StrategyError::BadReply("no legal moves to choose from".into()))?;
        Ok(Proposal::new(
            mv.to_string(),
            format!("Picked at random from {} moves.", request.legal_moves.len()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_rules::{Position, RuleEngine, Side, StandardRules};

    #[test]
    fn test_proposes_a_legal_move() {
        let rules = StandardRules;
        let start = Position::starting();
        let legal = rules.legal_moves(&start).unwrap();
        let request = MoveRequest {
            position: &start,
            side: Side::White,
            legal_moves: &legal,
        };

        let mut mover = RandomMover::new("random", None);
        for _ in 0..20 {
            let proposal = mover.propose(&request).unwrap();
            assert!(legal.iter().any(|m| m.to_string() == proposal.notation));
            assert_eq!(proposal.comment, "Picked at random from 20 moves.");
        }
    }

    #[test]
    fn test_seed_makes_choices_repeatable() {
        let rules = StandardRules;
        let start = Position::starting();
        let legal = rules.legal_moves(&start).unwrap();
        let request = MoveRequest {
            position: &start,
            side: Side::White,
            legal_moves: &legal,
        };

        let mut a = RandomMover::new("a", Some(42));
        let mut b = RandomMover::new("b", Some(42));
        for _ in 0..10 {
            assert_eq!(a.propose(&request).unwrap(), b.propose(&request).unwrap());
        }
    }

    #[test]
    fn test_no_moves_is_an_error() {
        let start = Position::starting();
        let request = MoveRequest {
            position: &start,
            side: Side::White,
            legal_moves: &[],
        };
        let mut mover = RandomMover::new("random", Some(1));
        assert!(mover.propose(&request).is_err());
    }
}
