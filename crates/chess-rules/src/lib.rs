//! Rule engine boundary for chess sessions.
//!
//! This crate provides the value types exchanged between a session and the
//! rules of the game:
//! - [`Side`] for the two players
//! - [`Square`] and [`UciMove`] for long-form move notation
//! - [`Position`] as an immutable FEN snapshot
//! - [`RuleEngine`] as the legality / application / terminal-state capability
//!
//! [`StandardRules`] implements [`RuleEngine`] for standard chess on top of
//! the `shakmaty` crate. Every call takes a [`Position`] value and returns a
//! new one; no board state is held between calls.
//!
//! # Example
//!
//! ```
//! use chess_rules::{RuleEngine, StandardRules, Side, UciMove};
//!
//! let rules = StandardRules;
//! let start = rules.starting_position();
//! let mv: UciMove = "e2e4".parse().unwrap();
//! let applied = rules.apply(&start, &mv).unwrap();
//! assert_eq!(applied.san, "e4");
//! assert_eq!(applied.position.side_to_move(), Side::Black);
//! ```

mod notation;
mod position;
mod rules;
mod side;
mod standard;

pub use notation::{NotationError, Promotion, Square, UciMove};
pub use position::Position;
pub use rules::{AppliedMove, DrawReason, RuleEngine, RulesError, Status};
pub use side::Side;
pub use standard::StandardRules;
