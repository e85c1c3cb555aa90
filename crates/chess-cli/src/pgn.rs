//! PGN (Portable Game Notation) export of a session ledger.
//!
//! Moves are written in SAN with move numbers. Automated moves carry their
//! comment in braces; a move that replaced an illegal human move says so.

use chess_rules::{Position, Side};
use chess_session::TurnLedger;
use chrono::{DateTime, Utc};
use std::io::{self, Write};

const LINE_WIDTH: usize = 80;

/// Player names and date for the PGN headers.
#[derive(Debug, Clone)]
pub struct PgnHeaders {
    pub event: String,
    pub white: String,
    pub black: String,
    pub date: DateTime<Utc>,
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn move_tokens(ledger: &TurnLedger) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut before = ledger.initial();
    for (i, ply) in ledger.plies().iter().enumerate() {
        let number = before.fullmove_number();
        match ply.side() {
            Side::White => tokens.push(format!("{number}.")),
            Side::Black if i == 0 => tokens.push(format!("{number}...")),
            Side::Black => {}
        }
        tokens.push(ply.san.clone());

        let mut notes = Vec::new();
        if let Some(rejected) = &ply.rejected_input {
            notes.push(format!("replaces illegal {rejected}"));
        }
        if !ply.comment.is_empty() {
            notes.push(ply.comment.replace('}', ")"));
        }
        if !notes.is_empty() {
            tokens.push(format!("{{{}}}", notes.join("; ")));
        }
        before = &ply.position;
    }
    tokens.push(ledger.outcome().result_str().to_string());
    tokens
}

/// Writes the game as PGN.
///
/// A game that did not start from the standard position gets `SetUp` and
/// `FEN` tags.
pub fn write_pgn<W: Write>(out: &mut W, ledger: &TurnLedger, headers: &PgnHeaders) -> io::Result<()> {
    let result = ledger.outcome().result_str();

    writeln!(out, "[Event \"{}\"]", escape(&headers.event))?;
    writeln!(out, "[Site \"local\"]")?;
    writeln!(out, "[Date \"{}\"]", headers.date.format("%Y.%m.%d"))?;
    writeln!(out, "[White \"{}\"]", escape(&headers.white))?;
    writeln!(out, "[Black \"{}\"]", escape(&headers.black))?;
    writeln!(out, "[Result \"{result}\"]")?;
    if ledger.initial().fen() != Position::STARTING_FEN {
        writeln!(out, "[SetUp \"1\"]")?;
        writeln!(out, "[FEN \"{}\"]", ledger.initial().fen())?;
    }
    if let Some(summary) = ledger.summary() {
        writeln!(out, "[Termination \"{}\"]", escape(&summary))?;
    }
    writeln!(out)?;

    let mut line = String::new();
    for token in move_tokens(ledger) {
        if !line.is_empty() && line.len() + 1 + token.len() > LINE_WIDTH {
            writeln!(out, "{line}")?;
            line.clear();
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&token);
    }
    writeln!(out, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_rules::{RuleEngine, StandardRules};
    use chess_session::{HumanSource, MoveSource, Seats, TurnLoop};

    fn headers() -> PgnHeaders {
        PgnHeaders {
            event: "Casual game".to_string(),
            white: "human".to_string(),
            black: "automated (random)".to_string(),
            date: DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    fn played(start: Position, moves: &[&str]) -> TurnLedger {
        let rules = StandardRules;
        let seats = Seats::new(
            MoveSource::Human(HumanSource::remote()),
            MoveSource::Human(HumanSource::remote()),
        );
        let mut turn_loop = TurnLoop::new(&rules, TurnLedger::new(start), seats, 500);
        for mv in moves {
            turn_loop.advance(Some(*mv)).unwrap();
        }
        turn_loop.into_ledger()
    }

    fn render(ledger: &TurnLedger) -> String {
        let mut out = Vec::new();
        write_pgn(&mut out, ledger, &headers()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_finished_game() {
        let ledger = played(Position::starting(), &["f2f3", "e7e5", "g2g4", "d8h4"]);
        let pgn = render(&ledger);

        assert!(pgn.contains("[Date \"2026.03.01\"]"));
        assert!(pgn.contains("[Black \"automated (random)\"]"));
        assert!(pgn.contains("[Result \"0-1\"]"));
        assert!(pgn.contains("[Termination \"Black wins by checkmate.\"]"));
        assert!(!pgn.contains("[FEN"));
        assert!(pgn.trim_end().ends_with("1. f3 e5 2. g4 Qh4 0-1"));
    }

    #[test]
    fn test_black_to_move_start_has_fen_tag() {
        let rules = StandardRules;
        let start = rules
            .parse_position("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
            .unwrap();
        let ledger = played(start, &["e7e5", "g1f3"]);
        let pgn = render(&ledger);

        assert!(pgn.contains("[SetUp \"1\"]"));
        assert!(pgn.contains(&format!("[FEN \"{}\"]", ledger.initial().fen())));
        assert!(pgn.trim_end().ends_with("1... e5 2. Nf3 *"));
    }

    #[test]
    fn test_long_games_wrap() {
        let moves = [
            "e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5", "c2c3", "g8f6", "d2d3", "d7d6",
            "b1d2", "a7a6", "a2a4", "h7h6", "h2h3", "c8e6", "c4b3", "d8e7", "d1e2", "a8d8",
        ];
        let ledger = played(Position::starting(), &moves);
        let pgn = render(&ledger);
        let body: Vec<&str> = pgn.split("\n\n").nth(1).unwrap().lines().collect();
        assert!(body.len() > 1);
        assert!(body.iter().all(|line| line.len() <= LINE_WIDTH));
    }
}
