//! Move sources: where the next move for a side comes from.

use chess_rules::{
    AppliedMove, NotationError, Position, RuleEngine, RulesError, Side, UciMove,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ply::MoverKind;

/// Everything a mover is told about the position it must move in.
#[derive(Debug, Clone, Copy)]
pub struct MoveRequest<'a> {
    pub position: &'a Position,
    pub side: Side,
    pub legal_moves: &'a [UciMove],
}

/// A move suggestion with an optional rationale.
///
/// The notation is kept as raw text because strategies are not trusted to
/// produce well-formed moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    #[serde(rename = "move")]
    pub notation: String,
    #[serde(default)]
    pub comment: String,
}

impl Proposal {
    pub fn new(notation: impl Into<String>, comment: impl Into<String>) -> Self {
        Proposal {
            notation: notation.into(),
            comment: comment.into(),
        }
    }
}

/// Failures reported by a strategy backend.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("unknown strategy '{0}'")]
    Unknown(String),

    #[error("strategy backend unreachable: {0}")]
    Unavailable(String),

    #[error("strategy reply could not be read: {0}")]
    BadReply(String),
}

/// Something that can suggest moves: an engine, a model, a random picker.
pub trait Strategy: Send {
    /// Short name used in logs and comments.
    fn name(&self) -> &str;

    /// Proposes a move for the side to move.
    fn propose(&mut self, request: &MoveRequest<'_>) -> Result<Proposal, StrategyError>;
}

/// A blocking channel a local human types moves into.
pub trait HumanInput: Send {
    fn read_move(&mut self, request: &MoveRequest<'_>) -> std::io::Result<String>;
}

/// Errors raised while obtaining a move from a source.
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("malformed move '{input}': {source}")]
    Malformed {
        input: String,
        #[source]
        source: NotationError,
    },

    #[error("{side} is played by a human and no move was supplied")]
    InputRequired { side: Side },

    #[error("reading human input failed: {0}")]
    Input(#[from] std::io::Error),

    #[error("no automated mover available for {side}")]
    NoFallback { side: Side },

    #[error("strategy '{name}' found no legal move in {attempts} attempts")]
    Exhausted { name: String, attempts: u32 },

    #[error("strategy '{name}' failed: {source}")]
    Strategy {
        name: String,
        #[source]
        source: StrategyError,
    },

    #[error(transparent)]
    Rules(#[from] RulesError),
}

/// Moves typed by a person, either handed in by the caller or read from a
/// local channel.
#[derive(Default)]
pub struct HumanSource {
    input: Option<Box<dyn HumanInput>>,
}

impl HumanSource {
    /// A human whose moves arrive from the caller (network play).
    pub fn remote() -> Self {
        HumanSource { input: None }
    }

    /// A human reading moves from a local channel.
    pub fn interactive(input: impl HumanInput + 'static) -> Self {
        HumanSource {
            input: Some(Box::new(input)),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.input.is_some()
    }

    /// Parses move text as typed by a person.
    pub fn parse(text: &str) -> Result<UciMove, MoveError> {
        text.parse().map_err(|source| MoveError::Malformed {
            input: text.trim().to_string(),
            source,
        })
    }

    /// Blocks on the local channel for the next move text.
    pub fn read(&mut self, request: &MoveRequest<'_>) -> Result<String, MoveError> {
        let input = self
            .input
            .as_mut()
            .ok_or(MoveError::InputRequired { side: request.side })?;
        Ok(input.read_move(request)?.trim().to_string())
    }
}

/// A legal move picked by an automated source, already applied.
#[derive(Debug, Clone)]
pub struct Choice {
    pub notation: UciMove,
    pub applied: AppliedMove,
    pub comment: String,
}

/// A strategy wrapped in a bounded retry loop.
pub struct AutomatedSource {
    strategy: Box<dyn Strategy>,
    max_attempts: u32,
}

impl AutomatedSource {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    pub fn new(strategy: Box<dyn Strategy>, max_attempts: u32) -> Self {
        AutomatedSource {
            strategy,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn name(&self) -> &str {
        self.strategy.name()
    }

    /// Asks the strategy until it proposes a legal move.
    ///
    /// Malformed and illegal proposals are retried up to the attempt bound.
    /// Backend failures end the loop immediately.
    pub fn choose(
        &mut self,
        rules: &dyn RuleEngine,
        request: &MoveRequest<'_>,
    ) -> Result<Choice, MoveError> {
        for attempt in 1..=self.max_attempts {
            let proposal =
                self.strategy
                    .propose(request)
                    .map_err(|source| MoveError::Strategy {
                        name: self.strategy.name().to_string(),
                        source,
                    })?;

            let notation = match proposal.notation.parse::<UciMove>() {
                Ok(notation) => notation,
                Err(e) => {
                    warn!(strategy = self.name(), attempt, error = %e, "malformed proposal");
                    continue;
                }
            };

            match rules.apply(request.position, &notation) {
                Ok(applied) => {
                    debug!(strategy = self.name(), attempt, mv = %notation, "proposal accepted");
                    return Ok(Choice {
                        notation,
                        applied,
                        comment: proposal.comment,
                    });
                }
                Err(RulesError::IllegalMove { .. }) => {
                    warn!(strategy = self.name(), attempt, mv = %notation, "illegal proposal");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(MoveError::Exhausted {
            name: self.name().to_string(),
            attempts: self.max_attempts,
        })
    }
}

/// How one side of a game gets its moves.
pub enum MoveSource {
    Human(HumanSource),
    Automated(AutomatedSource),
}

impl MoveSource {
    pub fn kind(&self) -> MoverKind {
        match self {
            MoveSource::Human(_) => MoverKind::Human,
            MoveSource::Automated(_) => MoverKind::Automated,
        }
    }
}

/// The move sources of both sides plus the stand-in used when a human
/// seat's move is rejected.
pub struct Seats {
    white: MoveSource,
    black: MoveSource,
    fallback: Option<AutomatedSource>,
}

impl Seats {
    pub fn new(white: MoveSource, black: MoveSource) -> Self {
        Seats {
            white,
            black,
            fallback: None,
        }
    }

    /// Sets the automated source that moves for human seats after an
    /// illegal move.
    pub fn with_fallback(mut self, fallback: AutomatedSource) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn kind(&self, side: Side) -> MoverKind {
        match side {
            Side::White => self.white.kind(),
            Side::Black => self.black.kind(),
        }
    }

    fn seat_mut(&mut self, side: Side) -> &mut MoveSource {
        match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        }
    }

    /// The human source of `side`; an automated seat has none.
    pub fn human_mut(&mut self, side: Side) -> Result<&mut HumanSource, MoveError> {
        match self.seat_mut(side) {
            MoveSource::Human(source) => Ok(source),
            MoveSource::Automated(_) => Err(MoveError::InputRequired { side }),
        }
    }

    /// The automated source that moves for `side`: the seat itself when it
    /// is automated, otherwise the fallback.
    pub fn automated_mut(&mut self, side: Side) -> Result<&mut AutomatedSource, MoveError> {
        let seat = match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        };
        match seat {
            MoveSource::Automated(source) => Ok(source),
            MoveSource::Human(_) => self.fallback.as_mut().ok_or(MoveError::NoFallback { side }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_rules::StandardRules;
    use std::collections::VecDeque;

    /// Replays canned proposals, then fails.
    struct Scripted {
        replies: VecDeque<&'static str>,
        calls: u32,
    }

    impl Scripted {
        fn new(replies: &[&'static str]) -> Self {
            Scripted {
                replies: replies.iter().copied().collect(),
                calls: 0,
            }
        }
    }

    impl Strategy for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn propose(&mut self, _request: &MoveRequest<'_>) -> Result<Proposal, StrategyError> {
            self.calls += 1;
            self.replies
                .pop_front()
                .map(|m| Proposal::new(m, format!("try {m}")))
                .ok_or_else(|| StrategyError::Unavailable("script exhausted".into()))
        }
    }

    fn request<'a>(position: &'a Position, legal: &'a [UciMove]) -> MoveRequest<'a> {
        MoveRequest {
            position,
            side: position.side_to_move(),
            legal_moves: legal,
        }
    }

    #[test]
    fn automated_source_retries_until_legal() {
        let rules = StandardRules;
        let start = rules.starting_position();
        let legal = rules.legal_moves(&start).unwrap();
        let mut source =
            AutomatedSource::new(Box::new(Scripted::new(&["zz9", "e2e5", "d2d4"])), 5);

        let choice = source.choose(&rules, &request(&start, &legal)).unwrap();
        assert_eq!(choice.notation.to_string(), "d2d4");
        assert_eq!(choice.applied.san, "d4");
        assert_eq!(choice.comment, "try d2d4");
    }

    #[test]
    fn automated_source_gives_up_after_bound() {
        let rules = StandardRules;
        let start = rules.starting_position();
        let legal = rules.legal_moves(&start).unwrap();
        let mut source =
            AutomatedSource::new(Box::new(Scripted::new(&["e2e5", "e2e6", "a1a8", "d2d4"])), 3);

        let err = source.choose(&rules, &request(&start, &legal)).unwrap_err();
        assert!(matches!(err, MoveError::Exhausted { attempts: 3, .. }));
    }

    #[test]
    fn automated_source_surfaces_backend_failure() {
        let rules = StandardRules;
        let start = rules.starting_position();
        let legal = rules.legal_moves(&start).unwrap();
        let mut source = AutomatedSource::new(Box::new(Scripted::new(&[])), 5);

        let err = source.choose(&rules, &request(&start, &legal)).unwrap_err();
        assert!(matches!(err, MoveError::Strategy { .. }));
    }

    #[test]
    fn zero_attempts_means_one() {
        let source = AutomatedSource::new(Box::new(Scripted::new(&[])), 0);
        assert_eq!(source.max_attempts, 1);
    }

    #[test]
    fn human_parse_reports_malformed_text() {
        assert_eq!(HumanSource::parse(" e2e4 ").unwrap().to_string(), "e2e4");
        let err = HumanSource::parse("zz9").unwrap_err();
        assert!(matches!(err, MoveError::Malformed { ref input, .. } if input == "zz9"));
    }

    #[test]
    fn remote_human_requires_input() {
        let start = Position::starting();
        let mut human = HumanSource::remote();
        let err = human.read(&request(&start, &[])).unwrap_err();
        assert!(matches!(err, MoveError::InputRequired { side: Side::White }));
    }

    #[test]
    fn seats_route_fallback() {
        let mut seats = Seats::new(
            MoveSource::Human(HumanSource::remote()),
            MoveSource::Automated(AutomatedSource::new(Box::new(Scripted::new(&[])), 1)),
        );
        assert_eq!(seats.kind(Side::White), MoverKind::Human);
        assert_eq!(seats.kind(Side::Black), MoverKind::Automated);
        assert!(matches!(
            seats.automated_mut(Side::White),
            Err(MoveError::NoFallback { side: Side::White })
        ));
        assert!(seats.automated_mut(Side::Black).is_ok());
        assert!(seats.human_mut(Side::Black).is_err());

        let mut seats = seats.with_fallback(AutomatedSource::new(
            Box::new(Scripted::new(&["e2e4"])),
            1,
        ));
        assert_eq!(seats.automated_mut(Side::White).unwrap().name(), "scripted");
    }
}
