//! The suspend/resume turn state machine.
//!
//! A [`TurnLoop`] advances a game one ply at a time. After every ply it
//! evaluates the new position and either finishes the game or suspends,
//! returning control to the caller together with the side to move and the
//! kind of mover expected next. The caller resumes it with (or without)
//! a move whenever it is ready.
//!
//! ```text
//! Evaluate ──terminal──▶ Finished
//!    │
//!    └──ongoing──▶ Suspended ──resume──▶ Resuming ──ply appended──▶ Evaluate
//! ```
//!
//! All state lives in the [`TurnLedger`]; a loop rebuilt from a ledger
//! behaves exactly like the loop that produced it.

use chess_rules::{Position, RuleEngine, RulesError, Side, Status};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ledger::{LedgerError, Outcome, Termination, TurnLedger};
use crate::ply::{Mover, MoverKind, Ply};
use crate::source::{Choice, HumanSource, MoveError, MoveRequest, Seats};
use crate::transcript::{TracingTranscript, Transcript};

/// Errors that stop a single turn. The loop is left suspended and the
/// ledger unchanged.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("game already finished ({0})")]
    Finished(Outcome),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// The current position has not been classified yet.
    Evaluate,
    /// Waiting for the caller to resume with the next move.
    Suspended { side: Side, expects: MoverKind },
    /// A move is being resolved.
    Resuming,
    /// The game is over.
    Finished,
}

/// What the caller sees when the loop hands back control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Step {
    Suspended {
        side: Side,
        expects: MoverKind,
    },
    Finished {
        outcome: Outcome,
        termination: Termination,
        summary: String,
    },
}

/// Result of one [`TurnLoop::advance`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advance {
    /// The ply appended by this call, if any.
    pub ply: Option<Ply>,
    /// State after the call.
    pub step: Step,
}

/// Drives one game over a [`TurnLedger`].
pub struct TurnLoop<'r> {
    rules: &'r dyn RuleEngine,
    ledger: TurnLedger,
    seats: Seats,
    max_plies: u32,
    state: LoopState,
    transcript: Box<dyn Transcript>,
}

impl<'r> TurnLoop<'r> {
    /// Creates a loop that continues the game recorded in `ledger`.
    ///
    /// # Arguments
    ///
    /// * `rules` - Rule engine used for every legality and terminal check
    /// * `ledger` - History to continue from; a fresh ledger starts a game
    /// * `seats` - Move sources for both sides
    /// * `max_plies` - Plies allowed; the game is drawn once the ledger holds more
    pub fn new(rules: &'r dyn RuleEngine, ledger: TurnLedger, seats: Seats, max_plies: u32) -> Self {
        TurnLoop {
            rules,
            ledger,
            seats,
            max_plies,
            state: LoopState::Evaluate,
            transcript: Box::new(TracingTranscript::default()),
        }
    }

    /// Replaces the default `tracing` transcript.
    pub fn with_transcript(mut self, transcript: impl Transcript + 'static) -> Self {
        self.transcript = Box::new(transcript);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn ledger(&self) -> &TurnLedger {
        &self.ledger
    }

    pub fn into_ledger(self) -> TurnLedger {
        self.ledger
    }

    /// Classifies the current position and either finishes or suspends.
    ///
    /// Rules outcomes take precedence over the ply limit, so a mate on the
    /// last allowed ply still counts as a win.
    pub fn evaluate(&mut self) -> Result<Step, TurnError> {
        if let Some(step) = self.finished_step() {
            self.state = LoopState::Finished;
            return Ok(step);
        }

        let status = self
            .rules
            .status(self.ledger.current_position(), &self.ledger.position_history())?;
        let verdict = match status {
            Status::Checkmate { winner } => Some((Outcome::win_for(winner), Termination::Checkmate)),
            Status::Draw(reason) => Some((Outcome::Draw, reason.into())),
            Status::Ongoing if self.ledger.len() > self.max_plies as usize => {
                Some((Outcome::Draw, Termination::PlyLimit))
            }
            Status::Ongoing => None,
        };

        if let Some((outcome, termination)) = verdict {
            self.ledger.finish(outcome, termination)?;
            let summary = self.ledger.summary().unwrap_or_default();
            info!(%outcome, ?termination, plies = self.ledger.len(), "game finished");
            self.transcript.line(&summary);
            self.state = LoopState::Finished;
            return Ok(Step::Finished {
                outcome,
                termination,
                summary,
            });
        }

        let side = self.ledger.side_to_move();
        let expects = self.seats.kind(side);
        debug!(%side, %expects, ply = self.ledger.len(), "suspended");
        self.state = LoopState::Suspended { side, expects };
        Ok(Step::Suspended { side, expects })
    }

    fn finished_step(&self) -> Option<Step> {
        if !self.ledger.is_finished() {
            return None;
        }
        Some(Step::Finished {
            outcome: self.ledger.outcome(),
            termination: self.ledger.termination()?,
            summary: self.ledger.summary().unwrap_or_default(),
        })
    }

    /// Resolves and appends one ply.
    ///
    /// `input` is move text from the caller. It is used whenever present,
    /// even for an automated seat; without it a human seat reads from its
    /// local channel and an automated seat asks its strategy.
    ///
    /// # Errors
    ///
    /// - [`TurnError::Finished`] if the game is over
    /// - [`MoveError::Malformed`] if caller-supplied text is not a move
    /// - [`MoveError::InputRequired`] if a human seat has no input and no channel
    /// - [`MoveError::Exhausted`] or [`MoveError::Strategy`] if no automated
    ///   mover produced a legal move
    ///
    /// On error the loop stays suspended and the ledger is unchanged.
    pub fn resume(&mut self, input: Option<&str>) -> Result<Ply, TurnError> {
        let (side, expects) = match self.state {
            LoopState::Suspended { side, expects } => (side, expects),
            LoopState::Finished => return Err(TurnError::Finished(self.ledger.outcome())),
            LoopState::Evaluate | LoopState::Resuming => match self.evaluate()? {
                Step::Suspended { side, expects } => (side, expects),
                Step::Finished { outcome, .. } => return Err(TurnError::Finished(outcome)),
            },
        };

        self.state = LoopState::Resuming;
        let before = self.ledger.current_position().clone();
        let resolved = self.resolve(&before, side, input).and_then(|ply| {
            self.ledger.append(ply.clone())?;
            Ok(ply)
        });

        match resolved {
            Ok(ply) => {
                self.transcript.line(&describe(&before, &ply));
                self.state = LoopState::Evaluate;
                Ok(ply)
            }
            Err(e) => {
                self.state = LoopState::Suspended { side, expects };
                Err(e)
            }
        }
    }

    /// Runs the loop until it suspends again or finishes.
    ///
    /// If the game is already decided by the current position (for example
    /// a stalemate start) no ply is played and the finishing step is
    /// returned.
    pub fn advance(&mut self, input: Option<&str>) -> Result<Advance, TurnError> {
        if self.ledger.is_finished() {
            return Err(TurnError::Finished(self.ledger.outcome()));
        }
        if !matches!(self.state, LoopState::Suspended { .. }) {
            if let step @ Step::Finished { .. } = self.evaluate()? {
                return Ok(Advance { ply: None, step });
            }
        }

        let ply = self.resume(input)?;
        let step = self.evaluate()?;
        Ok(Advance {
            ply: Some(ply),
            step,
        })
    }

    fn resolve(
        &mut self,
        position: &Position,
        side: Side,
        input: Option<&str>,
    ) -> Result<Ply, TurnError> {
        let rules = self.rules;
        let legal = rules.legal_moves(position)?;
        let request = MoveRequest {
            position,
            side,
            legal_moves: &legal,
        };

        if input.is_none() && self.seats.kind(side) == MoverKind::Automated {
            let choice = self.seats.automated_mut(side)?.choose(rules, &request)?;
            return Ok(automated_ply(side, choice, None));
        }

        let (text, typed_locally) = match input {
            Some(text) => (text.trim().to_string(), false),
            None => (self.seats.human_mut(side)?.read(&request)?, true),
        };

        let parsed = match HumanSource::parse(&text) {
            Ok(notation) => Some(notation),
            Err(e) if !typed_locally => return Err(e.into()),
            Err(e) => {
                warn!(%side, error = %e, "unreadable move typed");
                None
            }
        };

        if let Some(notation) = parsed {
            match rules.apply(position, &notation) {
                Ok(applied) => {
                    return Ok(Ply {
                        notation,
                        san: applied.san,
                        position: applied.position,
                        comment: String::new(),
                        mover: Mover {
                            side,
                            kind: MoverKind::Human,
                        },
                        rejected_input: None,
                    })
                }
                Err(RulesError::IllegalMove { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        warn!(%side, input = %text, "invalid move, automated mover takes over");
        self.transcript.line(&format!(
            "{} tried {text}: invalid move, an automated mover plays instead.",
            side.title()
        ));
        let choice = self.seats.automated_mut(side)?.choose(rules, &request)?;
        Ok(automated_ply(side, choice, Some(text)))
    }
}

fn automated_ply(side: Side, choice: Choice, rejected_input: Option<String>) -> Ply {
    Ply {
        notation: choice.notation,
        san: choice.applied.san,
        position: choice.applied.position,
        comment: choice.comment,
        mover: Mover {
            side,
            kind: MoverKind::Automated,
        },
        rejected_input,
    }
}

fn describe(before: &Position, ply: &Ply) -> String {
    let dots = match ply.side() {
        Side::White => ".",
        Side::Black => "...",
    };
    let mut line = format!(
        "{}{dots} {} ({}) {}",
        before.fullmove_number(),
        ply.side().title(),
        ply.mover.kind,
        ply.san
    );
    if !ply.comment.is_empty() {
        line.push_str(": ");
        line.push_str(&ply.comment);
    }
    line
}
