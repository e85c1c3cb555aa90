//! Session lifecycle on top of a checkpoint store.
//!
//! The controller holds no game state of its own. Every call loads the
//! session's checkpoint, rebuilds a [`TurnLoop`] from the ledger, runs it
//! and saves the result, so a process restart loses nothing.

use chess_rules::{NotationError, RuleEngine, RulesError, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::info;

use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointStore, Session};
use crate::config::{SessionConfig, SideAssignment};
use crate::ledger::{LedgerError, Outcome, Termination, TurnLedger};
use crate::ply::{MoverKind, Ply};
use crate::source::{
    AutomatedSource, HumanSource, MoveError, MoveRequest, MoveSource, Proposal, Seats, Strategy,
    StrategyError,
};
use crate::transcript::TracingTranscript;
use crate::turn_loop::{Advance, TurnError, TurnLoop};

/// Errors surfaced by [`SessionController`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(String),

    #[error("session {id} already finished ({outcome})")]
    AlreadyFinished { id: String, outcome: Outcome },

    #[error("malformed move '{input}': {source}")]
    MalformedInput {
        input: String,
        #[source]
        source: NotationError,
    },

    #[error("{side} is played by a human and needs a move")]
    InputRequired { side: Side },

    #[error("invalid position: {0}")]
    InvalidPosition(String),

    #[error("strategy unavailable: {0}")]
    StrategyUnavailable(String),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Builds strategies from profile names.
pub trait StrategyFactory: Send + Sync {
    /// Returns true if `name` is a known profile.
    fn contains(&self, name: &str) -> bool;

    fn build(&self, name: &str) -> Result<Box<dyn Strategy>, StrategyError>;
}

/// Parameters for a new session; anything left out uses the controller's
/// defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSession {
    /// Starting position as FEN; the standard start if absent or empty.
    pub initial_fen: Option<String>,
    pub sides: Option<SideAssignment>,
    pub max_plies: Option<u32>,
    pub strategy: Option<String>,
}

/// A read-only view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub id: String,
    /// Current position as FEN.
    pub board_state: String,
    pub side_to_move: Side,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<Termination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub ply_count: usize,
    /// Kind of mover expected next; absent once the game is over.
    pub awaiting: Option<MoverKind>,
    pub last_ply: Option<Ply>,
    pub config: SessionConfig,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    fn of(session: &Session) -> Self {
        let ledger = &session.ledger;
        let side = ledger.side_to_move();
        Snapshot {
            id: session.id.clone(),
            board_state: ledger.current_position().fen().to_string(),
            side_to_move: side,
            outcome: ledger.outcome(),
            termination: ledger.termination(),
            summary: ledger.summary(),
            ply_count: ledger.len(),
            awaiting: (!ledger.is_finished()).then(|| session.config.sides.get(side)),
            last_ply: ledger.last().cloned(),
            config: session.config.clone(),
            created_at: session.created_at,
        }
    }
}

/// Builds its strategy on first use, so seats that never move cost nothing.
struct Deferred {
    name: String,
    factory: Arc<dyn StrategyFactory>,
    built: Option<Box<dyn Strategy>>,
}

impl Strategy for Deferred {
    fn name(&self) -> &str {
        &self.name
    }

    fn propose(&mut self, request: &MoveRequest<'_>) -> Result<Proposal, StrategyError> {
        let strategy = match &mut self.built {
            Some(strategy) => strategy,
            slot => slot.insert(self.factory.build(&self.name)?),
        };
        strategy.propose(request)
    }
}

/// Creates, advances, inspects and discards sessions.
///
/// `advance` calls on the same session are serialized; different sessions
/// run in parallel. Strategies live for one `advance` call only and are
/// built from the factory again on the next automated ply.
pub struct SessionController {
    rules: Arc<dyn RuleEngine>,
    store: Arc<dyn CheckpointStore>,
    strategies: Arc<dyn StrategyFactory>,
    defaults: SessionConfig,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionController {
    pub fn new(
        rules: Arc<dyn RuleEngine>,
        store: Arc<dyn CheckpointStore>,
        strategies: Arc<dyn StrategyFactory>,
    ) -> Self {
        SessionController {
            rules,
            store,
            strategies,
            defaults: SessionConfig::default(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the configuration used for fields a [`NewSession`] leaves out.
    pub fn with_defaults(mut self, defaults: SessionConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &SessionConfig {
        &self.defaults
    }

    /// Starts a session and stores its first checkpoint.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidPosition`] if the FEN is rejected by the rules
    /// - [`SessionError::StrategyUnavailable`] if the strategy profile is unknown
    pub fn create_session(&self, request: NewSession) -> Result<Snapshot, SessionError> {
        let initial = match request.initial_fen.as_deref().map(str::trim) {
            Some(fen) if !fen.is_empty() => self
                .rules
                .parse_position(fen)
                .map_err(|e| SessionError::InvalidPosition(e.to_string()))?,
            _ => self.rules.starting_position(),
        };

        let config = SessionConfig {
            sides: request.sides.unwrap_or(self.defaults.sides),
            max_plies: request.max_plies.unwrap_or(self.defaults.max_plies),
            strategy: request
                .strategy
                .unwrap_or_else(|| self.defaults.strategy.clone()),
            max_attempts: self.defaults.max_attempts,
        };
        if !self.strategies.contains(&config.strategy) {
            return Err(SessionError::StrategyUnavailable(
                StrategyError::Unknown(config.strategy).to_string(),
            ));
        }

        let session = Session::start(TurnLedger::new(initial), config);
        self.store.save(&Checkpoint::capture(&session))?;
        info!(
            session_id = %session.id,
            white = %session.config.sides.white,
            black = %session.config.sides.black,
            strategy = %session.config.strategy,
            "session created"
        );
        Ok(Snapshot::of(&session))
    }

    /// Plays one ply of a session.
    ///
    /// `input` is the move for the side to move, if the caller has one.
    /// Without it an automated seat moves; a human seat fails with
    /// [`SessionError::InputRequired`].
    pub fn advance(&self, id: &str, input: Option<&str>) -> Result<Advance, SessionError> {
        self.advance_and_snapshot(id, input).map(|(advance, _)| advance)
    }

    /// Like [`advance`](Self::advance), and also returns the session as this
    /// ply left it, taken before any other call on the session can run.
    pub fn advance_and_snapshot(
        &self,
        id: &str,
        input: Option<&str>,
    ) -> Result<(Advance, Snapshot), SessionError> {
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.advance_locked(id, input)
        };
        self.release(id, &lock);
        result
    }

    fn advance_locked(
        &self,
        id: &str,
        input: Option<&str>,
    ) -> Result<(Advance, Snapshot), SessionError> {
        let Session {
            id: session_id,
            ledger,
            config,
            created_at,
        } = self.load(id)?;
        if ledger.is_finished() {
            return Err(SessionError::AlreadyFinished {
                id: session_id,
                outcome: ledger.outcome(),
            });
        }

        let seats = self.seats_for(&config);
        let mut turn_loop = TurnLoop::new(self.rules.as_ref(), ledger, seats, config.max_plies)
            .with_transcript(TracingTranscript::for_session(id));
        let advance = turn_loop
            .advance(input)
            .map_err(|e| session_error(id, e))?;

        let session = Session {
            id: session_id,
            ledger: turn_loop.into_ledger(),
            config,
            created_at,
        };
        self.store.save(&Checkpoint::capture(&session))?;
        Ok((advance, Snapshot::of(&session)))
    }

    pub fn snapshot(&self, id: &str) -> Result<Snapshot, SessionError> {
        Ok(Snapshot::of(&self.load(id)?))
    }

    /// Full history of a session.
    pub fn ledger(&self, id: &str) -> Result<TurnLedger, SessionError> {
        Ok(self.load(id)?.ledger)
    }

    /// Snapshots of all stored sessions, oldest first.
    pub fn list(&self) -> Result<Vec<Snapshot>, SessionError> {
        self.store
            .list()?
            .iter()
            .map(|id| self.snapshot(id))
            .collect()
    }

    /// Deletes a session.
    pub fn discard(&self, id: &str) -> Result<(), SessionError> {
        let lock = self.lock_for(id);
        let removed = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.store.delete(id)
        };
        self.release(id, &lock);
        if !removed? {
            return Err(SessionError::NotFound(id.to_string()));
        }
        info!(session_id = %id, "session discarded");
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Session, SessionError> {
        let checkpoint = match self.store.load(id) {
            Ok(Some(checkpoint)) => checkpoint,
            Ok(None) | Err(CheckpointError::InvalidId(_)) => {
                return Err(SessionError::NotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(checkpoint.restore(self.rules.as_ref())?)
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    /// Drops the lock entry for `id` once no other call holds or waits on it.
    fn release(&self, id: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one held by the caller.
        let idle = locks
            .get(id)
            .is_some_and(|entry| Arc::ptr_eq(entry, lock) && Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(id);
        }
    }

    fn automated(&self, config: &SessionConfig) -> AutomatedSource {
        let deferred = Deferred {
            name: config.strategy.clone(),
            factory: Arc::clone(&self.strategies),
            built: None,
        };
        AutomatedSource::new(Box::new(deferred), config.max_attempts)
    }

    fn seats_for(&self, config: &SessionConfig) -> Seats {
        let seat = |kind| match kind {
            MoverKind::Human => MoveSource::Human(HumanSource::remote()),
            MoverKind::Automated => MoveSource::Automated(self.automated(config)),
        };
        let seats = Seats::new(seat(config.sides.white), seat(config.sides.black));
        if config.sides.has_human() {
            seats.with_fallback(self.automated(config))
        } else {
            seats
        }
    }
}

fn session_error(id: &str, e: TurnError) -> SessionError {
    match e {
        TurnError::Finished(outcome) => SessionError::AlreadyFinished {
            id: id.to_string(),
            outcome,
        },
        TurnError::Move(MoveError::Malformed { input, source }) => {
            SessionError::MalformedInput { input, source }
        }
        TurnError::Move(MoveError::InputRequired { side }) => SessionError::InputRequired { side },
        TurnError::Move(MoveError::Rules(e)) | TurnError::Rules(e) => SessionError::Rules(e),
        TurnError::Move(e) => SessionError::StrategyUnavailable(e.to_string()),
        TurnError::Ledger(e) => SessionError::Ledger(e),
    }
}
