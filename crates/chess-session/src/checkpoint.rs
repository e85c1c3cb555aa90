//! Persistent snapshots of a session.
//!
//! A [`Checkpoint`] holds everything needed to rebuild a session in a fresh
//! process: the ledger (initial position plus every ply), the session
//! configuration and timestamps. The side to move and outcome are stored
//! redundantly so that stores can index them and restores can detect
//! damaged data.

use chess_rules::{RuleEngine, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::SessionConfig;
use crate::ledger::{LedgerError, Outcome, TurnLedger};

/// Current checkpoint format.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Errors raised while saving, loading or restoring checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("checkpoint database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("unsupported checkpoint version {0}")]
    UnsupportedVersion(u32),

    #[error("invalid session id '{0}'")]
    InvalidId(String),

    #[error("checkpoint {id} is inconsistent: {reason}")]
    Inconsistent { id: String, reason: String },

    #[error("checkpoint ledger is invalid: {0}")]
    Ledger(#[from] LedgerError),
}

/// A live session: its id, history and settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub ledger: TurnLedger,
    pub config: SessionConfig,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Starts a session with a fresh id.
    pub fn start(ledger: TurnLedger, config: SessionConfig) -> Self {
        Session {
            id: uuid::Uuid::new_v4().to_string(),
            ledger,
            config,
            created_at: Utc::now(),
        }
    }
}

/// Serialized form of a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub id: String,
    pub side_to_move: Side,
    pub outcome: Outcome,
    pub config: SessionConfig,
    pub ledger: TurnLedger,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Captures the current state of a session.
    pub fn capture(session: &Session) -> Self {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            id: session.id.clone(),
            side_to_move: session.ledger.side_to_move(),
            outcome: session.ledger.outcome(),
            config: session.config.clone(),
            ledger: session.ledger.clone(),
            created_at: session.created_at,
            updated_at: Utc::now(),
        }
    }

    /// Rebuilds the session, replaying the ledger through `rules`.
    ///
    /// # Errors
    ///
    /// Fails on an unknown format version, when the redundant side-to-move
    /// or outcome fields disagree with the ledger, or when the ledger does
    /// not replay cleanly.
    pub fn restore(self, rules: &dyn RuleEngine) -> Result<Session, CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion(self.version));
        }
        if self.side_to_move != self.ledger.side_to_move() {
            return Err(CheckpointError::Inconsistent {
                id: self.id,
                reason: format!(
                    "side to move is {} but the ledger says {}",
                    self.side_to_move,
                    self.ledger.side_to_move()
                ),
            });
        }
        if self.outcome != self.ledger.outcome() {
            return Err(CheckpointError::Inconsistent {
                id: self.id,
                reason: format!(
                    "outcome is {} but the ledger says {}",
                    self.outcome,
                    self.ledger.outcome()
                ),
            });
        }
        self.ledger.verify(rules)?;

        Ok(Session {
            id: self.id,
            ledger: self.ledger,
            config: self.config,
            created_at: self.created_at,
        })
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the checkpoint as JSON to `path`.
    ///
    /// The JSON goes to `<path>.tmp` first and is renamed over `path`, so a
    /// crash never leaves a half-written file behind.
    pub fn write_to(&self, path: &Path) -> Result<(), CheckpointError> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, self.to_json()?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, CheckpointError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Where checkpoints are kept.
///
/// Implementations are shared between threads; each call is atomic with
/// respect to a single checkpoint.
pub trait CheckpointStore: Send + Sync {
    /// Inserts or replaces the checkpoint stored under `checkpoint.id`.
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    fn load(&self, id: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Removes a checkpoint, returning whether one existed.
    fn delete(&self, id: &str) -> Result<bool, CheckpointError>;

    /// Ids of all stored checkpoints, oldest first.
    fn list(&self) -> Result<Vec<String>, CheckpointError>;
}
