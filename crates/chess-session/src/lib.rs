//! Suspend/resume chess sessions.
//!
//! A session is a game between two seats, each played by a human or by an
//! automated strategy. The [`TurnLoop`] advances the game one ply at a
//! time and hands control back after every ply, so moves can arrive from a
//! terminal, a network connection or an engine at their own pace.
//!
//! - [`TurnLedger`] is the append-only history of positions and moves
//! - [`MoveSource`] says where each side's moves come from
//! - [`Checkpoint`] and [`CheckpointStore`] persist sessions between calls
//! - [`SessionController`] ties them together behind session ids
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chess_rules::StandardRules;
//! use chess_session::{
//!     MoveRequest, NewSession, Proposal, SessionController, Strategy, StrategyError,
//!     StrategyFactory, store::MemoryStore,
//! };
//!
//! struct FirstLegal;
//!
//! impl Strategy for FirstLegal {
//!     fn name(&self) -> &str { "first" }
//!     fn propose(&mut self, req: &MoveRequest<'_>) -> Result<Proposal, StrategyError> {
//!         Ok(Proposal::new(req.legal_moves[0].to_string(), ""))
//!     }
//! }
//!
//! struct Factory;
//!
//! impl StrategyFactory for Factory {
//!     fn contains(&self, name: &str) -> bool { name == "random" }
//!     fn build(&self, _name: &str) -> Result<Box<dyn Strategy>, StrategyError> {
//!         Ok(Box::new(FirstLegal))
//!     }
//! }
//!
//! let controller = SessionController::new(
//!     Arc::new(StandardRules),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(Factory),
//! );
//! let session = controller.create_session(NewSession::default()).unwrap();
//! let reply = controller.advance(&session.id, Some("e2e4")).unwrap();
//! assert_eq!(reply.ply.unwrap().san, "e4");
//! ```

mod checkpoint;
mod config;
mod controller;
mod ledger;
mod ply;
mod source;
pub mod store;
mod transcript;
mod turn_loop;

pub use checkpoint::{Checkpoint, CheckpointError, CheckpointStore, Session, CHECKPOINT_VERSION};
pub use config::{SessionConfig, SideAssignment, DEFAULT_MAX_PLIES, DEFAULT_STRATEGY};
pub use controller::{NewSession, SessionController, SessionError, Snapshot, StrategyFactory};
pub use ledger::{LedgerError, Outcome, Termination, TurnLedger};
pub use ply::{Mover, MoverKind, Ply};
pub use source::{
    AutomatedSource, Choice, HumanInput, HumanSource, MoveError, MoveRequest, MoveSource,
    Proposal, Seats, Strategy, StrategyError,
};
pub use transcript::{MemoryTranscript, TracingTranscript, Transcript, WriterTranscript};
pub use turn_loop::{Advance, LoopState, Step, TurnError, TurnLoop};
