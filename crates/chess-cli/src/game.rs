//! Local games: seats on one terminal, a checkpoint file after every ply.

use std::io;
use std::path::Path;

use anyhow::Context;
use chess_rules::RuleEngine;
use chess_session::{
    AutomatedSource, Checkpoint, HumanInput, HumanSource, MoveError, MoveSource, MoverKind,
    Seats, Session, SessionConfig, Step, StrategyError, StrategyFactory, Transcript, TurnError,
    TurnLoop,
};
use tracing::{debug, info};

/// Builds the seats of a local game; human sides share `terminal`.
pub fn seats_for<H>(
    config: &SessionConfig,
    strategies: &dyn StrategyFactory,
    terminal: &H,
) -> Result<Seats, StrategyError>
where
    H: HumanInput + Clone + 'static,
{
    let automated = || -> Result<AutomatedSource, StrategyError> {
        Ok(AutomatedSource::new(
            strategies.build(&config.strategy)?,
            config.max_attempts,
        ))
    };
    let seat = |kind| -> Result<MoveSource, StrategyError> {
        Ok(match kind {
            MoverKind::Human => MoveSource::Human(HumanSource::interactive(terminal.clone())),
            MoverKind::Automated => MoveSource::Automated(automated()?),
        })
    };

    let seats = Seats::new(seat(config.sides.white)?, seat(config.sides.black)?);
    if config.sides.has_human() {
        Ok(seats.with_fallback(automated()?))
    } else {
        Ok(seats)
    }
}

pub fn save_checkpoint(path: &Path, session: &Session) -> anyhow::Result<()> {
    Checkpoint::capture(session)
        .write_to(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(session_id = %session.id, path = %path.display(), "checkpoint saved");
    Ok(())
}

/// Reads a checkpoint file and replays its ledger.
pub fn load_checkpoint(path: &Path, rules: &dyn RuleEngine) -> anyhow::Result<Session> {
    let checkpoint = Checkpoint::read_from(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let session = checkpoint
        .restore(rules)
        .with_context(|| format!("Checkpoint {} does not replay", path.display()))?;
    Ok(session)
}

/// How a call to [`play`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ending {
    Finished,
    /// The player left; the game can be resumed from its checkpoint.
    Paused,
}

fn left_the_game(e: &TurnError) -> bool {
    matches!(
        e,
        TurnError::Move(MoveError::Input(e))
            if matches!(e.kind(), io::ErrorKind::UnexpectedEof | io::ErrorKind::Interrupted)
    )
}

/// Plays until the game ends or a human leaves, saving after every ply.
pub fn play(
    rules: &dyn RuleEngine,
    session: &mut Session,
    seats: Seats,
    transcript: impl Transcript + 'static,
    save: Option<&Path>,
) -> anyhow::Result<Ending> {
    let mut turn_loop = TurnLoop::new(
        rules,
        session.ledger.clone(),
        seats,
        session.config.max_plies,
    )
    .with_transcript(transcript);

    if let Some(path) = save {
        save_checkpoint(path, session)?;
    }

    let ending = loop {
        match turn_loop.advance(None) {
            Ok(advance) => {
                session.ledger = turn_loop.ledger().clone();
                if let Some(path) = save {
                    save_checkpoint(path, session)?;
                }
                if matches!(advance.step, Step::Finished { .. }) {
                    break Ending::Finished;
                }
            }
            Err(TurnError::Finished(_)) => break Ending::Finished,
            Err(e) if left_the_game(&e) => {
                info!(session_id = %session.id, plies = session.ledger.len(), "game paused");
                break Ending::Paused;
            }
            Err(e) => return Err(e).context("Game stopped"),
        }
    };
    Ok(ending)
}
