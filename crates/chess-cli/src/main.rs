mod config;
mod game;
mod pgn;
mod terminal;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chess_rules::{RuleEngine, StandardRules};
use chess_session::{
    MoverKind, Session, SessionConfig, SideAssignment, TurnLedger, WriterTranscript,
};
use chess_strategies::load_or_default;
use clap::{Parser, Subcommand};
use config::CliConfig;
use game::{load_checkpoint, save_checkpoint, seats_for, Ending};
use pgn::{write_pgn, PgnHeaders};
use terminal::Terminal;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chess")]
#[command(about = "Play chess against people and engines, pause and resume")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "chess.toml", global = true)]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new game
    Play {
        /// Who plays white: human or ai
        #[arg(short, long)]
        white: Option<MoverKind>,
        /// Who plays black: human or ai
        #[arg(short, long)]
        black: Option<MoverKind>,
        /// Strategy profile for automated moves
        #[arg(short, long)]
        strategy: Option<String>,
        /// Starting position in FEN
        #[arg(long)]
        fen: Option<String>,
        /// Declare a draw once more than this many plies are played
        #[arg(long)]
        max_plies: Option<u32>,
        /// Checkpoint file written after every ply
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Continue a game from its checkpoint file
    Resume {
        checkpoint: PathBuf,
        /// Fork the game after this many plies instead of continuing at the end
        #[arg(long)]
        at: Option<usize>,
        /// Write the continued game here instead of back to the checkpoint
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Print the moves of a saved game after replaying them
    Replay { checkpoint: PathBuf },
    /// Export a saved game as PGN
    Export {
        checkpoint: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the strategy profiles from the configuration
    Strategies,
}

fn player_name(config: &SessionConfig, kind: MoverKind) -> String {
    match kind {
        MoverKind::Human => "human".to_string(),
        MoverKind::Automated => format!("automated ({})", config.strategy),
    }
}

fn run_game(
    rules: &dyn RuleEngine,
    config: &CliConfig,
    mut session: Session,
    save: Option<&Path>,
) -> anyhow::Result<()> {
    let registry = config.registry();
    let terminal = Terminal::stdio();
    let seats = seats_for(&session.config, &registry, &terminal)
        .with_context(|| format!("Strategy '{}' could not be started", session.config.strategy))?;

    println!(
        "{} vs {}",
        player_name(&session.config, session.config.sides.white),
        player_name(&session.config, session.config.sides.black)
    );
    println!("Position: {}", session.ledger.current_position().fen());

    let transcript = WriterTranscript::new(io::stdout());
    match game::play(rules, &mut session, seats, transcript, save)? {
        Ending::Finished => {}
        Ending::Paused => match save {
            Some(path) => println!(
                "Game paused after {} plies. Resume with: chess resume {}",
                session.ledger.len(),
                path.display()
            ),
            None => println!("Game left after {} plies.", session.ledger.len()),
        },
    }
    Ok(())
}

fn replay(rules: &dyn RuleEngine, path: &Path) -> anyhow::Result<()> {
    let session = load_checkpoint(path, rules)?;
    let ledger = &session.ledger;
    println!("Session {} ({} plies, verified)", session.id, ledger.len());
    println!("Start: {}", ledger.initial().fen());

    let mut before = ledger.initial();
    for ply in ledger.plies() {
        let dots = match ply.side() {
            chess_rules::Side::White => ".",
            chess_rules::Side::Black => "...",
        };
        let mut line = format!(
            "{}{dots} {} ({}) {}",
            before.fullmove_number(),
            ply.side().title(),
            ply.mover.kind,
            ply.san
        );
        if let Some(rejected) = &ply.rejected_input {
            line.push_str(&format!(" [replaced {rejected}]"));
        }
        if !ply.comment.is_empty() {
            line.push_str(&format!(": {}", ply.comment));
        }
        println!("{line}");
        before = &ply.position;
    }

    match ledger.summary() {
        Some(summary) => println!("{summary}"),
        None => println!("{} to move.", ledger.side_to_move().title()),
    }
    Ok(())
}

fn export(rules: &dyn RuleEngine, path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let session = load_checkpoint(path, rules)?;
    let headers = PgnHeaders {
        event: format!("Session {}", session.id),
        white: player_name(&session.config, session.config.sides.white),
        black: player_name(&session.config, session.config.sides.black),
        date: session.created_at,
    };
    match output {
        Some(out) => {
            let mut file = std::fs::File::create(out)
                .with_context(|| format!("Failed to create {}", out.display()))?;
            write_pgn(&mut file, &session.ledger, &headers)?;
        }
        None => write_pgn(&mut io::stdout().lock(), &session.ledger, &headers)?,
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config: CliConfig = load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let rules = StandardRules;

    match cli.command {
        Commands::Play {
            white,
            black,
            strategy,
            fen,
            max_plies,
            save,
        } => {
            let defaults = &config.session;
            let session_config = SessionConfig {
                sides: SideAssignment::new(
                    white.unwrap_or(defaults.sides.white),
                    black.unwrap_or(defaults.sides.black),
                ),
                max_plies: max_plies.unwrap_or(defaults.max_plies),
                strategy: strategy.unwrap_or_else(|| defaults.strategy.clone()),
                max_attempts: defaults.max_attempts,
            };
            let initial = match fen {
                Some(fen) => rules
                    .parse_position(&fen)
                    .with_context(|| format!("Invalid starting position '{fen}'"))?,
                None => rules.starting_position(),
            };
            let session = Session::start(TurnLedger::new(initial), session_config);
            run_game(&rules, &config, session, save.as_deref())
        }
        Commands::Resume {
            checkpoint,
            at,
            save,
        } => {
            let mut session = load_checkpoint(&checkpoint, &rules)?;
            if let Some(plies) = at {
                let fork = session
                    .ledger
                    .rewind(plies)
                    .with_context(|| format!("Cannot fork at ply {plies}"))?;
                session = Session::start(fork, session.config);
            } else if session.ledger.is_finished() {
                bail!(
                    "The game is over: {}",
                    session.ledger.summary().unwrap_or_default()
                );
            }
            let save = save.unwrap_or(checkpoint);
            run_game(&rules, &config, session, Some(&save))
        }
        Commands::Replay { checkpoint } => replay(&rules, &checkpoint),
        Commands::Export { checkpoint, output } => export(&rules, &checkpoint, output.as_deref()),
        Commands::Strategies => {
            let registry = config.registry();
            for name in registry.names() {
                let marker = if name == config.session.strategy { " (default)" } else { "" };
                println!("{name}{marker}");
            }
            Ok(())
        }
    }
}
