//! UCI (Universal Chess Interface) engines as move strategies.
//!
//! [`UciClient`] spawns a UCI-compatible engine as a subprocess and speaks
//! the protocol over its stdin/stdout. [`UciEngine`] wraps a client as a
//! [`Strategy`]: every proposal sends the current FEN, runs a search and
//! turns the engine's last reported evaluation into the move comment.
//!
//! # Example
//!
//! ```no_run
//! use chess_strategies::uci::UciClient;
//!
//! let mut client = UciClient::spawn("/usr/bin/stockfish", &[]).unwrap();
//! client.init().unwrap();
//! client.set_position("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
//! let (best_move, info) = client.go("movetime 1000").unwrap();
//! println!("Best move: {best_move} ({})", info.describe());
//! client.quit().unwrap();
//! ```

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use chess_session::{MoveRequest, Proposal, Strategy, StrategyError};
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors that can occur when communicating with a UCI engine.
#[derive(Error, Debug)]
pub enum UciError {
    /// Failed to spawn the engine process or perform I/O operations.
    #[error("Failed to spawn process: {0}")]
    SpawnError(#[from] std::io::Error),
    /// The engine closed its output before answering.
    #[error("Engine closed the connection")]
    Closed,
    /// The engine returned an invalid or unexpected response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Search details reported by the engine in `info` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchInfo {
    pub depth: Option<u32>,
    /// Evaluation in centipawns from the mover's point of view.
    pub score_cp: Option<i32>,
    /// Moves to mate; negative if the mover is getting mated.
    pub mate: Option<i32>,
}

impl SearchInfo {
    /// Folds one `info` line into the running totals.
    pub fn update(&mut self, line: &str) {
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                "depth" => {
                    if let Some(depth) = tokens.next().and_then(|t| t.parse().ok()) {
                        self.depth = Some(depth);
                    }
                }
                "score" => match (tokens.next(), tokens.next().and_then(|t| t.parse().ok())) {
                    (Some("cp"), Some(cp)) => {
                        self.score_cp = Some(cp);
                        self.mate = None;
                    }
                    (Some("mate"), Some(moves)) => {
                        self.mate = Some(moves);
                        self.score_cp = None;
                    }
                    _ => {}
                },
                // The principal variation runs to the end of the line.
                "pv" => break,
                _ => {}
            }
        }
    }

    /// Short human-readable evaluation, e.g. `depth 12, eval +0.35`.
    pub fn describe(&self) -> String {
        let eval = match (self.mate, self.score_cp) {
            (Some(moves), _) => Some(format!("mate in {moves}")),
            (None, Some(cp)) => Some(format!("eval {:+.2}", f64::from(cp) / 100.0)),
            (None, None) => None,
        };
        match (self.depth, eval) {
            (Some(depth), Some(eval)) => format!("depth {depth}, {eval}"),
            (Some(depth), None) => format!("depth {depth}"),
            (None, Some(eval)) => eval,
            (None, None) => String::new(),
        }
    }
}

/// A client for communicating with a UCI-compatible chess engine.
///
/// # Lifecycle
///
/// 1. Spawn the engine with [`UciClient::spawn`]
/// 2. Initialize the UCI protocol with [`UciClient::init`]
/// 3. Set positions and request moves with [`UciClient::set_position`] and [`UciClient::go`]
/// 4. Clean up with [`UciClient::quit`] (or rely on [`Drop`] implementation)
pub struct UciClient {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// The engine's name as reported during UCI initialization.
    pub name: String,
}

impl UciClient {
    /// Spawns a new UCI engine process.
    ///
    /// The process is not yet initialized for UCI communication; call
    /// [`init`](Self::init) after spawning.
    ///
    /// # Errors
    ///
    /// Returns [`UciError::SpawnError`] if the process cannot be spawned,
    /// typically because the executable doesn't exist or lacks permissions.
    pub fn spawn<P: AsRef<Path>>(path: P, args: &[String]) -> Result<Self, UciError> {
        let mut process = Command::new(path.as_ref())
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| UciError::InvalidResponse("engine stdin not piped".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| UciError::InvalidResponse("engine stdout not piped".into()))?;

        Ok(Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            name: String::new(),
        })
    }

    /// Sends a command to the UCI engine.
    pub fn send(&mut self, cmd: &str) -> Result<(), UciError> {
        debug!(cmd, "uci >");
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Reads a single line from the engine's stdout, trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`UciError::Closed`] if the engine has exited.
    pub fn read_line(&mut self) -> Result<String, UciError> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(UciError::Closed);
        }
        Ok(line.trim().to_string())
    }

    /// Runs the `uci` / `isready` handshake and records the engine's name.
    pub fn init(&mut self) -> Result<(), UciError> {
        self.send("uci")?;
        loop {
            let line = self.read_line()?;
            if let Some(name) = line.strip_prefix("id name ") {
                self.name = name.to_string();
            }
            if line == "uciok" {
                break;
            }
        }
        self.ready()
    }

    /// Sends `isready` and waits for `readyok`.
    pub fn ready(&mut self) -> Result<(), UciError> {
        self.send("isready")?;
        while self.read_line()? != "readyok" {}
        Ok(())
    }

    /// Sets the position to search from.
    pub fn set_position(&mut self, fen: &str) -> Result<(), UciError> {
        self.send(&format!("position fen {fen}"))
    }

    /// Runs a search and returns the best move with its search details.
    ///
    /// # Arguments
    ///
    /// * `time_control` - Time control parameters (e.g., `"movetime 1000"`,
    ///   `"depth 10"`, `"wtime 60000 btime 60000"`).
    pub fn go(&mut self, time_control: &str) -> Result<(String, SearchInfo), UciError> {
        self.send(&format!("go {time_control}"))?;

        let mut info = SearchInfo::default();
        loop {
            let line = self.read_line()?;
            if line.starts_with("info ") {
                info.update(&line);
            } else if let Some(rest) = line.strip_prefix("bestmove") {
                let bestmove = rest.split_whitespace().next().unwrap_or_default();
                return Ok((bestmove.to_string(), info));
            }
        }
    }

    /// Sends `quit` and waits for the process to exit.
    pub fn quit(&mut self) -> Result<(), UciError> {
        self.send("quit")?;
        let _ = self.process.wait();
        Ok(())
    }
}

impl Drop for UciClient {
    fn drop(&mut self) {
        let _ = self.send("quit");
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// A UCI engine playing as an automated mover.
///
/// The engine process lives as long as this value; dropping it kills the
/// process.
pub struct UciEngine {
    profile: String,
    client: UciClient,
    time_control: String,
}

impl UciEngine {
    /// Spawns and initializes the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be started or does not
    /// complete the handshake.
    pub fn start<P: AsRef<Path>>(
        profile: impl Into<String>,
        path: P,
        args: &[String],
        time_control: impl Into<String>,
    ) -> Result<Self, UciError> {
        let mut client = UciClient::spawn(path, args)?;
        client.init()?;
        client.send("ucinewgame")?;
        client.ready()?;
        Ok(UciEngine {
            profile: profile.into(),
            client,
            time_control: time_control.into(),
        })
    }

    /// Name reported by the engine.
    pub fn engine_name(&self) -> &str {
        &self.client.name
    }
}

impl Strategy for UciEngine {
    fn name(&self) -> &str {
        &self.profile
    }

    #[instrument(skip(self, request), fields(profile = %self.profile, side = %request.side))]
    fn propose(&mut self, request: &MoveRequest<'_>) -> Result<Proposal, StrategyError> {
        let unavailable = |e: UciError| StrategyError::Unavailable(e.to_string());
        self.client
            .set_position(request.position.fen())
            .map_err(unavailable)?;
        let (bestmove, info) = self.client.go(&self.time_control).map_err(unavailable)?;

        if bestmove.is_empty() || bestmove == "(none)" || bestmove == "0000" {
            return Err(StrategyError::BadReply(format!(
                "engine returned no move ('{bestmove}')"
            )));
        }
        debug!(%bestmove, depth = ?info.depth, "engine answered");
        Ok(Proposal::new(bestmove, info.describe()))
    }
}
