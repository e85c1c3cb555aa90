//! Human-readable commentary sinks for a running game.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Receives one line per ply and one closing line per game.
pub trait Transcript: Send {
    fn line(&mut self, text: &str);
}

/// Logs transcript lines through `tracing` at info level.
#[derive(Debug, Clone, Default)]
pub struct TracingTranscript {
    session: Option<String>,
}

impl TracingTranscript {
    pub fn for_session(id: impl Into<String>) -> Self {
        TracingTranscript {
            session: Some(id.into()),
        }
    }
}

impl Transcript for TracingTranscript {
    fn line(&mut self, text: &str) {
        match &self.session {
            Some(id) => info!(target: "transcript", session_id = %id, "{text}"),
            None => info!(target: "transcript", "{text}"),
        }
    }
}

/// Writes transcript lines to any writer, typically stdout.
pub struct WriterTranscript<W> {
    out: W,
}

impl<W: Write + Send> WriterTranscript<W> {
    pub fn new(out: W) -> Self {
        WriterTranscript { out }
    }
}

impl<W: Write + Send> Transcript for WriterTranscript<W> {
    fn line(&mut self, text: &str) {
        // A broken terminal should not stop the game.
        let _ = writeln!(self.out, "{text}");
    }
}

/// Collects lines in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryTranscript {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Transcript for MemoryTranscript {
    fn line(&mut self, text: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
    }
}
