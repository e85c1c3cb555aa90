//! Move entry on a terminal.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::{Arc, Mutex, PoisonError};

use chess_session::{HumanInput, MoveRequest};

/// Prompts for moves and reads them line by line.
///
/// Clones share the same input and output, so both sides of a hot-seat
/// game read from one terminal.
pub struct Terminal<R, W> {
    input: Arc<Mutex<R>>,
    output: Arc<Mutex<W>>,
}

impl<R, W> Clone for Terminal<R, W> {
    fn clone(&self) -> Self {
        Terminal {
            input: Arc::clone(&self.input),
            output: Arc::clone(&self.output),
        }
    }
}

impl Terminal<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Terminal::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead + Send, W: Write + Send> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Terminal {
            input: Arc::new(Mutex::new(input)),
            output: Arc::new(Mutex::new(output)),
        }
    }

    fn print(&self, text: &str) -> io::Result<()> {
        let mut out = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        write!(out, "{text}")?;
        out.flush()
    }
}

fn legal_list(request: &MoveRequest<'_>) -> String {
    request
        .legal_moves
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

impl<R: BufRead + Send, W: Write + Send> HumanInput for Terminal<R, W> {
    /// Reads one move. `moves` lists the legal moves again; `quit` or end of
    /// input stops the game with an [`io::ErrorKind::Interrupted`] or
    /// [`io::ErrorKind::UnexpectedEof`] error.
    fn read_move(&mut self, request: &MoveRequest<'_>) -> io::Result<String> {
        self.print(&format!(
            "{} to move. Legal moves: {}\n",
            request.side.title(),
            legal_list(request)
        ))?;
        loop {
            self.print(&format!("{}> ", request.side))?;
            let mut line = String::new();
            let read = self
                .input
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .read_line(&mut line)?;
            if read == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
            }
            match line.trim() {
                "" => continue,
                "moves" | "?" => self.print(&format!("{}\n", legal_list(request)))?,
                "quit" | "exit" => {
                    return Err(io::Error::new(io::ErrorKind::Interrupted, "game left"))
                }
                text => return Ok(text.to_string()),
            }
        }
    }
}
