//! Serialised access to the protocol output stream.
//!
//! One mutex guards both the writer and the committed response prefix. The
//! main loop writes a whole response while holding it, and deferred tasks
//! take the same lock to emit the asynchronous `R` notification, so lines
//! from different threads never interleave. The prefix is only changed
//! inside a response write, after the response lines are flushed.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Marker line announcing that new results are waiting.
pub const RESULTS_READY: &str = "R";

struct OutputState {
    writer: Box<dyn Write + Send>,
    prefix: String,
}

/// The single shared output stream of the server.
pub struct OutputChannel {
    state: Mutex<OutputState>,
}

impl OutputChannel {
    /// Wraps `writer` with an empty response prefix.
    pub fn new<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            state: Mutex::new(OutputState {
                writer: Box::new(writer),
                prefix: String::new(),
            }),
        }
    }

    /// Creates a channel writing to the process's standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Takes the output lock, recovering it if poisoned.
    pub(crate) fn lock(&self) -> OutputGuard<'_> {
        OutputGuard {
            state: self.state.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Returns the prefix currently applied to outbound lines.
    #[must_use]
    pub fn response_prefix(&self) -> String {
        self.lock().state.prefix.clone()
    }

    /// Writes a response and then commits a staged prefix change.
    ///
    /// Both steps happen in one critical section. The prefix is left alone
    /// when the write fails.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when writing or flushing fails.
    pub fn write_response(&self, lines: &[String], prefix_change: Option<String>) -> io::Result<()> {
        let mut guard = self.lock();
        for line in lines {
            guard.write_line(line)?;
        }
        guard.flush()?;
        if let Some(prefix) = prefix_change {
            guard.commit_prefix(prefix);
        }
        Ok(())
    }
}

impl fmt::Debug for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputChannel")
            .field("prefix", &self.response_prefix())
            .finish_non_exhaustive()
    }
}

/// Held output lock.
pub(crate) struct OutputGuard<'a> {
    state: MutexGuard<'a, OutputState>,
}

impl OutputGuard<'_> {
    /// Writes one line with the committed prefix and a line feed.
    pub(crate) fn write_line(&mut self, line: &str) -> io::Result<()> {
        let OutputState { writer, prefix } = &mut *self.state;
        writer.write_all(prefix.as_bytes())?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")
    }

    /// Writes and flushes the `R` notification.
    pub(crate) fn write_notification(&mut self) -> io::Result<()> {
        self.write_line(RESULTS_READY)?;
        self.flush()
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.state.writer.flush()
    }

    fn commit_prefix(&mut self, prefix: String) {
        self.state.prefix = prefix;
    }
}
