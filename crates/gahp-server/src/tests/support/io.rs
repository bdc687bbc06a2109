//! In-memory protocol streams.
//!
//! [`SharedBuffer`] captures server output and can be polled from another
//! thread. [`ScriptedInput`] feeds request lines on demand, so a scenario can
//! wait for an asynchronous notification before sending the next command.

use std::io::{self, BufRead, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cloneable writer whose contents can be inspected while a server runs.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Returns everything written so far.
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().expect("buffer mutex poisoned");
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Returns the written output split into lines.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    /// Polls until `predicate` accepts the output or `timeout` elapses.
    pub fn wait_until(&self, timeout: Duration, predicate: impl Fn(&[String]) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if predicate(&self.lines()) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .expect("buffer mutex poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer that rejects every write.
#[derive(Debug, Clone, Copy)]
pub struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "controller went away"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "controller went away"))
    }
}

/// Input stream fed line by line from the test thread.
///
/// Dropping the paired [`Sender`] closes the stream.
#[derive(Debug)]
pub struct ScriptedInput {
    receiver: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    position: usize,
}

impl ScriptedInput {
    /// Creates the input and the sender that feeds it.
    pub fn channel() -> (Sender<Vec<u8>>, Self) {
        let (sender, receiver) = mpsc::channel();
        let input = Self {
            receiver,
            pending: Vec::new(),
            position: 0,
        };
        (sender, input)
    }
}

impl Read for ScriptedInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.consume(count);
        Ok(count)
    }
}

impl BufRead for ScriptedInput {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.position >= self.pending.len() {
            match self.receiver.recv() {
                Ok(bytes) => {
                    self.pending = bytes;
                    self.position = 0;
                }
                Err(_) => return Ok(&[]),
            }
        }
        Ok(&self.pending[self.position..])
    }

    fn consume(&mut self, amount: usize) {
        self.position = (self.position + amount).min(self.pending.len());
    }
}
