//! The request/response main loop.
//!
//! The loop runs on one thread and handles requests strictly in arrival
//! order. Each response is written under the output lock, any staged prefix
//! is committed in the same critical section, and deferred work is started
//! on its own thread only after its acknowledgement is on the wire.

mod reader;

use std::fmt;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, warn};

use crate::builtins;
use crate::codec::tokenize;
use crate::dispatch::{CommandHandler, DeferredTask, DispatchError, Dispatcher, HandlerResult};
use crate::output::OutputChannel;
use crate::session::ExecutionContext;

use reader::{LineReader, MAX_REQUEST_BYTES, ReadOutcome};

/// Tracing target for main loop events.
pub(crate) const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Version string advertised when none is configured.
pub const DEFAULT_VERSION: &str = env!("GAHP_VERSION_STRING");

/// Why the main loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The controller sent `QUIT`.
    Quit,
    /// The input stream closed.
    EndOfInput,
    /// Reading the input stream failed.
    InputError,
    /// Writing a response failed.
    OutputError,
}

impl ShutdownReason {
    /// Returns a stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::EndOfInput => "end-of-input",
            Self::InputError => "input-error",
            Self::OutputError => "output-error",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Running,
    Draining(ShutdownReason),
    Terminated(ShutdownReason),
}

/// Assembles a [`Server`].
///
/// The built-in protocol commands are registered first, so a custom command
/// registered under the same name replaces the built-in.
pub struct ServerBuilder {
    output: Option<Arc<OutputChannel>>,
    version: String,
    dispatcher: Dispatcher,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        let mut dispatcher = Dispatcher::new();
        builtins::register(&mut dispatcher);
        Self {
            output: None,
            version: DEFAULT_VERSION.to_owned(),
            dispatcher,
        }
    }
}

impl ServerBuilder {
    /// Starts a builder with the built-in commands and standard output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends protocol output to `writer` instead of standard output.
    #[must_use]
    pub fn output<W>(mut self, writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        self.output = Some(Arc::new(OutputChannel::new(writer)));
        self
    }

    /// Sets the advertised version string, already in wire form.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Registers a command handler.
    #[must_use]
    pub fn command<H>(mut self, name: &str, handler: H) -> Self
    where
        H: CommandHandler + 'static,
    {
        self.dispatcher.register(name, Arc::new(handler));
        self
    }

    /// Finishes the server.
    #[must_use]
    pub fn build(self) -> Server {
        let output = self
            .output
            .unwrap_or_else(|| Arc::new(OutputChannel::stdout()));
        let context = ExecutionContext::new(output, self.version, self.dispatcher.commands());
        Server {
            dispatcher: self.dispatcher,
            context,
        }
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("version", &self.version)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

/// A helper server bound to one output stream.
#[derive(Debug)]
pub struct Server {
    dispatcher: Dispatcher,
    context: ExecutionContext,
}

impl Server {
    /// Starts building a server.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the session shared with handlers.
    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Serves requests from `input` until `QUIT` or a stream failure.
    ///
    /// Cleanup steps have run by the time this returns.
    pub fn run<R: BufRead>(&self, input: R) -> ShutdownReason {
        let mut reader = LineReader::new(input);
        let mut state = self.start();

        loop {
            state = match state {
                LoopState::Running => self.step(&mut reader),
                LoopState::Draining(reason) => {
                    self.drain(reason);
                    LoopState::Terminated(reason)
                }
                LoopState::Terminated(reason) => return reason,
            };
        }
    }

    fn start(&self) -> LoopState {
        let banner = [self.context.version().to_owned()];
        if let Err(error) = self.context.output().write_response(&banner, None) {
            warn!(target: SERVER_TARGET, %error, "failed to write version banner");
            return LoopState::Draining(ShutdownReason::OutputError);
        }
        info!(
            target: SERVER_TARGET,
            commands = self.dispatcher.commands().len(),
            "serving requests"
        );
        LoopState::Running
    }

    fn step<R: BufRead>(&self, reader: &mut LineReader<R>) -> LoopState {
        let line = match reader.next_line() {
            Ok(ReadOutcome::Line(line)) => line,
            Ok(ReadOutcome::TooLarge { size }) => {
                let error = DispatchError::request_too_large(size, MAX_REQUEST_BYTES);
                warn!(target: SERVER_TARGET, %error, "discarded request");
                return self.respond(HandlerResult::respond(error.to_response()));
            }
            Ok(ReadOutcome::EndOfStream) => {
                return LoopState::Draining(ShutdownReason::EndOfInput);
            }
            Err(error) => {
                warn!(target: SERVER_TARGET, %error, "failed to read request");
                return LoopState::Draining(ShutdownReason::InputError);
            }
        };

        let tokens = tokenize(&line);
        if tokens.is_empty() {
            return LoopState::Running;
        }
        let result = self.dispatcher.dispatch(tokens, &self.context);
        self.respond(result)
    }

    fn respond(&self, result: HandlerResult) -> LoopState {
        let (response, deferred, prefix_change) = result.into_parts();
        if let Err(error) = self
            .context
            .output()
            .write_response(&response.lines(), prefix_change)
        {
            warn!(target: SERVER_TARGET, %error, "failed to write response");
            return LoopState::Draining(ShutdownReason::OutputError);
        }

        if let Some(task) = deferred {
            self.spawn(task);
        }
        if self.context.exit_requested() {
            LoopState::Draining(ShutdownReason::Quit)
        } else {
            LoopState::Running
        }
    }

    fn spawn(&self, task: DeferredTask) {
        let label = task.label().to_owned();
        let context = self.context.clone();
        let spawned = thread::Builder::new()
            .name(format!("gahp-{label}"))
            .spawn(move || task.run(&context));
        match spawned {
            Ok(_) => debug!(target: SERVER_TARGET, task = %label, "deferred task started"),
            Err(error) => {
                error!(target: SERVER_TARGET, task = %label, %error, "failed to start deferred task");
            }
        }
    }

    fn drain(&self, reason: ShutdownReason) {
        info!(target: SERVER_TARGET, %reason, "shutting down");
        let report = self.context.run_cleanup();
        debug!(
            target: SERVER_TARGET,
            executed = report.executed,
            failed = report.failed,
            "cleanup complete"
        );
    }
}
