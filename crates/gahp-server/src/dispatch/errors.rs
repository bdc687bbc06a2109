//! Error types for command dispatch failures.
//!
//! The protocol only distinguishes two failure classes on the wire: syntax
//! errors, reported as a bare `E`, and handler failures, reported as `F`
//! followed by a human-readable message. Every variant here maps onto one of
//! those classes through [`DispatchError::outcome`].

use thiserror::Error;

use super::response::{Outcome, Response};

/// Errors surfaced while parsing or executing a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The line contained no command name.
    #[error("empty command")]
    EmptyCommand,

    /// No handler is registered under the command name.
    #[error("unknown command: {command}")]
    UnknownCommand {
        /// Command name as received.
        command: String,
    },

    /// The command received the wrong number of arguments.
    #[error("{command} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        /// Command name as received.
        command: String,
        /// Number of arguments the command accepts.
        expected: usize,
        /// Number of arguments supplied.
        actual: usize,
    },

    /// An argument could not be interpreted.
    #[error("invalid argument for {command}: {message}")]
    InvalidArgument {
        /// Command name as received.
        command: String,
        /// Description of the problem.
        message: String,
    },

    /// The request line exceeded the accepted size.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge {
        /// Size of the discarded line in bytes.
        size: usize,
        /// Accepted maximum in bytes.
        max_size: usize,
    },

    /// The handler ran but its operation failed.
    #[error("{message}")]
    Failure {
        /// Message reported after the `F` marker.
        message: String,
    },
}

impl DispatchError {
    /// Returns the wire outcome this error is reported with.
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::EmptyCommand
            | Self::UnknownCommand { .. }
            | Self::ArgumentCount { .. }
            | Self::InvalidArgument { .. }
            | Self::RequestTooLarge { .. } => Outcome::SyntaxError,
            Self::Failure { .. } => Outcome::Failure,
        }
    }

    /// Renders the error as the response written back to the controller.
    ///
    /// Syntax errors carry no payload; failures carry their message as a
    /// single escaped token.
    #[must_use]
    pub fn to_response(&self) -> Response {
        match self.outcome() {
            Outcome::Failure => Response::failure().arg(self.to_string()),
            Outcome::Success | Outcome::SyntaxError => Response::syntax_error(),
        }
    }

    /// Creates an unknown command error.
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Creates an argument count error.
    pub fn argument_count(command: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ArgumentCount {
            command: command.into(),
            expected,
            actual,
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a request too large error.
    #[must_use]
    pub const fn request_too_large(size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { size, max_size }
    }

    /// Creates a handler failure carrying a human-readable message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }
}
