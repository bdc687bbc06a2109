//! Parsed command requests and argument helpers.
//!
//! A [`CommandRequest`] is the token sequence produced by the codec. Token 0
//! is the command name exactly as the controller sent it; lookups use the
//! uppercased form while the original spelling is kept for logging.

use std::fmt;
use std::str::FromStr;

use super::errors::DispatchError;

/// Sentinel argument standing for "no value".
pub const NULL_ARGUMENT: &str = "NULL";

/// Identifier correlating a deferred command with its queued result.
///
/// Request ids are chosen by the controller and must be positive decimal
/// integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Error returned when a token is not a valid request id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("request id '{0}' is not a positive integer")]
pub struct RequestIdParseError(String);

impl FromStr for RequestId {
    type Err = RequestIdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(RequestIdParseError(value.to_owned()));
        }
        match value.parse::<u64>() {
            Ok(0) | Err(_) => Err(RequestIdParseError(value.to_owned())),
            Ok(id) => Ok(Self(id)),
        }
    }
}

/// A tokenized command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    tokens: Vec<String>,
    name: String,
}

impl CommandRequest {
    /// Builds a request from tokens.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::EmptyCommand`] when there are no tokens.
    pub fn from_tokens(tokens: Vec<String>) -> Result<Self, DispatchError> {
        let Some(first) = tokens.first() else {
            return Err(DispatchError::EmptyCommand);
        };
        let name = first.to_ascii_uppercase();
        Ok(Self { tokens, name })
    }

    /// Returns the uppercased command name used for lookup.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns every token, including the command name as sent.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Returns the arguments following the command name.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }

    /// Returns the argument at `index` (0 is the first argument).
    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&str> {
        self.arguments().get(index).map(String::as_str)
    }

    /// Checks that exactly `expected` arguments were supplied.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ArgumentCount`] on a mismatch.
    pub fn expect_arguments(&self, expected: usize) -> Result<(), DispatchError> {
        let actual = self.arguments().len();
        if actual == expected {
            Ok(())
        } else {
            Err(DispatchError::argument_count(&self.name, expected, actual))
        }
    }

    /// Returns a mandatory argument.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidArgument`] when the argument is absent.
    pub fn required(&self, index: usize) -> Result<&str, DispatchError> {
        self.argument(index).ok_or_else(|| {
            DispatchError::invalid_argument(&self.name, format!("missing argument {}", index + 1))
        })
    }

    /// Returns an argument where the literal `NULL` means "no value".
    ///
    /// The sentinel is matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidArgument`] when the argument is absent.
    pub fn optional(&self, index: usize) -> Result<Option<&str>, DispatchError> {
        let value = self.required(index)?;
        if value.eq_ignore_ascii_case(NULL_ARGUMENT) {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }

    /// Parses the argument at `index` as a request id.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidArgument`] when the argument is absent
    /// or not a positive integer.
    pub fn request_id(&self, index: usize) -> Result<RequestId, DispatchError> {
        self.required(index)?
            .parse()
            .map_err(|error: RequestIdParseError| {
                DispatchError::invalid_argument(&self.name, error.to_string())
            })
    }

    /// Parses the argument at `index` as an integer.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidArgument`] when the argument is absent
    /// or not an integer.
    pub fn integer(&self, index: usize) -> Result<i64, DispatchError> {
        let raw = self.required(index)?;
        raw.parse().map_err(|_| {
            DispatchError::invalid_argument(&self.name, format!("'{raw}' is not an integer"))
        })
    }
}
