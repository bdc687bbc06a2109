//! Response construction for the line protocol.
//!
//! A response is one or more lines. The first line starts with the outcome
//! marker (`S`, `E` or `F`) optionally followed by payload tokens; further
//! lines are used by multi-line replies such as `RESULTS`. The response
//! prefix is not part of the value: it is applied when the lines are written
//! to the output channel.

use std::fmt;

use crate::codec::escape_token;

/// Outcome marker leading the first line of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command succeeded (`S`).
    Success,
    /// The line was malformed or named an unknown command (`E`).
    SyntaxError,
    /// The command was understood but could not be carried out (`F`).
    Failure,
}

impl Outcome {
    /// Returns the wire marker for the outcome.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Success => "S",
            Self::SyntaxError => "E",
            Self::Failure => "F",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Immediate reply to a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    outcome: Outcome,
    payload: Vec<String>,
    trailing: Vec<String>,
}

impl Response {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            payload: Vec::new(),
            trailing: Vec::new(),
        }
    }

    /// Starts a success response.
    #[must_use]
    pub fn success() -> Self {
        Self::new(Outcome::Success)
    }

    /// Builds the generic syntax-error response.
    #[must_use]
    pub fn syntax_error() -> Self {
        Self::new(Outcome::SyntaxError)
    }

    /// Starts a failure response.
    #[must_use]
    pub fn failure() -> Self {
        Self::new(Outcome::Failure)
    }

    /// Appends a payload token, escaping it for the wire.
    #[must_use]
    pub fn arg(mut self, token: impl AsRef<str>) -> Self {
        self.payload.push(escape_token(token.as_ref()));
        self
    }

    /// Appends several payload tokens, escaping each one.
    #[must_use]
    pub fn args<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.payload
            .extend(tokens.into_iter().map(|token| escape_token(token.as_ref())));
        self
    }

    /// Appends payload text that is already in wire form.
    ///
    /// Used for values such as the version string, whose embedded spaces are
    /// escaped at the source.
    #[must_use]
    pub fn raw_arg(mut self, raw: impl Into<String>) -> Self {
        self.payload.push(raw.into());
        self
    }

    /// Appends a follow-up line that is already in wire form.
    #[must_use]
    pub fn line(mut self, raw_line: impl Into<String>) -> Self {
        self.trailing.push(raw_line.into());
        self
    }

    /// Returns the outcome marker of the response.
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Renders the response as unprefixed wire lines without terminators.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut first = String::from(self.outcome.marker());
        for token in &self.payload {
            first.push(' ');
            first.push_str(token);
        }

        let mut lines = Vec::with_capacity(1 + self.trailing.len());
        lines.push(first);
        lines.extend(self.trailing.iter().cloned());
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_markers_have_no_payload() {
        assert_eq!(Response::success().lines(), vec!["S"]);
        assert_eq!(Response::syntax_error().lines(), vec!["E"]);
        assert_eq!(Response::failure().lines(), vec!["F"]);
    }

    #[test]
    fn escapes_payload_tokens() {
        let response = Response::failure().arg("7").arg("no such job");
        assert_eq!(response.lines(), vec!["F 7 no\\ such\\ job"]);
    }

    #[test]
    fn raw_payload_is_written_verbatim() {
        let response = Response::success().raw_arg("$GahpVersion: 1.0 UW\\ Gahp $");
        assert_eq!(response.lines(), vec!["S $GahpVersion: 1.0 UW\\ Gahp $"]);
    }

    #[test]
    fn trailing_lines_follow_the_marker_line() {
        let response = Response::success()
            .raw_arg("2")
            .line("7 0 NULL")
            .line("9 F boom");
        assert_eq!(response.lines(), vec!["S 2", "7 0 NULL", "9 F boom"]);
        assert_eq!(response.outcome(), Outcome::Success);
    }
}
