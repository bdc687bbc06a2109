//! Line grammar for the helper protocol.
//!
//! A request line is a command name followed by arguments separated by runs of
//! spaces, tabs or carriage returns. A backslash in front of a separator (or
//! a line feed) makes that character part of the current token, and a doubled
//! backslash stands for one literal backslash. Any other backslash is kept as
//! written, so paths such as `C:\tmp` survive without escaping.
//!
//! Outbound payload tokens go through [`escape_token`], which is the inverse of
//! the tokenizer: `tokenize(&(escape_token(x) + " "))` yields `x` again for
//! any `x` (an empty `x` yields no token at all).

const ESCAPE: char = '\\';

/// Returns `true` for characters that terminate a token.
const fn is_separator(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r')
}

/// Returns `true` for characters that a backslash turns into token content.
const fn is_escapable(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n' | ESCAPE)
}

/// Splits a request line into tokens.
///
/// Empty input, or input made only of separators, yields no tokens. A
/// trailing token without a terminating separator is still returned. Bytes
/// the grammar does not mention (including NUL) pass through untouched.
///
/// # Examples
///
/// ```
/// use gahp_server::codec::tokenize;
///
/// assert_eq!(tokenize("GRAM_PING 7 host\\ name"), vec!["GRAM_PING", "7", "host name"]);
/// assert!(tokenize("").is_empty());
/// ```
#[must_use]
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == ESCAPE {
            match chars.peek() {
                Some(&next) if is_escapable(next) => {
                    current.push(next);
                    chars.next();
                }
                _ => current.push(ch),
            }
            continue;
        }

        if is_separator(ch) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Escapes a token for transmission inside a response line.
///
/// Every space, tab, carriage return, line feed and backslash gains a leading
/// backslash.
///
/// # Examples
///
/// ```
/// use gahp_server::codec::escape_token;
///
/// assert_eq!(escape_token("UW Gahp"), "UW\\ Gahp");
/// assert_eq!(escape_token("a\\b"), "a\\\\b");
/// ```
#[must_use]
pub fn escape_token(token: &str) -> String {
    let mut escaped = String::with_capacity(token.len());
    for ch in token.chars() {
        if is_escapable(ch) {
            escaped.push(ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

/// Escapes every token and joins them with single spaces.
#[must_use]
pub fn join_escaped<I, S>(tokens: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|token| escape_token(token.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reports whether a physical line ends in an escaped line feed.
///
/// `content` excludes the line feed itself. An odd run of trailing
/// backslashes means the last one escapes the line feed, so the logical line
/// continues on the next physical line.
#[must_use]
pub(crate) fn continues_on_next_line(content: &[u8]) -> bool {
    let trailing = content
        .iter()
        .rev()
        .take_while(|byte| **byte == b'\\')
        .count();
    !trailing.is_multiple_of(2)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("VERSION", &["VERSION"])]
    #[case("results", &["results"])]
    #[case("GRAM_PING 7 host", &["GRAM_PING", "7", "host"])]
    #[case("  leading\tand\r trailing  ", &["leading", "and", "trailing"])]
    #[case("A  B", &["A", "B"])]
    #[case("A B\\ C", &["A", "B C"])]
    #[case("A B\\\tC", &["A", "B\tC"])]
    #[case("A B\\\rC", &["A", "B\rC"])]
    #[case("A B\\\nC", &["A", "B\nC"])]
    #[case("A C:\\tmp", &["A", "C:\\tmp"])]
    #[case("A a\\\\b", &["A", "a\\b"])]
    #[case("A trailing\\", &["A", "trailing\\"])]
    #[case("A nul\0byte", &["A", "nul\0byte"])]
    fn tokenizes_lines(#[case] line: &str, #[case] expected: &[&str]) {
        assert_eq!(tokenize(line), expected);
    }

    #[rstest]
    #[case("")]
    #[case(" ")]
    #[case("\t\r ")]
    fn blank_lines_yield_no_tokens(#[case] line: &str) {
        assert!(tokenize(line).is_empty());
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("UW Gahp", "UW\\ Gahp")]
    #[case("tab\there", "tab\\\there")]
    #[case("cr\rlf\n", "cr\\\rlf\\\n")]
    #[case("back\\slash", "back\\\\slash")]
    fn escapes_reserved_characters(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(escape_token(raw), expected);
    }

    #[rstest]
    #[case("")]
    #[case("simple")]
    #[case("two words")]
    #[case(" leading and trailing ")]
    #[case("\\")]
    #[case("\\\\ \\")]
    #[case("ends with backslash\\")]
    #[case("mixed \t\r\n separators")]
    #[case("Globus error: 7 \"quoted\"")]
    #[case("ünïcödé spaces ✓")]
    fn escaped_tokens_round_trip(#[case] raw: &str) {
        let wire = format!("{} ", escape_token(raw));
        let rebuilt = tokenize(&wire).join("");
        assert_eq!(rebuilt, raw);
    }

    #[test]
    fn joined_payload_round_trips_token_by_token() {
        let tokens = ["0", "NULL", "job contact", "a\\b"];
        let line = join_escaped(tokens);
        assert_eq!(tokenize(&line), tokens);
    }

    #[rstest]
    #[case(b"", false)]
    #[case(b"A B", false)]
    #[case(b"A B\\", true)]
    #[case(b"A B\\\\", false)]
    #[case(b"A B\\\\\\", true)]
    fn detects_escaped_line_feeds(#[case] content: &[u8], #[case] expected: bool) {
        assert_eq!(continues_on_next_line(content), expected);
    }
}
