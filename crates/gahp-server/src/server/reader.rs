//! Bounded request line reader.
//!
//! Reads one logical request at a time. A physical line whose content ends
//! in an odd number of backslashes continues on the next physical line, with
//! the line feed kept so the tokenizer folds it into the token. Oversized
//! lines are consumed and discarded rather than buffered.

use std::io::{self, BufRead};

use crate::codec::continues_on_next_line;

/// Maximum size of a single logical request in bytes.
pub(crate) const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Result of reading one logical request.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    /// A complete request without its terminator.
    Line(String),
    /// A request exceeding the limit was discarded.
    TooLarge {
        /// Bytes consumed for the discarded request.
        size: usize,
    },
    /// The input closed before any further bytes arrived.
    EndOfStream,
}

/// Reads logical request lines from a buffered input.
pub(crate) struct LineReader<R> {
    input: R,
    limit: usize,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) const fn new(input: R) -> Self {
        Self::with_limit(input, MAX_REQUEST_BYTES)
    }

    pub(crate) const fn with_limit(input: R, limit: usize) -> Self {
        Self { input, limit }
    }

    /// Reads the next logical request.
    ///
    /// Invalid UTF-8 is replaced rather than rejected. A final request
    /// without a line feed is still returned.
    pub(crate) fn next_line(&mut self) -> io::Result<ReadOutcome> {
        let mut line = Vec::new();
        let mut size = 0_usize;
        let mut consumed_any = false;

        loop {
            let segment = self.read_segment(&mut line, &mut size)?;
            consumed_any |= segment.consumed > 0;

            if !segment.terminated {
                if !consumed_any {
                    return Ok(ReadOutcome::EndOfStream);
                }
                break;
            }
            if !segment.escapes_newline {
                break;
            }
            size += 1;
            if size <= self.limit {
                line.push(b'\n');
            }
        }

        if size > self.limit {
            return Ok(ReadOutcome::TooLarge { size });
        }
        Ok(ReadOutcome::Line(String::from_utf8_lossy(&line).into_owned()))
    }

    /// Reads up to and including the next line feed, which is not stored.
    fn read_segment(&mut self, line: &mut Vec<u8>, size: &mut usize) -> io::Result<Segment> {
        let mut segment = Segment::default();
        loop {
            let available = match self.input.fill_buf() {
                Ok(available) => available,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            };
            if available.is_empty() {
                return Ok(segment);
            }

            let newline = available.iter().position(|byte| *byte == b'\n');
            let content = match newline {
                Some(position) => available.get(..position).unwrap_or_default(),
                None => available,
            };
            let odd = continues_on_next_line(content);
            segment.escapes_newline = if content.iter().all(|byte| *byte == b'\\') {
                segment.escapes_newline != odd
            } else {
                odd
            };
            *size += content.len();
            if *size <= self.limit {
                line.extend_from_slice(content);
            } else {
                line.clear();
            }

            let used = content.len() + usize::from(newline.is_some());
            self.input.consume(used);
            segment.consumed += used;
            if newline.is_some() {
                segment.terminated = true;
                return Ok(segment);
            }
        }
    }
}

#[derive(Debug, Default)]
struct Segment {
    consumed: usize,
    terminated: bool,
    /// Odd run of trailing backslashes, tracked even when content is dropped.
    escapes_newline: bool,
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Cursor, Read};

    use rstest::rstest;

    use super::*;

    fn read_all(input: &[u8], limit: usize) -> Vec<ReadOutcome> {
        let mut reader = LineReader::with_limit(Cursor::new(input.to_vec()), limit);
        let mut outcomes = Vec::new();
        loop {
            let outcome = reader.next_line().expect("read");
            if outcome == ReadOutcome::EndOfStream {
                return outcomes;
            }
            outcomes.push(outcome);
        }
    }

    fn line(text: &str) -> ReadOutcome {
        ReadOutcome::Line(text.to_owned())
    }

    #[rstest]
    #[case(b"VERSION\nQUIT\n", vec![line("VERSION"), line("QUIT")])]
    #[case(b"\n\n", vec![line(""), line("")])]
    #[case(b"RESULTS", vec![line("RESULTS")])]
    #[case(b"A B\\\nC\n", vec![line("A B\\\nC")])]
    #[case(b"A B\\\\\nC\n", vec![line("A B\\\\"), line("C")])]
    #[case(b"", vec![])]
    fn frames_logical_lines(#[case] input: &[u8], #[case] expected: Vec<ReadOutcome>) {
        assert_eq!(read_all(input, MAX_REQUEST_BYTES), expected);
    }

    #[test]
    fn oversized_lines_are_discarded() {
        let outcomes = read_all(b"0123456789\nOK\n", 4);
        assert_eq!(outcomes, vec![ReadOutcome::TooLarge { size: 10 }, line("OK")]);
    }

    #[test]
    fn oversized_lines_swallow_their_continuation() {
        let outcomes = read_all(b"0123456789\\\nQUIT\nOK\n", 4);
        assert_eq!(outcomes, vec![ReadOutcome::TooLarge { size: 16 }, line("OK")]);
    }

    #[test]
    fn backslash_runs_split_across_reads_keep_their_parity() {
        let input = BufReader::with_capacity(2, Cursor::new(b"AB\\\\\\\nC\nD\n".to_vec()));
        let mut reader = LineReader::new(input);
        assert_eq!(reader.next_line().expect("read"), line("AB\\\\\\\nC"));
        assert_eq!(reader.next_line().expect("read"), line("D"));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let outcomes = read_all(b"A \xff\n", MAX_REQUEST_BYTES);
        assert_eq!(outcomes, vec![line("A \u{fffd}")]);
    }

    struct Interrupting {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for Interrupting {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let input = Interrupting {
            interrupted: false,
            inner: Cursor::new(b"VERSION\n".to_vec()),
        };
        let mut reader = LineReader::new(BufReader::new(input));
        assert_eq!(reader.next_line().expect("read"), line("VERSION"));
    }
}
