//! Line reader with newline normalization.

use std::collections::VecDeque;
use std::io::BufRead;

use crate::error::ParseError;

/// Reads UTF-8 lines, treating `\r\n`, `\r` and `\n` all as line ends.
#[derive(Debug)]
pub(crate) struct LineReader<R> {
    inner: R,
    origin: String,
    buffer: Vec<u8>,
    queued: VecDeque<String>,
    line: usize,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(inner: R, origin: impl Into<String>) -> Self {
        Self {
            inner,
            origin: origin.into(),
            buffer: Vec::new(),
            queued: VecDeque::new(),
            line: 0,
        }
    }

    /// The next line without its terminator, or `None` at end of input.
    pub(crate) fn next_line(&mut self) -> Result<Option<String>, ParseError> {
        if let Some(line) = self.queued.pop_front() {
            return Ok(Some(line));
        }

        self.buffer.clear();
        let read = self
            .inner
            .read_until(b'\n', &mut self.buffer)
            .map_err(|source| ParseError::Read {
                origin: self.origin.clone(),
                source,
            })?;
        if read == 0 {
            return Ok(None);
        }

        let mut bytes = self.buffer.as_slice();
        if let Some(rest) = bytes.strip_suffix(b"\n") {
            bytes = rest;
        }
        if let Some(rest) = bytes.strip_suffix(b"\r") {
            bytes = rest;
        }
        if self.line == 0 {
            if let Some(rest) = bytes.strip_prefix(b"\xEF\xBB\xBF") {
                bytes = rest;
            }
        }

        for segment in bytes.split(|b| *b == b'\r') {
            self.line += 1;
            let text = std::str::from_utf8(segment).map_err(|_| ParseError::Encoding {
                origin: self.origin.clone(),
                line: self.line,
            })?;
            self.queued.push_back(text.to_string());
        }
        Ok(self.queued.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &[u8]) -> Vec<String> {
        let mut reader = LineReader::new(input, "<test>");
        let mut out = Vec::new();
        while let Some(line) = reader.next_line().expect("readable") {
            out.push(line);
        }
        out
    }

    #[test]
    fn normalizes_all_line_endings() {
        assert_eq!(lines(b"a\r\nb\rc\nd"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn keeps_empty_lines() {
        assert_eq!(lines(b"a\n\n\nb\n"), vec!["a", "", "", "b"]);
    }

    #[test]
    fn strips_byte_order_mark() {
        assert_eq!(lines(b"\xEF\xBB\xBFtitle\n"), vec!["title"]);
    }

    #[test]
    fn empty_input_has_no_lines() {
        assert!(lines(b"").is_empty());
    }

    #[test]
    fn invalid_utf8_reports_line() {
        let mut reader = LineReader::new(&b"ok\n\xFF\n"[..], "doc.adoc");
        assert_eq!(reader.next_line().ok().flatten().as_deref(), Some("ok"));
        match reader.next_line() {
            Err(ParseError::Encoding { origin, line }) => {
                assert_eq!(origin, "doc.adoc");
                assert_eq!(line, 2);
            }
            other => panic!("expected encoding error, got {other:?}"),
        }
    }
}
