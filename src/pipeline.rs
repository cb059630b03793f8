//! The producer/consumer pipeline.
//!
//! A scanner thread reads the source and sends fragments over a channel of
//! capacity one. The calling thread preprocesses each fragment, parses it
//! into components and feeds the assembler. Included files are scanned on
//! the calling thread, at the point of the directive.
//!
//! ```text
//! scanner thread                    calling thread
//! ──────────────                    ──────────────
//! Scanner ──▶ sync_channel(1) ──▶ Preprocessor ──▶ FragmentParser ──▶ Assembler
//!    ▲                                                                   │
//!    └──────────── CancellationToken ◀── caller                          ▼
//!                                                                     Document
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use crate::asg::Document;
use crate::assembler::Assembler;
use crate::attributes::AttributeTable;
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::error::ParseError;
use crate::fragment::Fragment;
use crate::grammar::{Component, FragmentParser, PositionedComponent};
use crate::preprocess::{FragmentSink, Preprocessed, Preprocessor};
use crate::scanner::Scanner;

/// A parsed document with every diagnostic raised while parsing it.
pub type Parsed = (Document, Vec<Diagnostic>);

/// A shared flag that stops a running parse.
///
/// Clones share the flag. The scanner checks it before every send, so at
/// most one further fragment crosses the channel after it is raised.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the flag is raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Parse an in-memory document.
///
/// # Errors
///
/// See [`parse_with_cancellation`].
pub fn parse_document(input: &str, config: &Config) -> Result<Parsed, ParseError> {
    parse_reader(input.as_bytes(), config)
}

/// Parse a document from `path`. Unless `config` names a file already,
/// `path` anchors relative includes.
///
/// # Errors
///
/// [`ParseError::Read`] when the file cannot be opened, otherwise see
/// [`parse_with_cancellation`].
pub fn parse_file(path: impl AsRef<Path>, config: &Config) -> Result<Parsed, ParseError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ParseError::Read {
        origin: path.display().to_string(),
        source,
    })?;
    let config = match config.filename {
        Some(_) => config.clone(),
        None => config.clone().with_filename(path),
    };
    parse_reader(BufReader::new(file), &config)
}

/// Parse a document from any buffered reader.
///
/// # Errors
///
/// See [`parse_with_cancellation`].
pub fn parse_reader<R: BufRead + Send>(reader: R, config: &Config) -> Result<Parsed, ParseError> {
    parse_with_cancellation(reader, config, &CancellationToken::new())
}

/// Parse a document, stopping early once `token` is cancelled.
///
/// # Errors
///
/// - [`ParseError::Read`] or [`ParseError::Encoding`] when the source or an
///   included file cannot be read.
/// - [`ParseError::UnsupportedDelimiter`] for a front matter delimiter
///   anywhere but the first line.
/// - [`ParseError::UnresolvedInclusion`] when `fail_on_unresolved` is set.
/// - [`ParseError::Cancelled`] when `token` was cancelled.
pub fn parse_with_cancellation<R: BufRead + Send>(
    reader: R,
    config: &Config,
    token: &CancellationToken,
) -> Result<Parsed, ParseError> {
    thread::scope(|scope| {
        let (sender, receiver) = mpsc::sync_channel(1);
        let scanner = Scanner::new(reader, config);
        scope.spawn(move || produce(scanner, &sender, token));
        let outcome = consume(&receiver, config, token);
        // A producer blocked on a full channel sees the hang-up and exits.
        drop(receiver);
        outcome
    })
}

fn produce<R: BufRead>(mut scanner: Scanner<R>, sender: &SyncSender<Fragment>, token: &CancellationToken) {
    while Scanner::scan(&mut scanner) {
        if token.is_cancelled() {
            tracing::debug!("scanner cancelled");
            return;
        }
        let Some(fragment) = scanner.fragment() else {
            return;
        };
        tracing::trace!(line_offset = fragment.line_offset, "fragment sent");
        if sender.send(fragment).is_err() {
            return;
        }
    }
}

fn consume(
    receiver: &Receiver<Fragment>,
    config: &Config,
    token: &CancellationToken,
) -> Result<Parsed, ParseError> {
    let mut preprocessor = Preprocessor::new(config);
    let mut driver = Driver::new(config);
    for fragment in receiver {
        if token.is_cancelled() {
            return Err(ParseError::Cancelled);
        }
        preprocessor.process(fragment, &mut driver)?;
    }
    if token.is_cancelled() {
        return Err(ParseError::Cancelled);
    }
    Ok(driver.assembler.finish())
}

/// Parses preprocessed fragments and feeds the assembler.
#[derive(Debug)]
struct Driver {
    parser: FragmentParser,
    assembler: Assembler,
}

impl Driver {
    fn new(config: &Config) -> Self {
        Self {
            parser: FragmentParser::new(),
            assembler: Assembler::new(config),
        }
    }
}

impl FragmentSink for Driver {
    fn attributes(&self) -> &AttributeTable {
        self.assembler.attributes()
    }

    fn accept(&mut self, item: Preprocessed) -> Result<(), ParseError> {
        match item {
            Preprocessed::Fragment {
                line_offset,
                scopes,
                lines,
            } => {
                for component in self.parser.parse(line_offset, &scopes, lines) {
                    self.assembler.push(component);
                }
            }
            Preprocessed::Unresolved { line, message } => {
                self.assembler.push(PositionedComponent {
                    line,
                    component: Component::Unresolved { message },
                });
            }
        }
        Ok(())
    }

    fn diagnostic(&mut self, diagnostic: Diagnostic) {
        self.assembler.diagnostic(diagnostic);
    }
}

// ── Fragment stream ──────────────────────────────────────────────────

/// Scan `reader` on a background thread and iterate over its fragments.
///
/// Only the scanner runs here: include directives stay in the fragments
/// as classified lines.
pub fn scan_fragments<R: BufRead + Send + 'static>(reader: R, config: &Config) -> FragmentStream {
    let token = CancellationToken::new();
    let (sender, receiver) = mpsc::sync_channel(1);
    let scanner = Scanner::new(reader, config);
    let producer = token.clone();
    let handle = thread::spawn(move || produce(scanner, &sender, &producer));
    FragmentStream {
        receiver: Some(receiver),
        token,
        handle: Some(handle),
    }
}

/// Fragments produced by a scanner thread, in source order.
///
/// Dropping the stream cancels the scanner and waits for it to exit.
#[derive(Debug)]
pub struct FragmentStream {
    receiver: Option<Receiver<Fragment>>,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl FragmentStream {
    /// Stop the scanner. At most one fragment already in flight is still
    /// delivered.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The token controlling this stream.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Iterator for FragmentStream {
    type Item = Fragment;

    fn next(&mut self) -> Option<Fragment> {
        if self.token.is_cancelled() {
            // Close the channel; a producer blocked in `send` then exits.
            return self.receiver.take()?.try_recv().ok();
        }
        let fragment = self.receiver.as_ref()?.recv().ok();
        if fragment.is_none() {
            self.receiver = None;
        }
        fragment
    }
}

impl Drop for FragmentStream {
    fn drop(&mut self) {
        self.token.cancel();
        self.receiver = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("scanner thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::asg::{Block, InlineElement};

    #[test]
    fn parses_through_the_channel() {
        let (doc, diagnostics) =
            parse_document("= Title\n\n:x: 1\n\n{x}\n\n== Section\n\ntext", &Config::default())
                .expect("parse");
        assert!(diagnostics.is_empty());
        assert_eq!(doc.blocks.len(), 2);
        let Block::Paragraph(p) = &doc.blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.lines, vec![vec![InlineElement::text("1")]]);
    }

    #[test]
    fn cancelled_token_stops_the_parse() {
        let token = CancellationToken::new();
        token.cancel();
        let input = "para\n\n".repeat(100);
        let result = parse_with_cancellation(input.as_bytes(), &Config::default(), &token);
        assert!(matches!(result, Err(ParseError::Cancelled)));
    }

    #[test]
    fn read_errors_are_fatal() {
        let bytes: &[u8] = b"ok\n\xff\xfe\n";
        let result = parse_reader(bytes, &Config::default());
        assert!(matches!(result, Err(ParseError::Encoding { line: 2, .. })));
    }

    #[test]
    fn stray_front_matter_delimiter_is_fatal() {
        let result = parse_document("para\n\n---\nx\n---", &Config::default());
        assert!(matches!(result, Err(ParseError::UnsupportedDelimiter { line: 3, .. })));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = parse_file("/definitely/not/here.adoc", &Config::default());
        assert!(matches!(result, Err(ParseError::Read { .. })));
    }

    // ── Fragment stream ──────────────────────────────────────────────

    #[test]
    fn stream_yields_fragments_in_order() {
        let offsets: Vec<usize> = scan_fragments(&b"a\n\nb\n\nc"[..], &Config::default())
            .map(|fragment| fragment.line_offset)
            .collect();
        assert_eq!(offsets, vec![1, 3, 5]);
    }

    #[test]
    fn stream_delivers_at_most_one_fragment_after_cancel() {
        let input = "para\n\n".repeat(1000);
        let mut stream = scan_fragments(std::io::Cursor::new(input.into_bytes()), &Config::default());
        assert!(stream.next().is_some());
        stream.cancel();
        assert!(stream.by_ref().count() <= 1);
        assert!(stream.next().is_none());
    }
}
