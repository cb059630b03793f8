//! The line scanner.
//!
//! Reads the source line by line, runs conditional directives, classifies
//! every remaining line with the grammar entrypoint of the current scope
//! and groups the classified lines into [`Fragment`]s.
//!
//! ```text
//! source ──▶ LineReader ──▶ Conditionals ──▶ parse_line ──▶ ScopeStack
//!                                                              │
//!                                                   Fragment ◀─┘
//! ```

mod reader;
mod scope;

use std::io::BufRead;

pub use scope::{Scope, ScopeStack, Step};

use crate::attributes::AttributeTable;
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::error::ParseError;
use crate::fragment::{Fragment, Line, RawElement};
use crate::grammar;
use crate::preprocess::conditional::{Conditionals, LineAction};

pub(crate) use reader::LineReader;

/// Splits a source into fragments.
///
/// Call [`scan`](Self::scan) until it returns `false`, taking each
/// fragment with [`fragment`](Self::fragment), or use the scanner as an
/// iterator. Once a fragment carries an error, every later call to `scan`
/// returns `false`.
#[derive(Debug)]
pub struct Scanner<R> {
    reader: LineReader<R>,
    scopes: ScopeStack,
    attributes: AttributeTable,
    conditionals: Conditionals,
    line_no: usize,
    finished: bool,
    current: Option<Fragment>,
}

impl<R: BufRead> Scanner<R> {
    /// A scanner for the root document described by `config`.
    pub fn new(reader: R, config: &Config) -> Self {
        Self::with_scopes(
            reader,
            config.origin(),
            AttributeTable::from_caller(&config.attributes),
            ScopeStack::document(),
        )
    }

    /// A scanner that starts in `scopes`, used for included files so that
    /// their lines classify as they would have inline.
    pub(crate) fn with_scopes(
        reader: R,
        origin: impl Into<String>,
        attributes: AttributeTable,
        scopes: ScopeStack,
    ) -> Self {
        Self {
            reader: LineReader::new(reader, origin),
            scopes,
            attributes,
            conditionals: Conditionals::default(),
            line_no: 0,
            finished: false,
            current: None,
        }
    }

    /// The attribute view used for conditional directives.
    #[must_use]
    pub fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    /// Take the fragment produced by the last successful [`scan`](Self::scan).
    pub fn fragment(&mut self) -> Option<Fragment> {
        self.current.take()
    }

    /// Scan the next fragment.
    ///
    /// Returns `true` when a fragment is ready, including a fragment that
    /// carries an error, and `false` at end of input or after an error.
    pub fn scan(&mut self) -> bool {
        if self.finished {
            return false;
        }
        let mut lines: Vec<Line> = Vec::new();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut line_offset = self.line_no + 1;
        let mut scopes = self.scopes.clone();

        loop {
            let text = match self.reader.next_line() {
                Ok(Some(text)) => text,
                Ok(None) => {
                    self.finished = true;
                    self.conditionals.finish(&mut diagnostics);
                    if lines.is_empty() && diagnostics.is_empty() {
                        return false;
                    }
                    return self.emit(line_offset, scopes, Ok(lines), diagnostics);
                }
                Err(err) => {
                    self.finished = true;
                    return self.emit(line_offset, scopes, Err(err), diagnostics);
                }
            };
            self.line_no += 1;

            let text = match self.conditionals.process(
                &text,
                self.line_no,
                &self.attributes,
                &mut diagnostics,
            ) {
                LineAction::Keep => text,
                LineAction::Replace(replacement) => replacement,
                LineAction::Skip if lines.is_empty() => continue,
                LineAction::Skip => return self.emit(line_offset, scopes, Ok(lines), diagnostics),
            };

            if lines.is_empty() {
                if self.scopes.is_at_root() && text.trim().is_empty() {
                    continue;
                }
                line_offset = self.line_no;
                scopes = self.scopes.clone();
            }

            let mut element = grammar::parse_line(&text, self.scopes.entrypoint());
            let step = self.scopes.apply(&element, &text);
            match step {
                Step::Unsupported => {
                    self.finished = true;
                    let err = ParseError::UnsupportedDelimiter {
                        line: self.line_no,
                        delimiter: text.trim().to_string(),
                    };
                    return self.emit(line_offset, scopes, Err(err), diagnostics);
                }
                Step::Literal | Step::Blank { end_fragment: false } => {
                    element = RawElement::RawLine;
                }
                _ => {}
            }
            if let RawElement::AttributeDeclaration { name, value } = &element {
                self.attributes.apply(name, value.as_deref());
            }
            lines.push(Line::new(text, element));

            if step.ends_fragment() {
                return self.emit(line_offset, scopes, Ok(lines), diagnostics);
            }
        }
    }

    fn emit(
        &mut self,
        line_offset: usize,
        scopes: ScopeStack,
        lines: Result<Vec<Line>, ParseError>,
        diagnostics: Vec<Diagnostic>,
    ) -> bool {
        tracing::debug!(
            line_offset,
            lines = lines.as_ref().map_or(0, Vec::len),
            error = lines.is_err(),
            "fragment scanned"
        );
        self.current = Some(Fragment {
            line_offset,
            scopes,
            lines,
            diagnostics,
        });
        true
    }
}

impl<R: BufRead> Iterator for Scanner<R> {
    type Item = Fragment;

    fn next(&mut self) -> Option<Fragment> {
        if self.scan() { self.fragment() } else { None }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fragment::DelimiterKind;

    fn scan(input: &str) -> Vec<Fragment> {
        Scanner::new(input.as_bytes(), &Config::default()).collect()
    }

    fn texts(fragment: &Fragment) -> Vec<&str> {
        fragment
            .lines
            .as_ref()
            .map(|lines| lines.iter().map(|l| l.text.as_str()).collect())
            .unwrap_or_default()
    }

    // ── Fragment boundaries ──────────────────────────────────────────

    #[test]
    fn empty_input_has_no_fragments() {
        assert!(scan("").is_empty());
        assert!(scan("\n\n  \n").is_empty());
    }

    #[test]
    fn blank_lines_split_paragraphs() {
        let fragments = scan("one\ntwo\n\n\nthree");
        assert_eq!(fragments.len(), 2);
        assert_eq!(texts(&fragments[0]), vec!["one", "two", ""]);
        assert_eq!(fragments[0].line_offset, 1);
        assert_eq!(texts(&fragments[1]), vec!["three"]);
        assert_eq!(fragments[1].line_offset, 5);
    }

    #[test]
    fn verbatim_block_keeps_blank_lines() {
        let fragments = scan("----\na\n\nb\n----\nafter");
        assert_eq!(fragments.len(), 2);
        assert_eq!(texts(&fragments[0]), vec!["----", "a", "", "b", "----"]);
        let lines = fragments[0].lines.as_ref().expect("lines");
        assert_eq!(lines[2].element, RawElement::RawLine);
        assert_eq!(fragments[1].line_offset, 6);
    }

    #[test]
    fn line_offsets_match_source_lines() {
        let source = "= Title\n\npara\n\n====\ninner\n\nmore\n====\n\n* a\n* b\n";
        let all: Vec<&str> = source.lines().collect();
        for fragment in scan(source) {
            for (k, line) in fragment.lines.as_ref().expect("lines").iter().enumerate() {
                assert_eq!(line.text, all[fragment.line_offset + k - 1]);
            }
        }
    }

    #[test]
    fn normal_block_retains_inner_blank_as_raw_line() {
        let fragments = scan("====\ninner\n\nmore\n====");
        assert_eq!(fragments.len(), 1);
        let lines = fragments[0].lines.as_ref().expect("lines");
        assert_eq!(lines[2].element, RawElement::RawLine);
        assert!(lines[2].is_blank());
    }

    // ── Classification ───────────────────────────────────────────────

    #[test]
    fn paragraph_lines_are_not_list_items() {
        let fragments = scan("text\n* not an item");
        let lines = fragments[0].lines.as_ref().expect("lines");
        assert_eq!(lines[1].element, RawElement::RawLine);
    }

    #[test]
    fn listing_content_is_raw() {
        let fragments = scan("----\n== not a heading\n----");
        let lines = fragments[0].lines.as_ref().expect("lines");
        assert_eq!(lines[1].element, RawElement::RawLine);
    }

    // ── Conditionals ─────────────────────────────────────────────────

    #[test]
    fn conditionals_use_scanned_declarations() {
        let fragments = scan(":debug:\n\nifdef::debug[]\nshown\nendif::[]\nifndef::debug[]\nhidden\nendif::[]");
        let all: Vec<Vec<&str>> = fragments.iter().map(texts).collect();
        assert_eq!(all, vec![vec![":debug:", ""], vec!["shown"]]);
        assert_eq!(fragments[1].line_offset, 4);
    }

    #[test]
    fn unclosed_conditional_is_reported_with_last_fragment() {
        let fragments = scan("ifdef::x[]\nhidden");
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].is_empty());
        assert_eq!(fragments[0].diagnostics.len(), 1);
    }

    // ── Errors ───────────────────────────────────────────────────────

    #[test]
    fn front_matter_is_accepted_on_first_line() {
        let fragments = scan("---\ntitle: x\n---\n\ntext");
        let lines = fragments[0].lines.as_ref().expect("lines");
        assert!(matches!(
            &lines[0].element,
            RawElement::BlockDelimiter { delimiter, .. } if delimiter.kind == DelimiterKind::FrontMatter
        ));
        assert_eq!(fragments.len(), 2);
    }

    #[test]
    fn stray_front_matter_delimiter_is_sticky_error() {
        let mut scanner = Scanner::new("text\n\n---\nmore\n".as_bytes(), &Config::default());
        assert!(Scanner::scan(&mut scanner));
        assert!(scanner.fragment().is_some_and(|f| !f.is_error()));
        assert!(Scanner::scan(&mut scanner));
        let fragment = scanner.fragment().expect("error fragment");
        assert!(matches!(
            fragment.lines,
            Err(ParseError::UnsupportedDelimiter { line: 3, .. })
        ));
        assert!(!Scanner::scan(&mut scanner));
        assert!(!Scanner::scan(&mut scanner));
    }
}
