//! Fragments: the unit of work handed from the line scanner to the
//! consumer.
//!
//! A fragment is a run of consecutive source lines that can be assembled
//! without looking at anything outside of it, given the scope stack it
//! started in.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::diagnostic::Diagnostic;
use crate::error::ParseError;
use crate::scanner::ScopeStack;

/// Kinds of block delimiter lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DelimiterKind {
    /// `----`
    Listing,
    /// `....`
    Literal,
    /// ```` ``` ````
    Fenced,
    /// `====`
    Example,
    /// `****`
    Sidebar,
    /// `____`
    Quote,
    /// `////`
    Comment,
    /// `++++`
    Passthrough,
    /// `--`
    Open,
    /// `---` on the first line of the root document.
    FrontMatter,
    /// `|===`
    Table,
}

impl DelimiterKind {
    /// Whether content between the delimiters is never parsed for blocks.
    #[must_use]
    pub fn is_verbatim(self) -> bool {
        matches!(
            self,
            Self::Listing
                | Self::Literal
                | Self::Fenced
                | Self::Comment
                | Self::Passthrough
                | Self::FrontMatter
                | Self::Table
        )
    }
}

/// A delimiter line. Opening and closing lines match on kind and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Delimiter {
    /// Delimiter kind.
    pub kind: DelimiterKind,
    /// Number of delimiter characters.
    pub length: usize,
}

impl Delimiter {
    /// A delimiter of `kind` with `length` characters.
    #[must_use]
    pub fn new(kind: DelimiterKind, length: usize) -> Self {
        Self { kind, length }
    }

    /// Whether `line` closes a block opened by this delimiter.
    #[must_use]
    pub fn closes(&self, line: &str) -> bool {
        let line = line.trim_end();
        match self.kind {
            DelimiterKind::Table => line.strip_prefix('|').is_some_and(|rest| {
                rest.len() + 1 == self.length && rest.bytes().all(|b| b == b'=')
            }),
            kind => {
                let ch = delimiter_char(kind);
                line.len() == self.length && line.chars().all(|c| c == ch)
            }
        }
    }
}

fn delimiter_char(kind: DelimiterKind) -> char {
    match kind {
        DelimiterKind::Listing | DelimiterKind::Open | DelimiterKind::FrontMatter => '-',
        DelimiterKind::Literal => '.',
        DelimiterKind::Fenced => '`',
        DelimiterKind::Example => '=',
        DelimiterKind::Sidebar => '*',
        DelimiterKind::Quote => '_',
        DelimiterKind::Comment => '/',
        DelimiterKind::Passthrough => '+',
        DelimiterKind::Table => '|',
    }
}

/// List families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    /// `*` or `-` items.
    Unordered,
    /// `.` or numbered items.
    Ordered,
    /// `term::` items.
    Labeled,
    /// `<1>` items.
    Callout,
}

/// Checklist state of an unordered list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkbox {
    /// `[ ]`
    Unchecked,
    /// `[x]` or `[*]`
    Checked,
}

/// A list item marker line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListMarker {
    /// List family.
    pub kind: ListKind,
    /// Nesting depth implied by the marker (number of marker characters).
    pub depth: usize,
    /// Marker identity. Items with equal markers belong to the same list.
    pub marker: String,
    /// Term of a labeled list item.
    pub term: Option<String>,
    /// Checklist state.
    pub checkbox: Option<Checkbox>,
    /// Text after the marker.
    pub text: String,
}

/// A parsed `[...]` attribute list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeList {
    /// Positional entries. Empty entries are kept as empty strings.
    pub positional: Vec<String>,
    /// Named entries.
    pub named: BTreeMap<String, String>,
}

impl AttributeList {
    /// First positional entry, if non-empty.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.positional.first().map(String::as_str).filter(|s| !s.is_empty())
    }

    /// Positional entry at `index`, if non-empty.
    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str).filter(|s| !s.is_empty())
    }

    /// Named entry `name`.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Later lists override earlier ones entry by entry.
    pub fn merge(&mut self, other: AttributeList) {
        for (index, value) in other.positional.into_iter().enumerate() {
            if index < self.positional.len() {
                if !value.is_empty() {
                    self.positional[index] = value;
                }
            } else {
                self.positional.push(value);
            }
        }
        self.named.extend(other.named);
    }
}

/// Classification of a single source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawElement {
    /// Plain text. The text lives on the owning [`Line`].
    RawLine,
    /// Empty or whitespace-only line.
    BlankLine,
    /// A block delimiter.
    BlockDelimiter {
        /// The delimiter.
        delimiter: Delimiter,
        /// Language of a fenced block (```` ```ruby ````).
        language: Option<String>,
    },
    /// A list item marker line.
    ListElementHeader(ListMarker),
    /// A lone `+`.
    ListContinuation,
    /// `:name: value`; `value` is `None` for `:name!:` and `:!name:`.
    AttributeDeclaration {
        /// Attribute name.
        name: String,
        /// New value, or `None` to unset.
        value: Option<String>,
    },
    /// `[...]` or `[[id]]` on its own line.
    AttributeList(AttributeList),
    /// `.Title`
    Title(String),
    /// `== Title`; level 0 is the document title.
    SectionHeader {
        /// Section level (number of `=` minus one).
        level: u8,
        /// Title text.
        title: String,
    },
    /// `// text`
    SingleLineComment(String),
    /// `include::target[attrs]`
    FileInclusion {
        /// Target as written.
        target: String,
        /// Directive attributes.
        attributes: AttributeList,
    },
    /// `image::target[attrs]`
    BlockMacro {
        /// Macro name.
        name: String,
        /// Macro target.
        target: String,
        /// Macro attributes.
        attributes: AttributeList,
    },
    /// `'''`
    ThematicBreak,
    /// `<<<`
    PageBreak,
}

impl RawElement {
    /// Blank lines, and raw lines whose text is blank, both end paragraphs.
    #[must_use]
    pub fn is_blank_in(&self, text: &str) -> bool {
        match self {
            Self::BlankLine => true,
            Self::RawLine => text.trim().is_empty(),
            _ => false,
        }
    }
}

/// A classified source line with its original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    /// Original text with the line terminator removed.
    pub text: String,
    /// Classification.
    pub element: RawElement,
}

impl Line {
    /// A line classified as `element`.
    #[must_use]
    pub fn new(text: impl Into<String>, element: RawElement) -> Self {
        Self {
            text: text.into(),
            element,
        }
    }

    /// A plain text line.
    #[must_use]
    pub fn raw(text: impl Into<String>) -> Self {
        Self::new(text, RawElement::RawLine)
    }

    /// Whether the line ends paragraphs.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.element.is_blank_in(&self.text)
    }
}

/// A self-contained run of consecutive source lines.
///
/// Element `k` of `lines` came from source line `line_offset + k`.
#[derive(Debug)]
pub struct Fragment {
    /// 1-based line number of the first element.
    pub line_offset: usize,
    /// Scope stack at the start of the fragment.
    pub scopes: ScopeStack,
    /// Classified lines, or the error that stopped the scanner.
    pub lines: Result<Vec<Line>, ParseError>,
    /// Warnings raised while scanning these lines.
    pub diagnostics: Vec<Diagnostic>,
}

impl Fragment {
    /// Number of source lines the fragment spans.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.as_ref().map_or(0, Vec::len)
    }

    /// Whether the fragment carries no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the fragment carries an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.lines.is_err()
    }
}
