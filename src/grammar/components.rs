//! The fragment parser: classified lines to typed components.
//!
//! A fragment's lines were classified by the scanner, one line at a time.
//! The fragment parser replays the scanner's scope transitions from the
//! stack the fragment started with, which tells it what each line means in
//! context: whether a delimiter opens or closes, whether a line sits in a
//! verbatim block, whether a title line starts the document header.

use serde::Serialize;

use crate::asg::{Author, Revision};
use crate::fragment::{AttributeList, Delimiter, Line, ListMarker, RawElement};
use crate::scanner::{Scope, ScopeStack, Step};

use super::attrlist::ADMONITIONS;
use super::header::{is_revision_line, parse_authors, parse_revision};

/// A line in its block context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// An empty line outside verbatim content.
    BlankLine,
    /// `:name: value`, or an unset when `value` is `None`.
    AttributeDeclaration {
        /// Attribute name.
        name: String,
        /// New value.
        value: Option<String>,
    },
    /// `[...]` block attributes for the next block.
    AttributeList(AttributeList),
    /// `.Title` for the next block.
    Title(String),
    /// A section title.
    SectionHeader {
        /// Level, 1 to 5 in the body.
        level: u8,
        /// Title text.
        title: String,
    },
    /// The level-0 title that opens the document header.
    DocumentTitle(String),
    /// The author line of the header.
    Authors(Vec<Author>),
    /// The revision line of the header.
    Revision(Revision),
    /// A delimiter that opens a block.
    DelimiterOpen {
        /// The delimiter.
        delimiter: Delimiter,
        /// Language of a fenced block.
        language: Option<String>,
        /// Whether the content is kept literally.
        verbatim: bool,
    },
    /// A delimiter that closes the innermost open block.
    DelimiterClose {
        /// The delimiter.
        delimiter: Delimiter,
    },
    /// A list item marker line.
    ListElementHeader(ListMarker),
    /// A lone `+`.
    ListContinuation,
    /// `// text`
    Comment(String),
    /// A content line, verbatim or inline.
    Line(String),
    /// `NOTE: text` and the other admonition labels.
    Admonition {
        /// The label, upper case.
        label: String,
        /// Text after the label.
        text: String,
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
    /// An include directive that could not be resolved.
    Unresolved {
        /// The message shown in place of the included content.
        message: String,
    },
}

/// A component with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionedComponent {
    /// Source line, relative to the file the line came from.
    pub line: usize,
    /// The component.
    pub component: Component,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum HeaderLine {
    #[default]
    None,
    Author,
    Revision,
}

/// Turns fragments into components.
#[derive(Debug, Default)]
pub struct FragmentParser {
    expect: HeaderLine,
}

impl FragmentParser {
    /// A parser with no header state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the lines of a fragment that starts at `line_offset` in
    /// `scopes`.
    pub fn parse(
        &mut self,
        line_offset: usize,
        scopes: &ScopeStack,
        lines: Vec<Line>,
    ) -> Vec<PositionedComponent> {
        let mut scopes = scopes.clone();
        let mut out = Vec::with_capacity(lines.len());

        for (index, line) in lines.into_iter().enumerate() {
            let before = scopes.top();
            let step = scopes.apply(&line.element, &line.text);
            let component = self.component(line, before, step, scopes.in_header());
            out.push(PositionedComponent {
                line: line_offset + index,
                component,
            });
        }
        out
    }

    fn component(&mut self, line: Line, before: Scope, step: Step, in_header: bool) -> Component {
        let Line { text, element } = line;
        if !in_header {
            self.expect = HeaderLine::None;
        }

        match (step, element) {
            (
                Step::Open { verbatim },
                RawElement::BlockDelimiter {
                    delimiter,
                    language,
                },
            ) => Component::DelimiterOpen {
                delimiter,
                language,
                verbatim,
            },
            (Step::Close { .. }, RawElement::BlockDelimiter { delimiter, .. }) => {
                Component::DelimiterClose { delimiter }
            }
            _ if matches!(before, Scope::WithinVerbatim(_)) => Component::Line(text),
            (Step::Blank { .. }, _) => Component::BlankLine,
            (_, RawElement::RawLine) => self.raw_line(text, before, in_header),
            (_, RawElement::SectionHeader { level: 0, title }) if in_header => {
                self.expect = HeaderLine::Author;
                Component::DocumentTitle(title)
            }
            (_, RawElement::SectionHeader { level, title }) => {
                Component::SectionHeader { level, title }
            }
            (_, RawElement::AttributeDeclaration { name, value }) => {
                self.expect = HeaderLine::None;
                Component::AttributeDeclaration { name, value }
            }
            (_, RawElement::AttributeList(list)) => Component::AttributeList(list),
            (_, RawElement::Title(title)) => Component::Title(title),
            (_, RawElement::SingleLineComment(comment)) => Component::Comment(comment),
            (_, RawElement::ListElementHeader(marker)) => Component::ListElementHeader(marker),
            (_, RawElement::ListContinuation) => Component::ListContinuation,
            (
                _,
                RawElement::BlockMacro {
                    name,
                    target,
                    attributes,
                },
            ) => Component::BlockMacro {
                name,
                target,
                attributes,
            },
            (_, RawElement::ThematicBreak) => Component::ThematicBreak,
            (_, RawElement::PageBreak) => Component::PageBreak,
            (_, RawElement::BlankLine) => Component::BlankLine,
            (_, RawElement::BlockDelimiter { .. } | RawElement::FileInclusion { .. }) => {
                Component::Line(text)
            }
        }
    }

    fn raw_line(&mut self, text: String, before: Scope, in_header: bool) -> Component {
        if in_header {
            match self.expect {
                HeaderLine::Author => {
                    self.expect = HeaderLine::Revision;
                    return Component::Authors(parse_authors(&text));
                }
                HeaderLine::Revision if is_revision_line(&text) => {
                    self.expect = HeaderLine::None;
                    return Component::Revision(parse_revision(&text));
                }
                _ => self.expect = HeaderLine::None,
            }
        }
        let starts_paragraph = matches!(before, Scope::Default | Scope::WithinNormalBlock(_));
        if starts_paragraph && !in_header {
            if let Some((label, rest)) = text.split_once(": ") {
                if ADMONITIONS.contains(&label) {
                    return Component::Admonition {
                        label: label.to_string(),
                        text: rest.trim_start().to_string(),
                    };
                }
            }
        }
        Component::Line(text)
    }
}
