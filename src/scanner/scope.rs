//! The scanner's scope stack.
//!
//! The top scope picks the grammar entrypoint for the next line, and every
//! classified line is fed back through [`ScopeStack::apply`]. The fragment
//! parser replays the same transitions from the stack a fragment started
//! with, so both stages always agree on where blocks open and close.

use smallvec::{SmallVec, smallvec};

use crate::fragment::{Delimiter, DelimiterKind, RawElement};
use crate::grammar::Entrypoint;

/// Block styles whose delimited content is never parsed for blocks.
const VERBATIM_STYLES: [&str; 10] = [
    "verse",
    "pass",
    "comment",
    "stem",
    "latexmath",
    "asciimath",
    "listing",
    "literal",
    "source",
    "table",
];

/// A lexical scope of the line scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Between blocks.
    Default,
    /// After the first line of a paragraph.
    WithinParagraph,
    /// Inside a block whose lines are kept literally.
    WithinVerbatim(Delimiter),
    /// Inside a block whose lines are parsed as nested blocks.
    WithinNormalBlock(Delimiter),
    /// After a list item marker line.
    WithinList,
}

/// What a classified line did to the scope stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing structural changed.
    Continue,
    /// A delimited block opened.
    Open {
        /// Whether the block's content is kept literally.
        verbatim: bool,
    },
    /// A delimited block closed.
    Close {
        /// Whether the stack is back at the bottom.
        end_fragment: bool,
    },
    /// A blank line.
    Blank {
        /// Whether the blank line ends the fragment. When `false` it is
        /// retained as a raw line of the enclosing block.
        end_fragment: bool,
    },
    /// A delimiter line that is plain text where it appears.
    Literal,
    /// A delimiter that cannot open a block here.
    Unsupported,
}

impl Step {
    /// Whether the line is the last one of its fragment.
    #[must_use]
    pub fn ends_fragment(self) -> bool {
        matches!(
            self,
            Self::Close { end_fragment: true } | Self::Blank { end_fragment: true }
        )
    }
}

/// Stack of [`Scope`]s. Never empty: [`Scope::Default`] is always at the
/// bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeStack {
    scopes: SmallVec<[Scope; 8]>,
    verbatim_next: bool,
    subs_next: bool,
    document_start: bool,
    header: bool,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self {
            scopes: smallvec![Scope::Default],
            verbatim_next: false,
            subs_next: false,
            document_start: false,
            header: false,
        }
    }
}

impl ScopeStack {
    /// An empty stack for content that is not the start of a document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty stack for the first line of a root document, where a
    /// level-0 title opens the document header.
    #[must_use]
    pub fn document() -> Self {
        Self {
            document_start: true,
            ..Self::default()
        }
    }

    /// The stack an included file starts from: the same scopes, but never
    /// at the start of the document or inside its header.
    #[must_use]
    pub fn for_include(&self) -> Self {
        Self {
            document_start: false,
            header: false,
            ..self.clone()
        }
    }

    /// The innermost scope.
    #[must_use]
    pub fn top(&self) -> Scope {
        self.scopes.last().copied().unwrap_or(Scope::Default)
    }

    /// Number of scopes, including the bottom one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Whether only the bottom scope is left.
    #[must_use]
    pub fn is_at_root(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Whether the stack is inside the document header.
    #[must_use]
    pub fn in_header(&self) -> bool {
        self.header
    }

    /// Whether the next line would be the first content of the document.
    #[must_use]
    pub fn at_document_start(&self) -> bool {
        self.document_start
    }

    /// The grammar entrypoint for the next line.
    #[must_use]
    pub fn entrypoint(&self) -> Entrypoint {
        if self.header {
            return Entrypoint::DefaultFragmentElement;
        }
        match self.top() {
            Scope::Default | Scope::WithinList => Entrypoint::DefaultFragmentElement,
            Scope::WithinParagraph => Entrypoint::WithinParagraph,
            Scope::WithinVerbatim(delimiter) => Entrypoint::WithinVerbatimBlock(delimiter),
            Scope::WithinNormalBlock(delimiter) => Entrypoint::WithinNormalBlock(delimiter),
        }
    }

    fn clear_pending(&mut self) {
        self.verbatim_next = false;
        self.subs_next = false;
    }

    fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Apply the transition for one classified line.
    pub fn apply(&mut self, element: &RawElement, text: &str) -> Step {
        if let Scope::WithinVerbatim(open) = self.top() {
            return match element {
                RawElement::BlockDelimiter { delimiter, .. } if *delimiter == open => {
                    self.pop();
                    Step::Close {
                        end_fragment: self.is_at_root(),
                    }
                }
                _ => Step::Continue,
            };
        }

        self.track_document_start(element);

        if element.is_blank_in(text) {
            return self.blank();
        }

        match element {
            RawElement::BlockDelimiter { delimiter, .. } => self.delimiter(*delimiter),
            RawElement::RawLine => {
                self.clear_pending();
                if !self.header
                    && matches!(self.top(), Scope::Default | Scope::WithinNormalBlock(_))
                {
                    self.push(Scope::WithinParagraph);
                }
                Step::Continue
            }
            RawElement::ListElementHeader(_) => {
                self.clear_pending();
                if matches!(self.top(), Scope::Default | Scope::WithinNormalBlock(_)) {
                    self.push(Scope::WithinList);
                }
                Step::Continue
            }
            RawElement::AttributeList(list) => {
                self.subs_next |= list.named("subs").is_some();
                self.verbatim_next |= list.first().is_some_and(|first| {
                    let style = first
                        .split(['#', '.', '%'])
                        .next()
                        .unwrap_or_default()
                        .trim();
                    VERBATIM_STYLES.contains(&style)
                });
                Step::Continue
            }
            RawElement::Title(_) | RawElement::SingleLineComment(_) => Step::Continue,
            _ => {
                self.clear_pending();
                Step::Continue
            }
        }
    }

    fn track_document_start(&mut self, element: &RawElement) {
        if !self.document_start {
            return;
        }
        let keeps_start = match element {
            RawElement::BlankLine | RawElement::SingleLineComment(_) => true,
            RawElement::BlockDelimiter { delimiter, .. } => {
                delimiter.kind == DelimiterKind::FrontMatter
            }
            RawElement::SectionHeader { level: 0, .. } => {
                self.header = true;
                false
            }
            _ => false,
        };
        if !keeps_start {
            self.document_start = false;
        }
    }

    fn blank(&mut self) -> Step {
        self.header = false;
        while matches!(self.top(), Scope::WithinParagraph | Scope::WithinList) {
            self.pop();
        }
        Step::Blank {
            end_fragment: self.is_at_root(),
        }
    }

    fn delimiter(&mut self, delimiter: Delimiter) -> Step {
        if matches!(self.top(), Scope::WithinParagraph | Scope::WithinList) {
            let enclosing = self
                .scopes
                .iter()
                .rposition(|scope| *scope == Scope::WithinNormalBlock(delimiter));
            if let Some(index) = enclosing {
                self.scopes.truncate(index.max(1));
                self.clear_pending();
                return Step::Close {
                    end_fragment: self.is_at_root(),
                };
            }
            if self.top() == Scope::WithinParagraph {
                return Step::Literal;
            }
        }

        if self.top() == Scope::WithinNormalBlock(delimiter) {
            self.pop();
            self.clear_pending();
            return Step::Close {
                end_fragment: self.is_at_root(),
            };
        }

        if delimiter.kind == DelimiterKind::FrontMatter && !self.document_start {
            return Step::Unsupported;
        }

        self.header = false;
        // A quote block with explicit subs holds verse-like literal lines.
        let verbatim = delimiter.kind.is_verbatim()
            || self.verbatim_next
            || (delimiter.kind == DelimiterKind::Quote && self.subs_next);
        self.clear_pending();
        if verbatim {
            self.push(Scope::WithinVerbatim(delimiter));
        } else {
            self.push(Scope::WithinNormalBlock(delimiter));
        }
        Step::Open { verbatim }
    }
}
