//! The document tree produced by the assembler.
//!
//! Every node owns its data; nothing borrows from the source, since
//! fragments cross a thread boundary before they are assembled.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::fragment::{Checkbox, ListKind};

/// The root of a parsed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Caller attributes merged with header declarations.
    pub attributes: BTreeMap<String, String>,
    /// Document header, when the source opens with a level-0 title.
    pub header: Option<Header>,
    /// Raw lines of a `---` front matter block at the very top.
    pub front_matter: Option<Vec<String>>,
    /// Top-level blocks.
    pub blocks: Vec<Block>,
}

/// A document header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Document title.
    pub title: Vec<InlineElement>,
    /// Authors from the author line.
    pub authors: Vec<Author>,
    /// Revision line.
    pub revision: Option<Revision>,
}

/// A document author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Author {
    /// Full name (e.g., `"Doc Writer"`).
    pub fullname: String,
    /// Initials derived from name parts (e.g., `"DW"`).
    pub initials: String,
    /// First name.
    pub firstname: String,
    /// Middle name.
    pub middlename: Option<String>,
    /// Last name.
    pub lastname: Option<String>,
    /// Email address from `<email>`.
    pub email: Option<String>,
}

/// A revision line: `v1.0, 2024-01-01: Remark`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Revision {
    /// Version number without the `v` prefix.
    pub number: Option<String>,
    /// Revision date.
    pub date: Option<String>,
    /// Revision remark.
    pub remark: Option<String>,
}

/// Resolved block attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockAttributes {
    /// Block id from `[[id]]`, `[#id]` or `id=`.
    pub id: Option<String>,
    /// Reference text from `[[id,reftext]]` or `reftext=`.
    pub reftext: Option<String>,
    /// Block style (first positional).
    pub style: Option<String>,
    /// Role classes.
    pub roles: Vec<String>,
    /// Options from `%opt` or `options=`.
    pub options: Vec<String>,
    /// Block title from a `.Title` line.
    pub title: Option<Vec<InlineElement>>,
    /// Positional entries after the style.
    pub positional: Vec<String>,
    /// Named entries, including ones derived from positional slots
    /// (`language`, `attribution`, `citetitle`).
    pub named: BTreeMap<String, String>,
}

impl BlockAttributes {
    /// Whether option `name` is set.
    #[must_use]
    pub fn has_option(&self, name: &str) -> bool {
        self.options.iter().any(|o| o == name)
    }

    /// Named attribute `name`.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Source language of a listing.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.named("language")
    }

    /// Author of a quote or verse.
    #[must_use]
    pub fn attribution(&self) -> Option<&str> {
        self.named("attribution")
    }

    /// Cited work of a quote or verse.
    #[must_use]
    pub fn citetitle(&self) -> Option<&str> {
        self.named("citetitle")
    }

    /// Raw `subs` attribute value.
    #[must_use]
    pub fn subs(&self) -> Option<&str> {
        self.named("subs")
    }

    /// Whether the block carries `style`.
    #[must_use]
    pub fn is_style(&self, style: &str) -> bool {
        self.style.as_deref() == Some(style)
    }

    /// Whether nothing was set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A block-level node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// A section with its nested blocks.
    Section(Section),
    /// A paragraph.
    Paragraph(Paragraph),
    /// A delimited block.
    Delimited(DelimitedBlock),
    /// A list.
    List(List),
    /// A `[discrete]` heading.
    DiscreteHeading(DiscreteHeading),
    /// An `image::` block macro.
    Image(BlockImage),
    /// `'''`
    ThematicBreak,
    /// `<<<`
    PageBreak,
}

/// A section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Level, 1 to 5.
    pub level: u8,
    /// Title.
    pub title: Vec<InlineElement>,
    /// Attributes, with the generated id when none was given.
    pub attributes: BlockAttributes,
    /// Nested blocks.
    pub blocks: Vec<Block>,
}

impl Section {
    /// Section id.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attributes.id.as_deref()
    }
}

/// A paragraph: one inline list per source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    /// Attributes. Admonition paragraphs carry the lowercased label as style.
    pub attributes: BlockAttributes,
    /// Substituted lines.
    pub lines: Vec<Vec<InlineElement>>,
}

/// Content kinds of delimited blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
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
    /// `[verse]` on `____`
    Verse,
    /// `++++`
    Passthrough,
    /// `--`
    Open,
    /// `|===`
    Table,
}

/// Content of a delimited block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockContent {
    /// Lines of a verbatim block.
    Lines(Vec<Vec<InlineElement>>),
    /// Nested blocks of a compound block.
    Blocks(Vec<Block>),
}

/// A delimited block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelimitedBlock {
    /// Content kind.
    pub kind: BlockKind,
    /// Attributes.
    pub attributes: BlockAttributes,
    /// Lines or nested blocks.
    pub content: BlockContent,
    /// The block ran to end of input without a closing delimiter.
    pub synthetic_close: bool,
}

impl DelimitedBlock {
    /// Lines of a verbatim block; empty for compound blocks.
    #[must_use]
    pub fn lines(&self) -> &[Vec<InlineElement>] {
        match &self.content {
            BlockContent::Lines(lines) => lines,
            BlockContent::Blocks(_) => &[],
        }
    }

    /// Nested blocks of a compound block; empty for verbatim blocks.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        match &self.content {
            BlockContent::Blocks(blocks) => blocks,
            BlockContent::Lines(_) => &[],
        }
    }
}

/// A list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct List {
    /// List family.
    pub kind: ListKind,
    /// Marker identity shared by all items.
    pub marker: String,
    /// Attributes.
    pub attributes: BlockAttributes,
    /// Items.
    pub items: Vec<ListItem>,
}

/// A list item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListItem {
    /// Attributes.
    pub attributes: BlockAttributes,
    /// Term of a labeled list item.
    pub term: Option<Vec<InlineElement>>,
    /// Checklist state.
    pub checkbox: Option<Checkbox>,
    /// Item text, one inline list per source line.
    pub principal: Vec<Vec<InlineElement>>,
    /// Attached blocks and nested lists.
    pub blocks: Vec<Block>,
}

/// A heading outside the section hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscreteHeading {
    /// Heading level.
    pub level: u8,
    /// Title.
    pub title: Vec<InlineElement>,
    /// Attributes.
    pub attributes: BlockAttributes,
}

/// An `image::target[]` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockImage {
    /// Image path or URL.
    pub target: String,
    /// Attributes; `alt`, `width` and `height` are named.
    pub attributes: BlockAttributes,
}

/// Inline formatting kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteKind {
    /// `*strong*`
    Strong,
    /// `_emphasis_`
    Emphasis,
    /// `` `monospace` ``
    Monospace,
    /// `#mark#`
    Mark,
    /// `^superscript^`
    Superscript,
    /// `~subscript~`
    Subscript,
}

/// An inline link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineLink {
    /// URL or path.
    pub location: String,
    /// Display text; empty means show the location.
    pub text: Vec<InlineElement>,
    /// Remaining macro attributes.
    pub attributes: BTreeMap<String, String>,
}

/// An inline image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineImage {
    /// Image path or URL.
    pub target: String,
    /// Macro attributes; `alt`, `width` and `height` are named.
    pub attributes: BTreeMap<String, String>,
}

/// An inline node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineElement {
    /// Literal text.
    Text(String),
    /// Formatted text.
    QuotedText {
        /// Formatting kind.
        kind: QuoteKind,
        /// Formatted content.
        elements: Vec<InlineElement>,
    },
    /// A link or URL.
    Link(InlineLink),
    /// An inline image.
    Image(InlineImage),
    /// `icon:name[]`
    Icon {
        /// Icon name.
        name: String,
        /// Macro attributes.
        attributes: BTreeMap<String, String>,
    },
    /// `[[id]]` inline anchor.
    Anchor {
        /// Anchor id.
        id: String,
        /// Reference text.
        reftext: Option<String>,
    },
    /// `<<id,label>>` or `xref:id[label]`.
    CrossReference {
        /// Target id.
        id: String,
        /// Label; empty means use the target's title.
        label: Vec<InlineElement>,
    },
    /// `<`, `>` or `&`, for the renderer to escape.
    SpecialCharacter(char),
    /// Hard line break.
    LineBreak,
    /// `<1>` callout marker.
    Callout(u32),
    /// `{name}` that survived substitution without resolution.
    AttributeSubstitution(String),
    /// `{counter:name}` before resolution.
    CounterSubstitution {
        /// Counter name.
        name: String,
        /// Initial value for a new counter.
        seed: Option<String>,
        /// `counter2` increments without output.
        hidden: bool,
    },
    /// A predefined character attribute such as `{nbsp}`.
    PredefinedAttribute(String),
}

impl InlineElement {
    /// A text node.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// The text of a text node.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Concatenate the visible text of `elements`, ignoring markup.
#[must_use]
pub fn plain_text(elements: &[InlineElement]) -> String {
    let mut out = String::new();
    push_plain_text(elements, &mut out);
    out
}

fn push_plain_text(elements: &[InlineElement], out: &mut String) {
    for element in elements {
        match element {
            InlineElement::Text(text) => out.push_str(text),
            InlineElement::QuotedText { elements, .. } => push_plain_text(elements, out),
            InlineElement::Link(link) if link.text.is_empty() => out.push_str(&link.location),
            InlineElement::Link(link) => push_plain_text(&link.text, out),
            InlineElement::CrossReference { label, .. } => push_plain_text(label, out),
            InlineElement::SpecialCharacter(c) => out.push(*c),
            InlineElement::LineBreak => out.push('\n'),
            InlineElement::AttributeSubstitution(name) => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
            InlineElement::PredefinedAttribute(name) => {
                out.push_str(crate::subs::predefined_value(name).unwrap_or_default());
            }
            InlineElement::Image(_)
            | InlineElement::Icon { .. }
            | InlineElement::Anchor { .. }
            | InlineElement::Callout(_)
            | InlineElement::CounterSubstitution { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── BlockAttributes ──────────────────────────────────────────────

    #[test]
    fn block_attributes_default_is_empty() {
        let attrs = BlockAttributes::default();
        assert!(attrs.is_empty());
        assert!(attrs.language().is_none());
        assert!(!attrs.has_option("hardbreaks"));
    }

    #[test]
    fn block_attributes_accessors_read_named_entries() {
        let mut attrs = BlockAttributes::default();
        attrs.named.insert("attribution".into(), "Poe".into());
        attrs.named.insert("citetitle".into(), "The Raven".into());
        attrs.options.push("hardbreaks".into());
        assert_eq!(attrs.attribution(), Some("Poe"));
        assert_eq!(attrs.citetitle(), Some("The Raven"));
        assert!(attrs.has_option("hardbreaks"));
        assert!(!attrs.is_empty());
    }

    // ── plain_text ───────────────────────────────────────────────────

    #[test]
    fn plain_text_flattens_markup() {
        let elements = vec![
            InlineElement::text("a "),
            InlineElement::QuotedText {
                kind: QuoteKind::Strong,
                elements: vec![InlineElement::text("b")],
            },
            InlineElement::SpecialCharacter('&'),
            InlineElement::Callout(1),
        ];
        assert_eq!(plain_text(&elements), "a b&");
    }

    // ── DelimitedBlock ───────────────────────────────────────────────

    #[test]
    fn delimited_accessors_match_content() {
        let block = DelimitedBlock {
            kind: BlockKind::Listing,
            attributes: BlockAttributes::default(),
            content: BlockContent::Lines(vec![vec![InlineElement::text("x")]]),
            synthetic_close: false,
        };
        assert_eq!(block.lines().len(), 1);
        assert!(block.blocks().is_empty());
    }

    #[test]
    fn serializes_with_type_tags() {
        let block = Block::Paragraph(Paragraph {
            attributes: BlockAttributes::default(),
            lines: vec![vec![InlineElement::text("hi")]],
        });
        let json = serde_json::to_value(&block).expect("serializable");
        assert_eq!(json["type"], "paragraph");
        assert_eq!(json["lines"][0][0]["text"], "hi");
    }
}
