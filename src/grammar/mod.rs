//! Line grammar, attribute lists, header lines and the fragment parser.
//!
//! The line scanner classifies each line with [`parse_line`], picking the
//! [`Entrypoint`] from the scope it is in. The same function is replayed by
//! the [`FragmentParser`] when it turns fragments into components.

mod attrlist;
mod components;
mod header;
mod line;

use chumsky::prelude::*;

pub use attrlist::{parse_attribute_list, resolve as resolve_attributes};
pub use components::{Component, FragmentParser, PositionedComponent};

use crate::fragment::{Delimiter, RawElement};

/// Which part of the grammar applies to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entrypoint {
    /// Top level, and inside lists.
    DefaultFragmentElement,
    /// After the first line of a paragraph.
    WithinParagraph,
    /// Inside a block whose content is never parsed.
    WithinVerbatimBlock(Delimiter),
    /// Inside a compound block.
    WithinNormalBlock(Delimiter),
}

/// Classify `text` under `entry`.
///
/// Anything the grammar does not recognize is a [`RawElement::RawLine`];
/// classification never fails.
#[must_use]
pub fn parse_line(text: &str, entry: Entrypoint) -> RawElement {
    let line = text.trim_end();
    match entry {
        Entrypoint::WithinVerbatimBlock(delimiter) => {
            if delimiter.closes(line) {
                RawElement::BlockDelimiter {
                    delimiter,
                    language: None,
                }
            } else {
                line::include()
                    .parse(line)
                    .into_output()
                    .unwrap_or(RawElement::RawLine)
            }
        }
        _ if line.trim_start().is_empty() => RawElement::BlankLine,
        Entrypoint::WithinParagraph => line::paragraph_line()
            .parse(line)
            .into_output()
            .unwrap_or(RawElement::RawLine),
        Entrypoint::DefaultFragmentElement | Entrypoint::WithinNormalBlock(_) => line::block_line()
            .parse(line)
            .into_output()
            .unwrap_or(RawElement::RawLine),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fragment::DelimiterKind;

    const LISTING: Delimiter = Delimiter {
        kind: DelimiterKind::Listing,
        length: 4,
    };

    #[test]
    fn blank_lines() {
        assert_eq!(parse_line("", Entrypoint::DefaultFragmentElement), RawElement::BlankLine);
        assert_eq!(parse_line(" \t", Entrypoint::WithinParagraph), RawElement::BlankLine);
    }

    #[test]
    fn verbatim_only_sees_its_closing_delimiter() {
        let entry = Entrypoint::WithinVerbatimBlock(LISTING);
        assert_eq!(parse_line("== Not a section", entry), RawElement::RawLine);
        assert_eq!(parse_line("", entry), RawElement::RawLine);
        assert_eq!(parse_line("....", entry), RawElement::RawLine);
        assert_eq!(
            parse_line("----", entry),
            RawElement::BlockDelimiter {
                delimiter: LISTING,
                language: None
            }
        );
    }

    #[test]
    fn verbatim_still_honors_includes() {
        let entry = Entrypoint::WithinVerbatimBlock(LISTING);
        assert!(matches!(
            parse_line("include::code.rs[]", entry),
            RawElement::FileInclusion { .. }
        ));
    }

    #[test]
    fn paragraph_ignores_block_syntax() {
        let entry = Entrypoint::WithinParagraph;
        assert_eq!(parse_line("* not an item", entry), RawElement::RawLine);
        assert_eq!(parse_line("== not a section", entry), RawElement::RawLine);
        assert!(matches!(
            parse_line("// comment", entry),
            RawElement::SingleLineComment(_)
        ));
        assert!(matches!(
            parse_line("====", entry),
            RawElement::BlockDelimiter { .. }
        ));
    }

    #[test]
    fn normal_block_uses_full_grammar() {
        let entry = Entrypoint::WithinNormalBlock(Delimiter::new(DelimiterKind::Example, 4));
        assert!(matches!(
            parse_line("* item", entry),
            RawElement::ListElementHeader(_)
        ));
    }

    #[test]
    fn trailing_whitespace_is_ignored() {
        assert!(matches!(
            parse_line("----   ", Entrypoint::DefaultFragmentElement),
            RawElement::BlockDelimiter { .. }
        ));
    }
}
