#![doc = include_str!("../README.md")]
#![deny(missing_docs, unsafe_code)]

pub mod asg;
pub mod assembler;
pub mod attributes;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod fragment;
pub mod grammar;
mod lexer;
pub mod pipeline;
pub mod preprocess;
pub mod scanner;
pub mod span;
pub mod subs;
mod token;

pub use asg::Document;
pub use config::{Config, SafeMode};
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use error::{IncludeError, ParseError};
pub use pipeline::{
    CancellationToken, FragmentStream, Parsed, parse_document, parse_file, parse_reader,
    parse_with_cancellation, scan_fragments,
};

/// Substitute a single line of inline text with the `normal` phases and an
/// empty attribute table.
#[must_use]
pub fn parse_inline(input: &str) -> Vec<asg::InlineElement> {
    let table = attributes::AttributeTable::new();
    let mut counters = subs::Counters::default();
    let mut diagnostics = Vec::new();
    let mut ctx = subs::SubstitutionContext::new(&table, &mut counters, &mut diagnostics);
    subs::substitute_line(input, subs::NORMAL, &mut ctx)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::asg::{InlineElement, QuoteKind};

    #[test]
    fn parse_inline_runs_normal_subs() {
        assert_eq!(
            parse_inline("a *b*"),
            vec![
                InlineElement::text("a "),
                InlineElement::QuotedText {
                    kind: QuoteKind::Strong,
                    elements: vec![InlineElement::text("b")],
                },
            ]
        );
    }
}
