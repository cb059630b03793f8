//! Chumsky parsers for single source lines.
//!
//! Each parser recognizes one whole line (trailing whitespace already
//! trimmed) and yields a [`RawElement`]. Lines nothing recognizes are
//! [`RawElement::RawLine`].

use chumsky::{extra, prelude::*};

use super::attrlist::parse_attribute_list;
use crate::fragment::{
    AttributeList, Checkbox, Delimiter, DelimiterKind, ListKind, ListMarker, RawElement,
};

type Extra = extra::Default;

/// Every block-level construct, in priority order.
pub(super) fn block_line<'src>() -> impl Parser<'src, &'src str, RawElement, Extra> {
    choice((
        delimiter(),
        comment(),
        include(),
        block_macro(),
        attribute_declaration(),
        attribute_line(),
        section_header(),
        breaks(),
        list_continuation(),
        list_item(),
        block_title(),
    ))
}

/// Constructs recognized inside a paragraph.
///
/// Delimiters are recognized only so the scanner can close an enclosing
/// block with them; the scanner demotes any other delimiter to text.
pub(super) fn paragraph_line<'src>() -> impl Parser<'src, &'src str, RawElement, Extra> {
    choice((delimiter(), comment(), include()))
}

/// Include directives, which are honored in every scope.
pub(super) fn include<'src>() -> impl Parser<'src, &'src str, RawElement, Extra> {
    just("include::")
        .ignore_then(none_of("[").repeated().at_least(1).to_slice())
        .then(bracketed_tail())
        .map(|(target, attrs): (&str, &str)| RawElement::FileInclusion {
            target: target.trim().to_string(),
            attributes: parse_attribute_list(attrs),
        })
}

fn inline_ws<'src>() -> impl Parser<'src, &'src str, (), Extra> + Clone {
    one_of(" \t").repeated().at_least(1)
}

/// `[` content `]` running to end of line; yields the content.
fn bracketed_tail<'src>() -> impl Parser<'src, &'src str, &'src str, Extra> + Clone {
    just('[')
        .ignore_then(
            any()
                .and_is(just(']').then(end()).not())
                .repeated()
                .to_slice(),
        )
        .then_ignore(just(']'))
        .then_ignore(end())
}

fn run<'src>(ch: char, kind: DelimiterKind) -> impl Parser<'src, &'src str, Delimiter, Extra> + Clone {
    just(ch)
        .repeated()
        .at_least(4)
        .count()
        .map(move |length| Delimiter::new(kind, length))
}

fn delimiter<'src>() -> impl Parser<'src, &'src str, RawElement, Extra> {
    let plain = choice((
        run('-', DelimiterKind::Listing),
        run('.', DelimiterKind::Literal),
        run('=', DelimiterKind::Example),
        run('*', DelimiterKind::Sidebar),
        run('_', DelimiterKind::Quote),
        run('/', DelimiterKind::Comment),
        run('+', DelimiterKind::Passthrough),
        just("---").to(Delimiter::new(DelimiterKind::FrontMatter, 3)),
        just("--").to(Delimiter::new(DelimiterKind::Open, 2)),
        just('|')
            .ignore_then(just('=').repeated().at_least(3).count())
            .map(|n| Delimiter::new(DelimiterKind::Table, n + 1)),
    ))
    .then_ignore(end())
    .map(|delimiter| RawElement::BlockDelimiter {
        delimiter,
        language: None,
    });

    let fenced = just('`')
        .repeated()
        .at_least(3)
        .count()
        .then(none_of("` \t").repeated().to_slice())
        .then_ignore(end())
        .map(|(length, language): (usize, &str)| RawElement::BlockDelimiter {
            delimiter: Delimiter::new(DelimiterKind::Fenced, length),
            language: (!language.is_empty()).then(|| language.to_string()),
        });

    choice((plain, fenced))
}

fn comment<'src>() -> impl Parser<'src, &'src str, RawElement, Extra> {
    just("//")
        .ignore_then(choice((
            end().to(""),
            none_of("/").then(any().repeated()).to_slice(),
        )))
        .map(|text: &str| RawElement::SingleLineComment(text.trim().to_string()))
}

fn block_macro<'src>() -> impl Parser<'src, &'src str, RawElement, Extra> {
    just("image")
        .then_ignore(just("::"))
        .then(none_of("[ \t").repeated().to_slice())
        .then(bracketed_tail())
        .map(|((name, target), attrs): ((&str, &str), &str)| RawElement::BlockMacro {
            name: name.to_string(),
            target: target.to_string(),
            attributes: parse_attribute_list(attrs),
        })
}

fn attribute_name<'src>() -> impl Parser<'src, &'src str, &'src str, Extra> + Clone {
    any()
        .filter(|c: &char| c.is_alphanumeric() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_alphanumeric() || *c == '_' || *c == '-')
                .repeated(),
        )
        .to_slice()
}

fn attribute_declaration<'src>() -> impl Parser<'src, &'src str, RawElement, Extra> {
    let value = inline_ws().ignore_then(any().repeated().to_slice());

    just(':')
        .ignore_then(just('!').or_not())
        .then(attribute_name())
        .then(just('!').or_not())
        .then_ignore(just(':'))
        .then(value.or_not())
        .then_ignore(end())
        .map(|(((prefix, name), suffix), value)| RawElement::AttributeDeclaration {
            name: name.to_lowercase(),
            value: if prefix.is_some() || suffix.is_some() {
                None
            } else {
                Some(value.unwrap_or("").trim().to_string())
            },
        })
}

fn attribute_line<'src>() -> impl Parser<'src, &'src str, RawElement, Extra> {
    let anchor = just("[[")
        .ignore_then(none_of("[],").repeated().at_least(1).to_slice())
        .then(just(',').ignore_then(none_of("]").repeated().to_slice()).or_not())
        .then_ignore(just("]]"))
        .then_ignore(end())
        .map(|(id, reftext): (&str, Option<&str>)| {
            let mut list = AttributeList::default();
            list.named.insert("id".to_string(), id.trim().to_string());
            if let Some(reftext) = reftext.map(str::trim).filter(|r| !r.is_empty()) {
                list.named.insert("reftext".to_string(), reftext.to_string());
            }
            RawElement::AttributeList(list)
        });

    let list = just('[')
        .ignore_then(
            none_of("[ \t")
                .then(any().and_is(just(']').then(end()).not()).repeated())
                .to_slice(),
        )
        .then_ignore(just(']'))
        .then_ignore(end())
        .map(|content: &str| RawElement::AttributeList(parse_attribute_list(content)));

    choice((anchor, list))
}

fn section_header<'src>() -> impl Parser<'src, &'src str, RawElement, Extra> {
    just('=')
        .repeated()
        .at_least(1)
        .at_most(6)
        .count()
        .then_ignore(inline_ws())
        .then(any().repeated().at_least(1).to_slice())
        .then_ignore(end())
        .map(|(marks, title): (usize, &str)| RawElement::SectionHeader {
            level: u8::try_from(marks - 1).unwrap_or(5),
            title: title.trim().to_string(),
        })
}

fn breaks<'src>() -> impl Parser<'src, &'src str, RawElement, Extra> {
    choice((
        just("'''").to(RawElement::ThematicBreak),
        just("<<<").to(RawElement::PageBreak),
    ))
    .then_ignore(end())
}

fn list_continuation<'src>() -> impl Parser<'src, &'src str, RawElement, Extra> {
    just('+').then(end()).to(RawElement::ListContinuation)
}

fn list_item<'src>() -> impl Parser<'src, &'src str, RawElement, Extra> {
    let indent = one_of(" \t").repeated();
    let text = any().repeated().at_least(1).to_slice();

    let checkbox = just('[')
        .ignore_then(choice((
            just(' ').to(Checkbox::Unchecked),
            one_of("xX*").to(Checkbox::Checked),
        )))
        .then_ignore(just(']'))
        .then_ignore(inline_ws());

    let unordered = indent
        .clone()
        .ignore_then(choice((
            just('*').repeated().at_least(1).at_most(5).count().map(|n| ("*".repeat(n), n)),
            just('-').to(("-".to_string(), 1)),
        )))
        .then_ignore(inline_ws())
        .then(checkbox.or_not())
        .then(text)
        .map(|(((marker, depth), checkbox), text): (((String, usize), _), &str)| {
            ListMarker {
                kind: ListKind::Unordered,
                depth,
                marker,
                term: None,
                checkbox,
                text: text.to_string(),
            }
        });

    let ordered = indent
        .clone()
        .ignore_then(choice((
            just('.').repeated().at_least(1).at_most(5).count(),
            text::digits(10).then(just('.')).to(1),
        )))
        .then_ignore(inline_ws())
        .then(text)
        .map(|(depth, text): (usize, &str)| ListMarker {
            kind: ListKind::Ordered,
            depth,
            marker: ".".repeat(depth),
            term: None,
            checkbox: None,
            text: text.to_string(),
        });

    let callout = just('<')
        .ignore_then(choice((text::digits(10).ignored(), just('.').ignored())))
        .then_ignore(just('>'))
        .then_ignore(inline_ws())
        .ignore_then(text)
        .map(|text: &str| ListMarker {
            kind: ListKind::Callout,
            depth: 1,
            marker: "<>".to_string(),
            term: None,
            checkbox: None,
            text: text.to_string(),
        });

    let separator = choice((just("::::"), just(":::"), just("::"), just(";;")));
    let separator_end = separator
        .clone()
        .then(choice((one_of(" \t").ignored(), end())))
        .rewind();
    let labeled = indent
        .ignore_then(
            any()
                .and_is(separator_end.not())
                .repeated()
                .at_least(1)
                .to_slice()
                .filter(|term: &&str| !term.trim().is_empty()),
        )
        .then(separator)
        .then(one_of(" \t").repeated().ignore_then(any().repeated().to_slice()))
        .map(|((term, marker), text): ((&str, &str), &str)| ListMarker {
            kind: ListKind::Labeled,
            depth: match marker {
                "::::" => 3,
                ":::" => 2,
                _ => 1,
            },
            marker: marker.to_string(),
            term: Some(term.trim().to_string()),
            checkbox: None,
            text: text.trim().to_string(),
        });

    choice((callout, unordered, ordered, labeled)).map(RawElement::ListElementHeader)
}

fn block_title<'src>() -> impl Parser<'src, &'src str, RawElement, Extra> {
    just('.')
        .ignore_then(none_of(". \t").then(any().repeated()).to_slice())
        .map(|title: &str| RawElement::Title(title.to_string()))
}
