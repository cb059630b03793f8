//! Quoted text: strong, emphasis, monospace, mark, superscript and
//! subscript.
//!
//! The shielded line is lexed into [`Token`]s and run through a recursive
//! chumsky parser. Every quoted span found at the top level is shielded as
//! one [`InlineElement::QuotedText`]. Marks that do not open a span stay in
//! the text as they are.

use chumsky::{extra, input::ValueInput, prelude::*};

use crate::asg::{InlineElement, QuoteKind};
use crate::lexer::{Spanned, lex};
use crate::span::SourceSpan;
use crate::token::Token;

use super::Shielded;
use super::shield::{element_marker, push_merged};

type ParseExtra<'tokens, 'src> = extra::Err<Rich<'tokens, Token<'src>, SourceSpan>>;

/// A parsed piece of the line, pointing back into its text.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(SourceSpan),
    Placeholder(usize),
    Quoted { kind: QuoteKind, children: Vec<Node> },
}

pub(super) fn apply(line: &mut Shielded) {
    if !line.text.contains(['*', '_', '`', '#', '^', '~']) {
        return;
    }
    let source = std::mem::take(&mut line.text);
    let tokens = constrain(lex(&source), &source);
    let Some(nodes) = run(&tokens, source.len()) else {
        line.text = source;
        return;
    };

    let mut out = String::with_capacity(source.len());
    for node in &nodes {
        match node {
            Node::Text(span) => out.push_str(span.slice(&source)),
            Node::Placeholder(index) => out.push(element_marker(*index)),
            Node::Quoted { kind, children } => {
                let elements = build(children, &source, line);
                out.push(line.shield(vec![InlineElement::QuotedText {
                    kind: *kind,
                    elements,
                }]));
            }
        }
    }
    line.text = out;
}

/// A constrained mark with a word on both sides is plain text.
fn constrain<'src>(mut tokens: Vec<Spanned<'src>>, source: &'src str) -> Vec<Spanned<'src>> {
    for i in 1..tokens.len().saturating_sub(1) {
        let (token, span) = tokens[i];
        if token.is_constrained_mark()
            && matches!(tokens[i - 1].0, Token::Word(_))
            && matches!(tokens[i + 1].0, Token::Word(_))
        {
            tokens[i].0 = Token::Text(span.slice(source));
        }
    }
    tokens
}

fn run(tokens: &[Spanned<'_>], len: usize) -> Option<Vec<Node>> {
    if tokens.is_empty() {
        return Some(Vec::new());
    }
    let eoi = SourceSpan::from(len..len);
    let input = tokens.split_token_span(eoi);
    quotes_parser().parse(input).into_output()
}

fn build(children: &[Node], source: &str, line: &Shielded) -> Vec<InlineElement> {
    let mut out = Vec::new();
    for child in children {
        match child {
            Node::Text(span) => push_merged(&mut out, InlineElement::text(span.slice(source))),
            Node::Placeholder(index) => {
                for element in line.lookup(element_marker(*index)).unwrap_or_default() {
                    push_merged(&mut out, element.clone());
                }
            }
            Node::Quoted { kind, children } => out.push(InlineElement::QuotedText {
                kind: *kind,
                elements: build(children, source, line),
            }),
        }
    }
    out
}

fn text<'tokens, 'src: 'tokens, I>(
    token: Token<'src>,
) -> impl Parser<'tokens, I, Node, ParseExtra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SourceSpan>,
{
    just(token).map_with(|_, e| Node::Text(e.span()))
}

/// `(unconstrained, constrained)` parsers for a pair of `mark`s. The
/// unconstrained form must be tried first so that a doubled mark is not
/// read as two single ones.
fn pair_parsers<'tokens, 'src: 'tokens, I, P>(
    mark: Token<'src>,
    kind: QuoteKind,
    inner: P,
) -> (
    impl Parser<'tokens, I, Node, ParseExtra<'tokens, 'src>> + Clone,
    impl Parser<'tokens, I, Node, ParseExtra<'tokens, 'src>> + Clone,
)
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SourceSpan>,
    P: Parser<'tokens, I, Node, ParseExtra<'tokens, 'src>> + Clone,
{
    // Marks of another kind that open nothing are text inside the span.
    let other_mark = any()
        .filter(move |t: &Token<'src>| t.is_mark() && *t != mark)
        .map_with(|_, e| Node::Text(e.span()));
    let item = choice((inner, other_mark));

    let double = just(mark).then(just(mark));
    let unconstrained = double
        .clone()
        .not()
        .rewind()
        .ignore_then(item.clone())
        .repeated()
        .at_least(1)
        .collect::<Vec<Node>>()
        .delimited_by(double.clone(), double)
        .map(move |children| Node::Quoted { kind, children });

    let whitespace = just(Token::Whitespace);
    let word = select! { Token::Word(_) => () };
    let content = just(mark)
        .not()
        .rewind()
        .ignore_then(whitespace.clone().then(just(mark)).not().rewind())
        .ignore_then(item)
        .repeated()
        .at_least(1)
        .collect::<Vec<Node>>();
    let constrained = just(mark)
        .ignore_then(whitespace.not().rewind())
        .ignore_then(content)
        .then_ignore(just(mark))
        .then_ignore(word.not().rewind())
        .map(move |children| Node::Quoted { kind, children });

    (unconstrained, constrained)
}

/// `^super^` and `~sub~`: no whitespace and no nesting.
fn script_parser<'tokens, 'src: 'tokens, I>(
    mark: Token<'src>,
    kind: QuoteKind,
) -> impl Parser<'tokens, I, Node, ParseExtra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SourceSpan>,
{
    any()
        .filter(move |t: &Token<'src>| *t != mark && *t != Token::Whitespace)
        .map_with(|t, e| match t {
            Token::Placeholder(index) => Node::Placeholder(index),
            _ => Node::Text(e.span()),
        })
        .repeated()
        .at_least(1)
        .collect::<Vec<Node>>()
        .delimited_by(just(mark), just(mark))
        .map(move |children| Node::Quoted { kind, children })
}

/// Marks that open no span are consumed outside the recursion, so a
/// closing mark stays available to the span that needs it.
fn quotes_parser<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Vec<Node>, ParseExtra<'tokens, 'src>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SourceSpan>,
{
    let single = recursive(|inline| {
        let leaf = any()
            .filter(|t: &Token| {
                !t.is_mark() && !matches!(t, Token::Backslash | Token::Placeholder(_))
            })
            .map_with(|_, e| Node::Text(e.span()));

        let placeholder = select! { Token::Placeholder(index) => Node::Placeholder(index) };

        // `\*` and friends: the marks survive as text, the backslash does not.
        let escaped = just(Token::Backslash)
            .then(any().filter(Token::is_mark).repeated().at_least(1))
            .map_with(|_, e| {
                let span: SourceSpan = e.span();
                Node::Text(SourceSpan::from(span.start + 1..span.end))
            });

        let (strong_unconstrained, strong_constrained) =
            pair_parsers(Token::Star, QuoteKind::Strong, inline.clone());
        let (emphasis_unconstrained, emphasis_constrained) =
            pair_parsers(Token::Underscore, QuoteKind::Emphasis, inline.clone());
        let (monospace_unconstrained, monospace_constrained) =
            pair_parsers(Token::Backtick, QuoteKind::Monospace, inline.clone());
        let (mark_unconstrained, mark_constrained) =
            pair_parsers(Token::Hash, QuoteKind::Mark, inline);

        choice((
            strong_unconstrained,
            strong_constrained,
            emphasis_unconstrained,
            emphasis_constrained,
            monospace_unconstrained,
            monospace_constrained,
            mark_unconstrained,
            mark_constrained,
            script_parser(Token::Caret, QuoteKind::Superscript),
            script_parser(Token::Tilde, QuoteKind::Subscript),
            placeholder,
            escaped,
            leaf,
            text(Token::Backslash),
        ))
    });

    let mark_as_text = any()
        .filter(Token::is_mark)
        .map_with(|_, e| Node::Text(e.span()));

    choice((single, mark_as_text)).repeated().collect()
}
