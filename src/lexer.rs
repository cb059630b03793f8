//! Chumsky-based lexer for flattened inline text.
//!
//! Produces [`Token`]s paired with [`SourceSpan`]s. Deciding whether a mark
//! opens, closes or is plain text is left to the quotes grammar.

use chumsky::{extra, prelude::*};

use crate::span::SourceSpan;
use crate::subs::shield;
use crate::token::Token;

/// A single token paired with its source span.
pub type Spanned<'a> = (Token<'a>, SourceSpan);

/// Lex flattened inline text into tokens with spans.
///
/// Every character maps to some token, so the lexer cannot fail.
#[must_use]
pub fn lex(input: &str) -> Vec<Spanned<'_>> {
    lexer().parse(input).into_output().unwrap_or_default()
}

fn lexer<'src>() -> impl Parser<'src, &'src str, Vec<Spanned<'src>>, extra::Default> {
    let whitespace = one_of(" \t").repeated().at_least(1).to(Token::Whitespace);

    let mark = choice((
        just('*').to(Token::Star),
        just('_').to(Token::Underscore),
        just('`').to(Token::Backtick),
        just('#').to(Token::Hash),
        just('^').to(Token::Caret),
        just('~').to(Token::Tilde),
        just('\\').to(Token::Backslash),
    ));

    let placeholder = any()
        .filter(|c: &char| shield::element_index(*c).is_some())
        .map(|c: char| Token::Placeholder(shield::element_index(c).unwrap_or_default()));

    let word = any()
        .filter(|c: &char| c.is_alphanumeric())
        .repeated()
        .at_least(1)
        .to_slice()
        .map(Token::Word);

    let other = any().to_slice().map(Token::Text);

    choice((whitespace, mark, placeholder, word, other))
        .map_with(|tok, e| (tok, SourceSpan::from(e.span())))
        .repeated()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        lex(input).into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn empty_input() {
        assert!(tokens("").is_empty());
    }

    #[test]
    fn words_and_marks() {
        assert_eq!(
            tokens("*bold* text"),
            vec![
                Token::Star,
                Token::Word("bold"),
                Token::Star,
                Token::Whitespace,
                Token::Word("text"),
            ]
        );
    }

    #[test]
    fn punctuation_is_single_char_text() {
        assert_eq!(
            tokens("a, b"),
            vec![
                Token::Word("a"),
                Token::Text(","),
                Token::Whitespace,
                Token::Word("b"),
            ]
        );
    }

    #[test]
    fn placeholders_carry_their_index() {
        let input = format!("x{}y", shield::element_marker(3));
        assert_eq!(
            tokens(&input),
            vec![Token::Word("x"), Token::Placeholder(3), Token::Word("y")]
        );
    }

    #[test]
    fn spans_are_byte_offsets() {
        let spanned = lex("é *");
        assert_eq!(spanned[0].1, SourceSpan::from(0..2));
        assert_eq!(spanned[2].1, SourceSpan::from(3..4));
    }
}
