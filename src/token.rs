//! Tokens for the inline quotes grammar.
//!
//! The quotes phase runs over a flattened line in which every non-text
//! inline element has been replaced by a placeholder character. Span
//! information is tracked by chumsky, not stored in the token.

/// A lexical token of flattened inline text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token<'a> {
    /// A run of alphanumeric characters.
    Word(&'a str),

    /// A single character with no inline meaning (punctuation and the like).
    Text(&'a str),

    /// One or more spaces or tabs.
    Whitespace,

    /// `*`
    Star,

    /// `_`
    Underscore,

    /// `` ` ``
    Backtick,

    /// `#`
    Hash,

    /// `^`
    Caret,

    /// `~`
    Tilde,

    /// `\`
    Backslash,

    /// An inline element shielded from the grammar, by table index.
    Placeholder(usize),
}

impl Token<'_> {
    /// Whether this token can open or close formatted text.
    #[must_use]
    pub fn is_mark(&self) -> bool {
        matches!(
            self,
            Self::Star | Self::Underscore | Self::Backtick | Self::Hash | Self::Caret | Self::Tilde
        )
    }

    /// Whether this token can delimit constrained formatting.
    #[must_use]
    pub fn is_constrained_mark(&self) -> bool {
        matches!(self, Self::Star | Self::Underscore | Self::Backtick | Self::Hash)
    }
}
