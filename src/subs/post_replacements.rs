//! Hard line breaks.

use crate::asg::InlineElement;

use super::Shielded;

/// Turn a trailing ` +` into a [`InlineElement::LineBreak`]. With
/// `hard_break` every line gets one.
pub(super) fn apply(line: &mut Shielded, hard_break: bool) {
    let explicit = line.text.strip_suffix(" +").map(str::len);
    if let Some(len) = explicit {
        line.text.truncate(len);
    }
    if explicit.is_some() || hard_break {
        let marker = line.shield(vec![InlineElement::LineBreak]);
        line.text.push(marker);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn post(line: &str, hard_break: bool) -> Vec<InlineElement> {
        let mut shielded = Shielded::new(line);
        apply(&mut shielded, hard_break);
        shielded.expand()
    }

    #[test]
    fn trailing_plus_breaks() {
        assert_eq!(
            post("first +", false),
            vec![InlineElement::text("first"), InlineElement::LineBreak]
        );
    }

    #[test]
    fn plus_without_space_is_text() {
        assert_eq!(post("C+", false), vec![InlineElement::text("C+")]);
        assert_eq!(post("a + b", false), vec![InlineElement::text("a + b")]);
    }

    #[test]
    fn hard_break_adds_one_break_only() {
        assert_eq!(
            post("a +", true),
            vec![InlineElement::text("a"), InlineElement::LineBreak]
        );
        assert_eq!(
            post("a", true),
            vec![InlineElement::text("a"), InlineElement::LineBreak]
        );
    }
}
