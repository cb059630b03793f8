//! `<`, `>` and `&` become [`InlineElement::SpecialCharacter`].

use crate::asg::InlineElement;

use super::Shielded;

pub(super) fn apply(line: &mut Shielded) {
    if !line.text.contains(['<', '>', '&']) {
        return;
    }
    let text = std::mem::take(&mut line.text);
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '<' | '>' | '&') {
            out.push(line.shield(vec![InlineElement::SpecialCharacter(c)]));
        } else {
            out.push(c);
        }
    }
    line.text = out;
}
