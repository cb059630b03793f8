//! Callout markers at the end of verbatim lines: `code <1> <2>`.

use crate::asg::InlineElement;

use super::Shielded;

/// Line comment prefixes that may hide a callout from the language.
const COMMENT_PREFIXES: &[&str] = &["//", "#", "--", ";;"];

pub(super) fn apply(line: &mut Shielded) {
    let chars: Vec<char> = line.text.chars().collect();
    let mut end = chars.len();
    let mut found = Vec::new();

    loop {
        let mut close = end;
        while close > 0 && chars[close - 1] == ' ' {
            close -= 1;
        }
        let Some((number, start)) = callout_before(line, &chars, close) else {
            break;
        };
        found.push(number);
        end = start;
    }
    if found.is_empty() {
        return;
    }
    found.reverse();

    let mut text: String = chars[..end].iter().collect();
    let trimmed = text.trim_end().len();
    if let Some(prefix) = COMMENT_PREFIXES
        .iter()
        .find(|prefix| text[..trimmed].ends_with(*prefix))
    {
        text.truncate(trimmed - prefix.len());
    }
    for number in found {
        let marker = line.shield(vec![InlineElement::Callout(number)]);
        text.push(marker);
    }
    line.text = text;
}

/// A `<N>` ending just before `end`, with the index of its `<`.
fn callout_before(line: &Shielded, chars: &[char], end: usize) -> Option<(u32, usize)> {
    if end == 0 || !line.is_char(chars[end - 1], '>') {
        return None;
    }
    let digits_end = end - 1;
    let mut start = digits_end;
    while start > 0 && chars[start - 1].is_ascii_digit() {
        start -= 1;
    }
    if start == digits_end || start == 0 || !line.is_char(chars[start - 1], '<') {
        return None;
    }
    let number: String = chars[start..digits_end].iter().collect();
    Some((number.parse().ok()?, start - 1))
}
