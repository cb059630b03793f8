//! Typographic replacements.

use super::Shielded;

/// Sequences a backslash keeps literal.
const ESCAPABLE: &[&str] = &["(C)", "(R)", "(TM)", "...", "--", "->", "=>", "<-", "<=", "'"];

pub(super) fn apply(line: &mut Shielded) {
    let chars: Vec<char> = line.text.chars().collect();
    let mut out = String::with_capacity(line.text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '\\' {
            if let Some(pattern) = ESCAPABLE.iter().find(|p| matches_at(line, &chars, i + 1, p)) {
                let len = pattern.chars().count();
                out.extend(&chars[i + 1..i + 1 + len]);
                i += 1 + len;
                continue;
            }
        }

        if c == '(' {
            let symbol = [("(C)", '\u{a9}'), ("(R)", '\u{ae}'), ("(TM)", '\u{2122}')]
                .into_iter()
                .find(|(pattern, _)| matches_at(line, &chars, i, pattern));
            if let Some((pattern, symbol)) = symbol {
                out.push(symbol);
                i += pattern.len();
                continue;
            }
        }

        if c == '.' && matches_at(line, &chars, i, "...") {
            out.push_str("\u{2026}\u{200b}");
            i += 3;
            continue;
        }

        if c == '-' && next == Some('-') {
            let before = i.checked_sub(1).map(|p| chars[p]);
            let after = chars.get(i + 2).copied();
            if before.is_none_or(|b| b == ' ') && after.is_none_or(|a| a == ' ') {
                if out.ends_with(' ') {
                    out.pop();
                }
                out.push_str("\u{2009}\u{2014}\u{2009}");
                i += if after.is_some() { 3 } else { 2 };
                continue;
            }
            if before.is_some_and(is_word) && after.is_some_and(is_word) {
                out.push_str("\u{2014}\u{200b}");
                i += 2;
                continue;
            }
        }

        if let Some(next) = next {
            let arrow = if c == '-' && line.is_char(next, '>') {
                Some('\u{2192}')
            } else if c == '=' && line.is_char(next, '>') {
                Some('\u{21d2}')
            } else if line.is_char(c, '<') && next == '-' {
                Some('\u{2190}')
            } else if line.is_char(c, '<') && next == '=' {
                Some('\u{21d0}')
            } else {
                None
            };
            if let Some(arrow) = arrow {
                out.push(arrow);
                i += 2;
                continue;
            }
        }

        if c == '\''
            && i > 0
            && chars[i - 1].is_alphanumeric()
            && next.is_some_and(char::is_alphabetic)
        {
            out.push('\u{2019}');
            i += 1;
            continue;
        }

        out.push(c);
        i += 1;
    }
    line.text = out;
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `pattern` starts at `start`, reading `<` and `>` through
/// special character placeholders.
fn matches_at(line: &Shielded, chars: &[char], start: usize, pattern: &str) -> bool {
    let mut index = start;
    for p in pattern.chars() {
        match chars.get(index) {
            Some(c) if line.is_char(*c, p) => index += 1,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::asg::InlineElement;

    fn replace(line: &str) -> String {
        let mut shielded = Shielded::new(line);
        apply(&mut shielded);
        shielded.text
    }

    #[rstest]
    #[case("(C) 2024", "\u{a9} 2024")]
    #[case("Acme(TM)", "Acme\u{2122}")]
    #[case("(R)", "\u{ae}")]
    #[case("wait...", "wait\u{2026}\u{200b}")]
    #[case("a -- b", "a\u{2009}\u{2014}\u{2009}b")]
    #[case("a--b", "a\u{2014}\u{200b}b")]
    #[case("a - b", "a - b")]
    #[case("x -> y => z", "x \u{2192} y \u{21d2} z")]
    #[case("it's", "it\u{2019}s")]
    #[case("'quoted'", "'quoted'")]
    fn replaces(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(replace(line), expected);
    }

    #[test]
    fn backslash_keeps_sequence() {
        assert_eq!(replace(r"\(C) and \..."), "(C) and ...");
    }

    #[test]
    fn arrows_see_through_special_characters() {
        let mut line = Shielded::new("");
        let lt = line.shield(vec![InlineElement::SpecialCharacter('<')]);
        line.text = format!("a {lt}- b");
        apply(&mut line);
        assert_eq!(line.text, "a \u{2190} b");
    }
}
