//! Inline passthroughs.
//!
//! `+++text+++` and `pass:[text]` pass their content through untouched.
//! `++text++` and the constrained `+text+` only escape special characters.
//! `pass:SUBS[text]` applies the listed substitutions. All of them are
//! shielded, so no later phase sees their content.

use crate::asg::InlineElement;

use super::{NONE, Shielded, Substitution, SubstitutionContext, parse_subs, substitute_line};

pub(super) fn apply(line: &mut Shielded, ctx: &mut SubstitutionContext<'_>) {
    if !line.text.contains('+') && !line.text.contains("pass:") {
        return;
    }
    let chars: Vec<char> = line.text.chars().collect();
    let mut out = String::with_capacity(line.text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' && chars.get(i + 1) == Some(&'+') {
            let run = plus_run(&chars, i + 1).min(3);
            match find_close(&chars, i + 1, run) {
                Some(close) => {
                    out.extend(&chars[i + 1..close + run]);
                    i = close + run;
                }
                None => {
                    out.extend(&chars[i + 1..i + 1 + run]);
                    i += 1 + run;
                }
            }
            continue;
        }
        if c == '\\' && starts_with(&chars, i + 1, "pass:") {
            out.push_str("pass:");
            i += 6;
            continue;
        }

        if c == '+' {
            let run = plus_run(&chars, i);
            let n = run.min(3);
            if let Some(close) = find_close(&chars, i, n) {
                let content: String = chars[i + n..close].iter().collect();
                let elements = if n == 3 {
                    vec![InlineElement::Text(content)]
                } else {
                    escape_special(&content)
                };
                out.push(line.shield(elements));
                i = close + n;
            } else {
                out.extend(&chars[i..i + run]);
                i += run;
            }
            continue;
        }

        if starts_with(&chars, i, "pass:") && (i == 0 || !chars[i - 1].is_alphanumeric()) {
            if let Some((spec, content, next)) = pass_macro(&chars, i + 5) {
                let subs: Vec<Substitution> = if spec.is_empty() {
                    Vec::new()
                } else {
                    parse_subs(&spec, NONE, ctx.diagnostics)
                        .into_iter()
                        .filter(|s| *s != Substitution::InlinePassthrough)
                        .collect()
                };
                let elements = if subs.is_empty() {
                    vec![InlineElement::Text(content)]
                } else {
                    substitute_line(&content, &subs, ctx)
                };
                out.push(line.shield(elements));
                i = next;
                continue;
            }
        }

        out.push(c);
        i += 1;
    }
    line.text = out;
}

fn plus_run(chars: &[char], start: usize) -> usize {
    chars[start..].iter().take_while(|c| **c == '+').count()
}

fn starts_with(chars: &[char], start: usize, prefix: &str) -> bool {
    let mut index = start;
    for p in prefix.chars() {
        if chars.get(index) != Some(&p) {
            return false;
        }
        index += 1;
    }
    true
}

/// Index of the closing run of `n` pluses for an opening run at `open`.
fn find_close(chars: &[char], open: usize, n: usize) -> Option<usize> {
    let start = open + n;
    let first = *chars.get(start)?;
    if n == 1 {
        let opens = (open == 0 || !chars[open - 1].is_alphanumeric()) && !first.is_whitespace();
        if !opens {
            return None;
        }
    }
    (start + 1..=chars.len().saturating_sub(n)).find(|&j| {
        if !chars[j..j + n].iter().all(|c| *c == '+') {
            return false;
        }
        if n == 1 {
            !chars[j - 1].is_whitespace()
                && chars.get(j + 1).is_none_or(|next| !next.is_alphanumeric() && *next != '+')
        } else {
            true
        }
    })
}

/// `pass:` macro body starting after the colon: `SUBS[content]`.
fn pass_macro(chars: &[char], start: usize) -> Option<(String, String, usize)> {
    let mut i = start;
    while i < chars.len() && (chars[i].is_ascii_lowercase() || matches!(chars[i], ',' | '_' | '+' | '-')) {
        i += 1;
    }
    if chars.get(i) != Some(&'[') {
        return None;
    }
    let spec: String = chars[start..i].iter().collect();
    let mut content = String::new();
    let mut j = i + 1;
    while j < chars.len() {
        match chars[j] {
            '\\' if chars.get(j + 1) == Some(&']') => {
                content.push(']');
                j += 2;
            }
            ']' => return Some((spec, content, j + 1)),
            c => {
                content.push(c);
                j += 1;
            }
        }
    }
    None
}

fn escape_special(content: &str) -> Vec<InlineElement> {
    let mut out = Vec::new();
    let mut text = String::new();
    for c in content.chars() {
        if matches!(c, '<' | '>' | '&') {
            if !text.is_empty() {
                out.push(InlineElement::Text(std::mem::take(&mut text)));
            }
            out.push(InlineElement::SpecialCharacter(c));
        } else {
            text.push(c);
        }
    }
    if !text.is_empty() {
        out.push(InlineElement::Text(text));
    }
    out
}
