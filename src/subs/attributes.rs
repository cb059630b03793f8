//! Attribute references: `{name}`, `{counter:name}` and `{counter2:name}`.

use crate::asg::InlineElement;
use crate::attributes::{AttributeTable, MissingPolicy};
use crate::diagnostic::{Diagnostic, DiagnosticKind};

use super::{Shielded, SubstitutionContext};

/// How deep references inside attribute values are followed.
const MAX_DEPTH: usize = 10;

/// Built-in character attributes, available unless the document redefines
/// them.
const PREDEFINED: &[(&str, &str)] = &[
    ("amp", "&"),
    ("apos", "'"),
    ("asterisk", "*"),
    ("backslash", "\\"),
    ("backtick", "`"),
    ("blank", ""),
    ("brvbar", "\u{a6}"),
    ("caret", "^"),
    ("cpp", "C++"),
    ("cxx", "C++"),
    ("deg", "\u{b0}"),
    ("empty", ""),
    ("endsb", "]"),
    ("gt", ">"),
    ("ldquo", "\u{201c}"),
    ("lsquo", "\u{2018}"),
    ("lt", "<"),
    ("nbsp", "\u{a0}"),
    ("plus", "+"),
    ("pp", "++"),
    ("quot", "\""),
    ("rdquo", "\u{201d}"),
    ("rsquo", "\u{2019}"),
    ("sp", " "),
    ("startsb", "["),
    ("tilde", "~"),
    ("two-colons", "::"),
    ("two-semicolons", ";;"),
    ("vbar", "|"),
    ("wj", "\u{2060}"),
    ("zwsp", "\u{200b}"),
];

/// The character a predefined attribute stands for.
pub(crate) fn predefined_value(name: &str) -> Option<&'static str> {
    PREDEFINED
        .binary_search_by(|(key, _)| (*key).cmp(name))
        .ok()
        .map(|index| PREDEFINED[index].1)
}

#[derive(Debug, PartialEq, Eq)]
enum Reference {
    Name(String),
    Counter {
        name: String,
        seed: Option<String>,
        hidden: bool,
    },
}

pub(super) fn apply(line: &mut Shielded, ctx: &mut SubstitutionContext<'_>) {
    if !line.text.contains('{') {
        return;
    }
    let chars: Vec<char> = line.text.chars().collect();
    let mut out = String::with_capacity(line.text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' && chars.get(i + 1) == Some(&'{') {
            if let Some((_, end)) = parse_reference(&chars, i + 1) {
                out.extend(&chars[i + 1..end]);
                i = end;
                continue;
            }
        }
        if chars[i] != '{' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let Some((reference, end)) = parse_reference(&chars, i) else {
            out.push('{');
            i += 1;
            continue;
        };
        i = end;

        match reference {
            Reference::Counter {
                name,
                seed,
                hidden: false,
            } => out.push_str(&ctx.counters.next(&name, seed.as_deref())),
            Reference::Counter { name, seed, hidden: true } => {
                ctx.counters.next(&name, seed.as_deref());
                out.push(line.shield(vec![InlineElement::CounterSubstitution {
                    name,
                    seed,
                    hidden: true,
                }]));
            }
            Reference::Name(name) => {
                if let Some(value) = ctx.attributes.get(&name) {
                    out.push_str(&expand(value, ctx.attributes, 1));
                } else if predefined_value(&name).is_some() {
                    out.push(line.shield(vec![InlineElement::PredefinedAttribute(name)]));
                } else {
                    missing(name, line, &mut out, ctx);
                }
            }
        }
    }
    line.text = out;
}

fn missing(name: String, line: &mut Shielded, out: &mut String, ctx: &mut SubstitutionContext<'_>) {
    match ctx.attributes.missing_policy() {
        MissingPolicy::Drop => {}
        MissingPolicy::Skip => out.push(line.shield(vec![InlineElement::AttributeSubstitution(name)])),
        MissingPolicy::Warn => {
            Diagnostic::warning(
                DiagnosticKind::UnknownAttribute,
                ctx.line,
                format!("missing attribute `{name}`"),
            )
            .emit(ctx.diagnostics);
            out.push(line.shield(vec![InlineElement::AttributeSubstitution(name)]));
        }
    }
}

/// Parse a reference whose `{` is at `start`, returning it with the index
/// just past the closing `}`.
fn parse_reference(chars: &[char], start: usize) -> Option<(Reference, usize)> {
    let close = start + 1 + chars[start + 1..].iter().position(|c| *c == '}')?;
    let content: String = chars[start + 1..close].iter().collect();

    let counter = content
        .strip_prefix("counter2:")
        .map(|rest| (rest, true))
        .or_else(|| content.strip_prefix("counter:").map(|rest| (rest, false)));
    let reference = match counter {
        Some((rest, hidden)) => {
            let (name, seed) = match rest.split_once(':') {
                Some((name, seed)) => (name, Some(seed.to_string())),
                None => (rest, None),
            };
            if !is_name(name) {
                return None;
            }
            Reference::Counter {
                name: name.to_ascii_lowercase(),
                seed,
                hidden,
            }
        }
        None if is_name(&content) => Reference::Name(content.to_ascii_lowercase()),
        None => return None,
    };
    Some((reference, close + 1))
}

fn is_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Expand references in `text` against `attributes` only. References
/// that resolve to nothing are kept as written, and counters are left
/// alone.
///
/// Used for include targets and conditional expressions, where the
/// result has to be a plain string.
#[must_use]
pub fn expand_references(text: &str, attributes: &AttributeTable) -> String {
    expand(text, attributes, 0)
}

fn expand(text: &str, attributes: &AttributeTable, depth: usize) -> String {
    if depth > MAX_DEPTH || !text.contains('{') {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' {
            if let Some((Reference::Name(name), end)) = parse_reference(&chars, i) {
                let value = attributes
                    .get(&name)
                    .map(|value| expand(value, attributes, depth + 1))
                    .or_else(|| predefined_value(&name).map(str::to_string));
                if let Some(value) = value {
                    out.push_str(&value);
                    i = end;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::subs::Counters;

    fn table(entries: &[(&str, &str)]) -> AttributeTable {
        let mut table = AttributeTable::new();
        for (name, value) in entries {
            table.apply(name, Some(value));
        }
        table
    }

    fn attributes(line: &str, table: &AttributeTable) -> (Vec<InlineElement>, Vec<Diagnostic>) {
        let mut counters = Counters::default();
        let mut diagnostics = Vec::new();
        let mut ctx = SubstitutionContext::new(table, &mut counters, &mut diagnostics).at_line(7);
        let mut shielded = Shielded::new(line);
        apply(&mut shielded, &mut ctx);
        (shielded.expand(), diagnostics)
    }

    // ── References ───────────────────────────────────────────────────

    #[test]
    fn reference_is_replaced_case_insensitively() {
        let (out, _) = attributes("v{Version}!", &table(&[("version", "1.2")]));
        assert_eq!(out, vec![InlineElement::text("v1.2!")]);
    }

    #[test]
    fn nested_references_in_values_expand() {
        let t = table(&[("base", "https://x.org"), ("docs", "{base}/docs")]);
        let (out, _) = attributes("{docs}", &t);
        assert_eq!(out, vec![InlineElement::text("https://x.org/docs")]);
    }

    #[test]
    fn self_reference_stops_expanding() {
        let (out, _) = attributes("{loop}", &table(&[("loop", "{loop}")]));
        assert_eq!(out, vec![InlineElement::text("{loop}")]);
    }

    #[test]
    fn escaped_reference_is_literal() {
        let (out, _) = attributes(r"\{version}", &table(&[("version", "1")]));
        assert_eq!(out, vec![InlineElement::text("{version}")]);
    }

    #[test]
    fn braces_that_are_not_references_stay() {
        let (out, _) = attributes("{ a b } {}", &AttributeTable::new());
        assert_eq!(out, vec![InlineElement::text("{ a b } {}")]);
    }

    #[test]
    fn predefined_attributes_are_elements() {
        let (out, _) = attributes("a{nbsp}b", &AttributeTable::new());
        assert_eq!(
            out,
            vec![
                InlineElement::text("a"),
                InlineElement::PredefinedAttribute("nbsp".into()),
                InlineElement::text("b"),
            ]
        );
        let (out, _) = attributes("{nbsp}", &table(&[("nbsp", "x")]));
        assert_eq!(out, vec![InlineElement::text("x")]);
    }

    // ── Missing references ───────────────────────────────────────────

    #[test]
    fn missing_reference_is_kept_by_default() {
        let (out, diagnostics) = attributes("{nope}", &AttributeTable::new());
        assert_eq!(out, vec![InlineElement::AttributeSubstitution("nope".into())]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn missing_reference_can_be_dropped() {
        let (out, _) = attributes("a{nope}b", &table(&[("attribute-missing", "drop")]));
        assert_eq!(out, vec![InlineElement::text("ab")]);
    }

    #[test]
    fn missing_reference_can_warn() {
        let (out, diagnostics) = attributes("{nope}", &table(&[("attribute-missing", "warn")]));
        assert_eq!(out, vec![InlineElement::AttributeSubstitution("nope".into())]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnknownAttribute);
        assert_eq!(diagnostics[0].line, Some(7));
        assert_eq!(diagnostics[0].message, "missing attribute `nope`");
    }

    // ── Counters ─────────────────────────────────────────────────────

    #[test]
    fn counter_with_seed() {
        let (out, _) = attributes("{counter:x:5} {counter:x}", &AttributeTable::new());
        assert_eq!(out, vec![InlineElement::text("5 6")]);
    }

    #[test]
    fn hidden_counter_produces_no_text() {
        let (out, _) = attributes("a{counter2:x}", &AttributeTable::new());
        assert_eq!(
            out,
            vec![
                InlineElement::text("a"),
                InlineElement::CounterSubstitution {
                    name: "x".into(),
                    seed: None,
                    hidden: true,
                },
            ]
        );
    }

    // ── Plain expansion ──────────────────────────────────────────────

    #[test]
    fn expand_references_keeps_unknowns() {
        let t = table(&[("dir", "inc")]);
        assert_eq!(expand_references("{dir}/{file}.adoc", &t), "inc/{file}.adoc");
        assert_eq!(expand_references("a{sp}b", &t), "a b");
    }
}
