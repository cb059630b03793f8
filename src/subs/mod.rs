//! The inline substitution engine.
//!
//! A line of block content becomes a list of [`InlineElement`]s by running
//! an ordered list of [`Substitution`] phases over it. Each phase works on
//! a [`Shielded`] line: flat text in which everything an earlier phase
//! produced is hidden behind a placeholder character.
//!
//! The phase list comes from the block: its style picks a preset and its
//! `subs` attribute edits that preset (see [`parse_subs`]).

mod attributes;
mod callouts;
mod macros;
mod passthrough;
mod post_replacements;
mod quotes;
mod replacements;
pub(crate) mod shield;
mod specialchars;

use std::collections::BTreeMap;
use std::fmt;

use crate::asg::InlineElement;
use crate::attributes::AttributeTable;
use crate::diagnostic::{Diagnostic, DiagnosticKind};

pub(crate) use attributes::predefined_value;
pub(crate) use macros::default_alt;
pub use attributes::expand_references;
pub use shield::Shielded;

/// One named substitution phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Substitution {
    /// `+text+`, `++text++`, `+++text+++` and `pass:[text]`.
    InlinePassthrough,
    /// `<`, `>` and `&`.
    SpecialCharacters,
    /// Strong, emphasis, monospace, mark, superscript and subscript.
    Quotes,
    /// `{name}` references and counters.
    Attributes,
    /// Typographic replacements such as `(C)` and `...`.
    Replacements,
    /// Links, images, icons, anchors and cross references.
    Macros,
    /// Trailing ` +` line breaks.
    PostReplacements,
    /// `<1>` callout markers at the end of a line.
    Callouts,
}

impl Substitution {
    /// The name used in `subs` attributes.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::InlinePassthrough => "inline_passthrough",
            Self::SpecialCharacters => "specialchars",
            Self::Quotes => "quotes",
            Self::Attributes => "attributes",
            Self::Replacements => "replacements",
            Self::Macros => "macros",
            Self::PostReplacements => "post_replacements",
            Self::Callouts => "callouts",
        }
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every phase, in canonical order.
pub const NORMAL: &[Substitution] = &[
    Substitution::InlinePassthrough,
    Substitution::SpecialCharacters,
    Substitution::Quotes,
    Substitution::Attributes,
    Substitution::Replacements,
    Substitution::Macros,
    Substitution::PostReplacements,
];

/// Listing, literal and source content.
pub const VERBATIM: &[Substitution] = &[Substitution::SpecialCharacters, Substitution::Callouts];

/// Header values such as the document title.
pub const HEADER: &[Substitution] = &[Substitution::SpecialCharacters, Substitution::Attributes];

/// No substitutions.
pub const NONE: &[Substitution] = &[];

/// Names and aliases a `subs` entry may use.
fn lookup(name: &str) -> Option<&'static [Substitution]> {
    let single: &'static [Substitution] = match name {
        "specialcharacters" | "specialchars" | "c" => &[Substitution::SpecialCharacters],
        "quotes" | "q" => &[Substitution::Quotes],
        "attributes" | "a" => &[Substitution::Attributes],
        "replacements" | "r" => &[Substitution::Replacements],
        "macros" | "m" => &[Substitution::Macros],
        "post_replacements" | "p" => &[Substitution::PostReplacements],
        "callouts" => &[Substitution::Callouts],
        "inline_passthrough" => &[Substitution::InlinePassthrough],
        "normal" | "n" => NORMAL,
        "verbatim" | "v" => VERBATIM,
        "header" => HEADER,
        "none" => NONE,
        _ => return None,
    };
    Some(single)
}

/// Resolve a `subs` attribute against the block's default phases.
///
/// Entries are comma separated. A bare name replaces the default list
/// (several bare names apply in the order given), `+name` appends, `name+`
/// prepends and `-name` removes. Duplicate and unknown names are reported
/// and skipped.
pub fn parse_subs(
    spec: &str,
    default: &[Substitution],
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Substitution> {
    let entries: Vec<&str> = spec
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();
    let has_bare = entries
        .iter()
        .any(|e| !e.starts_with(['+', '-']) && !e.ends_with('+'));
    let mut subs: Vec<Substitution> = if has_bare { Vec::new() } else { default.to_vec() };

    for entry in entries {
        let (name, op) = if let Some(name) = entry.strip_prefix('+') {
            (name, Op::Append)
        } else if let Some(name) = entry.strip_prefix('-') {
            (name, Op::Remove)
        } else if let Some(name) = entry.strip_suffix('+') {
            (name, Op::Prepend)
        } else {
            (entry, Op::Append)
        };
        let Some(phases) = lookup(name.trim()) else {
            Diagnostic::warning(
                DiagnosticKind::UnknownSubstitution,
                None,
                format!("unknown substitution `{name}`"),
            )
            .emit(diagnostics);
            continue;
        };
        match op {
            Op::Remove => subs.retain(|s| !phases.contains(s)),
            Op::Append | Op::Prepend => {
                let mut fresh = Vec::new();
                for phase in phases {
                    if subs.contains(phase) || fresh.contains(phase) {
                        Diagnostic::warning(
                            DiagnosticKind::DuplicateSubstitution,
                            None,
                            format!("substitution `{phase}` listed more than once"),
                        )
                        .emit(diagnostics);
                    } else {
                        fresh.push(*phase);
                    }
                }
                if op == Op::Append {
                    subs.extend(fresh);
                } else {
                    let rest = std::mem::replace(&mut subs, fresh);
                    subs.extend(rest);
                }
            }
        }
    }
    subs
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Append,
    Prepend,
    Remove,
}

/// Document counters, kept apart from ordinary attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    values: BTreeMap<String, String>,
}

impl Counters {
    /// Advance counter `name` and return its new value. A counter that does
    /// not exist yet starts at `seed`, or `1`.
    pub fn next(&mut self, name: &str, seed: Option<&str>) -> String {
        let next = match self.values.get(name) {
            Some(current) => increment(current),
            None => seed
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("1")
                .to_string(),
        };
        self.values.insert(name.to_string(), next.clone());
        next
    }

    /// Current value of counter `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

fn increment(current: &str) -> String {
    if let Ok(n) = current.parse::<i64>() {
        return (n + 1).to_string();
    }
    let mut chars = current.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() && !matches!(c, 'z' | 'Z') => {
            char::from_u32(u32::from(c) + 1).map_or_else(|| "1".to_string(), String::from)
        }
        _ => "1".to_string(),
    }
}

/// Everything a substitution run reads or updates besides the line.
#[derive(Debug)]
pub struct SubstitutionContext<'a> {
    attributes: &'a AttributeTable,
    counters: &'a mut Counters,
    diagnostics: &'a mut Vec<Diagnostic>,
    line: Option<usize>,
    hard_break: bool,
}

impl<'a> SubstitutionContext<'a> {
    /// A context over the live document state.
    pub fn new(
        attributes: &'a AttributeTable,
        counters: &'a mut Counters,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            attributes,
            counters,
            diagnostics,
            line: None,
            hard_break: false,
        }
    }

    /// Attribute diagnostics to source line `line`.
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// Substitute one line.
///
/// With no phases the result is the line itself as a single text element.
pub fn substitute_line(
    line: &str,
    subs: &[Substitution],
    ctx: &mut SubstitutionContext<'_>,
) -> Vec<InlineElement> {
    if subs.is_empty() {
        return vec![InlineElement::Text(line.to_string())];
    }
    let mut shielded = Shielded::new(line);
    for sub in subs {
        match sub {
            Substitution::InlinePassthrough => passthrough::apply(&mut shielded, ctx),
            Substitution::SpecialCharacters => specialchars::apply(&mut shielded),
            Substitution::Quotes => quotes::apply(&mut shielded),
            Substitution::Attributes => attributes::apply(&mut shielded, ctx),
            Substitution::Replacements => replacements::apply(&mut shielded),
            Substitution::Macros => macros::apply(&mut shielded),
            Substitution::PostReplacements => {
                post_replacements::apply(&mut shielded, ctx.hard_break);
            }
            Substitution::Callouts => callouts::apply(&mut shielded),
        }
    }
    shielded.expand()
}

/// Substitute the lines of a block. With `hardbreaks`, every line but the
/// last ends in a line break when post replacements are enabled.
pub fn substitute_lines(
    lines: &[String],
    subs: &[Substitution],
    hardbreaks: bool,
    ctx: &mut SubstitutionContext<'_>,
) -> Vec<Vec<InlineElement>> {
    let first_line = ctx.line;
    let last = lines.len().saturating_sub(1);
    let result = lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            ctx.line = first_line.map(|l| l + index);
            ctx.hard_break = hardbreaks && index < last;
            substitute_line(line, subs, ctx)
        })
        .collect();
    ctx.line = first_line;
    ctx.hard_break = false;
    result
}
