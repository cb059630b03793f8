//! Conditional directives: `ifdef`, `ifndef`, `ifeval` and `endif`.
//!
//! The scanner feeds every line through [`Conditionals::process`] before
//! classifying it. Directive lines never reach the grammar, and neither do
//! lines inside an inactive region.

use crate::attributes::AttributeTable;
use crate::diagnostic::{Diagnostic, DiagnosticKind};

use super::expression;

/// How the names of an `ifdef`/`ifndef` are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    /// `a+b`: every name.
    All,
    /// `a,b`: any name.
    Any,
}

/// A parsed conditional directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Directive<'a> {
    /// `ifdef::names[]` or `ifdef::names[content]`
    Ifdef {
        names: Vec<&'a str>,
        combinator: Combinator,
        content: Option<&'a str>,
    },
    /// `ifndef::names[]` or `ifndef::names[content]`
    Ifndef {
        names: Vec<&'a str>,
        combinator: Combinator,
        content: Option<&'a str>,
    },
    /// `ifeval::[expression]`
    Ifeval { expression: &'a str },
    /// `endif::[]` or `endif::names[]`
    Endif,
    /// A directive escaped with a leading backslash.
    Escaped(&'a str),
}

const KEYWORDS: [&str; 4] = ["ifdef::", "ifndef::", "ifeval::", "endif::"];

/// Parse `line` as a conditional directive.
pub(crate) fn parse_directive(line: &str) -> Option<Directive<'_>> {
    if let Some(rest) = line.strip_prefix('\\') {
        return KEYWORDS
            .iter()
            .any(|k| rest.starts_with(k))
            .then_some(Directive::Escaped(rest));
    }
    if !line.trim_end().ends_with(']') {
        return None;
    }

    if let Some(rest) = line.strip_prefix("ifdef::") {
        let (names, combinator, content) = conditional_body(rest)?;
        return Some(Directive::Ifdef {
            names,
            combinator,
            content,
        });
    }
    if let Some(rest) = line.strip_prefix("ifndef::") {
        let (names, combinator, content) = conditional_body(rest)?;
        return Some(Directive::Ifndef {
            names,
            combinator,
            content,
        });
    }
    if let Some(rest) = line.strip_prefix("ifeval::[") {
        let end = rest.rfind(']')?;
        return Some(Directive::Ifeval {
            expression: &rest[..end],
        });
    }
    if let Some(rest) = line.strip_prefix("endif::") {
        return rest.contains('[').then_some(Directive::Endif);
    }
    None
}

fn conditional_body(body: &str) -> Option<(Vec<&str>, Combinator, Option<&str>)> {
    let open = body.find('[')?;
    let close = body.rfind(']')?;
    if close < open {
        return None;
    }
    let names = body[..open].trim();
    if names.is_empty() {
        return None;
    }
    let combinator = if names.contains('+') {
        Combinator::All
    } else {
        Combinator::Any
    };
    let names = names
        .split(['+', ','])
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();
    let content = Some(&body[open + 1..close]).filter(|c| !c.is_empty());
    Some((names, combinator, content))
}

fn defined(names: &[&str], combinator: Combinator, attributes: &AttributeTable) -> bool {
    match combinator {
        Combinator::Any => names.iter().any(|n| attributes.contains(n)),
        Combinator::All => names.iter().all(|n| attributes.contains(n)),
    }
}

fn undefined(names: &[&str], combinator: Combinator, attributes: &AttributeTable) -> bool {
    match combinator {
        Combinator::Any => names.iter().any(|n| !attributes.contains(n)),
        Combinator::All => names.iter().all(|n| !attributes.contains(n)),
    }
}

/// What the scanner should do with a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineAction {
    /// Classify the line as written.
    Keep,
    /// Classify this text in place of the line.
    Replace(String),
    /// Drop the line.
    Skip,
}

#[derive(Debug)]
struct Frame {
    active: bool,
    line: usize,
}

/// Stack of open conditional regions.
#[derive(Debug, Default)]
pub(crate) struct Conditionals {
    frames: Vec<Frame>,
}

impl Conditionals {
    fn active(&self) -> bool {
        self.frames.iter().all(|f| f.active)
    }

    /// Decide what happens to `line`, updating the stack for directives.
    pub(crate) fn process(
        &mut self,
        line: &str,
        line_no: usize,
        attributes: &AttributeTable,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> LineAction {
        let Some(directive) = parse_directive(line) else {
            return if self.active() {
                LineAction::Keep
            } else {
                LineAction::Skip
            };
        };

        let active = self.active();
        let (condition, content) = match directive {
            Directive::Escaped(rest) => {
                return if active {
                    LineAction::Replace(rest.to_string())
                } else {
                    LineAction::Skip
                };
            }
            Directive::Endif => {
                if self.frames.pop().is_none() {
                    Diagnostic::warning(
                        DiagnosticKind::InvalidDirective,
                        Some(line_no),
                        "endif without a matching conditional",
                    )
                    .emit(diagnostics);
                }
                return LineAction::Skip;
            }
            Directive::Ifdef {
                names,
                combinator,
                content,
            } => (defined(&names, combinator, attributes), content),
            Directive::Ifndef {
                names,
                combinator,
                content,
            } => (undefined(&names, combinator, attributes), content),
            Directive::Ifeval { expression } => {
                let condition = expression::evaluate(expression, attributes).unwrap_or_else(|e| {
                    Diagnostic::warning(
                        DiagnosticKind::InvalidDirective,
                        Some(line_no),
                        format!("invalid ifeval expression: {e}"),
                    )
                    .emit(diagnostics);
                    false
                });
                (condition, None)
            }
        };

        match content {
            Some(content) if active && condition => LineAction::Replace(content.to_string()),
            Some(_) => LineAction::Skip,
            None => {
                self.frames.push(Frame {
                    active: condition,
                    line: line_no,
                });
                LineAction::Skip
            }
        }
    }

    /// Report regions still open at end of input.
    pub(crate) fn finish(&mut self, diagnostics: &mut Vec<Diagnostic>) {
        for frame in self.frames.drain(..) {
            Diagnostic::warning(
                DiagnosticKind::UnclosedConditional,
                Some(frame.line),
                format!("unclosed conditional starting on line {}", frame.line),
            )
            .emit(diagnostics);
        }
    }
}
