//! Non-fatal diagnostics produced while building the document tree.
//!
//! The pipeline produces structured diagnostic data; it does **not** render
//! them. Every diagnostic is also logged through `tracing` at the moment it
//! is recorded, so callers that only install a subscriber still see them.

use serde::Serialize;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The parser recovered but the output may not match intent.
    Warning,
    /// The parser could not interpret part of the input.
    Error,
}

/// What kind of problem a diagnostic describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A delimited block was still open at end of input.
    UnclosedBlock,
    /// A `tag::` region in an included file was never closed.
    UnclosedTag,
    /// An include directive could not be resolved.
    UnresolvedInclude,
    /// An attribute reference has no binding (`attribute-missing=warn`).
    UnknownAttribute,
    /// A substitution appears more than once in a `subs` list.
    DuplicateSubstitution,
    /// A `subs` entry names no known substitution.
    UnknownSubstitution,
    /// A section level skips, or a level-0 title appears in the body.
    SectionOutOfSequence,
    /// A directive line that could not be interpreted.
    InvalidDirective,
    /// A conditional directive was never closed.
    UnclosedConditional,
}

impl DiagnosticKind {
    /// Stable snake-case code for the kind.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::UnclosedBlock => "unclosed_block",
            Self::UnclosedTag => "unclosed_tag",
            Self::UnresolvedInclude => "unresolved_include",
            Self::UnknownAttribute => "unknown_attribute",
            Self::DuplicateSubstitution => "duplicate_substitution",
            Self::UnknownSubstitution => "unknown_substitution",
            Self::SectionOutOfSequence => "section_out_of_sequence",
            Self::InvalidDirective => "invalid_directive",
            Self::UnclosedConditional => "unclosed_conditional",
        }
    }
}

/// A diagnostic emitted during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: Severity,
    /// Problem category.
    pub kind: DiagnosticKind,
    /// 1-based source line, when known.
    pub line: Option<usize>,
    /// Human-readable description of the issue.
    pub message: String,
}

impl Diagnostic {
    /// A warning-level diagnostic.
    #[must_use]
    pub fn warning(kind: DiagnosticKind, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            line,
            message: message.into(),
        }
    }

    /// Log the diagnostic and append it to `sink`.
    pub(crate) fn emit(self, sink: &mut Vec<Diagnostic>) {
        match self.severity {
            Severity::Warning => {
                tracing::warn!(kind = self.kind.code(), line = self.line, "{}", self.message);
            }
            Severity::Error => {
                tracing::error!(kind = self.kind.code(), line = self.line, "{}", self.message);
            }
        }
        sink.push(self);
    }
}
