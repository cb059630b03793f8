//! Fatal parse errors and the causes of unresolved include directives.
//!
//! Only [`ParseError`] ever stops a document. Everything recoverable is
//! reported as a [`Diagnostic`](crate::diagnostic::Diagnostic) instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::SafeMode;

/// An error that terminates the pipeline for the current document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// I/O failure while reading the source.
    #[error("failed to read {origin}: {source}")]
    Read {
        /// Name of the input that failed (`<stdin>` for in-memory sources).
        origin: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The source is not valid UTF-8.
    #[error("invalid UTF-8 in {origin} on line {line}")]
    Encoding {
        /// Name of the input.
        origin: String,
        /// 1-based line number of the offending line.
        line: usize,
    },

    /// A block delimiter the scanner cannot open in its current position.
    #[error("unsupported block delimiter `{delimiter}` on line {line}")]
    UnsupportedDelimiter {
        /// 1-based line number.
        line: usize,
        /// The delimiter line as written.
        delimiter: String,
    },

    /// An include directive could not be resolved and `fail_on_unresolved`
    /// is set.
    #[error("Unresolved directive in {parent} - {directive}")]
    UnresolvedInclusion {
        /// Name of the file containing the directive.
        parent: String,
        /// The directive line as written.
        directive: String,
        /// Why resolution failed.
        #[source]
        cause: IncludeError,
    },

    /// The consumer cancelled the pipeline.
    #[error("parsing was cancelled")]
    Cancelled,
}

/// Why an include directive could not be resolved.
#[derive(Debug, Error)]
pub enum IncludeError {
    /// The target could not be opened or read.
    #[error("unable to read {}: {source}", path.display())]
    Io {
        /// Resolved path of the target.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The `lines` attribute does not describe a valid set of ranges.
    #[error("invalid line range `{0}`")]
    InvalidLineRange(String),

    /// A tag selected with `tags` never appears in the target.
    #[error("tag `{0}` not found in include file")]
    MissingTag(String),

    /// The include chain is deeper than `max_include_depth`.
    #[error("maximum include depth of {0} exceeded")]
    DepthExceeded(usize),

    /// The target is already being included further up the chain.
    #[error("recursive include of {}", .0.display())]
    Recursive(PathBuf),

    /// The safe mode forbids this include.
    #[error("include of {target} is not permitted in {mode} mode")]
    NotPermitted {
        /// The target as written.
        target: String,
        /// The active safe mode.
        mode: SafeMode,
    },

    /// Remote targets are never fetched by the core.
    #[error("remote include {0} is not supported")]
    Remote(String),
}
