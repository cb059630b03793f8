//! Preprocessor: include directives and conditional directives.
//!
//! Conditionals are evaluated by the scanner while it reads, so inactive
//! lines never reach the scope stack. Include directives are resolved
//! here, on the consumer side: every fragment passes through
//! [`Preprocessor::process`], which splits it at each include directive
//! and splices the included content in place.
//!
//! ```text
//! Fragment ──▶ split at include:: ──▶ Preprocessed::Fragment ──▶ sink
//!                    │
//!                    └──▶ resolve ──▶ select ──▶ child Scanner ──┐
//!                           │                                     │
//!                           └──▶ Preprocessed::Unresolved         └──▶ (recurse)
//! ```

pub(crate) mod conditional;
mod expression;
mod include;
mod offset;
mod select;

use std::io::Cursor;
use std::mem;
use std::path::PathBuf;

use crate::attributes::AttributeTable;
use crate::config::Config;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::error::{IncludeError, ParseError};
use crate::fragment::{AttributeList, Fragment, Line, RawElement};
use crate::scanner::{Scanner, ScopeStack};
use crate::subs::expand_references;

use include::Policy;
use offset::{LevelOffset, LevelOffsets};

/// One piece of the preprocessed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preprocessed {
    /// Lines with no include directives left in them.
    Fragment {
        /// 1-based line of the first line, in the file it came from.
        line_offset: usize,
        /// Scope stack in force before the first line.
        scopes: ScopeStack,
        /// The lines.
        lines: Vec<Line>,
    },
    /// An include directive that could not be resolved.
    Unresolved {
        /// Line of the directive.
        line: usize,
        /// `Unresolved directive in <parent> - <directive>`.
        message: String,
    },
}

/// Receives the preprocessed stream.
pub trait FragmentSink {
    /// The live document attributes, used to expand include targets and
    /// to seed the conditionals of included files.
    fn attributes(&self) -> &AttributeTable;

    /// Take the next piece of the stream.
    ///
    /// # Errors
    ///
    /// An error stops preprocessing and is returned from
    /// [`Preprocessor::process`].
    fn accept(&mut self, item: Preprocessed) -> Result<(), ParseError>;

    /// Take a non-fatal problem.
    fn diagnostic(&mut self, diagnostic: Diagnostic);
}

/// Per-file state, cloned on every descent.
#[derive(Debug, Clone)]
struct Context {
    dir: PathBuf,
    origin: String,
    chain: Vec<PathBuf>,
    depth: usize,
    offsets: LevelOffsets,
}

/// Resolves include directives for one document.
#[derive(Debug)]
pub struct Preprocessor {
    policy: Policy,
    fail_on_unresolved: bool,
    context: Context,
}

impl Preprocessor {
    /// A preprocessor for the root document described by `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let chain = config
            .filename
            .as_deref()
            .map(include::normalize)
            .into_iter()
            .collect();
        Self {
            policy: Policy {
                mode: config.safe_mode,
                jail: include::normalize(&config.jail_dir()),
                max_depth: config.max_include_depth,
            },
            fail_on_unresolved: config.fail_on_unresolved,
            context: Context {
                dir: include::normalize(&config.document_dir()),
                origin: config.origin(),
                chain,
                depth: 0,
                offsets: LevelOffsets::default(),
            },
        }
    }

    /// Preprocess one fragment of the current file into `sink`.
    ///
    /// # Errors
    ///
    /// Returns the fragment's own error, a fatal error met while reading an
    /// included file, an unresolved include when `fail_on_unresolved` is
    /// set, or whatever the sink returns.
    pub fn process(&mut self, fragment: Fragment, sink: &mut impl FragmentSink) -> Result<(), ParseError> {
        for diagnostic in fragment.diagnostics {
            sink.diagnostic(diagnostic);
        }
        let lines = fragment.lines?;
        self.split(fragment.line_offset, fragment.scopes, lines, sink)
    }

    fn split(
        &mut self,
        line_offset: usize,
        scopes: ScopeStack,
        lines: Vec<Line>,
        sink: &mut impl FragmentSink,
    ) -> Result<(), ParseError> {
        let mut replay = scopes.clone();
        let mut start_scopes = scopes;
        let mut start = line_offset;
        let mut pending: Vec<Line> = Vec::with_capacity(lines.len());

        for (index, mut line) in lines.into_iter().enumerate() {
            let number = line_offset + index;
            if let RawElement::FileInclusion { target, attributes } = &line.element {
                if !pending.is_empty() {
                    sink.accept(Preprocessed::Fragment {
                        line_offset: start,
                        scopes: start_scopes,
                        lines: mem::take(&mut pending),
                    })?;
                }
                self.include(number, &line.text, target, attributes, &replay, sink)?;
                replay.apply(&line.element, &line.text);
                start = number + 1;
                start_scopes = replay.clone();
                continue;
            }
            if let RawElement::SectionHeader { level, .. } = &mut line.element {
                *level = self.context.offsets.apply(*level);
            }
            replay.apply(&line.element, &line.text);
            pending.push(line);
        }

        if pending.is_empty() {
            return Ok(());
        }
        sink.accept(Preprocessed::Fragment {
            line_offset: start,
            scopes: start_scopes,
            lines: pending,
        })
    }

    fn include(
        &mut self,
        line: usize,
        directive: &str,
        target: &str,
        attributes: &AttributeList,
        scopes: &ScopeStack,
        sink: &mut impl FragmentSink,
    ) -> Result<(), ParseError> {
        let target = expand_references(target, sink.attributes());
        let resolved = include::resolve(
            &target,
            &self.context.dir,
            &self.context.chain,
            self.context.depth,
            &self.policy,
        )
        .and_then(|path| include::read_lines(&path).map(|read| (path, read)));
        let (path, read) = match resolved {
            Ok(found) => found,
            Err(cause) => return self.unresolved(line, directive, cause, sink),
        };

        let mut diagnostics = Vec::new();
        let selected = select::select(read?, attributes, line, &mut diagnostics);
        for diagnostic in diagnostics {
            sink.diagnostic(diagnostic);
        }
        let selected = match selected {
            Ok(selected) => selected,
            Err(cause) => return self.unresolved(line, directive, cause, sink),
        };
        tracing::debug!(path = %path.display(), lines = selected.len(), "include resolved");

        if selected.is_empty() {
            return Ok(());
        }
        if !include::is_asciidoc(&path) {
            return sink.accept(Preprocessed::Fragment {
                line_offset: line,
                scopes: scopes.for_include(),
                lines: selected.into_iter().map(Line::raw).collect(),
            });
        }

        let mut child = self.context.clone();
        child.dir = path
            .parent()
            .map_or_else(|| self.context.dir.clone(), std::path::Path::to_path_buf);
        child.origin = path.display().to_string();
        child.chain.push(path);
        child.depth += 1;
        if let Some(offset) = attributes.named("leveloffset").and_then(LevelOffset::parse) {
            child.offsets.push(offset);
        }

        let scanner = Scanner::with_scopes(
            Cursor::new(selected.join("\n").into_bytes()),
            child.origin.clone(),
            sink.attributes().clone(),
            scopes.for_include(),
        );
        let parent = mem::replace(&mut self.context, child);
        let result = self.scan_child(scanner, sink);
        self.context = parent;
        result
    }

    fn scan_child(
        &mut self,
        scanner: Scanner<Cursor<Vec<u8>>>,
        sink: &mut impl FragmentSink,
    ) -> Result<(), ParseError> {
        for fragment in scanner {
            self.process(fragment, sink)?;
        }
        Ok(())
    }

    fn unresolved(
        &self,
        line: usize,
        directive: &str,
        cause: IncludeError,
        sink: &mut impl FragmentSink,
    ) -> Result<(), ParseError> {
        let directive = directive.trim().to_string();
        if self.fail_on_unresolved {
            return Err(ParseError::UnresolvedInclusion {
                parent: self.context.origin.clone(),
                directive,
                cause,
            });
        }
        let message = format!("Unresolved directive in {} - {directive}", self.context.origin);
        let mut diagnostics = Vec::new();
        Diagnostic::warning(
            DiagnosticKind::UnresolvedInclude,
            Some(line),
            format!("{message}: {cause}"),
        )
        .emit(&mut diagnostics);
        for diagnostic in diagnostics {
            sink.diagnostic(diagnostic);
        }
        sink.accept(Preprocessed::Unresolved { line, message })
    }
}
