//! Include target resolution.
//!
//! Targets resolve against the directory of the file that holds the
//! directive. Paths are joined and normalized lexically; the process
//! working directory is never changed.

use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use crate::config::SafeMode;
use crate::error::{IncludeError, ParseError};
use crate::scanner::LineReader;

/// Extensions whose content is scanned as AsciiDoc.
const ASCIIDOC_EXTENSIONS: [&str; 5] = ["adoc", "asciidoc", "ad", "asc", "txt"];

/// Where include targets may point.
#[derive(Debug, Clone)]
pub(super) struct Policy {
    pub(super) mode: SafeMode,
    pub(super) jail: PathBuf,
    pub(super) max_depth: usize,
}

/// Resolve an expanded `target` found in a file in `dir`.
///
/// `chain` holds every file on the active include chain, `depth` the
/// current nesting.
pub(super) fn resolve(
    target: &str,
    dir: &Path,
    chain: &[PathBuf],
    depth: usize,
    policy: &Policy,
) -> Result<PathBuf, IncludeError> {
    if !policy.mode.allows_include() {
        return Err(IncludeError::NotPermitted {
            target: target.to_string(),
            mode: policy.mode,
        });
    }
    if target.starts_with("http://") || target.starts_with("https://") {
        return Err(IncludeError::Remote(target.to_string()));
    }
    let path = normalize(&dir.join(target));
    if policy.mode.jails_paths() && !path.starts_with(&policy.jail) {
        return Err(IncludeError::NotPermitted {
            target: target.to_string(),
            mode: policy.mode,
        });
    }
    if chain.contains(&path) {
        return Err(IncludeError::Recursive(path));
    }
    if depth >= policy.max_depth {
        return Err(IncludeError::DepthExceeded(policy.max_depth));
    }
    Ok(path)
}

/// Open `path` and read its lines.
///
/// Failing to open the file leaves the directive unresolved. Failing
/// after that, including invalid UTF-8, is fatal.
pub(super) fn read_lines(
    path: &Path,
) -> Result<Result<Vec<String>, ParseError>, IncludeError> {
    let file = File::open(path).map_err(|source| IncludeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = LineReader::new(BufReader::new(file), path.display().to_string());
    let mut lines = Vec::new();
    Ok(loop {
        match reader.next_line() {
            Ok(Some(line)) => lines.push(line),
            Ok(None) => break Ok(lines),
            Err(err) => break Err(err),
        }
    })
}

/// Whether `path` is scanned as AsciiDoc rather than spliced as raw lines.
pub(super) fn is_asciidoc(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ASCIIDOC_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Make `path` absolute and fold `.` and `..` components.
pub(super) fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
