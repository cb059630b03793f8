//! Caller-supplied parse configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default for [`Config::max_include_depth`].
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 64;

/// How much access to the host file system the document is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeMode {
    /// Includes may reach anywhere.
    Unsafe,
    /// Includes are jailed to the base directory.
    #[default]
    Safe,
    /// Same include policy as `Safe`.
    Server,
    /// Include directives are never resolved.
    Secure,
}

impl SafeMode {
    /// Lowercase name of the mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsafe => "unsafe",
            Self::Safe => "safe",
            Self::Server => "server",
            Self::Secure => "secure",
        }
    }

    pub(crate) fn allows_include(self) -> bool {
        !matches!(self, Self::Secure)
    }

    pub(crate) fn jails_paths(self) -> bool {
        matches!(self, Self::Safe | Self::Server)
    }
}

impl fmt::Display for SafeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options controlling a single parse.
///
/// Attribute values follow the usual command-line conventions: a plain
/// value is locked against document overrides, a trailing `@` makes it a
/// soft default, and a `!`-prefixed name unsets the attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the root document, used for relative includes and messages.
    pub filename: Option<PathBuf>,
    /// Root of the include jail. Defaults to the document's directory.
    pub base_dir: Option<PathBuf>,
    /// Caller attributes.
    pub attributes: BTreeMap<String, String>,
    /// Include access policy.
    pub safe_mode: SafeMode,
    /// Turn unresolved includes into a fatal error.
    pub fail_on_unresolved: bool,
    /// Maximum nesting of include directives.
    pub max_include_depth: usize,
    /// Insert empty intermediate sections where a section skips levels,
    /// instead of only warning.
    pub fill_section_gaps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filename: None,
            base_dir: None,
            attributes: BTreeMap::new(),
            safe_mode: SafeMode::default(),
            fail_on_unresolved: false,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            fill_section_gaps: false,
        }
    }
}

impl Config {
    /// Set the root document path.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the include jail.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Add a caller attribute, using the `@` and `!` conventions.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the safe mode.
    #[must_use]
    pub fn with_safe_mode(mut self, mode: SafeMode) -> Self {
        self.safe_mode = mode;
        self
    }

    /// Make unresolved includes fatal.
    #[must_use]
    pub fn fail_on_unresolved(mut self, fail: bool) -> Self {
        self.fail_on_unresolved = fail;
        self
    }

    /// Directory that relative include targets in the root document resolve
    /// against.
    pub(crate) fn document_dir(&self) -> PathBuf {
        self.filename
            .as_deref()
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Root of the include jail.
    pub(crate) fn jail_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(|| self.document_dir())
    }

    /// Name used for the root document in messages.
    pub(crate) fn origin(&self) -> String {
        self.filename
            .as_deref()
            .map_or_else(|| "<stdin>".to_string(), |p| p.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.safe_mode, SafeMode::Safe);
        assert_eq!(config.max_include_depth, 64);
        assert!(!config.fail_on_unresolved);
        assert!(!config.fill_section_gaps);
    }

    #[test]
    fn deserializes_partial_config() {
        let config: Config =
            serde_json::from_str(r#"{"safe_mode":"unsafe","attributes":{"toc":""}}"#)
                .expect("valid config");
        assert_eq!(config.safe_mode, SafeMode::Unsafe);
        assert_eq!(config.attributes.get("toc").map(String::as_str), Some(""));
        assert_eq!(config.max_include_depth, DEFAULT_MAX_INCLUDE_DEPTH);
    }

    #[test]
    fn document_dir_follows_filename() {
        let config = Config::default().with_filename("docs/guide/index.adoc");
        assert_eq!(config.document_dir(), PathBuf::from("docs/guide"));
        assert_eq!(config.jail_dir(), PathBuf::from("docs/guide"));
        let config = config.with_base_dir("docs");
        assert_eq!(config.jail_dir(), PathBuf::from("docs"));
    }

    #[test]
    fn origin_defaults_to_stdin() {
        assert_eq!(Config::default().origin(), "<stdin>");
    }
}
