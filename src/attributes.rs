//! The live document attribute table.
//!
//! Caller attributes seed the table. Declarations in the document then set
//! or unset entries as they are encountered, except for entries the caller
//! locked.

use std::collections::{BTreeMap, BTreeSet};

/// What to do with a reference to an attribute that has no binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Leave the reference text in place.
    #[default]
    Skip,
    /// Remove the reference.
    Drop,
    /// Leave the reference text and record a diagnostic.
    Warn,
}

/// Document attributes with caller locks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTable {
    values: BTreeMap<String, String>,
    locked: BTreeSet<String>,
    unset: BTreeSet<String>,
}

impl AttributeTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from caller attributes.
    ///
    /// `name=value` locks the entry, `value@` is a soft default and `!name`
    /// locks the entry as unset.
    #[must_use]
    pub fn from_caller(attributes: &BTreeMap<String, String>) -> Self {
        let mut table = Self::new();
        for (name, value) in attributes {
            if let Some(name) = name.strip_prefix('!') {
                table.unset.insert(name.to_string());
                table.locked.insert(name.to_string());
            } else if let Some(name) = name.strip_suffix('!') {
                table.unset.insert(name.to_string());
                table.locked.insert(name.to_string());
            } else if let Some(soft) = value.strip_suffix('@') {
                table.values.insert(name.clone(), soft.to_string());
            } else {
                table.values.insert(name.clone(), value.clone());
                table.locked.insert(name.clone());
            }
        }
        table
    }

    /// Value of `name`, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether `name` is set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Whether `name` was explicitly unset.
    #[must_use]
    pub fn is_unset(&self, name: &str) -> bool {
        self.unset.contains(name)
    }

    /// Apply a declaration: `Some(value)` sets, `None` unsets.
    ///
    /// Returns `false` when the caller locked the entry and the declaration
    /// was ignored.
    pub fn apply(&mut self, name: &str, value: Option<&str>) -> bool {
        if self.locked.contains(name) {
            tracing::debug!(name, "ignoring declaration of locked attribute");
            return false;
        }
        match value {
            Some(value) => {
                self.unset.remove(name);
                self.values.insert(name.to_string(), value.to_string());
            }
            None => {
                self.values.remove(name);
                self.unset.insert(name.to_string());
            }
        }
        true
    }

    /// The `attribute-missing` policy currently in effect.
    #[must_use]
    pub fn missing_policy(&self) -> MissingPolicy {
        match self.get("attribute-missing") {
            Some("drop") | Some("drop-line") => MissingPolicy::Drop,
            Some("warn") => MissingPolicy::Warn,
            _ => MissingPolicy::Skip,
        }
    }

    /// Iterate over set entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Snapshot of the set entries.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.values.clone()
    }
}
