use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Project identifier -> concurrent-edit prevention flag.
///
/// A project with no entry is treated as disabled. Keys are kept ordered so
/// the encoded slot is stable between writes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectFlags(BTreeMap<String, bool>);

impl ProjectFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absent keys read as `false`.
    pub fn is_enabled(&self, project_id: &str) -> bool {
        self.0.get(project_id).copied().unwrap_or(false)
    }

    pub fn get(&self, project_id: &str) -> Option<bool> {
        self.0.get(project_id).copied()
    }

    /// Set a single entry, returning the previous explicit value.
    pub fn set(&mut self, project_id: impl Into<String>, enabled: bool) -> Option<bool> {
        self.0.insert(project_id.into(), enabled)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Decode the persisted slot text. Any value that is not a JSON object of
    /// booleans is rejected as a whole.
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        serde_json::from_str(text).map_err(|e| CoreError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::Encode(e.to_string()))
    }
}

impl FromIterator<(String, bool)> for ProjectFlags {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(&str, bool); N]> for ProjectFlags {
    fn from(entries: [(&str, bool); N]) -> Self {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}
