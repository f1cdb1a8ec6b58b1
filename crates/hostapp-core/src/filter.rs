//! Key-value filtering over app lists.
//!
//! A filter is a set of `key=value` pairs matched against the JSON form of a
//! manifest, so any descriptor field (including ones the engine does not model,
//! such as `type` or `categories`) can be used.

use hostapp_schema::Manifest;
use serde_json::Value;

/// Conjunction of `key == value` conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppFilter {
    pairs: Vec<(String, String)>,
}

impl AppFilter {
    /// A filter that matches everything.
    pub fn none() -> Self {
        Self::default()
    }

    /// Add a condition.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Parse `key=value` arguments.
    ///
    /// # Errors
    ///
    /// Returns the offending argument when it has no `=` or an empty key.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, String> {
        let mut filter = Self::none();
        for arg in args {
            let arg = arg.as_ref();
            match arg.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    filter = filter.with(key.trim(), value.trim());
                }
                _ => return Err(format!("invalid filter '{arg}', expected key=value")),
            }
        }
        Ok(filter)
    }

    /// Whether there are no conditions.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Whether `manifest` satisfies every condition.
    pub fn matches(&self, manifest: &Manifest) -> bool {
        if self.pairs.is_empty() {
            return true;
        }
        let value = manifest.to_value();
        self.pairs
            .iter()
            .all(|(key, expected)| value.get(key).is_some_and(|v| field_matches(v, expected)))
    }

    /// Keep only the manifests that match. Pure post-processing.
    pub fn apply(&self, apps: Vec<Manifest>) -> Vec<Manifest> {
        if self.pairs.is_empty() {
            return apps;
        }
        apps.into_iter().filter(|m| self.matches(m)).collect()
    }
}

fn field_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        Value::Array(items) => items.iter().any(|item| field_matches(item, expected)),
        Value::Null | Value::Object(_) => false,
    }
}
