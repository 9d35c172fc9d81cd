//! Alias registry as reported by `wp cli alias list`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::AliasError;

/// Connection attributes declared for one alias.
///
/// Both attributes are optional here; [`super::validate`] enforces them.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct AliasRecord {
    /// Transport descriptor such as `user@host`.
    #[serde(default)]
    pub ssh: Option<String>,
    /// Application root on the remote host.
    #[serde(default)]
    pub path: Option<String>,
}

impl AliasRecord {
    /// Builds a record with both attributes set.
    #[must_use]
    pub fn new(ssh: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            ssh: Some(ssh.into()),
            path: Some(path.into()),
        }
    }
}

/// Sigil-prefixed alias names mapped to their records.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AliasRegistry {
    aliases: BTreeMap<String, AliasRecord>,
}

impl AliasRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `record` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, record: AliasRecord) {
        self.aliases.insert(name.into(), record);
    }

    /// Looks up an alias by its exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AliasRecord> {
        self.aliases.get(name)
    }

    /// Returns `true` when no aliases are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Number of registered aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Parses the JSON printed by `wp cli alias list --format=json`.
    ///
    /// Blank output and an empty JSON array both yield an empty registry.
    /// Alias groups and other non-object entries are kept without connection
    /// attributes so that selecting them fails validation rather than lookup.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::Registry`] when the payload is not a JSON object
    /// or an alias entry has malformed attributes.
    pub fn from_json(payload: &str) -> Result<Self, AliasError> {
        if payload.trim().is_empty() {
            return Ok(Self::new());
        }

        let value: Value = serde_json::from_str(payload)
            .map_err(|err| AliasError::Registry(err.to_string()))?;
        let entries = match value {
            Value::Object(entries) => entries,
            // PHP encodes an empty alias map as `[]`.
            Value::Array(items) if items.is_empty() => return Ok(Self::new()),
            _ => {
                return Err(AliasError::Registry(String::from(
                    "alias list is not a JSON object",
                )));
            }
        };

        let mut registry = Self::new();
        for (name, entry) in entries {
            let record = if entry.is_object() {
                AliasRecord::deserialize(entry)
                    .map_err(|err| AliasError::Registry(format!("{name}: {err}")))?
            } else {
                AliasRecord::default()
            };
            registry.insert(name, record);
        }
        Ok(registry)
    }
}

impl<S: Into<String>> FromIterator<(S, AliasRecord)> for AliasRegistry {
    fn from_iter<I: IntoIterator<Item = (S, AliasRecord)>>(iter: I) -> Self {
        Self {
            aliases: iter
                .into_iter()
                .map(|(name, record)| (name.into(), record))
                .collect(),
        }
    }
}
