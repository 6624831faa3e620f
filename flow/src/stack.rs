use serde::{Deserialize, Serialize};

/// One level of a [`Position`](crate::Position): a node key plus, for loop
/// nodes, the surviving collection keys and the key currently being visited.
///
/// Entries are values; every change produces a new entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackEntry {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    collection_keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_key: Option<String>,
}

impl StackEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            collection_keys: None,
            active_key: None,
        }
    }

    pub fn with_active_key(mut self, active_key: impl Into<String>) -> Self {
        self.active_key = Some(active_key.into());
        self
    }

    pub fn with_collection_keys(mut self, collection_keys: Vec<String>) -> Self {
        self.collection_keys = Some(collection_keys);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn collection_keys(&self) -> Option<&[String]> {
        self.collection_keys.as_deref()
    }

    pub fn active_key(&self) -> Option<&str> {
        self.active_key.as_deref()
    }

    /// True when this level iterates a resolved collection.
    pub fn is_looping(&self) -> bool {
        self.collection_keys.is_some()
    }

    /// A collection was resolved but nothing in it survived filtering.
    pub fn has_empty_collection(&self) -> bool {
        self.collection_keys.as_ref().is_some_and(Vec::is_empty)
    }

    /// The collection key visited after the active one.
    ///
    /// An active key missing from the list restarts at the first key.
    pub fn following_key(&self) -> Option<&str> {
        let keys = self.collection_keys.as_deref()?;
        let next = self
            .active_key
            .as_deref()
            .and_then(|active| keys.iter().position(|key| key == active))
            .map_or(0, |index| index + 1);
        keys.get(next).map(String::as_str)
    }
}
