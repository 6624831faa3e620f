//! Filters - Named Predicates
//!
//! Definitions refer to predicates by name only; the embedding application
//! registers the functions. A name nobody registered passes.

use crate::position::Position;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Entry conditions and route conditions: `(state, position) -> bool`.
pub type Filter = Arc<dyn Fn(&Value, &Position<'_>) -> bool + Send + Sync>;

/// Collection filters: `(state, entry) -> bool`.
pub type CollectionFilter = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Filter>,
    collection_filters: HashMap<String, CollectionFilter>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_filter<F>(&mut self, name: impl Into<String>, filter: F)
    where
        F: Fn(&Value, &Position<'_>) -> bool + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Arc::new(filter));
    }

    pub fn insert_collection_filter<F>(&mut self, name: impl Into<String>, filter: F)
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.collection_filters.insert(name.into(), Arc::new(filter));
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn has_collection_filter(&self, name: &str) -> bool {
        self.collection_filters.contains_key(name)
    }

    /// Evaluates the named filter; no name or an unregistered name passes.
    pub fn test(&self, name: Option<&str>, state: &Value, position: &Position<'_>) -> bool {
        match name.and_then(|name| self.filters.get(name)) {
            Some(filter) => filter(state, position),
            None => true,
        }
    }

    /// Evaluates the named collection filter against one collection entry.
    pub fn accept(&self, name: Option<&str>, state: &Value, entry: &Value) -> bool {
        match name.and_then(|name| self.collection_filters.get(name)) {
            Some(filter) => filter(state, entry),
            None => true,
        }
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut filters: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        let mut collection_filters: Vec<&str> =
            self.collection_filters.keys().map(String::as_str).collect();
        filters.sort_unstable();
        collection_filters.sort_unstable();
        f.debug_struct("FilterRegistry")
            .field("filters", &filters)
            .field("collection_filters", &collection_filters)
            .finish()
    }
}
