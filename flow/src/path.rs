//! PropertyPath - Nested Lookups Over Caller Data
//!
//! Application state is an arbitrary JSON document owned by the caller.
//! Every read the engine makes goes through [`get`], which keeps
//! "present but falsy" (`null`, `false`, `0`) apart from "not present".

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// A path into nested data.
///
/// Built from a dot-delimited string (`"household.members"`) or from an
/// explicit list of keys. Numeric-looking keys stay plain string keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PropertyPath(Vec<String>);

impl PropertyPath {
    /// Split a dotted path into its keys.
    pub fn parse(dotted: &str) -> Self {
        Self(dotted.split('.').map(str::to_owned).collect())
    }

    pub fn from_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for PropertyPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

impl From<&String> for PropertyPath {
    fn from(dotted: &String) -> Self {
        Self::parse(dotted)
    }
}

impl From<String> for PropertyPath {
    fn from(dotted: String) -> Self {
        Self::parse(&dotted)
    }
}

impl From<&PropertyPath> for PropertyPath {
    fn from(path: &PropertyPath) -> Self {
        path.clone()
    }
}

impl From<Vec<String>> for PropertyPath {
    fn from(keys: Vec<String>) -> Self {
        Self(keys)
    }
}

impl From<&[&str]> for PropertyPath {
    fn from(keys: &[&str]) -> Self {
        Self::from_keys(keys.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for PropertyPath {
    fn from(keys: [&str; N]) -> Self {
        Self::from_keys(keys)
    }
}

/// Returns a top-level or nested value of `root`.
///
/// Returns `None` as soon as any step along the path is missing. Values that
/// are present are returned as-is, including `null`, `false` and `0`.
/// An empty key list addresses `root` itself.
pub fn get<'a>(root: &'a Value, path: impl Into<PropertyPath>) -> Option<&'a Value> {
    walk(root, path.into().keys())
}

/// Like [`get`], starting from an object's field map.
///
/// An empty key list addresses nothing, since the map is not itself a value.
pub fn get_in_map<'a>(map: &'a Map<String, Value>, keys: &[String]) -> Option<&'a Value> {
    let (first, rest) = keys.split_first()?;
    walk(map.get(first)?, rest)
}

fn walk<'a>(root: &'a Value, keys: &[String]) -> Option<&'a Value> {
    keys.iter().try_fold(root, |value, key| child(value, key))
}

fn child<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => array_index(key).and_then(|index| items.get(index)),
        _ => None,
    }
}

/// Only canonical non-negative integers address array elements.
fn array_index(key: &str) -> Option<usize> {
    let index: usize = key.parse().ok()?;
    (index.to_string() == key).then_some(index)
}

/// Lists the `(key, entry)` pairs of a collection.
///
/// Arrays yield their indices as decimal strings, objects their own keys in
/// document order. Anything else is not a collection and yields `None`.
pub fn entries(value: &Value) -> Option<Vec<(String, &Value)>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), item))
                .collect(),
        ),
        Value::Object(map) => Some(map.iter().map(|(k, v)| (k.clone(), v)).collect()),
        _ => None,
    }
}

/// Loose truthiness used for escape-hatch flags in definitions.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Anything with a countable number of entries.
pub trait Collection {
    /// `None` when the value is not a collection at all.
    fn entry_count(&self) -> Option<usize>;
}

impl Collection for Value {
    fn entry_count(&self) -> Option<usize> {
        match self {
            Value::Array(items) => Some(items.len()),
            Value::Object(map) => Some(map.len()),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => None,
        }
    }
}

impl Collection for Map<String, Value> {
    fn entry_count(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<T> Collection for [T] {
    fn entry_count(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<T> Collection for Vec<T> {
    fn entry_count(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<T, S> Collection for HashSet<T, S> {
    fn entry_count(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<T> Collection for BTreeSet<T> {
    fn entry_count(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<K, V, S> Collection for HashMap<K, V, S> {
    fn entry_count(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<K, V> Collection for BTreeMap<K, V> {
    fn entry_count(&self) -> Option<usize> {
        Some(self.len())
    }
}

/// Returns true if the collection contains no entries.
///
/// Absent input and non-collections return false.
pub fn is_empty<C: Collection + ?Sized>(collection: Option<&C>) -> bool {
    collection.and_then(Collection::entry_count) == Some(0)
}
