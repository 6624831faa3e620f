//! GraphDefinition - Typed Sections and Nodes
//!
//! A definition arrives as a nested mapping:
//!
//! ```json
//! {
//!   "sections": {
//!     "screener": {
//!       "_control": { "initialNode": "welcome" },
//!       "welcome": { "_control": { "next": "residency" }, "title": "Welcome" },
//!       "residency": { "_control": { "next": [{ "key": "exit", "condition": "notResident" }] } },
//!       "exit": {}
//!     }
//!   },
//!   "sectionOrdering": ["screener"]
//! }
//! ```
//!
//! It is parsed exactly once into [`Node`] trees whose kind, routes and
//! children are explicit, so traversal never re-inspects raw JSON.

use crate::path::{self, PropertyPath};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_CONTROL_KEY: &str = "_control";

/// Options controlling how a raw definition is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionOptions {
    /// Node field holding the control block.
    pub control_key: String,
    /// Object-valued fields that are node data rather than child nodes.
    pub ignored_properties: Vec<String>,
}

impl Default for DefinitionOptions {
    fn default() -> Self {
        Self {
            control_key: DEFAULT_CONTROL_KEY.to_string(),
            ignored_properties: Vec::new(),
        }
    }
}

impl DefinitionOptions {
    pub fn with_control_key(mut self, control_key: impl Into<String>) -> Self {
        self.control_key = control_key.into();
        self
    }

    pub fn ignore(mut self, property: impl Into<String>) -> Self {
        self.ignored_properties.push(property.into());
        self
    }

    fn is_ignored(&self, field: &str) -> bool {
        field == self.control_key || self.ignored_properties.iter().any(|p| p == field)
    }
}

#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("definition is missing `{0}`")]
    MissingField(&'static str),
    #[error("`{path}` must be {expected}")]
    InvalidField { path: String, expected: &'static str },
    #[error("route {index} of `{path}` must be a node key or an object with a string `key`")]
    MalformedRoute { path: String, index: usize },
    #[error("`{path}` lists child `{child}` which is not an object in the node")]
    UnknownChild { path: String, child: String },
    #[error("invalid definition JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DefinitionResult<T> = Result<T, DefinitionError>;

/// Collection loop declared by a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSpec {
    pub collection_path: PropertyPath,
    pub collection_filter: Option<String>,
    /// First node of the loop body, when the loop has one.
    pub body: Option<String>,
}

/// What a node does when the traversal reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Addressable end point; rendered as a page.
    Leaf,
    /// Container that descends into `initial` by default.
    Group { initial: String },
    /// One traversal pass per surviving collection key.
    Loop(LoopSpec),
}

/// One candidate `next` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    key: String,
    condition: Option<String>,
}

impl Route {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            condition: None,
        }
    }

    pub fn when(key: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            condition: Some(condition.into()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    key: String,
    path: String,
    kind: NodeKind,
    routes: Vec<Route>,
    condition: Option<String>,
    control: Map<String, Value>,
    data: Map<String, Value>,
    children: Vec<Node>,
}

impl Node {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Fully qualified dotted path, e.g. `household.members.profile`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Name of the entry filter gating this node.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Raw control block, including fields the engine does not interpret.
    pub fn control(&self) -> &Map<String, Value> {
        &self.control
    }

    /// Opaque fields for renderers (everything that is neither control nor child).
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child(&self, key: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.key == key)
    }

    /// Child the traversal descends into by default.
    pub fn initial_node(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Leaf => None,
            NodeKind::Group { initial } => Some(initial),
            NodeKind::Loop(spec) => spec.body.as_deref(),
        }
    }

    pub fn collection(&self) -> Option<&LoopSpec> {
        match &self.kind {
            NodeKind::Loop(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.initial_node().is_none()
    }

    fn parse(
        key: &str,
        path: String,
        value: &Value,
        options: &DefinitionOptions,
    ) -> DefinitionResult<Self> {
        let Value::Object(fields) = value else {
            return Err(DefinitionError::InvalidField {
                path,
                expected: "an object",
            });
        };

        let control = match fields.get(&options.control_key) {
            None => Map::new(),
            Some(Value::Object(control)) => control.clone(),
            Some(_) => {
                return Err(DefinitionError::InvalidField {
                    path: format!("{path}.{}", options.control_key),
                    expected: "an object",
                });
            }
        };

        let control_path = |field: &str| format!("{path}.{}.{field}", options.control_key);
        let initial = string_field(&control, "initialNode", &control_path)?;
        let condition = string_field(&control, "condition", &control_path)?;
        let collection_path = string_field(&control, "collectionPath", &control_path)?;
        let collection_filter = string_field(&control, "collectionFilter", &control_path)?;
        let routes = parse_routes(control.get("next"), &control_path("next"))?;

        let kind = match (collection_path, initial.clone()) {
            (Some(collection), body) => NodeKind::Loop(LoopSpec {
                collection_path: PropertyPath::parse(&collection),
                collection_filter,
                body,
            }),
            (None, Some(initial)) => NodeKind::Group { initial },
            (None, None) => NodeKind::Leaf,
        };

        let child_keys = if initial.is_none() {
            Vec::new()
        } else {
            match control.get("children") {
                Some(listed) => explicit_children(listed, fields, &path, &control_path)?,
                None => fields
                    .iter()
                    .filter(|(field, value)| value.is_object() && !options.is_ignored(field))
                    .map(|(field, _)| field.clone())
                    .collect(),
            }
        };

        let mut children = Vec::with_capacity(child_keys.len());
        let mut data = Map::new();
        for (field, value) in fields {
            if *field == options.control_key {
                continue;
            }
            if child_keys.contains(field) {
                children.push(Node::parse(field, format!("{path}.{field}"), value, options)?);
            } else {
                data.insert(field.clone(), value.clone());
            }
        }

        Ok(Node {
            key: key.to_string(),
            path,
            kind,
            routes,
            condition,
            control,
            data,
            children,
        })
    }
}

fn string_field(
    control: &Map<String, Value>,
    field: &str,
    control_path: &dyn Fn(&str) -> String,
) -> DefinitionResult<Option<String>> {
    match control.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(DefinitionError::InvalidField {
            path: control_path(field),
            expected: "a string",
        }),
    }
}

fn parse_routes(next: Option<&Value>, path: &str) -> DefinitionResult<Vec<Route>> {
    match next {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(key)) => Ok(vec![Route::new(key.clone())]),
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_route(entry, path, index))
            .collect(),
        Some(_) => Err(DefinitionError::InvalidField {
            path: path.to_string(),
            expected: "a node key or a list of routes",
        }),
    }
}

fn parse_route(entry: &Value, path: &str, index: usize) -> DefinitionResult<Route> {
    let malformed = || DefinitionError::MalformedRoute {
        path: path.to_string(),
        index,
    };
    match entry {
        Value::String(key) => Ok(Route::new(key.clone())),
        Value::Object(rule) => {
            let key = rule.get("key").and_then(Value::as_str).ok_or_else(malformed)?;
            let condition = match rule.get("condition") {
                None | Some(Value::Null) => None,
                Some(Value::String(name)) => Some(name.clone()),
                Some(_) => return Err(malformed()),
            };
            Ok(Route {
                key: key.to_string(),
                condition,
            })
        }
        _ => Err(malformed()),
    }
}

fn explicit_children(
    listed: &Value,
    fields: &Map<String, Value>,
    path: &str,
    control_path: &dyn Fn(&str) -> String,
) -> DefinitionResult<Vec<String>> {
    let Value::Array(keys) = listed else {
        return Err(DefinitionError::InvalidField {
            path: control_path("children"),
            expected: "a list of child keys",
        });
    };
    keys.iter()
        .map(|key| {
            let key = key.as_str().ok_or_else(|| DefinitionError::InvalidField {
                path: control_path("children"),
                expected: "a list of child keys",
            })?;
            match fields.get(key) {
                Some(Value::Object(_)) => Ok(key.to_string()),
                _ => Err(DefinitionError::UnknownChild {
                    path: path.to_string(),
                    child: key.to_string(),
                }),
            }
        })
        .collect()
}

/// The immutable, parsed graph configuration.
#[derive(Debug, Clone)]
pub struct GraphDefinition {
    sections: Vec<Node>,
    section_ordering: Vec<String>,
    control_key: String,
}

impl GraphDefinition {
    /// Parse `{ "sections": {...}, "sectionOrdering": [...] }`.
    ///
    /// A `controlKey` string in the document overrides `options.control_key`.
    pub fn from_value(value: &Value, options: &DefinitionOptions) -> DefinitionResult<Self> {
        let Value::Object(document) = value else {
            return Err(DefinitionError::InvalidField {
                path: "definition".into(),
                expected: "an object",
            });
        };

        let options = match document.get("controlKey") {
            None => options.clone(),
            Some(Value::String(key)) => options.clone().with_control_key(key.clone()),
            Some(_) => {
                return Err(DefinitionError::InvalidField {
                    path: "controlKey".into(),
                    expected: "a string",
                });
            }
        };

        let sections = document
            .get("sections")
            .ok_or(DefinitionError::MissingField("sections"))?;
        let ordering = document
            .get("sectionOrdering")
            .ok_or(DefinitionError::MissingField("sectionOrdering"))?;

        let Value::Array(ordering) = ordering else {
            return Err(DefinitionError::InvalidField {
                path: "sectionOrdering".into(),
                expected: "a list of section keys",
            });
        };
        let section_ordering = ordering
            .iter()
            .map(|key| {
                key.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| DefinitionError::InvalidField {
                        path: "sectionOrdering".into(),
                        expected: "a list of section keys",
                    })
            })
            .collect::<DefinitionResult<Vec<_>>>()?;

        Self::from_sections(sections, section_ordering, &options)
    }

    pub fn from_json_str(json: &str, options: &DefinitionOptions) -> DefinitionResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value, options)
    }

    /// Parse a bare `sections` mapping with an explicit ordering.
    pub fn from_sections(
        sections: &Value,
        section_ordering: Vec<String>,
        options: &DefinitionOptions,
    ) -> DefinitionResult<Self> {
        let Value::Object(sections) = sections else {
            return Err(DefinitionError::InvalidField {
                path: "sections".into(),
                expected: "an object",
            });
        };
        let sections = sections
            .iter()
            .map(|(key, value)| Node::parse(key, key.clone(), value, options))
            .collect::<DefinitionResult<Vec<_>>>()?;

        Ok(Self {
            sections,
            section_ordering,
            control_key: options.control_key.clone(),
        })
    }

    pub fn sections(&self) -> &[Node] {
        &self.sections
    }

    pub fn section(&self, key: &str) -> Option<&Node> {
        self.sections.iter().find(|section| section.key == key)
    }

    pub fn section_ordering(&self) -> &[String] {
        &self.section_ordering
    }

    pub fn control_key(&self) -> &str {
        &self.control_key
    }

    /// Walks `section -> child -> child ...` along the given keys.
    pub fn node<'k, I>(&self, keys: I) -> Option<&Node>
    where
        I: IntoIterator<Item = &'k str>,
    {
        let mut keys = keys.into_iter();
        let section = self.section(keys.next()?)?;
        keys.try_fold(section, |node, key| node.child(key))
    }

    /// Resolves a dotted node path such as `household.members.profile`.
    pub fn node_at(&self, dotted: &str) -> Option<&Node> {
        self.node(dotted.split('.'))
    }

    /// Reads a property of a node as it was written in the definition.
    ///
    /// The first key may name the control block, a data field, or a child node.
    pub fn property<'n>(&self, node: &'n Node, path: impl Into<PropertyPath>) -> Option<&'n Value> {
        let path = path.into();
        let (first, rest) = path.keys().split_first()?;
        if *first == self.control_key {
            return path::get_in_map(&node.control, rest);
        }
        if let Some(child) = node.child(first) {
            return self.property(child, PropertyPath::from(rest.to_vec()));
        }
        path::get_in_map(&node.data, path.keys())
    }

    /// Every node, sections included, depth first in document order.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            pending: self.sections.iter().rev().collect(),
        }
    }
}

/// Depth-first iterator over a definition's nodes.
pub struct Nodes<'d> {
    pending: Vec<&'d Node>,
}

impl<'d> Iterator for Nodes<'d> {
    type Item = &'d Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.pending.pop()?;
        self.pending.extend(node.children.iter().rev());
        Some(node)
    }
}
