//! GraphAnalyzer - Static Checks for Definitions
//!
//! Meant for unit tests and CI: assert that a definition has no references to
//! missing nodes and no content that can never be reached. Navigation itself
//! never runs these checks.

use crate::definition::{GraphDefinition, Node, NodeKind};
use crate::filter::FilterRegistry;
use crate::path;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Pseudo-node naming the `sectionOrdering` list as an edge source.
pub const SECTION_ORDERING: &str = "sectionOrdering";

/// A declared edge between two fully qualified node paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub from: String,
    pub to: String,
}

impl Reference {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// `condition` gating entry into a node.
    Entry,
    /// `condition` of a `next` route.
    Route,
    /// `collectionFilter` of a loop.
    Collection,
}

/// A filter name used by a node but missing from a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReference {
    pub node: String,
    pub name: String,
    pub kind: FilterKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub bad_references: Vec<Reference>,
    pub unreachable_nodes: Vec<String>,
    /// Informational: these names behave as always-true at runtime.
    pub unregistered_filters: Vec<FilterReference>,
}

impl AnalysisReport {
    /// No bad references and no unreachable nodes.
    pub fn is_clean(&self) -> bool {
        self.bad_references.is_empty() && self.unreachable_nodes.is_empty()
    }
}

pub struct GraphAnalyzer<'d> {
    definition: &'d GraphDefinition,
}

impl<'d> GraphAnalyzer<'d> {
    pub fn new(definition: &'d GraphDefinition) -> Self {
        Self { definition }
    }

    /// Every declared edge: section ordering, initial nodes and `next` routes.
    ///
    /// Route targets are siblings of the routing node; a section routes to
    /// other sections.
    pub fn list_references(&self) -> Vec<Reference> {
        let mut references: Vec<Reference> = self
            .definition
            .section_ordering()
            .iter()
            .map(|section| Reference::new(SECTION_ORDERING, section.as_str()))
            .collect();

        for node in self.definition.nodes() {
            if let Some(initial) = node.initial_node() {
                references.push(Reference::new(node.path(), format!("{}.{initial}", node.path())));
            }
            let parent = parent_path(node.path());
            for route in node.routes() {
                let to = match parent {
                    Some(parent) => format!("{parent}.{}", route.key()),
                    None => route.key().to_string(),
                };
                references.push(Reference::new(node.path(), to));
            }
        }
        references
    }

    /// Edges whose target path does not resolve to a defined node.
    pub fn list_bad_references(&self) -> Vec<Reference> {
        self.list_references()
            .into_iter()
            .filter(|reference| self.definition.node_at(&reference.to).is_none())
            .collect()
    }

    /// Defined nodes nothing links to.
    ///
    /// Nodes carrying a truthy value at `except_nodes_with_property` (for
    /// example `_control.allowUnreachable`) are allowed to be unreachable.
    pub fn list_unreachable_nodes(&self, except_nodes_with_property: Option<&str>) -> Vec<String> {
        let referenced: HashSet<String> = self
            .list_references()
            .into_iter()
            .map(|reference| reference.to)
            .collect();

        self.definition
            .nodes()
            .filter(|node| !referenced.contains(node.path()))
            .filter(|node| !self.is_exempt(node, except_nodes_with_property))
            .map(|node| node.path().to_string())
            .collect()
    }

    /// Filter names the definition uses that `registry` does not provide.
    pub fn list_unregistered_filters(&self, registry: &FilterRegistry) -> Vec<FilterReference> {
        let mut missing = Vec::new();
        for node in self.definition.nodes() {
            let mut record = |name: &str, kind: FilterKind| {
                missing.push(FilterReference {
                    node: node.path().to_string(),
                    name: name.to_string(),
                    kind,
                });
            };
            if let Some(name) = node.condition().filter(|name| !registry.has_filter(name)) {
                record(name, FilterKind::Entry);
            }
            for name in node.routes().iter().filter_map(|route| route.condition()) {
                if !registry.has_filter(name) {
                    record(name, FilterKind::Route);
                }
            }
            if let NodeKind::Loop(spec) = node.kind() {
                if let Some(name) = spec
                    .collection_filter
                    .as_deref()
                    .filter(|name| !registry.has_collection_filter(name))
                {
                    record(name, FilterKind::Collection);
                }
            }
        }
        missing
    }

    pub fn report(
        &self,
        except_nodes_with_property: Option<&str>,
        registry: Option<&FilterRegistry>,
    ) -> AnalysisReport {
        AnalysisReport {
            bad_references: self.list_bad_references(),
            unreachable_nodes: self.list_unreachable_nodes(except_nodes_with_property),
            unregistered_filters: registry
                .map(|registry| self.list_unregistered_filters(registry))
                .unwrap_or_default(),
        }
    }

    fn is_exempt(&self, node: &Node, property: Option<&str>) -> bool {
        property
            .and_then(|property| self.definition.property(node, property))
            .is_some_and(path::is_truthy)
    }
}

fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(parent, _)| parent)
}
