//! Position - Where the User Is
//!
//! A position is a stack of [`StackEntry`] values addressing a path of nested
//! nodes, e.g.:
//!
//! ```text
//! [household]                                   section
//! [household, members(one), profile]            loop iteration "one", body page
//! ```
//!
//! It corresponds to a url of the form `section/node/loopKey/node`, see
//! [`Position::to_url`]. The empty position (no entries) is the terminal
//! sentinel returned at the end of the graph or for an unroutable input.

use crate::definition::Node;
use crate::graph::Graph;
use crate::stack::StackEntry;
use std::fmt;

#[derive(Clone)]
pub struct Position<'g> {
    stack: Vec<StackEntry>,
    graph: &'g Graph,
}

impl<'g> Position<'g> {
    pub(crate) fn new(graph: &'g Graph, stack: Vec<StackEntry>) -> Self {
        Self { stack, graph }
    }

    /// The terminal position of `graph`.
    pub fn empty(graph: &'g Graph) -> Self {
        Self::new(graph, Vec::new())
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn stack(&self) -> &[StackEntry] {
        &self.stack
    }

    pub fn into_stack(self) -> Vec<StackEntry> {
        self.stack
    }

    pub fn is_end(&self) -> bool {
        self.stack.is_empty()
    }

    /// The innermost node; the page to render.
    pub fn active_node(&self) -> Option<&'g Node> {
        self.graph
            .definition()
            .node(self.stack.iter().map(StackEntry::key))
    }

    /// Every node below the section root, outermost first, ending at the leaf.
    pub fn all_nodes(&self) -> Vec<&'g Node> {
        let Some((section, rest)) = self.stack.split_first() else {
            return Vec::new();
        };
        let mut current = self.graph.definition().section(section.key());
        rest.iter()
            .map_while(|entry| {
                current = current?.child(entry.key());
                current
            })
            .collect()
    }

    /// Active loop keys below the section, outermost first.
    pub fn all_collection_keys(&self) -> Vec<&str> {
        self.stack
            .iter()
            .skip(1)
            .filter_map(StackEntry::active_key)
            .collect()
    }

    pub fn active_collection_key(&self) -> Option<&str> {
        self.stack
            .iter()
            .skip(1)
            .rev()
            .find_map(StackEntry::active_key)
    }

    pub fn section_key(&self) -> Option<&str> {
        self.stack.first().map(StackEntry::key)
    }

    /// Serializes the position as `section/node/activeKey/node...`.
    ///
    /// Every entry below the section is followed by its active key. An
    /// intermediate entry without one writes an empty segment so the
    /// `node/key` pairs stay aligned; the last entry omits it.
    pub fn to_url(&self) -> String {
        let last = self.stack.len().saturating_sub(1);
        let mut segments: Vec<&str> = Vec::with_capacity(self.stack.len() * 2);
        for (depth, entry) in self.stack.iter().enumerate() {
            segments.push(entry.key());
            if depth == 0 {
                continue;
            }
            match entry.active_key() {
                Some(active) => segments.push(active),
                None if depth < last => segments.push(""),
                None => {}
            }
        }
        segments.join("/")
    }
}

impl PartialEq for Position<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.stack == other.stack
    }
}

impl Eq for Position<'_> {}

impl fmt::Debug for Position<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Position<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}
