//! Graph - The Navigation Engine
//!
//! A [`Graph`] pairs a parsed [`GraphDefinition`] with the registered
//! [`FilterRegistry`]. After construction every operation is a pure function
//! of `(state, position)`: the same inputs always produce the same position.
//!
//! # Example
//! ```rust
//! use pathway_flow::{DefinitionOptions, Graph, GraphDefinition};
//! use serde_json::json;
//!
//! let definition = GraphDefinition::from_value(
//!     &json!({
//!         "sections": {
//!             "intro": {
//!                 "_control": { "initialNode": "welcome" },
//!                 "welcome": { "_control": { "next": "done" } },
//!                 "done": {}
//!             }
//!         },
//!         "sectionOrdering": ["intro"]
//!     }),
//!     &DefinitionOptions::default(),
//! )
//! .unwrap();
//!
//! let graph = Graph::new(definition);
//! let state = json!({});
//! let start = graph.initial_position(&state);
//! assert_eq!(start.to_url(), "intro/welcome");
//! assert_eq!(graph.next_position(&state, &start).to_url(), "intro/done");
//! ```

use crate::definition::{GraphDefinition, Node};
use crate::filter::FilterRegistry;
use crate::path;
use crate::position::Position;
use crate::stack::StackEntry;
use serde_json::Value;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct Graph {
    definition: GraphDefinition,
    filters: FilterRegistry,
}

/// Result of one raw transition, before the skip rule is applied.
enum Step<'g> {
    Candidate(Position<'g>),
    /// A loop ran out of keys; continue from the loop node itself.
    LoopExhausted(Position<'g>),
    End,
}

impl Graph {
    /// A graph without registered filters; every named condition passes.
    pub fn new(definition: GraphDefinition) -> Self {
        Self {
            definition,
            filters: FilterRegistry::new(),
        }
    }

    pub fn builder(definition: GraphDefinition) -> GraphBuilder {
        GraphBuilder {
            definition,
            filters: FilterRegistry::new(),
        }
    }

    pub fn definition(&self) -> &GraphDefinition {
        &self.definition
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// The first position that should be visited for `state`.
    pub fn initial_position(&self, state: &Value) -> Position<'_> {
        let Some(first) = self.definition.section_ordering().first() else {
            return Position::empty(self);
        };
        let candidate = self.create_position(state, vec![StackEntry::new(first.as_str())]);
        self.current_or_next_valid(state, candidate)
    }

    /// Parses `section/node/activeKey/node...` into a position.
    ///
    /// A leading `/` and any `?query` or `#fragment` suffix are ignored.
    pub fn create_position_from_url(&self, state: &Value, url: &str) -> Position<'_> {
        let url = url.split(['?', '#']).next().unwrap_or_default();
        let url = url.strip_prefix('/').unwrap_or(url);
        let segments: Vec<&str> = url.split('/').collect();
        self.create_position_from_segments(state, &segments)
    }

    /// Same as [`Graph::create_position_from_url`] for pre-split segments:
    /// `[section, node, activeKey, node, activeKey, ...]`.
    pub fn create_position_from_segments<S: AsRef<str>>(
        &self,
        state: &Value,
        segments: &[S],
    ) -> Position<'_> {
        let Some((section, pairs)) = segments.split_first() else {
            return Position::empty(self);
        };
        let section: &str = section.as_ref();
        let mut stack = vec![StackEntry::new(section)];
        for pair in pairs.chunks(2) {
            let key: &str = pair[0].as_ref();
            let active: Option<&str> = pair.get(1).map(|active| active.as_ref());
            let entry = match active.filter(|active| !active.is_empty()) {
                Some(active) => StackEntry::new(key).with_active_key(active),
                None => StackEntry::new(key),
            };
            stack.push(entry);
        }
        self.create_position(state, stack)
    }

    /// Completes `stack` into a position pointing at a leaf.
    ///
    /// Descends through `initialNode` declarations and resolves collection
    /// keys at every level. An entry's existing active key is kept as-is.
    /// Returns the empty position when any addressed node does not exist.
    pub fn create_position(&self, state: &Value, mut stack: Vec<StackEntry>) -> Position<'_> {
        let Some(mut active) = self.definition.node(stack.iter().map(StackEntry::key)) else {
            debug!(stack = ?stack, "stack does not address a node");
            return Position::empty(self);
        };

        while let Some(initial) = active.initial_node() {
            let Some(child) = active.child(initial) else {
                debug!(node = active.path(), initial, "initial node is not defined");
                return Position::empty(self);
            };
            stack.push(StackEntry::new(initial));
            active = child;
        }

        let stack = self.ensure_collections(state, stack);
        Position::new(self, stack)
    }

    /// The position to visit after `current`.
    ///
    /// Follows the active node's routes, then the enclosing loop, then the
    /// next section. Candidates failing an entry condition or looping over an
    /// empty collection are skipped. Returns the empty position at the end of
    /// the graph or when a route points nowhere; the empty position maps to
    /// itself.
    pub fn next_position<'g>(&'g self, state: &Value, current: &Position<'g>) -> Position<'g> {
        if current.is_end() {
            return current.clone();
        }

        let mut current = current.clone();
        loop {
            match self.step(state, &current) {
                Step::Candidate(candidate) => {
                    if !self.should_skip(state, &candidate) {
                        return candidate;
                    }
                    current = candidate;
                }
                Step::LoopExhausted(loop_node) => current = loop_node,
                Step::End => return Position::empty(self),
            }
        }
    }

    /// Name of the node the active node routes to, if any.
    ///
    /// Routes are tried in order; the first whose condition passes wins.
    pub fn next_node_name<'g>(&'g self, state: &Value, current: &Position<'g>) -> Option<&'g str> {
        let node = current.active_node()?;
        let route = node
            .routes()
            .iter()
            .find(|route| self.filters.test(route.condition(), state, current))?;
        trace!(from = node.path(), to = route.key(), "route resolved");
        Some(route.key())
    }

    /// Walks the graph from the initial position, calling `visitor` at each
    /// position until it returns true, the graph ends, or `max_steps`
    /// positions have been visited. Returns the number of visited positions.
    ///
    /// `Some(n)` allows exactly `n` visits, so `Some(0)` visits nothing;
    /// `None` is unlimited. A pre-decrementing counter would allow one fewer
    /// and treat zero as unlimited; this budget does neither.
    pub fn visit_sequence<F>(&self, state: &Value, mut visitor: F, max_steps: Option<usize>) -> usize
    where
        F: FnMut(&Position<'_>) -> bool,
    {
        let mut visited = 0;
        let mut sequence = self.sequence(state);
        while max_steps.is_none_or(|max| visited < max) {
            let Some(position) = sequence.next() else {
                break;
            };
            visited += 1;
            if visitor(&position) {
                break;
            }
        }
        visited
    }

    /// Lazy iterator over every position visited for `state`.
    pub fn sequence<'g, 's>(&'g self, state: &'s Value) -> Sequence<'g, 's> {
        Sequence {
            graph: self,
            state,
            cursor: Cursor::Start,
        }
    }

    /// Surviving collection keys of the node at `node_path`, if it loops.
    ///
    /// `None` when the node does not loop, when its collection is absent or
    /// not a collection, and when no entry survives the collection filter.
    pub fn collection_keys<S: AsRef<str>>(&self, state: &Value, node_path: &[S]) -> Option<Vec<String>> {
        let node = self.definition.node(node_path.iter().map(|key| key.as_ref()))?;
        self.resolve_collection(state, node)
            .filter(|keys| !keys.is_empty())
    }

    fn resolve_collection(&self, state: &Value, node: &Node) -> Option<Vec<String>> {
        let spec = node.collection()?;
        let collection = path::get(state, &spec.collection_path)?;
        let entries = path::entries(collection)?;
        let filter = spec.collection_filter.as_deref();
        Some(
            entries
                .into_iter()
                .filter(|(_, entry)| self.filters.accept(filter, state, entry))
                .map(|(key, _)| key)
                .collect(),
        )
    }

    fn ensure_collections(&self, state: &Value, stack: Vec<StackEntry>) -> Vec<StackEntry> {
        let mut parent: Option<&Node> = None;
        let mut resolved = Vec::with_capacity(stack.len());
        for entry in stack {
            let node = match parent {
                None => self.definition.section(entry.key()),
                Some(parent) => parent.child(entry.key()),
            };
            let entry = match node.and_then(|node| self.resolve_collection(state, node)) {
                Some(keys) => {
                    let active = entry
                        .active_key()
                        .map(str::to_owned)
                        .or_else(|| keys.first().cloned());
                    let updated = StackEntry::new(entry.key()).with_collection_keys(keys);
                    match active {
                        Some(active) => updated.with_active_key(active),
                        None => updated,
                    }
                }
                None => entry,
            };
            resolved.push(entry);
            parent = node;
        }
        resolved
    }

    fn should_skip(&self, state: &Value, candidate: &Position<'_>) -> bool {
        if let Some(node) = candidate
            .all_nodes()
            .into_iter()
            .find(|node| !self.filters.test(node.condition(), state, candidate))
        {
            debug!(url = %candidate, node = node.path(), "entry condition failed, skipping");
            return true;
        }
        if let Some(entry) = candidate.stack().iter().find(|entry| entry.has_empty_collection()) {
            debug!(url = %candidate, node = entry.key(), "collection is empty, skipping");
            return true;
        }
        false
    }

    fn current_or_next_valid<'g>(&'g self, state: &Value, candidate: Position<'g>) -> Position<'g> {
        if self.should_skip(state, &candidate) {
            self.next_position(state, &candidate)
        } else {
            candidate
        }
    }

    fn step<'g>(&'g self, state: &Value, current: &Position<'g>) -> Step<'g> {
        let entries = current.stack();
        let mut stack = entries[..entries.len() - 1].to_vec();

        if let Some(next) = self.next_node_name(state, current) {
            stack.push(StackEntry::new(next));
            return Step::Candidate(self.create_position(state, stack));
        }

        if let Some(top) = stack.last_mut().filter(|top| top.is_looping()) {
            return match top.following_key().map(str::to_owned) {
                Some(following) => {
                    debug!(node = top.key(), key = %following, "advancing loop");
                    *top = top.clone().with_active_key(following);
                    Step::Candidate(self.create_position(state, stack))
                }
                None => {
                    debug!(node = top.key(), "loop exhausted");
                    Step::LoopExhausted(Position::new(self, stack))
                }
            };
        }

        let ordering = self.definition.section_ordering();
        let next_section = current
            .section_key()
            .and_then(|key| ordering.iter().position(|section| section == key))
            .map_or(0, |index| index + 1);
        match ordering.get(next_section) {
            Some(section) => {
                debug!(from = ?current.section_key(), to = %section, "entering next section");
                Step::Candidate(self.create_position(state, vec![StackEntry::new(section.as_str())]))
            }
            None => Step::End,
        }
    }
}

/// Builds a [`Graph`] with named filters.
#[derive(Debug)]
pub struct GraphBuilder {
    definition: GraphDefinition,
    filters: FilterRegistry,
}

impl GraphBuilder {
    /// Registers an entry/route condition.
    pub fn filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&Value, &Position<'_>) -> bool + Send + Sync + 'static,
    {
        self.filters.insert_filter(name, filter);
        self
    }

    /// Registers a predicate deciding which collection entries a loop visits.
    pub fn collection_filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.filters.insert_collection_filter(name, filter);
        self
    }

    pub fn filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = filters;
        self
    }

    pub fn build(self) -> Graph {
        Graph {
            definition: self.definition,
            filters: self.filters,
        }
    }
}

enum Cursor<'g> {
    Start,
    After(Position<'g>),
    Done,
}

/// Positions visited for one state, produced on demand.
///
/// Calling [`Graph::sequence`] again restarts from the initial position.
pub struct Sequence<'g, 's> {
    graph: &'g Graph,
    state: &'s Value,
    cursor: Cursor<'g>,
}

impl<'g> Iterator for Sequence<'g, '_> {
    type Item = Position<'g>;

    fn next(&mut self) -> Option<Self::Item> {
        let position = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Start => self.graph.initial_position(self.state),
            Cursor::After(previous) => self.graph.next_position(self.state, &previous),
            Cursor::Done => return None,
        };
        if position.is_end() {
            return None;
        }
        self.cursor = Cursor::After(position.clone());
        Some(position)
    }
}
