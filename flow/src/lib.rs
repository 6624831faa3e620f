//! Pathway Flow - Declarative Wizard Navigation
//!
//! This crate defines the **navigation** aspects of Pathway:
//! - `GraphDefinition`: Sections and nodes parsed from a nested mapping
//! - `Graph`: Position creation and "what comes next" traversal
//! - `Position`: A stack of node keys and loop keys, serializable as a url
//! - `GraphAnalyzer`: Static checks for bad references and unreachable nodes
//!
//! Caller state is an arbitrary `serde_json::Value`; the engine only reads it.
//!
//! **IMPORTANT**: This layer is Pure Rust - no HTTP, no IO, no Async.

pub mod analyzer;
pub mod definition;
pub mod filter;
pub mod graph;
pub mod path;
pub mod position;
pub mod stack;

pub use analyzer::{AnalysisReport, FilterKind, FilterReference, GraphAnalyzer, Reference};
pub use definition::{
    DefinitionError, DefinitionOptions, DefinitionResult, GraphDefinition, LoopSpec, Node,
    NodeKind, Route,
};
pub use filter::{CollectionFilter, Filter, FilterRegistry};
pub use graph::{Graph, GraphBuilder, Sequence};
pub use path::PropertyPath;
pub use position::Position;
pub use stack::StackEntry;
