//! Navigation commands: `walk`, `locate` and `next`

use crate::config::{self, Config};
use anyhow::Result;
use pathway_flow::{Graph, Position};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Where a url lands after completion against the definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Located {
    pub url: String,
    pub node: Option<String>,
    pub collection_keys: Vec<String>,
}

impl Located {
    fn from_position(position: &Position<'_>) -> Self {
        Self {
            url: position.to_url(),
            node: position.active_node().map(|node| node.path().to_string()),
            collection_keys: position
                .all_collection_keys()
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

fn load(definition_path: &Path, state_path: Option<&Path>, config: &Config) -> Result<(Graph, Value)> {
    let definition = config::read_definition(definition_path, &config.definition)?;
    let state = config::read_state(state_path)?;
    Ok((Graph::new(definition), state))
}

/// Urls of every position visited from the start of the graph.
pub fn walk_urls(graph: &Graph, state: &Value, max_steps: Option<usize>) -> Vec<String> {
    let mut urls = Vec::new();
    graph.visit_sequence(
        state,
        |position| {
            urls.push(position.to_url());
            false
        },
        max_steps,
    );
    urls
}

pub fn locate(graph: &Graph, state: &Value, url: &str) -> Located {
    Located::from_position(&graph.create_position_from_url(state, url))
}

/// Url of the position after `url`; `None` at the end of the graph.
pub fn next_url(graph: &Graph, state: &Value, url: &str) -> Option<String> {
    let current = graph.create_position_from_url(state, url);
    let next = graph.next_position(state, &current);
    (!next.is_end()).then(|| next.to_url())
}

pub fn run_walk_command(
    definition_path: &Path,
    state_path: Option<&Path>,
    max_steps: Option<usize>,
    config: &Config,
) -> Result<()> {
    let (graph, state) = load(definition_path, state_path, config)?;
    let max_steps = max_steps.or(config.max_steps);
    let urls = walk_urls(&graph, &state, max_steps);
    for url in &urls {
        println!("{url}");
    }
    if max_steps.is_some_and(|max| urls.len() >= max) {
        info!(max_steps = ?max_steps, "walk stopped at step budget");
    }
    Ok(())
}

pub fn run_locate_command(
    definition_path: &Path,
    url: &str,
    state_path: Option<&Path>,
    json: bool,
    config: &Config,
) -> Result<()> {
    let (graph, state) = load(definition_path, state_path, config)?;
    let located = locate(&graph, &state, url);

    if json {
        println!("{}", serde_json::to_string_pretty(&located)?);
        return Ok(());
    }
    if located.node.is_none() {
        anyhow::bail!("`{url}` does not address a node");
    }
    println!("{}", located.url);
    if !located.collection_keys.is_empty() {
        println!("collection keys: {}", located.collection_keys.join(", "));
    }
    Ok(())
}

pub fn run_next_command(
    definition_path: &Path,
    url: &str,
    state_path: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let (graph, state) = load(definition_path, state_path, config)?;
    match next_url(&graph, &state, url) {
        Some(next) => println!("{next}"),
        None => {
            println!();
            eprintln!("(end of graph)");
        }
    }
    Ok(())
}
