//! `pathway.toml` loading and input files
//!
//! ```toml
//! except = "_control.allowUnreachable"
//! max_steps = 500
//!
//! [definition]
//! control_key = "_control"
//! ignored_properties = ["content"]
//! ```

use anyhow::{Context, Result};
use pathway_flow::{DefinitionOptions, GraphDefinition};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "pathway.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub definition: DefinitionOptions,
    /// Escape-hatch property for `check`, e.g. `_control.allowUnreachable`.
    pub except: Option<String>,
    /// Step budget for `walk`.
    pub max_steps: Option<usize>,
}

impl Config {
    /// Reads `path`, or `pathway.toml` in the current directory when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }
}

pub fn read_definition(path: &Path, options: &DefinitionOptions) -> Result<GraphDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph definition: {}", path.display()))?;
    GraphDefinition::from_json_str(&content, options)
        .with_context(|| format!("Invalid graph definition: {}", path.display()))
}

/// Application state for navigation; an empty object when no file is given.
pub fn read_state(path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Object(Default::default()));
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse state JSON: {}", path.display()))
}
