//! Pathway CLI - Command-line interface for Pathway wizard graphs
//!
//! # Commands
//! - `pathway check <graph.json>` - Find bad references and unreachable nodes
//! - `pathway walk <graph.json>` - Print every position visited for a state
//! - `pathway locate <graph.json> <url>` - Complete a url to the page it addresses
//! - `pathway next <graph.json> <url>` - Print the position after a url
//!
//! The CLI registers no filters: every named condition passes.

mod check;
mod config;
mod walk;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Pathway graph CLI
#[derive(Parser)]
#[command(name = "pathway")]
#[command(author, version, about = "Command-line interface for Pathway wizard graphs")]
struct Cli {
    /// Config file (default: ./pathway.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging for the navigation engine
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a graph definition
    Check {
        /// Graph definition JSON file
        definition: PathBuf,

        /// Property path that allows a node to be unreachable
        #[arg(short, long)]
        except: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the url of every position visited for a state
    Walk {
        /// Graph definition JSON file
        definition: PathBuf,

        /// Application state JSON file (default: empty object)
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Stop after this many positions
        #[arg(short, long)]
        max_steps: Option<usize>,
    },

    /// Resolve a url to the position it addresses
    Locate {
        /// Graph definition JSON file
        definition: PathBuf,

        /// Position url, e.g. `household/members/a/profile`
        url: String,

        /// Application state JSON file (default: empty object)
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Print the position as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the url of the position after a url
    Next {
        /// Graph definition JSON file
        definition: PathBuf,

        /// Current position url
        url: String,

        /// Application state JSON file (default: empty object)
        #[arg(short, long)]
        state: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,pathway_flow=debug,pathway_cli=debug"
    } else {
        "warn,pathway_flow=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Check {
            definition,
            except,
            json,
        } => check::run_check_command(&definition, except.as_deref(), json, &config),
        Commands::Walk {
            definition,
            state,
            max_steps,
        } => walk::run_walk_command(&definition, state.as_deref(), max_steps, &config),
        Commands::Locate {
            definition,
            url,
            state,
            json,
        } => walk::run_locate_command(&definition, &url, state.as_deref(), json, &config),
        Commands::Next {
            definition,
            url,
            state,
        } => walk::run_next_command(&definition, &url, state.as_deref(), &config),
    }
}
