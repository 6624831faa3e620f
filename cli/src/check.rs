//! Graph definition validation

use crate::config::{self, Config};
use anyhow::Result;
use pathway_flow::{AnalysisReport, FilterKind, FilterRegistry, GraphAnalyzer, GraphDefinition};
use std::fmt::{self, Write};
use std::path::Path;

/// Run the static checks against a definition file
pub fn run_check_command(
    definition_path: &Path,
    except: Option<&str>,
    json: bool,
    config: &Config,
) -> Result<()> {
    let definition = config::read_definition(definition_path, &config.definition)?;
    let except = except.or(config.except.as_deref());
    let report = analyze(&definition, except);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Checking graph definition at: {}", definition_path.display());
        print!("{}", render_report(&report)?);
    }

    if !report.is_clean() {
        anyhow::bail!(
            "Graph definition has {} bad reference(s) and {} unreachable node(s)",
            report.bad_references.len(),
            report.unreachable_nodes.len()
        );
    }

    if !json {
        println!();
        println!("✅ Check complete!");
    }
    Ok(())
}

/// The CLI registers no filters, so every filter name is reported.
pub fn analyze(definition: &GraphDefinition, except: Option<&str>) -> AnalysisReport {
    GraphAnalyzer::new(definition).report(except, Some(&FilterRegistry::new()))
}

pub fn render_report(report: &AnalysisReport) -> Result<String, fmt::Error> {
    let mut out = String::new();

    if report.bad_references.is_empty() {
        writeln!(out, "  ✅ No references to missing nodes")?;
    } else {
        writeln!(
            out,
            "  ❌ {} reference(s) to missing nodes:",
            report.bad_references.len()
        )?;
        for reference in &report.bad_references {
            writeln!(out, "      {} -> {}", reference.from, reference.to)?;
        }
    }

    if report.unreachable_nodes.is_empty() {
        writeln!(out, "  ✅ Every node is reachable")?;
    } else {
        writeln!(
            out,
            "  ❌ {} unreachable node(s):",
            report.unreachable_nodes.len()
        )?;
        for node in &report.unreachable_nodes {
            writeln!(out, "      {node}")?;
        }
    }

    for filter in &report.unregistered_filters {
        let kind = match filter.kind {
            FilterKind::Entry => "entry condition",
            FilterKind::Route => "route condition",
            FilterKind::Collection => "collection filter",
        };
        writeln!(
            out,
            "  ⚠️  {kind} `{}` on `{}` is not registered; treated as passing",
            filter.name, filter.node
        )?;
    }

    Ok(out)
}
