//! Command-line interface for working with saved layout states
//!
//! Supports:
//! - Listing the layouts saved in the config directory
//! - Inspecting a layout's widgets and links
//! - Validating saved links
//! - Converting between YAML and JSON

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::config::LayoutConfig;
use crate::config_paths;

/// Inspect and convert saved flexing layouts
#[derive(Parser, Debug)]
#[command(name = "flexing", version, about = "Inspect and convert saved flexing layouts")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// List layouts saved in the config directory
    List,
    /// Show the widgets and links of a layout
    Inspect {
        /// Layout file, or the name of a saved layout
        #[arg(value_name = "LAYOUT")]
        layout: String,
    },
    /// Check saved links for conflicts
    Validate {
        #[arg(value_name = "LAYOUT")]
        layout: String,
    },
    /// Rewrite a layout file; the output extension picks the format
    Convert {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

/// A path that exists, else `<config>/layouts/<name>.yaml`
pub fn resolve_layout(layout: &str) -> Result<PathBuf> {
    let path = Path::new(layout);
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    match config_paths::layout_file(layout) {
        Some(saved) if saved.exists() => Ok(saved),
        _ => bail!("No layout file or saved layout named '{}'", layout),
    }
}

impl CliCommand {
    /// Run the command, writing its report to `out`
    pub fn run(&self, out: &mut impl Write) -> Result<()> {
        match self {
            CliCommand::List => {
                for name in config_paths::saved_layouts() {
                    writeln!(out, "{}", name)?;
                }
            }
            CliCommand::Inspect { layout } => {
                let path = resolve_layout(layout)?;
                let config = load(&path)?;
                write_summary(&config, out)?;
            }
            CliCommand::Validate { layout } => {
                let path = resolve_layout(layout)?;
                let issues = load(&path)?.validate_links();
                if !issues.is_empty() {
                    for issue in &issues {
                        writeln!(out, "{}", issue)?;
                    }
                    bail!("{}: {} link problem(s)", path.display(), issues.len());
                }
                writeln!(out, "{}: links ok", path.display())?;
            }
            CliCommand::Convert { input, output } => {
                let config = load(input)?;
                config
                    .save(output)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                writeln!(out, "{} -> {}", input.display(), output.display())?;
            }
        }
        Ok(())
    }
}

fn load(path: &Path) -> Result<LayoutConfig> {
    LayoutConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn write_summary(config: &LayoutConfig, out: &mut impl Write) -> Result<()> {
    writeln!(out, "widgets: {}", config.component_state.len())?;
    for id in config.component_state.keys() {
        writeln!(out, "  {}", id)?;
    }
    writeln!(out, "links: {}", config.links.len())?;
    for link in &config.links {
        let subscribers: Vec<&str> = link.subscribers.iter().map(|s| s.as_str()).collect();
        writeln!(
            out,
            "  {} {} -> [{}]",
            link.color,
            link.source,
            subscribers.join(", ")
        )?;
    }
    Ok(())
}
