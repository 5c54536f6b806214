//! Command-line options for the `relgraph` subcommands.

use std::path::PathBuf;

use clap::Args;

use relgraph_render::OutputFormat;

use crate::config::ExportConfig;

/// Options shared by every command that renders diagrams.
#[derive(Args, Debug, Clone, Default)]
pub struct DiagramArgs {
    /// Edge style for inheritance edges in DOT output (e.g. "dir=forward,weight=2")
    #[arg(long = "parent-edge-style", value_name = "STYLE")]
    pub parent_edge_style: Option<String>,

    /// Entity whose inheritance edges are never drawn
    #[arg(long = "root-type", value_name = "TYPE")]
    pub root_type: Option<String>,
}

/// `relgraph render`: one description, one diagram.
#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// JSON model document
    #[arg(short = 'm', long = "model", value_name = "FILE")]
    pub model: PathBuf,

    /// Diagram description file
    #[arg(short = 'd', long = "description", value_name = "FILE")]
    pub description: PathBuf,

    /// Output format: 'dot' or 'plantuml' (or 'puml')
    #[arg(long, value_name = "FORMAT", default_value = "dot", value_parser = parse_format)]
    pub format: OutputFormat,

    /// Output file path (writes to file instead of stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub diagram: DiagramArgs,
}

/// `relgraph export`: every `graph::Graph` instance of a model.
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// JSON model document
    #[arg(short = 'm', long = "model", value_name = "FILE")]
    pub model: PathBuf,

    /// TOML file with a [graph] table
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output directory (overrides the config file)
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Skip failing diagrams instead of aborting
    #[arg(long = "keep-going")]
    pub keep_going: bool,

    #[command(flatten)]
    pub diagram: DiagramArgs,
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    OutputFormat::parse(value).map_err(|err| err.message().to_string())
}

impl DiagramArgs {
    /// Apply flag overrides on top of `config`.
    pub fn apply(&self, config: &mut ExportConfig) {
        if let Some(style) = &self.parent_edge_style {
            config.parent_edge_style = style.clone();
        }
        if let Some(root) = &self.root_type {
            config.root_type = root.clone();
        }
    }
}

impl ExportArgs {
    /// Apply flag overrides on top of `config`.
    pub fn apply(&self, config: &mut ExportConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = Some(dir.clone());
        }
        self.diagram.apply(config);
    }
}
