//! Diagram rendering for collected graphs.
//!
//! Both renderers are pure functions of the collector: rendering the same
//! collector twice yields byte-identical text.
//!
//! # Module Structure
//!
//! - [`dot`]: Graphviz DOT output and the [`DotBuilder`] helper
//! - [`plantuml`]: PlantUML class diagram output

pub mod dot;
pub mod plantuml;

use std::str::FromStr;

use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::debug;

use relgraph_collect::GraphCollector;
use relgraph_error::{Error, Result};

pub use dot::{DotBuilder, render_dot};
pub use plantuml::render_plantuml;

/// Edge style used for inheritance edges in DOT output.
pub const DEFAULT_PARENT_EDGE_STYLE: &str = "dir=forward";

/// Output text format.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    Dot,
    #[strum(to_string = "plantuml", serialize = "puml")]
    PlantUml,
}

impl OutputFormat {
    /// File extension of rendered output.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Dot => "dot",
            OutputFormat::PlantUml => "puml",
        }
    }

    /// Parse a format name, reporting unknown names as configuration errors.
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_str(name.trim()).map_err(|_| {
            Error::config_invalid(format!("unknown output format '{name}'"))
                .with_detail("format", name)
        })
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Raw DOT attribute list appended to parent edges; empty for none.
    pub parent_edge_style: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            parent_edge_style: DEFAULT_PARENT_EDGE_STYLE.to_string(),
        }
    }
}

/// Render `collector` in `format`.
pub fn render(collector: &GraphCollector<'_>, format: OutputFormat, options: &RenderOptions) -> String {
    debug!(
        %format,
        nodes = collector.node_count(),
        relations = collector.relation_count(),
        "rendering"
    );
    match format {
        OutputFormat::Dot => render_dot(collector, options),
        OutputFormat::PlantUml => render_plantuml(collector),
    }
}
