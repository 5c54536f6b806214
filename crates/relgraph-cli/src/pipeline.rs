//! Diagram pipeline: parse → collect → render.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use relgraph_collect::{CollectOptions, Description, GraphCollector};
use relgraph_core::{MemoryModel, ModelLookup};
use relgraph_error::{Error, Result};
use relgraph_render::{OutputFormat, RenderOptions, render};

/// Settings shared by every diagram of one run.
#[derive(Debug, Clone, Default)]
pub struct DiagramOptions {
    pub collect: CollectOptions,
    pub render: RenderOptions,
}

/// Parse `description` and collect its nodes and edges from `model`.
pub fn collect_graph<'m>(
    description: &str,
    model: &'m dyn ModelLookup,
    options: &CollectOptions,
) -> Result<GraphCollector<'m>> {
    let parsed = Description::parse(description)?;
    relgraph_collect::collect_graph(&parsed, model, options)
}

/// Render one diagram description.
///
/// Any parse or lookup failure aborts the diagram; no partial output is
/// returned.
pub fn render_diagram(
    description: &str,
    model: &dyn ModelLookup,
    format: OutputFormat,
    options: &DiagramOptions,
) -> Result<String> {
    let collector = collect_graph(description, model, &options.collect)?;
    Ok(render(&collector, format, &options.render))
}

/// Load a JSON model document from disk.
pub fn load_model(path: &Path) -> Result<MemoryModel> {
    let start = Instant::now();
    let text = std::fs::read_to_string(path)
        .map_err(|err| Error::from(err).with_detail("path", path.display().to_string()))?;
    let model = MemoryModel::from_json_str(&text)
        .map_err(|err| err.with_detail("path", path.display().to_string()))?;
    info!(
        entities = model.entity_count(),
        instances = model.instance_count(),
        "Model loading: {:.2}s",
        start.elapsed().as_secs_f64()
    );
    Ok(model)
}
