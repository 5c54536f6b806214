//! Batch export of every `graph::Graph` instance in a model.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};

use relgraph_core::{GRAPH_ENTITY, InstanceId, ModelLookup, QualifiedName, Value};
use relgraph_error::{Error, Result};
use relgraph_render::OutputFormat;

use crate::config::ExportConfig;
use crate::pipeline::{DiagramOptions, render_diagram};
use crate::raster::Rasterizer;

/// What to do when one diagram fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failing diagram.
    #[default]
    Abort,
    /// Log the failure and continue with the next diagram.
    KeepGoing,
}

/// A diagram declared in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSpec {
    pub name: String,
    pub config: String,
}

/// A diagram left out of the export.
#[derive(Debug)]
pub struct SkippedDiagram {
    pub name: String,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct ExportSummary {
    pub exported: Vec<String>,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedDiagram>,
}

/// Every diagram instance in declaration order.
///
/// An instance whose `name` or `config` cannot be read comes back as a
/// skipped diagram, named by its `name` if that much is readable and by the
/// instance id otherwise.
pub fn find_diagrams(
    model: &dyn ModelLookup,
) -> Result<Vec<std::result::Result<DiagramSpec, SkippedDiagram>>> {
    let instances = model.resolve_instances(&QualifiedName::parse(GRAPH_ENTITY))?;
    Ok(instances
        .into_iter()
        .map(|id| {
            let name = string_attribute(model, id, "name");
            let config = string_attribute(model, id, "config");
            match (name, config) {
                (Ok(name), Ok(config)) => Ok(DiagramSpec { name, config }),
                (Ok(name), Err(error)) => Err(SkippedDiagram { name, error }),
                (Err(error), _) => Err(SkippedDiagram {
                    name: model.instance_repr(id),
                    error,
                }),
            }
        })
        .collect())
}

fn string_attribute(model: &dyn ModelLookup, id: InstanceId, name: &str) -> Result<String> {
    match model.attribute(id, name)? {
        Value::Str(value) => Ok(value),
        _ => Err(Error::type_mismatch(format!(
            "diagram attribute '{name}' must be a string"
        ))
        .with_operation("export::find_diagrams")
        .with_detail("instance", model.instance_repr(id))),
    }
}

/// Diagram names become file stems.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Error::config_invalid(format!("invalid diagram name '{name}'"))
            .with_operation("export::validate_name"));
    }
    Ok(())
}

/// Render every diagram, write the text files and rasterize DOT output.
///
/// Diagrams render in parallel; files are written in declaration order.
pub fn run_export(
    model: &(dyn ModelLookup + Sync),
    config: &ExportConfig,
    policy: FailurePolicy,
) -> Result<ExportSummary> {
    let mut summary = ExportSummary::default();
    let Some(output_dir) = config.output_dir.as_deref() else {
        info!("no output-dir configured, export skipped");
        return Ok(summary);
    };

    let start = Instant::now();
    let formats = config.output_formats()?;
    let types = config.raster_types()?;
    let options = config.diagram_options();
    let rasterizer = Rasterizer::new(config.layout_program.clone());
    let diagrams = find_diagrams(model)?;
    fs::create_dir_all(output_dir)
        .map_err(|err| Error::from(err).with_detail("path", output_dir.display().to_string()))?;

    let rendered: Vec<(String, Result<Vec<(OutputFormat, String)>>)> = diagrams
        .into_par_iter()
        .map(|entry| match entry {
            Ok(diagram) => {
                let outputs = render_formats(&diagram, model, &formats, &options);
                (diagram.name, outputs)
            }
            Err(skipped) => (skipped.name, Err(skipped.error)),
        })
        .collect();

    for (name, outputs) in rendered {
        let outcome = outputs
            .and_then(|outputs| write_outputs(&name, &outputs, output_dir, types, &rasterizer));
        match outcome {
            Ok(paths) => {
                info!(diagram = %name, files = paths.len(), "diagram exported");
                summary.exported.push(name);
                summary.written.extend(paths);
            }
            Err(err) => {
                let err = err.in_diagram(name.clone());
                match policy {
                    FailurePolicy::Abort => return Err(err),
                    FailurePolicy::KeepGoing => {
                        warn!(diagram = %name, error = %err, "diagram skipped");
                        summary.skipped.push(SkippedDiagram { name, error: err });
                    }
                }
            }
        }
    }

    info!(
        exported = summary.exported.len(),
        skipped = summary.skipped.len(),
        "Export: {:.2}s",
        start.elapsed().as_secs_f64()
    );
    Ok(summary)
}

fn render_formats(
    diagram: &DiagramSpec,
    model: &dyn ModelLookup,
    formats: &[OutputFormat],
    options: &DiagramOptions,
) -> Result<Vec<(OutputFormat, String)>> {
    validate_name(&diagram.name)?;
    formats
        .iter()
        .map(|&format| Ok((format, render_diagram(&diagram.config, model, format, options)?)))
        .collect()
}

fn write_outputs(
    name: &str,
    outputs: &[(OutputFormat, String)],
    output_dir: &Path,
    types: &[String],
    rasterizer: &Rasterizer,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (format, text) in outputs {
        let path = output_dir.join(format!("{name}.{}", format.extension()));
        fs::write(&path, text)
            .map_err(|err| Error::from(err).with_detail("path", path.display().to_string()))?;
        written.push(path.clone());

        // only DOT output is rasterized
        if *format != OutputFormat::Dot {
            continue;
        }
        for file_type in types {
            let image = output_dir.join(format!("{name}.{file_type}"));
            rasterize_with_retry(rasterizer, &path, &image, file_type)?;
            written.push(image);
        }
    }
    Ok(written)
}

/// Run the rasterizer, retrying a temporary failure once.
fn rasterize_with_retry(
    rasterizer: &Rasterizer,
    input: &Path,
    output: &Path,
    file_type: &str,
) -> Result<()> {
    match rasterizer.run(input, output, file_type) {
        Err(err) if err.is_retryable() => {
            warn!(
                program = rasterizer.program(),
                output = %output.display(),
                error = %err,
                "rasterizer failed, retrying"
            );
            rasterizer.run(input, output, file_type).map_err(Error::persist)
        }
        other => other,
    }
}
