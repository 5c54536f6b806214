use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use relgraph_cli::{
    ExportArgs, ExportConfig, FailurePolicy, RenderArgs, load_model, render_diagram, run_export,
};

#[derive(Parser, Debug)]
#[command(
    name = "relgraph",
    about = "relgraph: relationship diagrams from a model and a short description",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one diagram description to DOT or PlantUML
    Render(RenderArgs),
    /// Export every graph::Graph diagram declared in the model
    Export(ExportArgs),
}

fn render(args: RenderArgs) -> Result<()> {
    let model = load_model(&args.model)?;
    let description = std::fs::read_to_string(&args.description)
        .with_context(|| format!("reading description {}", args.description.display()))?;

    let mut config = ExportConfig::default();
    args.diagram.apply(&mut config);
    let output = render_diagram(&description, &model, args.format, &config.diagram_options())?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &output)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "output written");
    } else {
        print!("{output}");
    }
    Ok(())
}

fn export(args: ExportArgs) -> Result<()> {
    let model = load_model(&args.model)?;
    let mut config = match &args.config {
        Some(path) => ExportConfig::load(path)?,
        None => ExportConfig::default(),
    };
    args.apply(&mut config);

    let policy = if args.keep_going {
        FailurePolicy::KeepGoing
    } else {
        FailurePolicy::Abort
    };
    let summary = run_export(&model, &config, policy)?;

    for skipped in &summary.skipped {
        eprintln!("skipped {}: {}", skipped.name, skipped.error);
    }
    eprintln!(
        "exported {} diagram(s), {} file(s) written, {} skipped",
        summary.exported.len(),
        summary.written.len(),
        summary.skipped.len()
    );
    if !summary.skipped.is_empty() {
        bail!("{} diagram(s) failed", summary.skipped.len());
    }
    Ok(())
}

pub fn run(args: Cli) -> Result<()> {
    let total_start = Instant::now();

    // Initialize tracing subscriber for logging
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match args.command {
        Command::Render(render_args) => render(render_args),
        Command::Export(export_args) => export(export_args),
    };

    let total_secs = total_start.elapsed().as_secs_f64();
    tracing::info!(total_secs, "complete");
    result
}

pub fn main() -> Result<()> {
    let args = Cli::parse();
    run(args)
}
