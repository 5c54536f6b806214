//! relgraph command-line interface.
//!
//! - [`pipeline`]: parse, collect and render one diagram description
//! - [`export`]: batch export of the diagrams declared in a model
//! - [`config`]: the TOML export configuration
//! - [`raster`]: Graphviz rasterizer invocation
//! - [`options`]: clap argument structs
pub mod config;
pub mod export;
pub mod options;
pub mod pipeline;
pub mod raster;

pub use config::ExportConfig;
pub use export::{DiagramSpec, ExportSummary, FailurePolicy, find_diagrams, run_export};
pub use options::{DiagramArgs, ExportArgs, RenderArgs};
pub use pipeline::{DiagramOptions, collect_graph, load_model, render_diagram};
pub use raster::Rasterizer;
