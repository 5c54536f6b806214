//! Graphviz rasterizer invocation.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use relgraph_error::{Error, Result};

pub const DEFAULT_LAYOUT_PROGRAM: &str = "dot";

/// Graph attributes passed to every layout run.
pub const LAYOUT_ARGS: [&str; 5] = [
    "-Goverlap=scale",
    "-Gdefaultdist=0.1",
    "-Gsplines=true",
    "-Gsep=.1",
    "-Gepsilon=.0000001",
];

/// Runs the layout program on written DOT files.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    program: String,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(DEFAULT_LAYOUT_PROGRAM)
    }
}

impl Rasterizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `dot -T<type> <layout args> -o <output> <input>`
    pub fn command(&self, input: &Path, output: &Path, file_type: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg(format!("-T{file_type}"))
            .args(LAYOUT_ARGS)
            .arg("-o")
            .arg(output)
            .arg(input);
        command
    }

    /// Rasterize `input` into `output`. Blocks until the program exits.
    pub fn run(&self, input: &Path, output: &Path, file_type: &str) -> Result<()> {
        let result = self.command(input, output, file_type).output();
        let output_text = output.display().to_string();
        let out = result.map_err(|err| {
            Error::external_tool_failed(&self.program, err.to_string())
                .with_operation("raster::run")
                .with_detail("output", output_text.clone())
                .set_source(err)
        })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(Error::external_tool_failed(
                &self.program,
                format!("{} ({})", out.status, stderr.trim()),
            )
            .with_operation("raster::run")
            .with_detail("output", output_text));
        }

        debug!(program = %self.program, output = %output_text, "rasterized");
        Ok(())
    }
}
