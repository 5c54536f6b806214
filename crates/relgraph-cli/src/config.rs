//! Export configuration, read from the `[graph]` table of a TOML file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use relgraph_collect::CollectOptions;
use relgraph_core::ROOT_ENTITY;
use relgraph_error::{Error, Result};
use relgraph_render::{DEFAULT_PARENT_EDGE_STYLE, OutputFormat, RenderOptions};

use crate::pipeline::DiagramOptions;
use crate::raster::DEFAULT_LAYOUT_PROGRAM;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    graph: ExportConfig,
}

/// Settings of one export run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ExportConfig {
    /// Target directory; without it the export does nothing.
    pub output_dir: Option<PathBuf>,
    /// Rasterizer output types, e.g. `png` or `svg`.
    #[serde(deserialize_with = "string_list")]
    pub types: Vec<String>,
    /// Text formats to write.
    pub formats: Vec<String>,
    pub parent_edge_style: String,
    pub root_type: String,
    pub layout_program: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            types: Vec::new(),
            formats: vec![OutputFormat::Dot.to_string()],
            parent_edge_style: DEFAULT_PARENT_EDGE_STYLE.to_string(),
            root_type: ROOT_ENTITY.to_string(),
            layout_program: DEFAULT_LAYOUT_PROGRAM.to_string(),
        }
    }
}

impl ExportConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text).map_err(|err| {
            Error::config_invalid(err.message().to_string())
                .with_operation("config::parse")
                .set_source(err)
        })?;
        Ok(file.graph)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| Error::from(err).with_detail("path", path.display().to_string()))?;
        Self::from_toml_str(&text).map_err(|err| err.with_detail("path", path.display().to_string()))
    }

    /// Configured formats, validated.
    pub fn output_formats(&self) -> Result<Vec<OutputFormat>> {
        let mut formats = Vec::with_capacity(self.formats.len());
        for name in &self.formats {
            let format = OutputFormat::parse(name)?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        Ok(formats)
    }

    /// Rasterizer types, validated for use as file extensions.
    pub fn raster_types(&self) -> Result<&[String]> {
        if let Some(bad) = self
            .types
            .iter()
            .find(|t| t.is_empty() || t.contains(['/', '\\']) || t.starts_with('.'))
        {
            return Err(
                Error::config_invalid(format!("invalid rasterizer type '{bad}'"))
                    .with_operation("config::raster_types"),
            );
        }
        Ok(&self.types)
    }

    pub fn diagram_options(&self) -> DiagramOptions {
        DiagramOptions {
            collect: CollectOptions {
                root_entity: self.root_type.clone(),
            },
            render: RenderOptions {
                parent_edge_style: self.parent_edge_style.clone(),
            },
        }
    }
}

/// Accept either a TOML array or a comma-separated string.
fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringList {
        List(Vec<String>),
        Joined(String),
    }

    let items = match StringList::deserialize(deserializer)? {
        StringList::List(items) => items,
        StringList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}
