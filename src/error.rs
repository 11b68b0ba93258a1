//! Error type for a batch run

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::format::FormatError;
use crate::raster::RasterError;
use crate::report::ReportError;
use crate::svg::{MutateError, TreeError};

/// Errors that abort a batch run
///
/// A rasterizer that exits unsuccessfully is not one of these; see
/// [`crate::raster::RasterOutcome`].
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to load template: {0}")]
    Template(#[from] TreeError),

    #[error(transparent)]
    Mutate(#[from] MutateError),

    #[error("bad label template: {0}")]
    Label(#[from] FormatError),

    #[error("attribute '{0}' is not defined")]
    UnknownAttribute(String),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("failed to create directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot determine a template name from '{}'", .0.display())]
    TemplateName(PathBuf),
}

impl GenerateError {
    /// Human-readable report; path syntax errors point at the offending column
    pub fn format(&self) -> String {
        match self {
            GenerateError::Config(ConfigError::Path {
                id,
                expression,
                source,
            }) => format!(
                "attribute '{}' has an invalid path\n{}",
                id,
                source.format(expression, "xpath")
            ),
            GenerateError::Mutate(MutateError::Path { expression, source }) => {
                source.format(expression, "xpath")
            }
            other => other.to_string(),
        }
    }
}
