//! svg-colorways - render every palette combination of an SVG template
//!
//! A template directory holds `base.svg` and `config.toml`. The configuration
//! declares palettes, the stylable attributes of the SVG (path expression plus
//! style template) and styles that bind attributes to palettes. Every
//! combination of colors of a style is applied to the template, rasterized
//! with Inkscape into `pngs/<template>/`, and indexed in `docs/<template>.md`.
//!
//! # Example
//!
//! ```rust
//! use svg_colorways::config::Config;
//! use svg_colorways::svg::Document;
//! use svg_colorways::{combos, Template};
//!
//! let config = Config::from_str(r##"
//!     file_prefix = "dot"
//!     namespace = "http://www.w3.org/2000/svg"
//!
//!     [palette.basic]
//!     red = "#ff0000"
//!     blue = "#0000ff"
//!
//!     [attribute.fill]
//!     name = "{color_key}"
//!     xpath = ".//{{{namespace}}}circle"
//!     style = "fill:{color_value}"
//!
//!     [[style]]
//!     name = "Fill"
//!     attribute = [{ id = "fill", palette = "basic" }]
//! "##).unwrap();
//! let svg = Document::parse(r#"<svg xmlns="http://www.w3.org/2000/svg"><circle r="4"/></svg>"#).unwrap();
//! let template = Template::new("dot", config, svg);
//!
//! let styles = combos::enumerate(&template.config);
//! let mut doc = template.document.clone();
//! let artifact = template.render(&mut doc, &styles[0].combinations[1]).unwrap();
//! assert_eq!(artifact.file_name, "dot-blue.png");
//! ```

pub mod combos;
pub mod config;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod progress;
pub mod raster;
pub mod report;
pub mod svg;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub use config::{Config, ConfigError, MutationMode};
pub use error::GenerateError;
pub use pipeline::{generate, RenderedArtifact, RunSummary, Template};
pub use progress::{Progress, Silent, TerminalProgress};
pub use raster::{Inkscape, Rasterizer};

/// Run-time settings that are not part of a template's configuration
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Root of the image output; images land in `<pngs_dir>/<template>/`
    pub pngs_dir: PathBuf,
    /// Directory receiving `<template>.md`
    pub docs_dir: PathBuf,
    /// Overrides the configuration's `output.mutation`
    pub mutation: Option<MutationMode>,
    /// Inkscape executable
    pub inkscape: OsString,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            pngs_dir: PathBuf::from("pngs"),
            docs_dir: PathBuf::from("docs"),
            mutation: None,
            inkscape: OsString::from("inkscape"),
        }
    }
}

impl GenerateOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the image output root
    pub fn with_pngs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pngs_dir = dir.into();
        self
    }

    /// Set the report directory
    pub fn with_docs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.docs_dir = dir.into();
        self
    }

    /// Force a mutation mode regardless of the configuration
    pub fn with_mutation(mut self, mode: MutationMode) -> Self {
        self.mutation = Some(mode);
        self
    }

    /// Use a different Inkscape executable
    pub fn with_inkscape(mut self, program: impl Into<OsString>) -> Self {
        self.inkscape = program.into();
        self
    }
}

/// Load the template in `dir` and generate everything with Inkscape
pub fn run(
    dir: &Path,
    options: &GenerateOptions,
    progress: &mut dyn Progress,
) -> Result<RunSummary, GenerateError> {
    let template = Template::load(dir)?;
    let mut inkscape = Inkscape::new()
        .with_program(options.inkscape.clone())
        .with_size(template.config.output.width, template.config.output.height);
    generate(&template, options, &mut inkscape, progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = GenerateOptions::default();
        assert_eq!(options.pngs_dir, PathBuf::from("pngs"));
        assert_eq!(options.docs_dir, PathBuf::from("docs"));
        assert_eq!(options.mutation, None);
        assert_eq!(options.inkscape, OsString::from("inkscape"));
    }

    #[test]
    fn test_builder_pattern() {
        let options = GenerateOptions::new()
            .with_pngs_dir("out/pngs")
            .with_docs_dir("out/docs")
            .with_mutation(MutationMode::Cumulative)
            .with_inkscape("/opt/inkscape/bin/inkscape");

        assert_eq!(options.pngs_dir, PathBuf::from("out/pngs"));
        assert_eq!(options.docs_dir, PathBuf::from("out/docs"));
        assert_eq!(options.mutation, Some(MutationMode::Cumulative));
        assert_eq!(options.inkscape, OsString::from("/opt/inkscape/bin/inkscape"));
    }

    #[test]
    fn test_run_missing_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let options = GenerateOptions::new()
            .with_pngs_dir(dir.path().join("pngs"))
            .with_docs_dir(dir.path().join("docs"));
        let err = run(&dir.path().join("nope"), &options, &mut Silent).unwrap_err();
        assert!(matches!(err, GenerateError::Config(ConfigError::IoError(_))));
    }
}
