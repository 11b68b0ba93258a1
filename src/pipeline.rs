//! The batch run: template and configuration in, images and report out

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::combos::{self, Combination, StyleCombinations};
use crate::config::{Config, MutationMode};
use crate::error::GenerateError;
use crate::progress::Progress;
use crate::raster::{RasterOutcome, Rasterizer};
use crate::report::{Figure, Report, Section};
use crate::svg::{apply_color, Document};
use crate::GenerateOptions;

/// File name of the SVG template inside a template directory
pub const TEMPLATE_FILE: &str = "base.svg";

/// One combination applied to the template, ready to rasterize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    /// Serialized SVG document
    pub svg: Vec<u8>,
    /// One label per attribute slot
    pub labels: Vec<String>,
    pub file_name: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Images the rasterizer reported as written
    pub rendered: usize,
    /// Images whose rasterizer run failed
    pub failures: Vec<PathBuf>,
    pub report_path: PathBuf,
}

/// Image file name: the prefix followed by every label, dash separated
pub fn file_name(prefix: &str, labels: &[String]) -> String {
    format!("{}-{}.png", prefix, labels.join("-"))
}

/// A loaded template directory
#[derive(Debug, Clone)]
pub struct Template {
    /// Directory name, used for output paths and the report title
    pub name: String,
    pub config: Config,
    pub document: Document,
}

impl Template {
    /// Load `config.toml` and `base.svg` from `dir`
    pub fn load(dir: &Path) -> Result<Self, GenerateError> {
        let name = template_name(dir)?;
        let config = Config::from_dir(dir)?;
        let document = Document::from_file(&dir.join(TEMPLATE_FILE))?;
        Ok(Self {
            name,
            config,
            document,
        })
    }

    pub fn new(name: impl Into<String>, config: Config, document: Document) -> Self {
        Self {
            name: name.into(),
            config,
            document,
        }
    }

    /// Apply `combination` to `document` and serialize the result
    pub fn render(
        &self,
        document: &mut Document,
        combination: &Combination,
    ) -> Result<RenderedArtifact, GenerateError> {
        let mut labels = Vec::with_capacity(combination.len());
        for styled in combination {
            let spec = self
                .config
                .attribute(&styled.attribute_id)
                .ok_or_else(|| GenerateError::UnknownAttribute(styled.attribute_id.clone()))?;
            let changed = apply_color(
                &mut document.root,
                &self.config.namespace,
                spec,
                &styled.color_value,
            )?;
            debug!(
                attribute = %styled.attribute_id,
                color = %styled.color_key,
                changed,
                "applied color"
            );
            labels.push(spec.label(&styled.color_key)?);
        }

        Ok(RenderedArtifact {
            svg: document.to_bytes(),
            file_name: file_name(&self.config.file_prefix, &labels),
            labels,
        })
    }
}

fn template_name(dir: &Path) -> Result<String, GenerateError> {
    if let Some(name) = dir.file_name() {
        return Ok(name.to_string_lossy().into_owned());
    }
    // `.` or a trailing `..` have no file name of their own
    let canonical = dir
        .canonicalize()
        .map_err(|_| GenerateError::TemplateName(dir.to_path_buf()))?;
    canonical
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| GenerateError::TemplateName(dir.to_path_buf()))
}

fn create_dir(path: &Path) -> Result<(), GenerateError> {
    std::fs::create_dir_all(path).map_err(|source| GenerateError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Render, rasterize and index every combination of every style
#[instrument(skip_all, fields(template = %template.name))]
pub fn generate(
    template: &Template,
    options: &GenerateOptions,
    rasterizer: &mut dyn Rasterizer,
    progress: &mut dyn Progress,
) -> Result<RunSummary, GenerateError> {
    let image_dir = options.pngs_dir.join(&template.name);
    create_dir(&image_dir)?;
    create_dir(&options.docs_dir)?;

    let output = &template.config.output;
    let mode = options.mutation.unwrap_or(output.mutation);
    let directory_url = format!(
        "{}/{}",
        output.image_url_prefix.trim_end_matches('/'),
        template.name
    );

    let mut report = Report::new(&template.name, output.columns);
    let mut summary = RunSummary::default();

    for StyleCombinations {
        style,
        combinations,
    } in combos::enumerate(&template.config)
    {
        let total = combinations.len();
        info!(style = %style, combinations = total, "generating images");
        progress.style_started(&style, total);

        let mut working = template.document.clone();
        let mut figures = Vec::with_capacity(total);
        for (index, combination) in combinations.iter().enumerate() {
            if mode == MutationMode::Fresh && index > 0 {
                working = template.document.clone();
            }
            let artifact = template.render(&mut working, combination)?;
            let dest = image_dir.join(&artifact.file_name);

            debug!(dest = %dest.display(), "rasterizing");
            match rasterizer.rasterize(&artifact.svg, &dest)? {
                RasterOutcome::Written => summary.rendered += 1,
                RasterOutcome::Failed(failure) => {
                    progress.rasterize_failed(&dest, &failure);
                    summary.failures.push(dest);
                }
            }
            progress.combination_done(index + 1, total, &artifact.labels);

            figures.push(Figure {
                label: artifact.labels.join(", "),
                url: format!("{}/{}", directory_url, artifact.file_name),
            });
        }

        report.add_section(Section {
            heading: style,
            directory_url: directory_url.clone(),
            figures,
        });
    }

    let report_path = options.docs_dir.join(format!("{}.md", template.name));
    report.write(&report_path)?;
    info!(
        report = %report_path.display(),
        rendered = summary.rendered,
        failed = summary.failures.len(),
        "finished"
    );
    summary.report_path = report_path;
    progress.finished(&summary);
    Ok(summary)
}
