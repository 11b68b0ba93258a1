//! Markdown index of generated images

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// An image and its caption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Figure {
    pub label: String,
    /// Image location relative to the report
    pub url: String,
}

/// HTML table of figures, `columns` cells per row
///
/// The last row holds the remainder when the figure count is not a multiple
/// of `columns`.
pub fn figure_table(figures: &[Figure], columns: usize) -> String {
    let cells: Vec<String> = figures
        .iter()
        .map(|figure| {
            format!(
                r#"<td align="center">{}<img src="{}"></td>"#,
                figure.label, figure.url
            )
        })
        .collect();
    let rows: Vec<String> = cells
        .chunks(columns.max(1))
        .map(|group| format!("<tr>\n{}\n</tr>", group.join("\n")))
        .collect();
    format!("\n<table>\n{}\n</table>\n", rows.join("\n"))
}

/// Uppercase the first character and lowercase the rest
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Images generated for one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    /// Directory holding every image of the template
    pub directory_url: String,
    pub figures: Vec<Figure>,
}

/// The Markdown document written next to the images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    title: String,
    columns: usize,
    sections: Vec<Section>,
}

impl Report {
    /// Start a report for the named template
    pub fn new(template_name: &str, columns: usize) -> Self {
        Self {
            title: capitalize(template_name),
            columns,
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn to_markdown(&self) -> String {
        let mut lines = vec![format!("# {}", self.title)];
        for section in &self.sections {
            lines.push(format!("## {}\n\n", section.heading));
            lines.push(format!(
                "See [here]({}) for all png's.",
                section.directory_url
            ));
            lines.push(figure_table(&section.figures, self.columns));
        }
        lines.join("\n")
    }

    /// Write the Markdown document to `path`
    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_markdown()).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
