//! Progress reporting for a batch run

use std::path::Path;

use console::{style, Term};

use crate::pipeline::RunSummary;
use crate::raster::RasterFailure;

/// Receives batch events; every method defaults to doing nothing
pub trait Progress {
    /// A style with `total` combinations is about to be rasterized
    fn style_started(&mut self, _style: &str, _total: usize) {}

    /// Combination `index` (1-based) of `total` was handed to the rasterizer
    fn combination_done(&mut self, _index: usize, _total: usize, _labels: &[String]) {}

    /// The rasterizer exited unsuccessfully for `dest`
    fn rasterize_failed(&mut self, _dest: &Path, _failure: &RasterFailure) {}

    fn finished(&mut self, _summary: &RunSummary) {}
}

/// Reports nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Progress for Silent {}

/// Progress bar on stdout
pub struct TerminalProgress {
    term: Term,
    width: usize,
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self {
            term: Term::stdout(),
            width: 50,
        }
    }
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Render a bar such as `[=====     ] 50%`
pub fn bar(index: usize, total: usize, width: usize) -> String {
    let fraction = if total == 0 {
        1.0
    } else {
        index.min(total) as f64 / total as f64
    };
    let filled = (fraction * width as f64) as usize;
    format!(
        "[{:<width$}] {}%",
        "=".repeat(filled),
        (fraction * 100.0) as usize,
        width = width
    )
}

impl Progress for TerminalProgress {
    fn style_started(&mut self, style_name: &str, _total: usize) {
        let _ = self
            .term
            .write_line(&format!("Generating png's for style: {}", style_name));
    }

    fn combination_done(&mut self, index: usize, total: usize, labels: &[String]) {
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&format!(
            "{}  {}",
            bar(index, total, self.width),
            labels.join(" | ")
        ));
        if index >= total {
            let _ = self.term.clear_line();
        }
        let _ = self.term.flush();
    }

    fn rasterize_failed(&mut self, dest: &Path, failure: &RasterFailure) {
        let _ = self.term.clear_line();
        let _ = self.term.write_line(&format!(
            "{} {}",
            style("Error using inkscape....").red(),
            dest.display()
        ));
        if !failure.stdout.is_empty() {
            let _ = self.term.write_line(failure.stdout.trim_end());
        }
        if !failure.stderr.is_empty() {
            let _ = self.term.write_line(failure.stderr.trim_end());
        }
    }

    fn finished(&mut self, _summary: &RunSummary) {
        let _ = self.term.write_line("done.");
    }
}
