//! svg-colorways CLI
//!
//! Usage:
//!   svg-colorways [OPTIONS] <DIR>
//!
//! Options:
//!   --pngs-dir <DIR>      Root of the generated images [default: pngs]
//!   --docs-dir <DIR>      Directory for the Markdown report [default: docs]
//!   --inkscape <PROGRAM>  Inkscape executable [default: inkscape]
//!   --cumulative          Carry changes from one combination into the next
//!   -q, --quiet           No progress bar
//!   -v, --verbose         More log output (repeatable)
//!   -h, --help            Print help

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use svg_colorways::{run, GenerateOptions, MutationMode, Progress, Silent, TerminalProgress};

#[derive(Parser)]
#[command(name = "svg-colorways")]
#[command(about = "Render every palette combination of an SVG template to PNG")]
struct Cli {
    /// Template directory containing base.svg and config.toml
    dir: PathBuf,

    /// Root of the generated images; each template gets a subdirectory
    #[arg(long, default_value = "pngs")]
    pngs_dir: PathBuf,

    /// Directory for the Markdown report
    #[arg(long, default_value = "docs")]
    docs_dir: PathBuf,

    /// Inkscape executable
    #[arg(long, default_value = "inkscape")]
    inkscape: String,

    /// Carry changes from one combination into the next within a style
    #[arg(long)]
    cumulative: bool,

    /// Do not draw the progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut options = GenerateOptions::new()
        .with_pngs_dir(&cli.pngs_dir)
        .with_docs_dir(&cli.docs_dir)
        .with_inkscape(&cli.inkscape);
    if cli.cumulative {
        options = options.with_mutation(MutationMode::Cumulative);
    }

    let mut terminal = TerminalProgress::new();
    let mut silent = Silent;
    let progress: &mut dyn Progress = if cli.quiet {
        &mut silent
    } else {
        &mut terminal
    };

    match run(&cli.dir, &options, progress) {
        Ok(summary) => {
            if !summary.failures.is_empty() {
                eprintln!(
                    "{} of {} images failed to rasterize",
                    summary.failures.len(),
                    summary.failures.len() + summary.rendered
                );
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e.format());
            std::process::exit(1);
        }
    }
}
