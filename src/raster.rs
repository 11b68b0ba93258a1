//! Rasterizing serialized SVG through an external program
//!
//! Inkscape is driven as a subprocess with the document piped to its stdin.
//! A non-zero exit is a per-image failure reported back to the caller, not an
//! error: the batch goes on with the next combination.

use std::ffi::OsString;
use std::io::Write as _;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

/// Errors that stop a batch
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to spawn '{program}' (is it installed and on PATH?): {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to wait for '{program}' to finish: {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },
}

/// Captured result of a rasterizer run that exited unsuccessfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFailure {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterOutcome {
    Written,
    Failed(RasterFailure),
}

/// Turns serialized SVG into an image file
pub trait Rasterizer {
    fn rasterize(&mut self, svg: &[u8], dest: &Path) -> Result<RasterOutcome, RasterError>;
}

/// Inkscape invoked as `inkscape --export-type=png ... --pipe`
#[derive(Debug, Clone)]
pub struct Inkscape {
    program: OsString,
    width: u32,
    height: u32,
}

impl Default for Inkscape {
    fn default() -> Self {
        Self {
            program: OsString::from("inkscape"),
            width: 3840,
            height: 2160,
        }
    }
}

impl Inkscape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the exported image size in pixels
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Arguments passed for a given destination
    pub fn args(&self, dest: &Path) -> Vec<OsString> {
        let mut filename = OsString::from("--export-filename=");
        filename.push(dest.as_os_str());
        vec![
            OsString::from("--export-type=png"),
            filename,
            OsString::from(format!("--export-width={}", self.width)),
            OsString::from(format!("--export-height={}", self.height)),
            OsString::from("--pipe"),
        ]
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl Rasterizer for Inkscape {
    fn rasterize(&mut self, svg: &[u8], dest: &Path) -> Result<RasterOutcome, RasterError> {
        let mut command = Command::new(&self.program);
        command
            .args(self.args(dest))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        run_piped(command, &self.program_name(), svg)
    }
}

/// Any program that reads SVG on stdin and writes the image itself
///
/// The destination path is appended as the last argument.
#[derive(Debug, Clone)]
pub struct PipeCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl PipeCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl Rasterizer for PipeCommand {
    fn rasterize(&mut self, svg: &[u8], dest: &Path) -> Result<RasterOutcome, RasterError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(dest)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        run_piped(command, &self.program.to_string_lossy(), svg)
    }
}

fn run_piped(mut command: Command, program: &str, input: &[u8]) -> Result<RasterOutcome, RasterError> {
    let mut child = command.spawn().map_err(|source| RasterError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let stdin = child.stdin.take();
    let output = std::thread::scope(|scope| {
        // stdin is fed from its own thread while stdout and stderr are drained,
        // so a program that talks before it has read everything cannot stall
        let writer = stdin.map(|mut stdin| scope.spawn(move || stdin.write_all(input)));
        let output = child.wait_with_output();
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // a program that exits without reading its input closes the
                // pipe; its exit status is what gets reported
                Ok(Err(e)) => debug!(program, error = %e, "failed to write document to stdin"),
                Err(_) => debug!(program, "stdin writer panicked"),
            }
        }
        output
    })
    .map_err(|source| RasterError::Wait {
        program: program.to_string(),
        source,
    })?;

    Ok(outcome(output.status, &output.stdout, &output.stderr))
}

fn outcome(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> RasterOutcome {
    if status.success() {
        return RasterOutcome::Written;
    }
    let failure = RasterFailure {
        code: status.code(),
        stdout: String::from_utf8_lossy(stdout).into_owned(),
        stderr: String::from_utf8_lossy(stderr).into_owned(),
    };
    warn!(code = ?failure.code, "rasterizer exited unsuccessfully");
    RasterOutcome::Failed(failure)
}
