//! Locating and invoking the `uv` executable.
//!
//! The resolver and installer adapters shell out to `uv pip compile` and
//! `uv pip sync`. [`UvCommand`] finds the binary once (`RIPENV_UV`, then
//! `PATH`) and runs it with captured output.

use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, trace};

/// Environment variable overriding the `uv` binary location.
pub const UV_ENV_VAR: &str = "RIPENV_UV";

/// Failure to run `uv` at all (as opposed to `uv` reporting an error).
#[derive(Debug, thiserror::Error)]
pub enum UvError {
    #[error("could not find the `uv` executable; install uv or set {UV_ENV_VAR}")]
    NotFound(#[source] which::Error),
    #[error("failed to run `{}`", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of a `uv` invocation.
#[derive(Debug, Clone)]
pub struct UvOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl UvOutput {
    /// Whether `uv` exited with status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// A located `uv` binary.
#[derive(Debug, Clone)]
pub struct UvCommand {
    program: PathBuf,
}

impl UvCommand {
    /// Use the given binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find `uv` from `RIPENV_UV` or on `PATH`.
    pub fn discover() -> Result<Self, UvError> {
        if let Some(explicit) = env::var_os(UV_ENV_VAR).filter(|value| !value.is_empty()) {
            debug!("Using uv from {UV_ENV_VAR}: {}", Path::new(&explicit).display());
            return Ok(Self::new(explicit));
        }
        let program = which::which("uv").map_err(UvError::NotFound)?;
        debug!("Using uv at {}", program.display());
        Ok(Self { program })
    }

    /// The binary path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run `uv` with `args` in `cwd`, feeding `stdin` when given.
    pub fn output(
        &self,
        args: &[String],
        stdin: Option<&str>,
        cwd: &Path,
    ) -> Result<UvOutput, UvError> {
        debug!("Running: uv {}", args.join(" "));

        let spawn_error = |source| UvError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // Write stdin from a separate thread so a large input cannot deadlock
        // against a full stdout pipe.
        let output = std::thread::scope(|scope| {
            if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
                scope.spawn(move || {
                    if let Err(err) = pipe.write_all(input.as_bytes()) {
                        trace!("uv closed stdin early: {err}");
                    }
                });
            }
            child.wait_with_output()
        })
        .map_err(spawn_error)?;

        let output = UvOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        trace!("uv exited with {:?}", output.code);
        Ok(output)
    }
}
