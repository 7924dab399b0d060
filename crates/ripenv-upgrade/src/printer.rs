//! Output formatting for ripenv-upgrade commands.
//!
//! The [`Printer`] controls whether messages are emitted based on the user's
//! `--quiet` and `--verbose` flags. Progress and diagnostics go to stderr;
//! reports that are the command's actual output go to stdout. Errors are
//! always printed regardless of quiet mode.

use anstream::{eprintln, println};
use owo_colors::OwoColorize;

/// Controls output formatting for ripenv-upgrade commands.
#[derive(Debug, Copy, Clone)]
pub struct Printer {
    /// Verbosity level: 0 = normal, 1+ = verbose.
    verbosity: u8,
    /// Whether output is suppressed.
    quiet: bool,
}

impl Printer {
    /// Create a new printer with the given verbosity and quiet settings.
    pub fn new(verbosity: u8, quiet: bool) -> Self {
        Self { verbosity, quiet }
    }

    /// A printer that only reports errors.
    #[must_use]
    pub fn quieted(self) -> Self {
        Self {
            quiet: true,
            ..self
        }
    }

    /// Print an informational message to stderr.
    pub fn info(&self, message: &str) {
        if !self.quiet {
            eprintln!("{message}");
        }
    }

    /// Print a success message to stderr.
    pub fn success(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", message.green().bold());
        }
    }

    /// Print an error message to stderr.
    ///
    /// Errors are always printed, even in quiet mode.
    pub fn error(&self, message: &str) {
        eprintln!("{}: {}", "error".red().bold(), message);
    }

    /// Print a debug message (only at verbosity >= 1).
    pub fn debug(&self, message: &str) {
        if self.verbosity >= 1 && !self.quiet {
            eprintln!("{}: {}", "debug".dimmed(), message);
        }
    }

    /// Print a line of command output to stdout.
    pub fn report(&self, message: &str) {
        if !self.quiet {
            println!("{message}");
        }
    }
}
