//! Command dispatch for ripenv-upgrade.
//!
//! `update` is the entry point; [`lock`], [`outdated`] and [`sync`] are the
//! steps it delegates to after the Pipfile and lock have been settled.

use std::process::ExitCode;

use anyhow::Result;

use crate::cli;
use crate::printer::Printer;

pub mod lock;
pub mod outdated;
pub mod sync;
pub mod update;
pub mod uv_runner;

/// Exit status for ripenv-upgrade commands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    /// The command succeeded.
    Success,

    /// The command completed but reported a negative result (e.g. outdated packages).
    Failure,

    /// The command failed with an unexpected error.
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => Self::from(0),
            ExitStatus::Failure => Self::from(1),
            ExitStatus::Error => Self::from(2),
        }
    }
}

/// Dispatch a parsed CLI command to the appropriate handler.
pub fn dispatch(command: cli::Commands, printer: Printer) -> Result<ExitStatus> {
    match command {
        cli::Commands::Update(args) => update::execute(&args, printer),
    }
}
