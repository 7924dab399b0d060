//! ripenv-upgrade: selective package upgrades for Pipfile projects.
//!
//! This crate provides the entry point and command dispatch for the
//! `ripenv-upgrade` binary. It parses CLI arguments, records requested
//! packages in the Pipfile, and merges a two-phase resolution into
//! `Pipfile.lock` without disturbing packages that were not requested.

#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::ffi::OsString;
use std::process::ExitCode;

use anstream::eprintln;
use clap::Parser;
use owo_colors::OwoColorize;
use tracing::debug;

use crate::cli::Cli;
use crate::commands::ExitStatus;
use crate::printer::Printer;

pub mod cli;
pub mod commands;
pub mod installer;
pub mod logging;
pub mod pipfile;
pub mod printer;
pub mod project;
pub mod requirement;
pub mod resolver;
pub mod upgrade;

/// Entry point for the ripenv-upgrade CLI.
///
/// Parses CLI arguments, installs logging, and dispatches to the command
/// handler. Errors are printed with their cause chain.
pub fn main<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };

    logging::setup_logging(cli.verbose, cli.quiet);
    let printer = Printer::new(cli.verbose, cli.quiet);
    debug!("Running `{}`", cli.command.name());

    match commands::dispatch(cli.command, printer) {
        Ok(code) => code.into(),
        Err(err) => {
            let mut causes = err.chain();
            if let Some(error) = causes.next() {
                printer.error(&error.to_string());
            }
            for cause in causes {
                eprintln!(
                    "  {}: {}",
                    "Caused by".red().bold(),
                    cause.to_string().trim()
                );
            }
            ExitStatus::Error.into()
        }
    }
}
