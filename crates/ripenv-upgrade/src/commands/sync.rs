//! Environment sync: install the lock's contents.

use anyhow::{Context, Result};

use crate::commands::ExitStatus;
use crate::installer::{Installer, SyncOptions};
use crate::pipfile::PipfileLock;
use crate::printer::Printer;

/// Install the selected lock sections.
pub fn sync<I: Installer + ?Sized>(
    lock: &PipfileLock,
    installer: &I,
    options: &SyncOptions,
    printer: Printer,
) -> Result<ExitStatus> {
    let printer = if options.bare {
        printer.quieted()
    } else {
        printer
    };

    let hash = &lock.meta.hash.sha256;
    let short = hash.get(hash.len().saturating_sub(6)..).unwrap_or(hash);
    printer.info(&format!(
        "Installing dependencies from Pipfile.lock ({short})..."
    ));

    installer
        .sync(lock, options)
        .context("failed to install dependencies")?;

    printer.success("All dependencies are now up-to-date!");
    Ok(ExitStatus::Success)
}
