//! Outdated report: compare the lock against a fresh resolve.

use anyhow::{Context, Result};

use crate::commands::ExitStatus;
use crate::pipfile::{Category, LockedPackage, Pipfile, PipfileLock};
use crate::printer::Printer;
use crate::resolver::{Resolver, ResolverEnvironment};

/// A locked package for which the resolver now picks something else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedPackage {
    pub category: Category,
    pub name: String,
    pub installed: String,
    pub available: String,
}

/// Resolve every category afresh and collect lock entries that differ.
pub fn find_outdated<R: Resolver + ?Sized>(
    pipfile: &Pipfile,
    lock: &PipfileLock,
    resolver: &R,
    environment: &ResolverEnvironment,
) -> Result<Vec<OutdatedPackage>> {
    let mut outdated = Vec::new();
    for category in Category::ALL {
        let fresh = resolver
            .resolve(pipfile.section(category), category, environment)
            .with_context(|| format!("failed to resolve [{category}]"))?;
        for (name, locked) in lock.section(category) {
            let Some(latest) = fresh.get(name) else {
                continue;
            };
            let (installed, available) = (describe(locked), describe(latest));
            if installed != available {
                outdated.push(OutdatedPackage {
                    category,
                    name: name.to_string(),
                    installed,
                    available,
                });
            }
        }
    }
    Ok(outdated)
}

/// Print the outdated report.
///
/// Returns [`ExitStatus::Failure`] when any package is out of date.
pub fn report<R: Resolver + ?Sized>(
    pipfile: &Pipfile,
    lock: &PipfileLock,
    resolver: &R,
    environment: &ResolverEnvironment,
    printer: Printer,
) -> Result<ExitStatus> {
    let outdated = find_outdated(pipfile, lock, resolver, environment)?;
    if outdated.is_empty() {
        printer.report("All packages are up to date!");
        return Ok(ExitStatus::Success);
    }
    for package in &outdated {
        printer.report(&format!(
            "Package '{}' out-of-date: '{}' installed, '{}' available.",
            package.name, package.installed, package.available
        ));
    }
    Ok(ExitStatus::Failure)
}

/// The version, or direct reference, a lock entry pins.
fn describe(package: &LockedPackage) -> String {
    if let Some(version) = &package.version {
        return version.clone();
    }
    match (&package.git, &package.git_ref) {
        (Some(git), Some(git_ref)) => format!("{git}@{git_ref}"),
        (Some(git), None) => git.clone(),
        _ => package
            .path
            .clone()
            .or_else(|| package.file.clone())
            .unwrap_or_default(),
    }
}
