//! Full relock: regenerate every category of the lockfile from the Pipfile.

use anyhow::{Context, Result};
use tracing::debug;

use crate::pipfile::{Category, Pipfile, PipfileLock};
use crate::resolver::{Resolver, ResolverEnvironment};

/// Resolve every category of `pipfile` into a fresh lock.
///
/// Each lock section is replaced wholesale by the full resolve of the
/// matching Pipfile section, and `_meta` is stamped from `pipfile`.
pub fn relock<R: Resolver + ?Sized>(
    pipfile: &Pipfile,
    resolver: &R,
    environment: &ResolverEnvironment,
) -> Result<PipfileLock> {
    let mut lock = PipfileLock::default();
    for category in Category::ALL {
        let resolved = resolver
            .resolve(pipfile.section(category), category, environment)
            .with_context(|| format!("failed to lock [{category}]"))?;
        debug!("Locked {} package(s) in [{category}]", resolved.len());
        *lock.section_mut(category) = resolved;
    }
    lock.stamp_meta(pipfile);
    Ok(lock)
}
