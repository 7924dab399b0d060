//! Selective upgrades.
//!
//! Upgrading a subset of packages must not churn the rest of the lock, yet
//! the packages that do change have to be consistent with the whole
//! category. Each category therefore goes through two resolutions:
//!
//! 1. a *targeted* resolve of only the requested entries, whose result
//!    (the upgrade graph) decides **which** names change, and
//! 2. a *full* resolve of every entry in the category, whose result
//!    (the full graph) decides **what** those names change to.
//!
//! [`merge_upgrade`] then copies `full_graph[name]` into the lock for every
//! name in the upgrade graph and leaves every other lock entry alone.

use rustc_hash::FxHashSet;
use tracing::{debug, info};
use uv_normalize::PackageName;

use crate::pipfile::{Category, LockSection, Pipfile, PipfileLock, PipfileSection, generate_entry};
use crate::requirement::{InstallRequirement, InvalidSpecifier, PackageSpec};
use crate::resolver::{ResolveError, Resolver, ResolverEnvironment};

#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    #[error(transparent)]
    InvalidSpecifier(#[from] InvalidSpecifier),
    #[error("no packages were requested for [{category}]")]
    EmptyUpgradeRequest { category: Category },
    #[error("failed to resolve [{category}] while upgrading {}", .packages.join(", "))]
    ResolutionFailed {
        category: Category,
        packages: Vec<String>,
        #[source]
        source: ResolveError,
    },
    #[error("`{package}` was selected for upgrade in [{category}] but is missing from the full resolution")]
    MergeInconsistency {
        category: Category,
        package: PackageName,
    },
}

/// The two graphs produced for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryResolution {
    /// Result of resolving only the requested entries.
    pub upgrade_graph: LockSection,
    /// Result of resolving every entry of the category.
    pub full_graph: LockSection,
}

/// Run the two-phase protocol for one category.
///
/// `requested` holds the entries just written for this category, keyed as
/// in the Pipfile. Returns `None` when the targeted resolve produced nothing,
/// in which case the full resolve is skipped.
pub fn resolve_category<R: Resolver + ?Sized>(
    resolver: &R,
    pipfile: &Pipfile,
    category: Category,
    requested: &PipfileSection,
    environment: &ResolverEnvironment,
) -> Result<Option<CategoryResolution>, UpgradeError> {
    if requested.is_empty() {
        return Err(UpgradeError::EmptyUpgradeRequest { category });
    }

    let failed = |source| UpgradeError::ResolutionFailed {
        category,
        packages: requested.keys().cloned().collect(),
        source,
    };

    debug!("Resolving {} requested package(s) in [{category}]", requested.len());
    let upgrade_graph = resolver
        .resolve(requested, category, environment)
        .map_err(failed)?;
    if upgrade_graph.is_empty() {
        return Ok(None);
    }

    debug!("Resolving all of [{category}]");
    let full_graph = resolver
        .resolve(pipfile.section(category), category, environment)
        .map_err(failed)?;

    Ok(Some(CategoryResolution {
        upgrade_graph,
        full_graph,
    }))
}

/// Fold a category's resolution into the lock.
///
/// Only the names in the upgrade graph are written, each with its value from
/// the full graph, and only into `category`'s section. Nothing is written if
/// any name is missing from the full graph. Returns the names written.
pub fn merge_upgrade(
    lock: &mut PipfileLock,
    category: Category,
    resolution: &CategoryResolution,
) -> Result<Vec<PackageName>, UpgradeError> {
    if let Some(package) = resolution
        .upgrade_graph
        .keys()
        .find(|name| !resolution.full_graph.contains_key(*name))
    {
        return Err(UpgradeError::MergeInconsistency {
            category,
            package: package.clone(),
        });
    }

    let section = lock.section_mut(category);
    let mut written = Vec::with_capacity(resolution.upgrade_graph.len());
    for name in resolution.upgrade_graph.keys() {
        let resolved = &resolution.full_graph[name];
        if section.get(name) != Some(resolved) {
            debug!("Locking {name} in [{category}]");
        }
        section.insert(name.clone(), resolved.clone());
        written.push(name.clone());
    }
    Ok(written)
}

/// What to upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    /// Package specifiers, plain ones first, then editables.
    pub specs: Vec<PackageSpec>,
    /// Categories to upgrade, in processing order.
    pub categories: Vec<Category>,
    /// Source name every requested package is pinned to.
    pub index: Option<String>,
}

/// Result of [`upgrade`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The targeted resolve of some category was empty; nothing may be persisted.
    NothingToUpgrade,
    /// The lock was updated; names written per category, in processing order.
    Upgraded {
        changes: Vec<(Category, Vec<PackageName>)>,
    },
}

/// Upgrade the requested packages in `pipfile` and `lock`.
///
/// Both are mutated in memory only; the caller persists them on
/// [`UpgradeOutcome::Upgraded`] and discards them otherwise. On success the
/// lock's `_meta` is restamped from the updated Pipfile.
pub fn upgrade<R: Resolver + ?Sized>(
    pipfile: &mut Pipfile,
    lock: &mut PipfileLock,
    request: &UpgradeRequest,
    resolver: &R,
    environment: &ResolverEnvironment,
) -> Result<UpgradeOutcome, UpgradeError> {
    // Parse everything up front so a bad specifier fails before any resolve.
    let requirements = request
        .specs
        .iter()
        .map(|spec| {
            InstallRequirement::from_spec(spec)
                .map(|requirement| requirement.with_index(request.index.as_deref()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = FxHashSet::default();
    let mut changes = Vec::with_capacity(request.categories.len());
    for &category in &request.categories {
        if !seen.insert(category) {
            continue;
        }

        let mut requested = PipfileSection::new();
        for requirement in &requirements {
            let generated = generate_entry(requirement);
            pipfile.add_entry(category, &generated);
            let key = pipfile
                .entry_key(category, &generated.normalized_name)
                .map_or_else(|| generated.name.clone(), str::to_owned);
            requested.insert(key, generated.entry);
        }
        if requested.is_empty() {
            return Err(UpgradeError::EmptyUpgradeRequest { category });
        }

        let Some(resolution) =
            resolve_category(resolver, pipfile, category, &requested, environment)?
        else {
            info!("Targeted resolve of [{category}] selected nothing");
            return Ok(UpgradeOutcome::NothingToUpgrade);
        };

        let written = merge_upgrade(lock, category, &resolution)?;
        changes.push((category, written));
    }

    lock.stamp_meta(pipfile);
    Ok(UpgradeOutcome::Upgraded { changes })
}
