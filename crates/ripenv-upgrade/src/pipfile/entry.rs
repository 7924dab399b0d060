//! Recording install requirements as Pipfile entries.
//!
//! [`generate_entry`] converts an [`InstallRequirement`] into the value that
//! belongs under its name in `[packages]` or `[dev-packages]`, and
//! [`Pipfile::add_entry`] stores it, replacing any entry whose key normalizes
//! to the same package name.

use std::str::FromStr;

use tracing::debug;
use uv_normalize::PackageName;

use crate::pipfile::{Category, Pipfile, PipfilePackage, PipfilePackageDetail};
use crate::requirement::InstallRequirement;

/// A Pipfile entry ready to be written, with both spellings of its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedEntry {
    /// The package name as the user wrote it; used as the key for new entries.
    pub name: String,
    /// The normalized name used to find existing entries.
    pub normalized_name: PackageName,
    /// The Pipfile value.
    pub entry: PipfilePackage,
}

/// Convert a requirement into its Pipfile entry.
///
/// Requirements that only carry a version collapse to the string form
/// (`"*"`, `"==2.31.0"`); anything with extras, markers, an index, a URL or
/// an editable target becomes a table.
pub fn generate_entry(requirement: &InstallRequirement) -> GeneratedEntry {
    let mut detail = PipfilePackageDetail {
        extras: requirement.extras.clone(),
        markers: requirement.markers.clone(),
        index: requirement.index.clone(),
        ..PipfilePackageDetail::default()
    };

    if let Some(target) = &requirement.editable {
        set_location(&mut detail, target);
        detail.editable = true;
    } else if let Some(url) = &requirement.url {
        set_location(&mut detail, url);
    } else {
        let version = requirement
            .specifiers
            .clone()
            .unwrap_or_else(|| "*".to_owned());
        if detail.extras.is_empty() && detail.markers.is_none() && detail.index.is_none() {
            return GeneratedEntry {
                name: requirement.name.clone(),
                normalized_name: requirement.normalized_name.clone(),
                entry: PipfilePackage::Simple(version),
            };
        }
        detail.version = Some(version);
    }

    GeneratedEntry {
        name: requirement.name.clone(),
        normalized_name: requirement.normalized_name.clone(),
        entry: PipfilePackage::Detailed(detail),
    }
}

/// Fill `git`/`ref`, `path` or `file` from a URL or local path.
fn set_location(detail: &mut PipfilePackageDetail, target: &str) {
    if let Some(vcs) = target.strip_prefix("git+") {
        let (repository, git_ref) = split_vcs_ref(vcs);
        detail.git = Some(repository.to_owned());
        detail.git_ref = git_ref.map(str::to_owned);
    } else if let Some(path) = target.strip_prefix("file://") {
        detail.path = Some(path.to_owned());
    } else if target.contains("://") {
        detail.file = Some(target.to_owned());
    } else {
        detail.path = Some(target.to_owned());
    }
}

/// Split `https://host/repo.git@ref` into the repository URL and the ref.
///
/// An `@` that is followed by a `/` belongs to the authority
/// (`ssh://git@host/repo`), not to a ref.
fn split_vcs_ref(url: &str) -> (&str, Option<&str>) {
    match url.rsplit_once('@') {
        Some((repository, git_ref))
            if !git_ref.is_empty() && !git_ref.contains('/') && repository.contains('/') =>
        {
            (repository, Some(git_ref))
        }
        _ => (url, None),
    }
}

impl Pipfile {
    /// The key under which `name` is stored in a category, if any.
    pub fn entry_key(&self, category: Category, name: &PackageName) -> Option<&str> {
        self.section(category)
            .keys()
            .find(|key| PackageName::from_str(key).is_ok_and(|key| key == *name))
            .map(String::as_str)
    }

    /// The entry stored for `name` in a category, if any.
    pub fn get_entry(&self, category: Category, name: &PackageName) -> Option<&PipfilePackage> {
        let key = self.entry_key(category, name)?;
        self.section(category).get(key)
    }

    /// Record an entry under a category.
    ///
    /// An existing entry for the same normalized name is overwritten in place,
    /// keeping its key and position; otherwise the entry is appended under the
    /// name as written. Returns `true` if an entry was replaced.
    pub fn add_entry(&mut self, category: Category, generated: &GeneratedEntry) -> bool {
        let existing = self
            .entry_key(category, &generated.normalized_name)
            .map(str::to_owned);
        let section = self.section_mut(category);

        if let Some(key) = existing {
            debug!("Replacing `{key}` in [{category}]");
            section.insert(key, generated.entry.clone());
            true
        } else {
            debug!("Adding `{}` to [{category}]", generated.name);
            section.insert(generated.name.clone(), generated.entry.clone());
            false
        }
    }
}
