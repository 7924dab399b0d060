//! `Pipfile.lock` model, hashing and persistence.
//!
//! The lock holds one section per [`Category`] (`default`, `develop`), each a
//! sorted map of normalized package name to [`LockedPackage`], plus a `_meta`
//! block recording the hash of the Pipfile it was produced from. The file is
//! deterministic JSON: sorted keys, four-space indentation, trailing newline.
//!
//! Keys this crate does not model (other category sections, extra `_meta`
//! keys, unknown package fields) are carried through unchanged.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use uv_normalize::PackageName;

use crate::pipfile::{Category, Pipfile, PipfilePackage, PipfileRequires, PipfileSource};

/// The `pipfile-spec` version written to `_meta`.
pub const PIPFILE_SPEC: u32 = 6;

/// Resolved packages of one category, keyed by normalized name.
pub type LockSection = BTreeMap<PackageName, LockedPackage>;

/// Unmodeled keys of a lock object, kept verbatim.
pub type LockExtra = BTreeMap<String, serde_json::Value>;

/// Top-level `Pipfile.lock` structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipfileLock {
    /// Metadata section.
    #[serde(rename = "_meta")]
    pub meta: PipfileLockMeta,
    /// Production dependencies (from `[packages]`).
    #[serde(default)]
    pub default: LockSection,
    /// Development dependencies (from `[dev-packages]`).
    #[serde(default)]
    pub develop: LockSection,
    /// Sections of other categories.
    #[serde(flatten)]
    pub extra: LockExtra,
}

/// The `_meta` section of `Pipfile.lock`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipfileLockMeta {
    /// SHA256 hash of the Pipfile content.
    pub hash: PipfileLockHash,
    /// Pipfile.lock spec version.
    #[serde(rename = "pipfile-spec")]
    pub pipfile_spec: u32,
    /// Python requirements from the Pipfile.
    #[serde(default)]
    pub requires: BTreeMap<String, String>,
    /// Package index sources.
    #[serde(default)]
    pub sources: Vec<PipfileSource>,
    #[serde(flatten)]
    pub extra: LockExtra,
}

impl Default for PipfileLockMeta {
    fn default() -> Self {
        Self {
            hash: PipfileLockHash::default(),
            pipfile_spec: PIPFILE_SPEC,
            requires: BTreeMap::new(),
            sources: Vec::new(),
            extra: LockExtra::new(),
        }
    }
}

/// Hash entry in `_meta`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipfileLockHash {
    /// SHA256 hex digest.
    pub sha256: String,
}

/// A locked package entry in a category section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPackage {
    #[serde(default, skip_serializing_if = "is_false")]
    pub editable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,
    /// Distribution hashes, as `sha256:<hex>`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashes: Vec<String>,
    /// Source index name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// PEP 508 environment markers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    /// Pinned version string (e.g., `"==1.2.3"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Fields such as `subdirectory` that are passed through untouched.
    #[serde(flatten)]
    pub extra: LockExtra,
}

impl LockedPackage {
    /// A registry package pinned to `version` (`"==1.2.3"`).
    pub fn pinned(version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..Self::default()
        }
    }
}

impl PipfileLock {
    /// Read a lockfile from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)?;
        serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Read a lockfile, or start from an empty one if it does not exist yet.
    pub fn from_path_or_default(path: &Path) -> Result<Self> {
        if path.is_file() {
            Self::from_path(path)
        } else {
            debug!("No lockfile at {}; starting empty", path.display());
            Ok(Self::default())
        }
    }

    /// The lock section for a category.
    pub fn section(&self, category: Category) -> &LockSection {
        match category {
            Category::Packages => &self.default,
            Category::DevPackages => &self.develop,
        }
    }

    /// The mutable lock section for a category.
    pub fn section_mut(&mut self, category: Category) -> &mut LockSection {
        match category {
            Category::Packages => &mut self.default,
            Category::DevPackages => &mut self.develop,
        }
    }

    /// Re-stamp `_meta` from the Pipfile the lock now corresponds to.
    ///
    /// Unknown `_meta` keys are kept.
    pub fn stamp_meta(&mut self, pipfile: &Pipfile) {
        self.meta = PipfileLockMeta {
            hash: PipfileLockHash {
                sha256: compute_pipfile_hash(pipfile),
            },
            pipfile_spec: PIPFILE_SPEC,
            requires: requires_map(pipfile.requires.as_ref()),
            sources: pipfile.source.clone(),
            extra: std::mem::take(&mut self.meta.extra),
        };
    }

    /// Whether `_meta.hash` matches the given Pipfile.
    pub fn is_current_for(&self, pipfile: &Pipfile) -> bool {
        self.meta.hash.sha256 == compute_pipfile_hash(pipfile)
    }

    /// Serialize as pretty JSON with sorted keys and four-space indentation.
    pub fn to_json_string(&self) -> Result<String> {
        let value = serde_json::to_value(self).context("failed to serialize Pipfile.lock")?;
        let mut buffer = Vec::with_capacity(1024);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        sorted(value)
            .serialize(&mut serializer)
            .context("failed to serialize Pipfile.lock")?;
        buffer.push(b'\n');
        Ok(String::from_utf8(buffer)?)
    }

    /// Replace the lockfile at `path` atomically.
    ///
    /// The content is written to a temporary file in the same directory and
    /// renamed over the target, so readers never observe a partial lock.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut file = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create a temporary file in {}", dir.display()))?;
        file.write_all(json.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path)
            .with_context(|| format!("failed to write {}", path.display()))?;

        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Compute the Pipfile content hash for the `_meta.hash` field.
///
/// Matches pipenv's algorithm: SHA256 of a JSON string built from the
/// Pipfile content with sorted keys and compact separators (`","`, `":"`).
pub fn compute_pipfile_hash(pipfile: &Pipfile) -> String {
    let mut meta = serde_json::Map::new();
    meta.insert(
        "requires".to_owned(),
        serde_json::to_value(requires_map(pipfile.requires.as_ref())).unwrap_or_default(),
    );
    meta.insert(
        "sources".to_owned(),
        serde_json::to_value(&pipfile.source).unwrap_or_default(),
    );

    let mut root = serde_json::Map::new();
    root.insert("_meta".to_owned(), serde_json::Value::Object(meta));
    for category in Category::ALL {
        root.insert(
            category.lock_section().to_owned(),
            packages_to_json(pipfile.section(category)),
        );
    }

    let json = sorted(serde_json::Value::Object(root)).to_string();
    let hash = Sha256::digest(json.as_bytes());
    format!("{hash:x}")
}

/// Rebuild every object with its keys in sorted order.
fn sorted(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sorted(value)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sorted).collect())
        }
        other => other,
    }
}

/// Convert `PipfileRequires` to the sorted map stored in `_meta.requires`.
fn requires_map(requires: Option<&PipfileRequires>) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(requires) = requires {
        if let Some(version) = &requires.python_version {
            map.insert("python_version".to_owned(), version.clone());
        }
        if let Some(full_version) = &requires.python_full_version {
            map.insert("python_full_version".to_owned(), full_version.clone());
        }
    }
    map
}

/// Convert a Pipfile package table to its JSON form.
fn packages_to_json<'a>(
    packages: impl IntoIterator<Item = (&'a String, &'a PipfilePackage)>,
) -> serde_json::Value {
    let map = packages
        .into_iter()
        .map(|(name, package)| {
            (
                name.clone(),
                serde_json::to_value(package).unwrap_or(serde_json::Value::Null),
            )
        })
        .collect();
    serde_json::Value::Object(map)
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}
