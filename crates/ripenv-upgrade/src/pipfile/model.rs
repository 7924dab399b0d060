//! Data model types for Pipfile deserialization.
//!
//! These structs mirror the Pipfile TOML schema. Packages can be specified
//! as either a simple version string (`"*"`, `">=1.0"`) or a table with
//! extended fields (`{version = ">=1.0", extras = ["security"]}`).
//!
//! Package tables keep their on-disk order so a rewritten Pipfile only
//! differs where an entry actually changed. Tables and keys outside the
//! modeled schema (custom categories, other `[pipenv]` settings) are kept in
//! `extra` and written back as they were read.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::pipfile::Category;

/// An ordered package table, keyed by the package name as written.
pub type PipfileSection = IndexMap<String, PipfilePackage>;

/// Unmodeled keys of a Pipfile table, in file order.
pub type PipfileExtra = IndexMap<String, toml::Value>;

/// Top-level Pipfile structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Pipfile {
    /// Package index sources.
    #[serde(default)]
    pub source: Vec<PipfileSource>,

    /// Production dependencies.
    #[serde(default)]
    pub packages: PipfileSection,

    /// Development dependencies.
    #[serde(rename = "dev-packages", default)]
    pub dev_packages: PipfileSection,

    /// Python version requirements.
    pub requires: Option<PipfileRequires>,

    /// Script definitions.
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,

    /// Pipenv-specific settings.
    #[serde(default)]
    pub pipenv: Option<PipfileSettings>,

    /// Custom category tables and any other top-level keys.
    #[serde(flatten)]
    pub extra: PipfileExtra,
}

impl Pipfile {
    /// Parse a Pipfile from the given path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)?;
        let pipfile: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(pipfile)
    }

    /// The package table for a category.
    pub fn section(&self, category: Category) -> &PipfileSection {
        match category {
            Category::Packages => &self.packages,
            Category::DevPackages => &self.dev_packages,
        }
    }

    /// The mutable package table for a category.
    pub fn section_mut(&mut self, category: Category) -> &mut PipfileSection {
        match category {
            Category::Packages => &mut self.packages,
            Category::DevPackages => &mut self.dev_packages,
        }
    }

    /// Whether `[pipenv] allow_prereleases = true` is set.
    pub fn allow_prereleases(&self) -> bool {
        self.pipenv
            .as_ref()
            .is_some_and(|settings| settings.allow_prereleases)
    }

    /// Return the name of the `[[source]]` matching `index`, registering a new
    /// source when none matches.
    ///
    /// `index` may be the name of an existing source or an index URL. New
    /// sources are named after the URL host and verify SSL unless the URL is
    /// plain `http`.
    pub fn ensure_source(&mut self, index: &str) -> Result<String> {
        if let Some(source) = self.source.iter().find(|source| source.name == index) {
            return Ok(source.name.clone());
        }

        let wanted = index.trim_end_matches('/');
        if let Some(source) = self
            .source
            .iter()
            .find(|source| source.url.trim_end_matches('/') == wanted)
        {
            return Ok(source.name.clone());
        }

        let url = Url::parse(index)
            .with_context(|| format!("`{index}` is neither a known source name nor a URL"))?;
        let Some(host) = url.host_str() else {
            bail!("index URL `{index}` has no host");
        };

        let base = host.replace('.', "-");
        let mut name = base.clone();
        let mut suffix = 1;
        while self.source.iter().any(|source| source.name == name) {
            suffix += 1;
            name = format!("{base}-{suffix}");
        }

        self.source.push(PipfileSource {
            name: name.clone(),
            url: index.to_owned(),
            verify_ssl: url.scheme() != "http",
            extra: PipfileExtra::new(),
        });
        Ok(name)
    }
}

/// A `[[source]]` entry in the Pipfile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipfileSource {
    /// Source name (e.g., `"pypi"`).
    pub name: String,

    /// Index URL.
    pub url: String,

    /// Whether to verify SSL certificates.
    #[serde(default = "default_true")]
    pub verify_ssl: bool,

    #[serde(flatten)]
    pub extra: PipfileExtra,
}

/// A package dependency in the Pipfile.
///
/// Pipfile packages can be either a simple version string like `"*"` or
/// `">=1.0"`, or a table with extended fields like
/// `{version = ">=1.0", extras = ["security"], markers = "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipfilePackage {
    /// Simple version string: `requests = "*"` or `requests = ">=1.0"`.
    Simple(String),

    /// Table with extended fields: `requests = {version = ">=1.0", extras = ["security"]}`.
    Detailed(PipfilePackageDetail),
}

/// Extended package specification fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipfilePackageDetail {
    /// Version specifier (e.g., `">=1.0"`, `"*"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Extra features to install.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,

    /// PEP 508 environment markers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markers: Option<String>,

    /// Platform-specific marker shorthand (e.g., `"== 'linux'"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sys_platform: Option<String>,

    /// Git repository URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,

    /// Git ref (branch, tag, or commit).
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,

    /// Local path to a package.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Remote archive or wheel URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Whether the package is installed as editable.
    #[serde(default, skip_serializing_if = "is_false")]
    pub editable: bool,

    /// Specific index to install from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

/// The `[requires]` section of a Pipfile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipfileRequires {
    /// Python version (e.g., `"3.12"`).
    pub python_version: Option<String>,

    /// Full Python version (e.g., `"3.12.1"`).
    pub python_full_version: Option<String>,
}

/// The `[pipenv]` section for pipenv-specific settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipfileSettings {
    /// Whether to allow pre-release versions.
    #[serde(default)]
    pub allow_prereleases: bool,

    /// Settings this crate does not interpret (`sort_pipfile`, ...).
    #[serde(flatten)]
    pub extra: PipfileExtra,
}

fn default_true() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}
