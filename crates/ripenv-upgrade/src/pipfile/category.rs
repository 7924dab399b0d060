//! Dependency categories.
//!
//! A Pipfile splits its dependencies into `[packages]` and `[dev-packages]`;
//! `Pipfile.lock` records the same partitions under `default` and `develop`.
//! [`Category`] names one partition and knows both spellings, so every lookup
//! and every lock write goes through the same identifier.

use std::fmt;
use std::str::FromStr;

/// One dependency partition of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Runtime dependencies: `[packages]` / `default`.
    Packages,
    /// Development-only dependencies: `[dev-packages]` / `develop`.
    DevPackages,
}

impl Category {
    /// Every category, in the order they appear in a Pipfile.
    pub const ALL: [Self; 2] = [Self::Packages, Self::DevPackages];

    /// The Pipfile table name (`packages`, `dev-packages`).
    pub fn pipfile_section(self) -> &'static str {
        match self {
            Self::Packages => "packages",
            Self::DevPackages => "dev-packages",
        }
    }

    /// The `Pipfile.lock` key (`default`, `develop`).
    pub fn lock_section(self) -> &'static str {
        match self {
            Self::Packages => "default",
            Self::DevPackages => "develop",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pipfile_section())
    }
}

/// A category name that is neither a Pipfile table nor a lock section.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error(
    "unknown category `{0}` (expected one of `packages`, `default`, `dev-packages`, `develop`)"
)]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "packages" | "default" => Ok(Self::Packages),
            "dev-packages" | "develop" => Ok(Self::DevPackages),
            other => Err(UnknownCategory(other.to_owned())),
        }
    }
}
