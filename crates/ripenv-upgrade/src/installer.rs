//! The environment synchronization seam.
//!
//! After a successful upgrade the environment is brought in line with the
//! lock through an [`Installer`]. [`UvInstaller`] renders the selected lock
//! sections as a hashed requirements file and runs `uv pip sync` on it.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;
use url::Url;

use crate::commands::uv_runner::{UvCommand, UvError};
use crate::pipfile::{Category, LockedPackage, PipfileLock, PipfileSource};
use crate::resolver::index_args;

/// How the environment should be synchronized.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Lock sections to install.
    pub categories: Vec<Category>,
    /// Install into the system interpreter.
    pub system: bool,
    /// Suppress installer output.
    pub bare: bool,
    /// Ignore cached index data.
    pub clear: bool,
    /// Replacement for the default PyPI index URL.
    pub mirror: Option<Url>,
    /// Package indexes to install from, the first being the default.
    pub sources: Vec<PipfileSource>,
    /// Extra arguments passed through to the installer.
    pub extra_pip_args: Vec<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            categories: Category::ALL.to_vec(),
            system: false,
            bare: false,
            clear: false,
            mirror: None,
            sources: Vec::new(),
            extra_pip_args: Vec::new(),
        }
    }
}

/// Installs the contents of a lock into the target environment.
pub trait Installer {
    fn sync(&self, lock: &PipfileLock, options: &SyncOptions) -> Result<(), InstallError>;
}

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error(transparent)]
    Uv(#[from] UvError),
    #[error("failed to write the requirements file")]
    Io(#[from] std::io::Error),
    #[error("uv pip sync failed:\n{}", .stderr.trim())]
    Failed { code: Option<i32>, stderr: String },
}

/// Installs with `uv pip sync`.
#[derive(Debug, Clone)]
pub struct UvInstaller {
    uv: UvCommand,
    root: PathBuf,
}

impl UvInstaller {
    pub fn new(uv: UvCommand, root: impl Into<PathBuf>) -> Self {
        Self {
            uv,
            root: root.into(),
        }
    }
}

impl Installer for UvInstaller {
    fn sync(&self, lock: &PipfileLock, options: &SyncOptions) -> Result<(), InstallError> {
        let requirements = render_requirements(lock, &options.categories);

        let mut file = tempfile::Builder::new()
            .prefix("ripenv-")
            .suffix(".txt")
            .tempfile()?;
        file.write_all(requirements.as_bytes())?;
        file.flush()?;

        let args = sync_args(file.path(), options);
        let output = self.uv.output(&args, None, &self.root)?;
        if !output.success() {
            return Err(InstallError::Failed {
                code: output.code,
                stderr: output.stderr,
            });
        }
        debug!("Synchronized {} categor(ies)", options.categories.len());
        Ok(())
    }
}

/// The `uv pip sync` arguments for a rendered requirements file.
pub fn sync_args(requirements: &Path, options: &SyncOptions) -> Vec<String> {
    let mut args = vec![
        "pip".to_owned(),
        "sync".to_owned(),
        requirements.to_string_lossy().into_owned(),
    ];
    if options.system {
        args.push("--system".to_owned());
    }
    if options.clear {
        args.push("--refresh".to_owned());
    }
    if options.bare {
        args.push("--quiet".to_owned());
    }
    args.extend(index_args(&options.sources, options.mirror.as_ref()));
    args.extend(options.extra_pip_args.iter().cloned());
    args
}

/// Render the selected lock sections as a hashed requirements file.
///
/// A package present in several sections is written once, with the entry
/// of the first section that lists it.
pub fn render_requirements(lock: &PipfileLock, categories: &[Category]) -> String {
    let mut seen = rustc_hash::FxHashSet::default();
    let mut out = String::new();
    for category in categories {
        for (name, package) in lock.section(*category) {
            if !seen.insert(name.clone()) {
                continue;
            }
            out.push_str(&requirement_line(name.as_str(), package));
            out.push('\n');
        }
    }
    out
}

fn requirement_line(name: &str, package: &LockedPackage) -> String {
    let target = if let Some(git) = &package.git {
        Some(match &package.git_ref {
            Some(git_ref) => format!("git+{git}@{git_ref}"),
            None => format!("git+{git}"),
        })
    } else {
        package.path.clone().or_else(|| package.file.clone())
    };

    if package.editable
        && let Some(target) = &target
    {
        return format!("-e {target}");
    }

    let mut line = name.to_owned();
    if !package.extras.is_empty() {
        line.push('[');
        line.push_str(&package.extras.join(","));
        line.push(']');
    }
    match (&target, &package.version) {
        (Some(target), _) => {
            line.push_str(" @ ");
            line.push_str(target);
        }
        (None, Some(version)) => line.push_str(version),
        (None, None) => {}
    }
    if let Some(markers) = &package.markers {
        line.push_str(" ; ");
        line.push_str(markers);
    }
    for hash in &package.hashes {
        line.push_str(" \\\n    --hash=");
        line.push_str(hash);
    }
    line
}
