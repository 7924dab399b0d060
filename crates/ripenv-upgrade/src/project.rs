//! Project discovery: locate the `Pipfile` and its `Pipfile.lock`.
//!
//! Respects `PIPENV_PIPFILE` (explicit path) and `PIPENV_MAX_DEPTH`
//! (maximum parent directories to traverse).

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::pipfile::{Pipfile, PipfileLock};

/// Default maximum directory traversal depth.
const DEFAULT_MAX_DEPTH: usize = 3;

/// The filename we're looking for.
const PIPFILE_NAME: &str = "Pipfile";

/// The lockfile written next to the Pipfile.
const LOCKFILE_NAME: &str = "Pipfile.lock";

/// A project rooted at the directory containing its Pipfile.
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory containing the Pipfile.
    pub root: PathBuf,
    /// Path of the Pipfile.
    pub pipfile_path: PathBuf,
    /// The parsed Pipfile.
    pub pipfile: Pipfile,
}

impl Project {
    /// Find and load the project that `start_dir` belongs to.
    pub fn discover(start_dir: &Path) -> Result<Self> {
        let pipfile_path = find_pipfile(start_dir)?;
        Self::from_pipfile(pipfile_path)
    }

    /// Load the project whose Pipfile is at `pipfile_path`.
    pub fn from_pipfile(pipfile_path: PathBuf) -> Result<Self> {
        let pipfile = Pipfile::from_path(&pipfile_path)?;
        let root = pipfile_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        debug!("Using Pipfile at {}", pipfile_path.display());
        Ok(Self {
            root,
            pipfile_path,
            pipfile,
        })
    }

    /// Path of the project's `Pipfile.lock`.
    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join(LOCKFILE_NAME)
    }

    /// Load the lockfile, starting empty when there is none yet.
    pub fn load_lockfile(&self) -> Result<PipfileLock> {
        PipfileLock::from_path_or_default(&self.lockfile_path())
    }

    /// Persist the in-memory Pipfile.
    pub fn write_pipfile(&self) -> Result<()> {
        self.pipfile
            .write_to(&self.pipfile_path)
            .with_context(|| format!("failed to write {}", self.pipfile_path.display()))
    }

    /// Persist a lock for this project.
    pub fn write_lockfile(&self, lock: &PipfileLock) -> Result<()> {
        lock.write_to(&self.lockfile_path())
    }
}

/// Discover the Pipfile by walking up from the given directory.
///
/// Resolution order:
/// 1. `PIPENV_PIPFILE` environment variable (explicit path)
/// 2. Walk up from `start_dir` looking for `Pipfile`, up to `PIPENV_MAX_DEPTH`
///    parent directories (default: 3).
pub fn find_pipfile(start_dir: &Path) -> Result<PathBuf> {
    if let Ok(explicit) = env::var("PIPENV_PIPFILE") {
        let path = PathBuf::from(&explicit);
        if path.is_file() {
            return Ok(path);
        }
        bail!("PIPENV_PIPFILE is set to '{explicit}' but the file does not exist");
    }

    let max_depth = env::var("PIPENV_MAX_DEPTH")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_DEPTH);

    let mut current = start_dir.to_path_buf();
    for _ in 0..=max_depth {
        let candidate = current.join(PIPFILE_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !current.pop() {
            break;
        }
    }

    bail!(
        "No Pipfile found (searched up to {} parent directories from {})",
        max_depth,
        start_dir.display()
    );
}
