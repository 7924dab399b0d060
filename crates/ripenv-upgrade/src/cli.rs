//! CLI argument definitions for ripenv-upgrade.
//!
//! All clap derive structs live here. The [`Cli`] struct is the top-level
//! parser; [`Commands`] enumerates every subcommand.

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use url::Url;

use crate::pipfile::Category;

/// Clap v3-style help menu colors, matching uv's convention.
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Selective package upgrades for Pipfile projects.
#[derive(Parser, Debug)]
#[command(
    name = "ripenv-upgrade",
    author,
    version,
    about = "Selective package upgrades for Pipfile projects.",
    styles = STYLES,
    after_help = "Use `ripenv-upgrade help <command>` for more information on a specific command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase logging verbosity.
    #[arg(global = true, short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output.
    #[arg(global = true, short, long)]
    pub quiet: bool,
}

/// Top-level subcommands for ripenv-upgrade.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upgrade packages in the lockfile, then sync the environment.
    #[command(alias = "upgrade")]
    Update(UpdateArgs),
}

impl Commands {
    /// Return the subcommand name as a static string (for diagnostics).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Update(_) => "update",
        }
    }
}

/// Arguments for `ripenv-upgrade update`.
#[derive(Parser, Debug, Default)]
pub struct UpdateArgs {
    /// Packages to upgrade. If omitted, the whole lockfile is regenerated.
    pub packages: Vec<String>,

    /// Editable path or VCS URL to upgrade (repeatable).
    #[arg(short, long = "editable", value_name = "PATH_OR_URL")]
    pub editable: Vec<String>,

    /// Upgrade packages in dev-packages.
    #[arg(short, long)]
    pub dev: bool,

    /// Categories to upgrade (`packages`, `dev-packages`, `default`, `develop`).
    #[arg(long, value_delimiter = ',')]
    pub categories: Vec<Category>,

    /// Index name or URL to pin the requested packages to.
    #[arg(short, long)]
    pub index: Option<String>,

    /// Allow pre-release versions.
    #[arg(long)]
    pub pre: bool,

    /// Resolve and install against the system Python.
    #[arg(long)]
    pub system: bool,

    /// Mirror URL used in place of PyPI.
    #[arg(long, env = "PIPENV_PYPI_MIRROR")]
    pub pypi_mirror: Option<Url>,

    /// Extra arguments passed to the resolver and installer.
    #[arg(long, allow_hyphen_values = true)]
    pub extra_pip_args: Option<String>,

    /// List out-of-date packages instead of syncing.
    #[arg(long)]
    pub outdated: bool,

    /// Show what would change without syncing (implies `--outdated`).
    #[arg(long)]
    pub dry_run: bool,

    /// Ignore cached index data.
    #[arg(long)]
    pub clear: bool,

    /// Only update the lockfile, do not sync.
    #[arg(long)]
    pub lock_only: bool,

    /// Minimal output during sync.
    #[arg(long)]
    pub bare: bool,
}
