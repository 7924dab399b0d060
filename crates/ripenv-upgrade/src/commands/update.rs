//! `ripenv-upgrade update`: upgrade packages, then report or sync.
//!
//! Without package arguments the whole lock is regenerated. With package
//! arguments only those packages move, through [`crate::upgrade::upgrade`].
//! Either way the run ends with an outdated report (`--outdated`,
//! `--dry-run`) or an environment sync (unless `--lock-only`).

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tracing::debug;
use url::Url;

use crate::cli::UpdateArgs;
use crate::commands::uv_runner::UvCommand;
use crate::commands::{ExitStatus, lock, outdated, sync};
use crate::installer::{Installer, SyncOptions, UvInstaller};
use crate::pipfile::{Category, Pipfile};
use crate::printer::Printer;
use crate::project::Project;
use crate::requirement::PackageSpec;
use crate::resolver::{Resolver, ResolverEnvironment, UvResolver};
use crate::upgrade::{UpgradeError, UpgradeOutcome, UpgradeRequest, upgrade};

/// Settings for one update run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub packages: Vec<String>,
    pub editables: Vec<String>,
    pub dev: bool,
    pub categories: Vec<Category>,
    pub index: Option<String>,
    pub pre: bool,
    pub system: bool,
    pub pypi_mirror: Option<Url>,
    pub extra_pip_args: Vec<String>,
    pub outdated: bool,
    pub dry_run: bool,
    pub clear: bool,
    pub lock_only: bool,
    pub bare: bool,
}

impl From<&UpdateArgs> for UpdateOptions {
    fn from(args: &UpdateArgs) -> Self {
        Self {
            packages: args.packages.clone(),
            editables: args.editable.clone(),
            dev: args.dev,
            categories: args.categories.clone(),
            index: args.index.clone(),
            pre: args.pre,
            system: args.system,
            pypi_mirror: args.pypi_mirror.clone(),
            extra_pip_args: args
                .extra_pip_args
                .as_deref()
                .map(|extra| extra.split_whitespace().map(str::to_owned).collect())
                .unwrap_or_default(),
            outdated: args.outdated,
            dry_run: args.dry_run,
            clear: args.clear,
            lock_only: args.lock_only,
            bare: args.bare,
        }
    }
}

impl UpdateOptions {
    /// Categories to upgrade: the explicit list, else `--dev`, else `[packages]`.
    pub fn upgrade_categories(&self) -> Vec<Category> {
        if !self.categories.is_empty() {
            self.categories.clone()
        } else if self.dev {
            vec![Category::DevPackages]
        } else {
            vec![Category::Packages]
        }
    }

    /// Categories to install: the explicit list, else everything with
    /// `--dev`, else `[packages]`.
    pub fn sync_categories(&self) -> Vec<Category> {
        if !self.categories.is_empty() {
            self.categories.clone()
        } else if self.dev {
            Category::ALL.to_vec()
        } else {
            vec![Category::Packages]
        }
    }

    /// The resolver settings for a run against `pipfile`.
    pub fn resolver_environment(&self, pipfile: &Pipfile) -> ResolverEnvironment {
        ResolverEnvironment {
            pre: self.pre || pipfile.allow_prereleases(),
            allow_global: self.system,
            mirror: self.pypi_mirror.clone(),
            sources: pipfile.source.clone(),
            python_version: pipfile
                .requires
                .as_ref()
                .and_then(|requires| requires.python_version.clone()),
            extra_pip_args: self.extra_pip_args.clone(),
            clear: self.clear,
        }
    }

    fn sync_options(&self, pipfile: &Pipfile) -> SyncOptions {
        SyncOptions {
            categories: self.sync_categories(),
            system: self.system,
            bare: self.bare,
            clear: self.clear,
            mirror: self.pypi_mirror.clone(),
            sources: pipfile.source.clone(),
            extra_pip_args: self.extra_pip_args.clone(),
        }
    }
}

/// Execute `ripenv-upgrade update` in the current directory.
pub fn execute(args: &UpdateArgs, printer: Printer) -> Result<ExitStatus> {
    let cwd = std::env::current_dir().context("failed to determine the current directory")?;
    let mut project = Project::discover(&cwd)?;

    let uv = UvCommand::discover()?;
    let resolver = UvResolver::new(uv.clone(), &project.root);
    let installer = UvInstaller::new(uv, &project.root);

    update(
        &mut project,
        &UpdateOptions::from(args),
        &resolver,
        &installer,
        printer,
    )
}

/// Run an update against `project` with the given collaborators.
pub fn update<R, I>(
    project: &mut Project,
    options: &UpdateOptions,
    resolver: &R,
    installer: &I,
    printer: Printer,
) -> Result<ExitStatus>
where
    R: Resolver + ?Sized,
    I: Installer + ?Sized,
{
    let specs: Vec<PackageSpec> = options
        .packages
        .iter()
        .filter(|raw| !raw.trim().is_empty())
        .map(PackageSpec::plain)
        .chain(
            options
                .editables
                .iter()
                .filter(|raw| !raw.trim().is_empty())
                .map(PackageSpec::editable),
        )
        .collect();
    let show_outdated = options.outdated || options.dry_run;

    let lock = if specs.is_empty() {
        printer.info(&format!(
            "{} {} {} {}{}",
            "Running".bold(),
            "$ ripenv lock".yellow().bold(),
            "then".bold(),
            "$ ripenv sync".yellow().bold(),
            ".".bold()
        ));
        let environment = options.resolver_environment(&project.pipfile);
        if show_outdated {
            project.load_lockfile()?
        } else {
            let lock = lock::relock(&project.pipfile, resolver, &environment)?;
            project.write_lockfile(&lock)?;
            printer.success("Locking successful.");
            lock
        }
    } else {
        // Work on copies so a failed or empty upgrade leaves both files alone.
        let mut pipfile = project.pipfile.clone();
        let index = options
            .index
            .as_deref()
            .map(|index| pipfile.ensure_source(index))
            .transpose()?;
        let environment = options.resolver_environment(&pipfile);
        let mut lock = project.load_lockfile()?;

        let request = UpgradeRequest {
            specs,
            categories: options.upgrade_categories(),
            index,
        };
        match upgrade(&mut pipfile, &mut lock, &request, resolver, &environment) {
            Ok(UpgradeOutcome::Upgraded { changes }) => {
                for (category, names) in &changes {
                    let names: Vec<_> = names.iter().map(ToString::to_string).collect();
                    printer.debug(&format!("Upgraded in [{category}]: {}", names.join(", ")));
                }
            }
            Ok(UpgradeOutcome::NothingToUpgrade)
            | Err(UpgradeError::EmptyUpgradeRequest { .. }) => {
                printer.info("Nothing to upgrade!");
                return Ok(ExitStatus::Success);
            }
            Err(err) => return Err(err.into()),
        }

        project.pipfile = pipfile;
        project.write_pipfile()?;
        project.write_lockfile(&lock)?;
        debug!("Wrote {}", project.lockfile_path().display());
        lock
    };

    if show_outdated {
        let environment = options.resolver_environment(&project.pipfile);
        return outdated::report(&project.pipfile, &lock, resolver, &environment, printer);
    }
    if options.lock_only {
        return Ok(ExitStatus::Success);
    }
    sync::sync(
        &lock,
        installer,
        &options.sync_options(&project.pipfile),
        printer,
    )
}
