//! The dependency resolver seam.
//!
//! The upgrade engine never solves constraints itself: it hands a set of
//! Pipfile entries to a [`Resolver`] and receives the pinned graph back.
//! [`UvResolver`] is the production implementation, driving
//! `uv pip compile` and parsing its pinned, hashed output.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};
use url::Url;
use uv_normalize::PackageName;
use uv_pep508::{Requirement, VerbatimUrl, VersionOrUrl};

use crate::commands::uv_runner::{UvCommand, UvError};
use crate::pipfile::bridge::requirement_lines;
use crate::pipfile::{
    Category, LockSection, LockedPackage, PipfilePackage, PipfileSection, PipfileSource,
};

/// Settings shared by every resolver call of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverEnvironment {
    /// Allow pre-release versions.
    pub pre: bool,
    /// Resolve against the global interpreter instead of a virtualenv.
    pub allow_global: bool,
    /// Replacement for the default PyPI index URL.
    pub mirror: Option<Url>,
    /// Package indexes, the first being the default.
    pub sources: Vec<PipfileSource>,
    /// Target Python version from `[requires]`.
    pub python_version: Option<String>,
    /// Extra arguments passed through to the resolver.
    pub extra_pip_args: Vec<String>,
    /// Ignore cached index data.
    pub clear: bool,
}

/// Produces a pinned graph from a set of requested entries.
pub trait Resolver {
    /// Resolve `requested` (and its transitive dependencies).
    ///
    /// An empty request yields an empty graph.
    fn resolve(
        &self,
        requested: &PipfileSection,
        category: Category,
        environment: &ResolverEnvironment,
    ) -> Result<LockSection, ResolveError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Uv(#[from] UvError),
    #[error("uv pip compile failed:\n{}", .stderr.trim())]
    Failed { code: Option<i32>, stderr: String },
    #[error("unexpected resolver output `{line}`: {message}")]
    Output { line: String, message: String },
}

/// Resolves with `uv pip compile`.
#[derive(Debug, Clone)]
pub struct UvResolver {
    uv: UvCommand,
    /// Directory relative paths in the Pipfile are interpreted against.
    root: PathBuf,
}

impl UvResolver {
    pub fn new(uv: UvCommand, root: impl Into<PathBuf>) -> Self {
        Self {
            uv,
            root: root.into(),
        }
    }
}

impl Resolver for UvResolver {
    fn resolve(
        &self,
        requested: &PipfileSection,
        category: Category,
        environment: &ResolverEnvironment,
    ) -> Result<LockSection, ResolveError> {
        if requested.is_empty() {
            return Ok(LockSection::new());
        }

        let mut input = requirement_lines(requested).join("\n");
        input.push('\n');
        trace!("Resolving [{category}]:\n{input}");

        let output = self
            .uv
            .output(&compile_args(environment), Some(&input), &self.root)?;
        if !output.success() {
            return Err(ResolveError::Failed {
                code: output.code,
                stderr: output.stderr,
            });
        }

        let graph = parse_compile_output(&output.stdout, requested, environment)?;
        debug!("Resolved {} package(s) for [{category}]", graph.len());
        Ok(graph)
    }
}

/// Command-line arguments for `uv pip compile` reading from stdin.
pub fn compile_args(environment: &ResolverEnvironment) -> Vec<String> {
    let mut args: Vec<String> = [
        "pip",
        "compile",
        "-",
        "--quiet",
        "--no-header",
        "--no-annotate",
        "--generate-hashes",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect();

    if environment.pre {
        args.push("--prerelease=allow".to_owned());
    }
    if environment.allow_global {
        args.push("--system".to_owned());
    }
    if let Some(python_version) = &environment.python_version {
        args.push(format!("--python-version={python_version}"));
    }

    args.extend(index_args(&environment.sources, environment.mirror.as_ref()));

    if environment.clear {
        args.push("--refresh".to_owned());
    }
    args.extend(environment.extra_pip_args.iter().cloned());
    args
}

/// `uv` index flags for the Pipfile sources: the first source is the default
/// index, the rest are extra indexes, and sources with `verify_ssl = false`
/// mark their host as insecure. PyPI sources are replaced by `mirror`.
pub fn index_args(sources: &[PipfileSource], mirror: Option<&Url>) -> Vec<String> {
    let mut args = Vec::new();
    let mut sources = sources.iter();
    match sources.next() {
        Some(default) => {
            args.push(format!("--default-index={}", index_url(default, mirror)));
            insecure_host(&mut args, default);
        }
        None => {
            if let Some(mirror) = mirror {
                args.push(format!("--default-index={mirror}"));
            }
        }
    }
    for source in sources {
        args.push(format!("--index={}", index_url(source, mirror)));
        insecure_host(&mut args, source);
    }
    args
}

/// The URL to query for a source, swapping PyPI for the mirror.
fn index_url(source: &PipfileSource, mirror: Option<&Url>) -> String {
    match mirror {
        Some(mirror) if is_pypi(&source.url) => mirror.to_string(),
        _ => source.url.clone(),
    }
}

fn is_pypi(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .is_some_and(|url| matches!(url.host_str(), Some("pypi.org" | "pypi.python.org")))
}

fn insecure_host(args: &mut Vec<String>, source: &PipfileSource) {
    if source.verify_ssl {
        return;
    }
    if let Some(host) = Url::parse(&source.url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
    {
        args.push(format!("--allow-insecure-host={host}"));
    }
}

/// Parse pinned `uv pip compile` output into a lock section.
///
/// Index names and extras are not part of the output; they are carried over
/// from the requested entry of the same name, and registry pins default to
/// the first source.
pub fn parse_compile_output(
    output: &str,
    requested: &PipfileSection,
    environment: &ResolverEnvironment,
) -> Result<LockSection, ResolveError> {
    let requested: Vec<(PackageName, &PipfilePackage)> = requested
        .iter()
        .filter_map(|(name, package)| {
            PackageName::from_str(name)
                .ok()
                .map(|name| (name, package))
        })
        .collect();
    let default_index = environment.sources.first().map(|source| source.name.clone());

    let mut graph = LockSection::new();
    for line in logical_lines(output) {
        let (requirement, hashes) = match line.find(" --hash=") {
            Some(at) => (line[..at].trim(), &line[at..]),
            None => (line.trim(), ""),
        };
        let hashes: Vec<String> = hashes
            .split_whitespace()
            .filter_map(|token| token.strip_prefix("--hash="))
            .map(str::to_owned)
            .collect();

        if requirement.starts_with("--") {
            trace!("Skipping resolver option `{requirement}`");
            continue;
        }

        let (name, mut package) = if let Some(target) = requirement.strip_prefix("-e") {
            parse_editable_line(target.trim(), &requested, &line)?
        } else {
            parse_pinned_line(requirement, &line)?
        };

        let entry = requested
            .iter()
            .find(|(requested, _)| *requested == name)
            .map(|(_, package)| *package);
        if let Some(PipfilePackage::Detailed(detail)) = entry {
            package.extras.clone_from(&detail.extras);
            package.index.clone_from(&detail.index);
        }
        if package.index.is_none() && package.version.is_some() {
            package.index.clone_from(&default_index);
        }
        package.hashes = hashes;

        graph.insert(name, package);
    }
    Ok(graph)
}

/// Join `\`-continued lines, dropping blanks and comments.
fn logical_lines(output: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for raw in output.lines() {
        let trimmed = raw.trim();
        if current.is_empty() && (trimmed.is_empty() || trimmed.starts_with('#')) {
            continue;
        }
        match trimmed.strip_suffix('\\') {
            Some(head) => {
                current.push_str(head.trim_end());
                current.push(' ');
            }
            None => {
                current.push_str(trimmed);
                lines.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.trim().is_empty() {
        lines.push(current.trim().to_owned());
    }
    lines
}

fn parse_pinned_line(
    requirement: &str,
    line: &str,
) -> Result<(PackageName, LockedPackage), ResolveError> {
    let parsed = Requirement::<VerbatimUrl>::from_str(requirement).map_err(|err| {
        ResolveError::Output {
            line: line.to_owned(),
            message: err.to_string(),
        }
    })?;

    let mut package = LockedPackage {
        markers: parsed.marker.try_to_string(),
        ..LockedPackage::default()
    };
    match &parsed.version_or_url {
        Some(VersionOrUrl::VersionSpecifier(specifiers)) => {
            package.version = Some(specifiers.to_string());
        }
        Some(VersionOrUrl::Url(url)) => {
            set_locked_location(&mut package, &url.to_string());
        }
        None => {
            return Err(ResolveError::Output {
                line: line.to_owned(),
                message: "requirement is not pinned".to_owned(),
            });
        }
    }
    Ok((parsed.name, package))
}

fn parse_editable_line(
    target: &str,
    requested: &[(PackageName, &PipfilePackage)],
    line: &str,
) -> Result<(PackageName, LockedPackage), ResolveError> {
    let (location, fragment) = match target.split_once('#') {
        Some((location, fragment)) => (location, Some(fragment)),
        None => (target, None),
    };

    let egg = fragment.and_then(|fragment| {
        fragment
            .split('&')
            .find_map(|part| part.strip_prefix("egg="))
            .and_then(|name| PackageName::from_str(name).ok())
    });
    let name = egg
        .or_else(|| {
            requested.iter().find_map(|(name, package)| {
                editable_location(package)
                    .filter(|wanted| same_location(location, wanted))
                    .map(|_| name.clone())
            })
        })
        .ok_or_else(|| ResolveError::Output {
            line: line.to_owned(),
            message: "editable requirement does not match any requested package".to_owned(),
        })?;

    // Keep the location as written in the Pipfile rather than the resolver's
    // absolute form.
    let written = requested
        .iter()
        .find(|(requested, _)| *requested == name)
        .and_then(|(_, package)| editable_location(package));

    let mut package = LockedPackage {
        editable: true,
        ..LockedPackage::default()
    };
    set_locked_location(&mut package, written.unwrap_or(location));
    Ok((name, package))
}

/// The `git`/`path`/`file` target of an editable entry.
fn editable_location(package: &PipfilePackage) -> Option<&str> {
    match package {
        PipfilePackage::Detailed(detail) if detail.editable => detail
            .path
            .as_deref()
            .or(detail.git.as_deref())
            .or(detail.file.as_deref()),
        _ => None,
    }
}

/// Whether a resolver-reported location refers to the requested one.
fn same_location(reported: &str, wanted: &str) -> bool {
    let clean = |location: &str| {
        location
            .trim_start_matches("file://")
            .trim_start_matches("git+")
            .trim_start_matches("./")
            .trim_end_matches('/')
            .to_owned()
    };
    let (reported, wanted) = (clean(reported), clean(wanted));
    if wanted.is_empty() || wanted == "." {
        return false;
    }
    reported == wanted
        || reported.ends_with(&format!("/{wanted}"))
        || reported.starts_with(&format!("{wanted}@"))
}

fn set_locked_location(package: &mut LockedPackage, target: &str) {
    if let Some(vcs) = target.strip_prefix("git+") {
        match vcs.rsplit_once('@') {
            Some((repository, git_ref)) if repository.contains('/') && !git_ref.contains('/') => {
                package.git = Some(repository.to_owned());
                package.git_ref = Some(git_ref.to_owned());
            }
            _ => package.git = Some(vcs.to_owned()),
        }
    } else if let Some(path) = target.strip_prefix("file://") {
        package.path = Some(path.to_owned());
    } else if target.contains("://") {
        package.file = Some(target.to_owned());
    } else {
        package.path = Some(target.to_owned());
    }
}
