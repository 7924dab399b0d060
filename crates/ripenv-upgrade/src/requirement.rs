//! Turning command-line package specifiers into install requirements.
//!
//! A [`PackageSpec`] is whatever the user typed (`requests==2.31.0`,
//! `requests[socks]>=2; python_version >= "3.9"`, or an editable path such as
//! `./libs/core`). [`InstallRequirement::from_spec`] expands `${VAR}`
//! references, parses the result, and yields a normalized requirement that
//! the Pipfile entry writer can record.

use std::borrow::Cow;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::trace;
use uv_normalize::PackageName;
use uv_pep508::{Requirement, VerbatimUrl, VersionOrUrl};

/// `${NAME}` environment references, as accepted in requirement files.
static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// A raw package reference supplied by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// The specifier exactly as given.
    pub raw: String,
    /// Whether the specifier names an editable (local source) install.
    pub editable: bool,
}

impl PackageSpec {
    /// A regular requirement specifier.
    pub fn plain(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            editable: false,
        }
    }

    /// An editable path or VCS URL.
    pub fn editable(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            editable: true,
        }
    }
}

/// A specifier that could not be turned into a package name and constraint.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid package specifier `{specifier}`: {message}")]
pub struct InvalidSpecifier {
    pub specifier: String,
    pub message: String,
}

impl InvalidSpecifier {
    fn new(specifier: &str, message: impl Into<String>) -> Self {
        Self {
            specifier: specifier.to_owned(),
            message: message.into(),
        }
    }
}

/// A normalized, resolvable package request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequirement {
    /// The package name as the user wrote it.
    pub name: String,
    /// The PEP 503 normalized name.
    pub normalized_name: PackageName,
    /// Requested extras, in the order given.
    pub extras: Vec<String>,
    /// Version specifiers (`==2.31.0`, `>=1,<2`); `None` means any version.
    pub specifiers: Option<String>,
    /// Direct URL for `name @ url` requirements.
    pub url: Option<String>,
    /// PEP 508 environment markers.
    pub markers: Option<String>,
    /// Local path or VCS URL for editable installs.
    pub editable: Option<String>,
    /// Name of the `[[source]]` the package must come from.
    pub index: Option<String>,
}

impl InstallRequirement {
    /// Build a requirement from a user-supplied specifier.
    pub fn from_spec(spec: &PackageSpec) -> Result<Self, InvalidSpecifier> {
        let expanded = expand_env_vars(spec.raw.trim());
        let requirement = if spec.editable {
            Self::parse_editable(&expanded)?
        } else {
            Self::parse(&expanded)?
        };
        trace!(
            "Parsed `{}` as {} ({})",
            spec.raw,
            requirement.normalized_name,
            requirement.specifiers.as_deref().unwrap_or("*")
        );
        Ok(requirement)
    }

    /// Pin the requirement to a named index, if one is given.
    #[must_use]
    pub fn with_index(mut self, index: Option<&str>) -> Self {
        if let Some(index) = index {
            self.index = Some(index.to_owned());
        }
        self
    }

    /// Parse a PEP 508 requirement string.
    fn parse(line: &str) -> Result<Self, InvalidSpecifier> {
        if line.is_empty() {
            return Err(InvalidSpecifier::new(line, "empty requirement"));
        }

        let requirement = Requirement::<VerbatimUrl>::from_str(line)
            .map_err(|err| InvalidSpecifier::new(line, err.to_string()))?;

        let (specifiers, url) = match &requirement.version_or_url {
            None => (None, None),
            Some(VersionOrUrl::VersionSpecifier(specifiers)) => {
                let specifiers = specifiers.to_string().replace(", ", ",");
                ((!specifiers.is_empty()).then_some(specifiers), None)
            }
            Some(VersionOrUrl::Url(url)) => (None, Some(url.to_string())),
        };

        let name = written_name(line)
            .map(str::to_owned)
            .unwrap_or_else(|| requirement.name.to_string());

        Ok(Self {
            name,
            normalized_name: requirement.name.clone(),
            extras: requirement.extras.iter().map(ToString::to_string).collect(),
            specifiers,
            url,
            markers: requirement.marker.try_to_string(),
            editable: None,
            index: None,
        })
    }

    /// Parse an editable target: a local directory or a VCS URL.
    ///
    /// The package name comes from an `#egg=` fragment, then from the
    /// directory's `pyproject.toml`, then from the last path segment.
    fn parse_editable(target: &str) -> Result<Self, InvalidSpecifier> {
        let target = target
            .strip_prefix("-e")
            .map(str::trim_start)
            .unwrap_or(target);
        if target.is_empty() {
            return Err(InvalidSpecifier::new(
                target,
                "editable requirement needs a path or URL",
            ));
        }

        let (location, fragment) = match target.split_once('#') {
            Some((location, fragment)) => (location, Some(fragment)),
            None => (target, None),
        };

        let name = fragment
            .and_then(egg_name)
            .map(str::to_owned)
            .or_else(|| project_name(Path::new(location)))
            .or_else(|| last_segment(location).map(str::to_owned))
            .ok_or_else(|| {
                InvalidSpecifier::new(
                    target,
                    "cannot infer a package name; add `#egg=<name>` to the specifier",
                )
            })?;

        let normalized_name = PackageName::from_str(&name)
            .map_err(|err| InvalidSpecifier::new(target, err.to_string()))?;

        Ok(Self {
            name,
            normalized_name,
            extras: Vec::new(),
            specifiers: None,
            url: None,
            markers: None,
            editable: Some(location.to_owned()),
            index: None,
        })
    }
}

/// Replace `${NAME}` references with the value of the environment variable.
///
/// Unset variables are left untouched so the resulting parse error still
/// shows what the user wrote.
pub fn expand_env_vars(input: &str) -> Cow<'_, str> {
    ENV_VAR.replace_all(input, |caps: &Captures| {
        env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_owned())
    })
}

/// The leading package name of a requirement line, preserving its case.
fn written_name(line: &str) -> Option<&str> {
    let end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(line.len());
    (end > 0).then(|| &line[..end])
}

/// The package name from an `egg=<name>` URL fragment.
fn egg_name(fragment: &str) -> Option<&str> {
    fragment
        .split('&')
        .find_map(|part| part.strip_prefix("egg="))
        .filter(|name| !name.is_empty())
}

/// The `[project] name` of a local source tree.
fn project_name(dir: &Path) -> Option<String> {
    let content = fs_err::read_to_string(dir.join("pyproject.toml")).ok()?;
    let pyproject: toml::Table = toml::from_str(&content).ok()?;
    pyproject
        .get("project")?
        .get("name")?
        .as_str()
        .map(str::to_owned)
}

/// The last path segment of a path or URL, without a VCS ref or `.git` suffix.
fn last_segment(location: &str) -> Option<&str> {
    let trimmed = location.trim_end_matches(['/', '\\']);
    let segment = trimmed.rsplit(['/', '\\']).next()?;
    let segment = segment.split('@').next().unwrap_or(segment);
    let segment = segment.strip_suffix(".git").unwrap_or(segment);
    (!segment.is_empty() && segment != "." && segment != "..").then_some(segment)
}
