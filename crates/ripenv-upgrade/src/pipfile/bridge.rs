//! Bridge from Pipfile entries to requirement lines.
//!
//! The central function [`requirement_lines`] converts a [`PipfileSection`]
//! into the lines of a `requirements.in` that `uv pip compile` can resolve.
//! Git, path and editable packages are rendered as direct references.

use crate::pipfile::{PipfilePackage, PipfilePackageDetail, PipfileSection};

/// Convert every entry of a section into a requirement line, in section order.
pub fn requirement_lines(section: &PipfileSection) -> Vec<String> {
    section
        .iter()
        .map(|(name, package)| requirement_line(name, package))
        .collect()
}

/// Convert a single Pipfile entry into a requirement line.
pub fn requirement_line(name: &str, package: &PipfilePackage) -> String {
    match package {
        PipfilePackage::Simple(version) => format_simple_requirement(name, version),
        PipfilePackage::Detailed(detail) => format_detailed_requirement(name, detail),
    }
}

/// Format a simple version requirement like `requests>=1.0` or just `requests`.
fn format_simple_requirement(name: &str, version: &str) -> String {
    if version == "*" {
        name.to_owned()
    } else {
        format!("{name}{version}")
    }
}

fn format_detailed_requirement(name: &str, detail: &PipfilePackageDetail) -> String {
    if detail.editable
        && let Some(target) = location(detail)
    {
        return format!("-e {target}#egg={name}");
    }

    let mut req = String::from(name);

    // Extras: requests[security,tests]
    if !detail.extras.is_empty() {
        req.push('[');
        req.push_str(&detail.extras.join(","));
        req.push(']');
    }

    if let Some(target) = location(detail) {
        req.push_str(" @ ");
        req.push_str(&target);
    } else if let Some(version) = detail.version.as_deref().filter(|version| *version != "*") {
        req.push_str(version);
    }

    let marker = build_marker(detail);
    if !marker.is_empty() {
        // A space keeps the marker separator from fusing with a URL.
        req.push_str(" ; ");
        req.push_str(&marker);
    }

    req
}

/// The direct reference of a git, path or file entry.
fn location(detail: &PipfilePackageDetail) -> Option<String> {
    if let Some(git) = &detail.git {
        return Some(match &detail.git_ref {
            Some(git_ref) => format!("git+{git}@{git_ref}"),
            None => format!("git+{git}"),
        });
    }
    detail.path.clone().or_else(|| detail.file.clone())
}

/// Build a PEP 508 marker string from detail fields.
fn build_marker(detail: &PipfilePackageDetail) -> String {
    let mut parts = Vec::new();

    if let Some(markers) = &detail.markers {
        parts.push(markers.clone());
    }

    if let Some(sys_platform) = &detail.sys_platform {
        parts.push(format!("sys_platform {sys_platform}"));
    }

    parts.join(" and ")
}
