//! Pipfile writer: serialize a [`Pipfile`] back to TOML.
//!
//! Used after a successful upgrade to persist the entries that were added or
//! replaced. Preserves standard section ordering:
//! `[[source]]`, `[packages]`, `[dev-packages]`, custom tables, `[requires]`,
//! `[scripts]`, `[pipenv]`, and the order of packages within each section.
//! Keys outside the modeled schema are written back with their parsed values.

use std::fmt::Write;
use std::path::Path;

use anyhow::Result;

use crate::pipfile::{
    Category, Pipfile, PipfileExtra, PipfilePackage, PipfilePackageDetail, PipfileSection,
};

impl Pipfile {
    /// Write the Pipfile to the given path.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let content = self.to_toml_string()?;
        fs_err::write(path, content)?;
        Ok(())
    }

    /// Serialize the Pipfile to a TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        let mut out = String::with_capacity(512);

        // Bare top-level keys must precede the first table header.
        let (tables, arrays, bare) = split_extra(&self.extra);
        if !bare.is_empty() {
            for (name, value) in &bare {
                writeln!(out, "{} = {value}", key(name))?;
            }
            writeln!(out)?;
        }

        for source in &self.source {
            writeln!(out, "[[source]]")?;
            writeln!(out, "url = {}", quoted(&source.url))?;
            writeln!(out, "verify_ssl = {}", source.verify_ssl)?;
            writeln!(out, "name = {}", quoted(&source.name))?;
            write_values(&mut out, &source.extra)?;
            writeln!(out)?;
        }

        for category in Category::ALL {
            writeln!(out, "[{}]", category.pipfile_section())?;
            write_packages(&mut out, self.section(category))?;
            writeln!(out)?;
        }

        for &(name, table) in &tables {
            writeln!(out, "[{}]", key(name))?;
            write_values(&mut out, table)?;
            writeln!(out)?;
        }

        if let Some(requires) = &self.requires {
            writeln!(out, "[requires]")?;
            if let Some(version) = &requires.python_version {
                writeln!(out, "python_version = {}", quoted(version))?;
            }
            if let Some(full_version) = &requires.python_full_version {
                writeln!(out, "python_full_version = {}", quoted(full_version))?;
            }
            writeln!(out)?;
        }

        if !self.scripts.is_empty() {
            writeln!(out, "[scripts]")?;
            for (name, command) in &self.scripts {
                writeln!(out, "{} = {}", key(name), quoted(command))?;
            }
            writeln!(out)?;
        }

        if let Some(settings) = &self.pipenv {
            writeln!(out, "[pipenv]")?;
            if settings.allow_prereleases {
                writeln!(out, "allow_prereleases = true")?;
            }
            write_values(&mut out, &settings.extra)?;
            writeln!(out)?;
        }

        for (name, items) in &arrays {
            for &table in items {
                writeln!(out, "[[{}]]", key(name))?;
                write_values(&mut out, table)?;
                writeln!(out)?;
            }
        }

        Ok(out)
    }
}

fn write_packages(out: &mut String, packages: &PipfileSection) -> Result<()> {
    for (name, package) in packages {
        match package {
            PipfilePackage::Simple(version) => {
                writeln!(out, "{} = {}", key(name), quoted(version))?;
            }
            PipfilePackage::Detailed(detail) => {
                writeln!(out, "{} = {{{}}}", key(name), detail_fields(detail).join(", "))?;
            }
        }
    }
    Ok(())
}

type Extra<'a, T> = Vec<(&'a str, T)>;

/// Partition unmodeled top-level keys into tables, arrays of tables and
/// bare values.
fn split_extra(
    extra: &PipfileExtra,
) -> (
    Extra<'_, &toml::Table>,
    Extra<'_, Vec<&toml::Table>>,
    Extra<'_, &toml::Value>,
) {
    let mut tables = Vec::new();
    let mut arrays = Vec::new();
    let mut bare = Vec::new();
    for (name, value) in extra {
        match value {
            toml::Value::Table(table) => tables.push((name.as_str(), table)),
            toml::Value::Array(items)
                if !items.is_empty() && items.iter().all(toml::Value::is_table) =>
            {
                let items = items.iter().filter_map(toml::Value::as_table).collect();
                arrays.push((name.as_str(), items));
            }
            _ => bare.push((name.as_str(), value)),
        }
    }
    (tables, arrays, bare)
}

/// Write `key = value` lines, nested tables inline.
fn write_values<'a>(
    out: &mut String,
    values: impl IntoIterator<Item = (&'a String, &'a toml::Value)>,
) -> Result<()> {
    for (name, value) in values {
        writeln!(out, "{} = {value}", key(name))?;
    }
    Ok(())
}

/// The inline table fields for a detailed package spec.
fn detail_fields(detail: &PipfilePackageDetail) -> Vec<String> {
    let mut fields = Vec::new();

    if let Some(version) = &detail.version {
        fields.push(format!("version = {}", quoted(version)));
    }
    if !detail.extras.is_empty() {
        let extras: Vec<_> = detail.extras.iter().map(String::as_str).map(quoted).collect();
        fields.push(format!("extras = [{}]", extras.join(", ")));
    }
    if let Some(git) = &detail.git {
        fields.push(format!("git = {}", quoted(git)));
    }
    if let Some(git_ref) = &detail.git_ref {
        fields.push(format!("ref = {}", quoted(git_ref)));
    }
    if let Some(path) = &detail.path {
        fields.push(format!("path = {}", quoted(path)));
    }
    if let Some(file) = &detail.file {
        fields.push(format!("file = {}", quoted(file)));
    }
    if detail.editable {
        fields.push("editable = true".to_owned());
    }
    if let Some(index) = &detail.index {
        fields.push(format!("index = {}", quoted(index)));
    }
    if let Some(markers) = &detail.markers {
        fields.push(format!("markers = {}", quoted(markers)));
    }
    if let Some(sys_platform) = &detail.sys_platform {
        fields.push(format!("sys_platform = {}", quoted(sys_platform)));
    }

    fields
}

/// A TOML basic string.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// A TOML key, quoted only when it is not a bare key.
fn key(name: &str) -> String {
    let bare = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if bare { name.to_owned() } else { quoted(name) }
}
