//! Pipfile and `Pipfile.lock` handling for ripenv-upgrade.
//!
//! This module provides Rust types that mirror the Pipfile TOML schema and
//! the `Pipfile.lock` JSON schema, plus the operations the upgrade engine
//! performs on them.
//!
//! ## Architecture
//!
//! Both files are partitioned by [`Category`]:
//!
//! - `[packages]` <-> `default`
//! - `[dev-packages]` <-> `develop`
//!
//! [`entry`] records requested packages in the Pipfile, [`bridge`] renders a
//! Pipfile section as requirement lines for the resolver, and [`lockfile`]
//! owns the lock model, its `_meta` hash and atomic persistence.

pub mod bridge;
pub mod category;
pub mod entry;
pub mod lockfile;
pub mod model;
mod writer;

pub use category::{Category, UnknownCategory};
pub use entry::{GeneratedEntry, generate_entry};
pub use lockfile::{LockExtra, LockSection, LockedPackage, PipfileLock};
pub use model::{
    Pipfile, PipfileExtra, PipfilePackage, PipfilePackageDetail, PipfileRequires,
    PipfileSection, PipfileSettings, PipfileSource,
};
