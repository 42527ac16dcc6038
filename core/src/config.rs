//! Configuration.

use crate::ir::Namespace;
use crate::ir::Repository;
use crate::ErrorSource;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::os::raw::c_int;
use std::path::Path;

/// Filename of a GirZig config.
pub const FILENAME: &str = "GirZig.toml";

/// `GirZig.toml`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Emit deprecated entities, members and signals.
    pub include_deprecated: bool,

    /// Keep constant names as declared instead of lower-casing them.
    pub uppercase_constants: bool,

    /// Width in bits of the C `int` on the platform the bindings are generated for.
    pub native_int_width: u32,

    /// What target code should be generated.
    pub targets: BTreeSet<String>,

    /// Namespaces to generate. Empty means all of them.
    pub namespaces: Vec<String>,
}

impl Config {
    /// Reads config from filesystem.
    ///
    /// Returns a default config if the file is not found.
    pub fn read(path: &Path) -> Result<Self, crate::Error> {
        if !path.is_file() {
            return Ok(Default::default());
        }

        log::info!("Reading `{}`", path.display());
        let raw = std::fs::read_to_string(path).map_err(|err| crate::Error {
            file: path.to_owned(),
            source: ErrorSource::ReadConfig(err),
        })?;
        toml::from_str(&raw).map_err(|err| crate::Error {
            file: path.to_owned(),
            source: ErrorSource::ParseConfig(err),
        })
    }

    /// Namespaces of a [Repository] selected for generation.
    pub fn select<'a>(&self, repository: &'a Repository) -> Vec<&'a Namespace> {
        if self.namespaces.is_empty() {
            return repository.namespaces.iter().collect();
        }
        self.namespaces
            .iter()
            .filter_map(|name| {
                let namespace = repository.namespace(name);
                if namespace.is_none() {
                    log::warn!("Namespace `{}` is not in the description, skipping…", name);
                }
                namespace
            })
            .collect()
    }

    /// Whether an item with the given deprecation status should be emitted.
    pub fn includes(&self, deprecated: bool) -> bool {
        !deprecated || self.include_deprecated
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include_deprecated: false,
            uppercase_constants: true,
            native_int_width: (std::mem::size_of::<c_int>() * 8) as u32,
            targets: std::iter::once("zig".to_string()).collect(),
            namespaces: Default::default(),
        }
    }
}
