//! Core components of GirZig
//!
//! GirZig turns a description of an introspected object-oriented C API into Zig declarations and
//! wrapper functions. [bindgen] is the entry point.

pub mod config;
pub mod ir;
pub mod util;
pub mod zig;

use config::Config;
use ir::Entity;
use ir::Namespace;
use ir::Repository;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fmt::Formatter;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

/// Target code generation.
pub trait TargetCodeWriter {
    /// Name of the file holding the target code of a namespace.
    fn file_name(&self, namespace: &Namespace) -> String;

    /// Generates target code for a namespace.
    fn write_target_namespace(&self, namespace: &Namespace, repository: &Repository) -> Generated;

    /// Generates target code for a single top-level entity.
    fn write_target_entity(
        &self,
        entity: &Entity,
        namespace: &Namespace,
        repository: &Repository,
    ) -> Generated;

    /// Generates target code for every selected namespace.
    fn write_target_all(&self, repository: &Repository, config: &Config) -> Vec<(String, Generated)> {
        config
            .select(repository)
            .into_iter()
            .map(|namespace| {
                log::info!("Generating bindings for namespace `{}`", &namespace.name);
                (
                    self.file_name(namespace),
                    self.write_target_namespace(namespace, repository),
                )
            })
            .collect()
    }
}

/// Target code along with everything that could not be translated faithfully.
#[derive(Debug, Default, PartialEq)]
pub struct Generated {
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// A construct replaced by a placeholder during generation.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub namespace: String,
    pub message: String,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.namespace, self.message)
    }
}

/// Writes a source file.
///
/// The file will be created first, and all existing content will be erased.
async fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    log::info!("Writing to `{}`", path.display());

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await
}

/// Generates language bindings and writes to an output directory.
///
/// Every target gets its own subdirectory. Returns the diagnostics of all namespaces.
pub async fn bindgen(
    repository: &Repository,
    config: &Config,
    output_directory: &Path,
) -> Result<Vec<Diagnostic>, Error> {
    let mut diagnostics = Vec::new();
    for (target, writer) in create_target_code_writers(config).into_iter() {
        let target_output_directory = output_directory.join(&target);
        for (file_name, generated) in writer.write_target_all(repository, config) {
            let path = target_output_directory.join(file_name);
            if let Err(err) = write_file(&path, &generated.source).await {
                return Err(Error {
                    file: path,
                    source: ErrorSource::Write(err),
                });
            }
            diagnostics.extend(generated.diagnostics);
        }
    }
    Ok(diagnostics)
}

/// This is where [TargetCodeWriter] implementations are registered.
fn create_target_code_writers(config: &Config) -> BTreeMap<String, Box<dyn TargetCodeWriter>> {
    let mut map = BTreeMap::<String, Box<dyn TargetCodeWriter>>::new();
    for target in config.targets.iter() {
        match target.as_str() {
            "zig" => {
                map.insert(target.clone(), Box::new(zig::ZigWriter::new(config.clone())));
            }
            _ => log::warn!("Unsupported target `{}`", target),
        }
    }
    map
}

/// Errors when reading a description or writing target code.
#[derive(Error, Debug)]
pub struct Error {
    /// The file which causes the error.
    pub file: PathBuf,
    pub source: ErrorSource,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.file.display())
    }
}

/// Cause of [Error].
#[derive(Error, Debug)]
pub enum ErrorSource {
    #[error("Failed to read the API description")]
    ReadDescription(#[source] std::io::Error),

    #[error("Malformed API description")]
    ParseDescription(#[source] serde_json::Error),

    #[error("Failed to read the configuration")]
    ReadConfig(#[source] std::io::Error),

    #[error("Malformed configuration")]
    ParseConfig(#[source] toml::de::Error),

    #[error("Failed to write target code")]
    Write(#[source] std::io::Error),
}

#[cfg(test)]
fn normalize_source_code(code: &str) -> String {
    let regex = regex::Regex::new(r"\s+").unwrap();
    regex.replace_all(code.trim(), " ").into_owned()
}
