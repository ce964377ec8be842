//! # Shared Loading
//!
//! Configuration, schema files, and JSON documents, read from disk with
//! the path attached to every failure.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use avm_core::Datum;
use avm_model::{Behavior, Registry, RegistryConfig};

/// Schema arguments shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Schema file to register (`.avsc`). Repeat for several files; a file
    /// may refer to types defined in a later one.
    #[arg(long = "schema", short = 's', required = true)]
    pub schemas: Vec<PathBuf>,
}

/// Load a registry configuration, or the default when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<RegistryConfig> {
    let Some(path) = path else {
        return Ok(RegistryConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let config: RegistryConfig =
        serde_yaml::from_str(&content).with_context(|| format!("invalid YAML in {}", path.display()))?;
    tracing::debug!(config = %path.display(), ?config, "loaded registry config");
    Ok(config)
}

/// Build a registry holding every schema file, in order.
pub fn load_registry(config: &RegistryConfig, schemas: &[PathBuf]) -> Result<Registry> {
    let registry = Registry::new(config.clone());
    for path in schemas {
        let model = registry
            .register_file(path, Behavior::default())
            .with_context(|| format!("failed to register schema: {}", path.display()))?;
        tracing::info!(schema = %path.display(), model = model.name(), "registered");
    }
    Ok(registry)
}

/// Read a JSON document into a datum.
pub fn load_document(path: &Path) -> Result<Datum> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read document: {}", path.display()))?;
    Datum::from_json_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Path of a file under the repository `schemas/` directory.
#[cfg(test)]
pub(crate) fn fixture(file: &str) -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir.join("schemas").join(file)
}
