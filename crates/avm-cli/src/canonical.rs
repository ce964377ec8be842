//! # Canonical Subcommand
//!
//! Conforms a single JSON document to a type and prints its canonical text:
//! record fields in declaration order, defaults filled in, enum symbols and
//! union branches resolved.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use avm_model::{Instance, RegistryConfig};

use crate::load::{load_document, load_registry, SchemaArgs};

/// Arguments for the canonical subcommand.
#[derive(Args, Debug)]
pub struct CanonicalArgs {
    #[command(flatten)]
    pub schemas: SchemaArgs,

    /// Fullname of the type to conform to.
    #[arg(long = "type", short = 't')]
    pub type_name: String,

    /// JSON document to conform.
    pub document: PathBuf,
}

/// Execute the canonical subcommand.
pub fn run_canonical(args: &CanonicalArgs, config: &RegistryConfig) -> Result<u8> {
    let instance = conform(args, config)?;
    println!("{}", instance.to_text());
    Ok(0)
}

fn conform(args: &CanonicalArgs, config: &RegistryConfig) -> Result<Instance> {
    let registry = load_registry(config, &args.schemas.schemas)?;
    let model = registry
        .lookup(&args.type_name)
        .with_context(|| format!("unknown type '{}'", args.type_name))?;
    let value = load_document(&args.document)?;
    model
        .construct(value)
        .with_context(|| format!("{} does not conform to {}", args.document.display(), model.name()))
}
