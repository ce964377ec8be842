//! # Inspect Subcommand
//!
//! Lists every named type a set of schema files defines, with its kind and
//! structural fingerprint. Types only defined inline inside another schema
//! are marked `(inline)`.

use anyhow::Result;
use clap::Args;

use avm_model::{Registry, RegistryConfig};

use crate::load::{load_registry, SchemaArgs};

/// Arguments for the inspect subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub schemas: SchemaArgs,
}

/// One row of inspect output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSummary {
    pub fullname: String,
    pub kind: String,
    pub fingerprint: String,
    pub registered: bool,
}

/// Execute the inspect subcommand.
pub fn run_inspect(args: &InspectArgs, config: &RegistryConfig) -> Result<u8> {
    let registry = load_registry(config, &args.schemas.schemas)?;
    let rows = summarize(&registry)?;
    for row in &rows {
        let marker = if row.registered { "" } else { " (inline)" };
        println!("{:<40} {:<8} {}{marker}", row.fullname, row.kind, row.fingerprint);
    }
    println!();
    println!("Total: {} types", rows.len());
    Ok(0)
}

/// Summarize every defined fullname, sorted.
pub fn summarize(registry: &Registry) -> Result<Vec<TypeSummary>> {
    let registered = registry.registered();
    registry
        .fullnames()
        .into_iter()
        .map(|fullname| -> Result<TypeSummary> {
            let model = registry.lookup(&fullname)?;
            let fingerprint = model.fingerprint()?.to_hex();
            Ok(TypeSummary {
                registered: registered.contains(&fullname),
                kind: model.kind().to_string(),
                fingerprint,
                fullname,
            })
        })
        .collect()
}
