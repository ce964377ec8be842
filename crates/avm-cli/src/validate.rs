//! # Validate Subcommand
//!
//! Checks JSON documents against one registered type and prints one line
//! per document:
//!
//! ```text
//! avm validate -s schemas/Date.avsc -s schemas/Occupation.avsc \
//!     -s schemas/User.avsc --type example.avro.User data/*.json
//! OK    data/user.json
//! FAIL  data/user_bad_occupation.json: value "ASTRONAUT" does not conform ...
//! ```
//!
//! Exits 0 when every document conforms and 1 otherwise.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use avm_model::RegistryConfig;

use crate::load::{load_document, load_registry, SchemaArgs};

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub schemas: SchemaArgs,

    /// Fullname of the type to validate against.
    #[arg(long = "type", short = 't')]
    pub type_name: String,

    /// JSON documents to check.
    #[arg(required = true)]
    pub documents: Vec<PathBuf>,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs, config: &RegistryConfig) -> Result<u8> {
    let registry = load_registry(config, &args.schemas.schemas)?;
    let model = registry
        .lookup(&args.type_name)
        .with_context(|| format!("unknown type '{}'", args.type_name))?;

    let mut failures = 0usize;
    for path in &args.documents {
        let outcome = load_document(path).and_then(|value| model.construct(value).map_err(anyhow::Error::from));
        match outcome {
            Ok(_) => println!("OK    {}", path.display()),
            Err(e) => {
                failures += 1;
                println!("FAIL  {}: {e:#}", path.display());
            }
        }
    }

    tracing::info!(documents = args.documents.len(), failures, model = model.name(), "validation finished");
    Ok(u8::from(failures > 0))
}
