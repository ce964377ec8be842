//! # avm CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use avm_cli::canonical::{run_canonical, CanonicalArgs};
use avm_cli::inspect::{run_inspect, InspectArgs};
use avm_cli::load::load_config;
use avm_cli::validate::{run_validate, ValidateArgs};

/// Avro model toolchain.
///
/// Registers Avro schema files and checks, canonicalizes, or lists the
/// runtime models synthesized from them.
#[derive(Parser, Debug)]
#[command(name = "avm", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a registry configuration file (YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check JSON documents against a registered type.
    Validate(ValidateArgs),

    /// Print the canonical JSON text of a document.
    Canonical(CanonicalArgs),

    /// List the types defined by a set of schema files.
    Inspect(InspectArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Validate(args) => run_validate(args, &config),
        Commands::Canonical(args) => run_canonical(args, &config),
        Commands::Inspect(args) => run_inspect(args, &config),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_parse_validate() {
        let cli = Cli::try_parse_from([
            "avm",
            "validate",
            "--schema",
            "Date.avsc",
            "-s",
            "User.avsc",
            "--type",
            "example.avro.User",
            "a.json",
            "b.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Validate(args) => {
                assert_eq!(args.schemas.schemas.len(), 2);
                assert_eq!(args.type_name, "example.avro.User");
                assert_eq!(args.documents, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
            }
            other => panic!("Expected Validate, got: {other:?}"),
        }
    }

    #[test]
    fn cli_parse_validate_requires_documents() {
        assert!(Cli::try_parse_from(["avm", "validate", "-s", "Date.avsc", "-t", "Date"]).is_err());
    }

    #[test]
    fn cli_parse_canonical() {
        let cli = Cli::try_parse_from(["avm", "canonical", "-s", "Date.avsc", "-t", "Date", "d.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Canonical(_)));
    }

    #[test]
    fn cli_parse_inspect_requires_schema() {
        assert!(Cli::try_parse_from(["avm", "inspect"]).is_err());
        let cli = Cli::try_parse_from(["avm", "inspect", "-s", "Date.avsc"]).unwrap();
        assert!(matches!(cli.command, Commands::Inspect(_)));
    }

    #[test]
    fn cli_parse_verbose_levels() {
        let cli0 = Cli::try_parse_from(["avm", "inspect", "-s", "x.avsc"]).unwrap();
        assert_eq!(cli0.verbose, 0);

        let cli2 = Cli::try_parse_from(["avm", "-vv", "inspect", "-s", "x.avsc"]).unwrap();
        assert_eq!(cli2.verbose, 2);

        let cli3 = Cli::try_parse_from(["avm", "inspect", "-s", "x.avsc", "-vvv"]).unwrap();
        assert_eq!(cli3.verbose, 3);
    }

    #[test]
    fn cli_parse_config_option() {
        let cli = Cli::try_parse_from(["avm", "--config", "avm.yaml", "inspect", "-s", "x.avsc"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("avm.yaml")));
    }

    #[test]
    fn cli_parse_no_subcommand_errors() {
        assert!(Cli::try_parse_from(["avm"]).is_err());
    }
}
