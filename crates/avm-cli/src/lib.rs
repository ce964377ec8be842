//! # avm-cli: Avro Model Command-Line Interface
//!
//! Thin front end over [`avm_model`]. Every subcommand loads one or more
//! `.avsc` files into a fresh [`Registry`](avm_model::Registry) and then
//! works against the models it produces.
//!
//! ## Subcommands
//!
//! - `validate`: check JSON documents against a named type
//! - `canonical`: print the canonical JSON text of a document
//! - `inspect`: list the types a set of schema files defines
//!
//! Handlers return `anyhow::Result<u8>` where the `u8` is the process exit
//! code. Domain logic stays in the library crates.

pub mod canonical;
pub mod inspect;
pub mod load;
pub mod validate;
