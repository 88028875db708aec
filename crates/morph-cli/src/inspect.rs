//! # Inspect Subcommand
//!
//! Applies a coercion policy to a schema and prints the lowered JSON Schema
//! the validator compiler would hand to its backend.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use morph_schema::lower;
use serde_json::Value;

use crate::{load_schema, Policy};

/// Arguments for the `morph inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// JSON Schema document (JSON or YAML).
    #[arg(value_name = "SCHEMA")]
    pub schema: PathBuf,

    /// Coercion policy applied before lowering.
    #[arg(long, value_enum, default_value_t = Policy::None)]
    pub policy: Policy,

    /// Print compact JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,
}

/// Execute the inspect subcommand.
///
/// Returns exit code 0; failures to load or lower are errors.
pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let lowered = lowered_document(&args.schema, args.policy)?;
    let rendered = if args.compact {
        serde_json::to_string(&lowered)?
    } else {
        serde_json::to_string_pretty(&lowered)?
    };
    println!("{rendered}");
    Ok(0)
}

/// Load, coerce, and lower the schema at `path`.
pub fn lowered_document(path: &Path, policy: Policy) -> Result<Value> {
    let schema = load_schema(path)?;
    let coerced = policy.apply(&schema);
    lower(&coerced).with_context(|| format!("cannot lower {}", path.display()))
}
