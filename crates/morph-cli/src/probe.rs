//! # Probe Subcommand
//!
//! Reports what a schema reaches: node kinds, codecs, coercion tags, and
//! whether a schema bridge is available to the compiler.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use morph_core::{CoercionTag, Kind, Schema};
use morph_schema::has_bridge;
use morph_transform::{has_capability, has_codec, has_coercion};
use serde::Serialize;

use crate::{load_schema, Policy};

/// Arguments for the `morph probe` subcommand.
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// JSON Schema document (JSON or YAML).
    #[arg(value_name = "SCHEMA")]
    pub schema: PathBuf,

    /// Only report these kinds; exit 1 unless every one is reached.
    #[arg(long = "kind", value_name = "KIND")]
    pub kinds: Vec<Kind>,

    /// Coercion policy applied before probing.
    #[arg(long, value_enum, default_value_t = Policy::None)]
    pub policy: Policy,
}

/// What a schema reaches.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProbeReport {
    /// Kinds reached, in canonical order.
    pub kinds: Vec<Kind>,
    /// Coercion tags reached.
    pub coercions: Vec<CoercionTag>,
    /// Whether any reached node needs decoding.
    pub decodes: bool,
    /// Whether the process has a schema bridge.
    pub bridge: bool,
}

impl ProbeReport {
    /// Probe `schema`, optionally restricted to `kinds`.
    pub fn new(schema: &Schema, kinds: &[Kind]) -> Self {
        let candidates = if kinds.is_empty() { Kind::all() } else { kinds };
        Self {
            kinds: candidates
                .iter()
                .copied()
                .filter(|k| has_capability(*k, Some(schema)))
                .collect(),
            coercions: CoercionTag::all()
                .iter()
                .copied()
                .filter(|t| has_coercion(*t, Some(schema)))
                .collect(),
            decodes: has_codec(Some(schema)),
            bridge: has_bridge(),
        }
    }
}

/// Execute the probe subcommand.
///
/// Returns exit code 1 when `--kind` filters were given and one of them is
/// not reached, 0 otherwise.
pub fn run_probe(args: &ProbeArgs) -> Result<u8> {
    let schema = args.policy.apply(&load_schema(&args.schema)?);
    let report = ProbeReport::new(&schema, &args.kinds);
    println!("{}", serde_json::to_string_pretty(&report)?);

    let missing: Vec<&Kind> = args
        .kinds
        .iter()
        .filter(|k| !report.kinds.contains(k))
        .collect();
    if missing.is_empty() {
        Ok(0)
    } else {
        tracing::info!(?missing, "requested kinds not reached");
        Ok(1)
    }
}
