//! # Check Subcommand
//!
//! Validates documents against a schema the way a transport layer would:
//! coerce the schema, compile it once, then decode and validate each
//! document.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use morph_core::{Issue, Outcome};
use morph_schema::{Compiler, CompilerOptions, Validator};

use crate::{load_schema, read_value, Policy};

/// Arguments for the `morph check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// JSON Schema document (JSON or YAML).
    #[arg(value_name = "SCHEMA")]
    pub schema: PathBuf,

    /// Documents to validate (JSON or YAML).
    #[arg(value_name = "DOCUMENT", required = true)]
    pub documents: Vec<PathBuf>,

    /// Coercion policy applied before compiling.
    #[arg(long, value_enum, default_value_t = Policy::None)]
    pub policy: Policy,

    /// Print each document's decoded value when it passes.
    #[arg(long)]
    pub show_decoded: bool,
}

/// Result of validating one document.
#[derive(Debug)]
pub struct DocumentResult {
    /// The document's path.
    pub path: PathBuf,
    /// The validation outcome.
    pub outcome: Outcome,
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 when every document passes, 1 otherwise.
pub fn run_check(args: &CheckArgs, options: &CompilerOptions) -> Result<u8> {
    let validator = compile_schema(&args.schema, args.policy, options)?;
    let results = check_documents(&validator, &args.documents)?;

    let passed = results.iter().filter(|r| r.outcome.is_valid()).count();
    for result in &results {
        match &result.outcome {
            Outcome::Value(value) => {
                println!("  OK: {}", result.path.display());
                if args.show_decoded {
                    println!("{}", serde_json::to_string_pretty(value)?);
                }
            }
            Outcome::Issues(issues) => {
                println!("  FAIL: {}", result.path.display());
                for issue in issues {
                    println!("    {}", render(issue));
                }
            }
        }
    }
    println!("Documents: {}/{} passed", passed, results.len());

    Ok(if passed == results.len() { 0 } else { 1 })
}

/// Load, coerce, and compile the schema at `path`.
pub fn compile_schema(path: &Path, policy: Policy, options: &CompilerOptions) -> Result<Validator> {
    let schema = policy.apply(&load_schema(path)?);
    let validator = Compiler::new(options.clone())
        .compile(&schema)
        .with_context(|| format!("cannot compile {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        compiled = validator.is_compiled(),
        "validator ready"
    );
    Ok(validator)
}

/// Validate every document at `paths`. Unreadable documents are errors,
/// invalid ones are results.
pub fn check_documents(validator: &Validator, paths: &[PathBuf]) -> Result<Vec<DocumentResult>> {
    paths
        .iter()
        .map(|path| {
            let value = read_value(path)?;
            Ok(DocumentResult {
                path: path.clone(),
                outcome: validator.validate(&value),
            })
        })
        .collect()
}

fn render(issue: &Issue) -> String {
    match issue.path.as_deref() {
        None | Some("") => issue.message.clone(),
        Some(path) => format!("{path}: {}", issue.message),
    }
}
