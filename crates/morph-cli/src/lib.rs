//! # morph-cli — Developer Tool for the Schema Engine
//!
//! Drives the engine from the command line. It is not a server bootstrap:
//! every subcommand loads files, calls into the library crates, and prints.
//!
//! ## Subcommands
//!
//! - `morph inspect` — apply a coercion policy and print the lowered schema.
//! - `morph probe` — report which kinds, codecs, and coercion tags a schema
//!   reaches.
//! - `morph check` — validate documents against a (coerced) schema.
//!
//! Schemas are JSON Schema documents in JSON or YAML, converted into native
//! nodes by the built-in bridge conversion.
//!
//! ```bash
//! morph inspect user.schema.json --policy query
//! morph probe upload.schema.yaml --kind File
//! morph check user.schema.json fixtures/*.json --policy auto
//! ```

pub mod check;
pub mod config;
pub mod inspect;
pub mod probe;

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use morph_core::{Kind, Schema};
use morph_schema::from_json_schema;
use morph_transform::{
    coerce_form_data, coerce_query, coerce_root_primitive, coerce_structural_string,
    has_capability,
};
use serde_json::Value;

/// The coercion policy to apply before lowering or validating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Policy {
    /// Leave the schema as loaded.
    #[default]
    None,
    /// Nested objects and arrays arrive as JSON strings.
    StructuralString,
    /// Query-string parameters: nested objects as JSON, arrays comma-separated.
    Query,
    /// A bare numeric or boolean root arrives as a string.
    RootPrimitive,
    /// Multipart fields: first-level objects and arrays arrive as JSON strings.
    FormData,
    /// Form data when the schema reaches a file, root primitive for numeric
    /// and boolean roots, query otherwise.
    Auto,
}

impl Policy {
    /// Rewrite `schema` under this policy.
    pub fn apply(self, schema: &Schema) -> Schema {
        let rewritten = match self.resolve(schema) {
            Self::None | Self::Auto => Some(schema.clone()),
            Self::StructuralString => coerce_structural_string(Some(schema)),
            Self::Query => coerce_query(Some(schema)),
            Self::RootPrimitive => coerce_root_primitive(Some(schema)),
            Self::FormData => coerce_form_data(Some(schema)),
        };
        rewritten.unwrap_or_else(|| schema.clone())
    }

    /// The concrete policy `Auto` picks for `schema`.
    pub fn resolve(self, schema: &Schema) -> Self {
        if self != Self::Auto {
            return self;
        }
        let picked = if has_capability(Kind::File, Some(schema)) {
            Self::FormData
        } else if matches!(schema.kind(), Kind::Number | Kind::Boolean) {
            Self::RootPrimitive
        } else {
            Self::Query
        };
        tracing::debug!(policy = ?picked, "auto policy resolved");
        picked
    }
}

/// Read a JSON or YAML file into a JSON value. `.yaml` / `.yml` files are
/// parsed as YAML, everything else as JSON.
pub fn read_value(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    if is_yaml {
        serde_yaml::from_str(&text).with_context(|| format!("invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
    }
}

/// Load a JSON Schema document from `path` as native schema nodes.
pub fn load_schema(path: &Path) -> Result<Schema> {
    let document = read_value(path)?;
    let schema = from_json_schema(&document)
        .with_context(|| format!("cannot convert schema {}", path.display()))?;
    tracing::debug!(path = %path.display(), kind = %schema.kind(), "schema loaded");
    Ok(schema)
}
