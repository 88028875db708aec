//! # morph-transform — Capability Detection & Schema Rewriting
//!
//! Operates on [`morph_core::Schema`] trees without ever mutating them.
//!
//! ## Capability Detection (`detect`)
//!
//! [`has_capability`] answers "does this schema reach a node of kind K?"
//! across properties, items, composition branches, wrappers, and reference
//! targets. Callers use it to gate which transport policy a route needs
//! (e.g. a schema reaching `File` must be read as multipart).
//!
//! ## Transformation Engine (`engine`)
//!
//! [`replace_schema`] rewrites a tree with a list of [`Rule`]s. Each rule is
//! a shape pattern, a replacement function, and traversal flags
//! (`root_only`, `exclude_root`, `only_first`, `until_object_found`).
//! Conflicting flags are rejected before traversal starts.
//!
//! ## Coercion Policies (`policy`)
//!
//! Four process-wide rule sets for string transports: structural-string,
//! query, root-primitive, and form-data.
//!
//! ## Crate Policy
//!
//! - Depends only on `morph-core` internally.
//! - Every traversal uses an explicit work stack; stack usage is
//!   independent of schema depth.
//! - Cyclic reference graphs always terminate.

pub mod detect;
pub mod engine;
pub mod error;
pub mod policy;

pub use detect::{has_capability, has_codec, has_coercion, reaches};
pub use engine::{replace_schema, ReplaceFn, Rule, RuleSet};
pub use error::TransformError;
pub use policy::{
    coerce_form_data, coerce_query, coerce_root_primitive, coerce_structural_string, encode_as,
    form_data, query, root_primitive, structural_string,
};
