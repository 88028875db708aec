//! # morph-core — Foundational Types for the Schema Engine
//!
//! Defines the schema representation every other crate in the workspace
//! operates on, plus the small amount of shared machinery around it.
//!
//! ## Key Design Principles
//!
//! 1. **One tagged node model.** [`Schema`] is a shared handle to an
//!    immutable [`Node`]: primitive, object, array, composition, wrapper,
//!    reference, or foreign. Every node reports a [`Kind`]; capability
//!    checks and rule matching compare kinds, nothing else.
//!
//! 2. **Lazy references.** Recursive schemas are expressed through
//!    [`Reference`] nodes into a write-once [`Definitions`] table. Targets
//!    are resolved on demand and never inlined.
//!
//! 3. **Foreign schemas stay opaque.** A [`ForeignSchema`] exposes
//!    optional capabilities (declared kind, embedded document, Standard
//!    Validation) through accessors; the engine never guesses by name.
//!
//! 4. **Structural identity for caching.** [`CanonicalBytes`] and
//!    [`ContentDigest`] give a stable key for "the same schema", used by
//!    the validator cache.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `morph-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod codec;
pub mod digest;
pub mod error;
pub mod foreign;
pub mod kind;
pub mod node;
pub mod registry;
pub mod tag;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use codec::{Codec, CustomCodec};
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{CanonicalizationError, CoreError};
pub use foreign::{ForeignSchema, Issue, JsonSchemaDocument, Outcome, StandardValidate};
pub use kind::{CompositionKind, Kind, PrimitiveKind, WrapperKind};
pub use node::{
    Array, Composition, Constraints, Definitions, Foreign, Meta, Node, Object, Primitive,
    Reference, Schema, Wrapper,
};
pub use registry::{resolve_schema, Models, Module, Registry, SchemaSource};
pub use tag::CoercionTag;
