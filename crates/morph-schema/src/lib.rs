//! # morph-schema — Validator Compilation
//!
//! Turns [`morph_core::Schema`] trees into executable validators.
//!
//! ## Pipeline
//!
//! 1. **Lowering** (`lower`): native nodes become a self-contained JSON
//!    Schema (Draft 2020-12) document. Codec wrappers lower to their
//!    structural form with an `x-codec` annotation; references land in
//!    `$defs`.
//! 2. **Compilation** (`compile`): the lowered document is compiled by the
//!    `jsonschema` backend and cached by the digest of its canonical bytes.
//!    Foreign schemas go through the bridge (`bridge`) or their Standard
//!    Validation Capability.
//! 3. **Validation** (`validate`): a boolean fast path, lazy error
//!    iteration, and decode-then-check through the schema's codecs
//!    (`transcode`).
//!
//! ## Crate Policy
//!
//! - Compilation failures are typed ([`CompileError`]); an absent bridge
//!   is never an error.
//! - Validators are immutable and shareable across threads.

pub mod bridge;
pub mod compile;
pub mod error;
pub mod lower;
pub mod options;
pub mod transcode;
pub mod validate;

pub use bridge::{
    from_json_schema, has_bridge, install_bridge, JsonSchemaBridge, SchemaBridge, MAX_NESTING,
};
pub use compile::{default_compiler, to_validator, Compiler};
pub use error::{CompileError, ConversionError};
pub use lower::{lower, lower_with};
pub use options::CompilerOptions;
pub use transcode::{decode_value, encode_value};
pub use validate::{CompiledValidator, StandardValidator, Validator};
