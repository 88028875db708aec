//! # Compilation Errors
//!
//! Only failures to produce a validator are errors. A value failing
//! validation is reported as [`Outcome::Issues`](morph_core::Outcome), and
//! a bridge that cannot convert a schema is skipped, never surfaced.

use morph_core::CanonicalizationError;
use thiserror::Error;

/// Error raised while compiling a schema into a validator.
#[derive(Error, Debug)]
pub enum CompileError {
    /// No strategy can compile the schema: it is not native, no bridge
    /// converted it, and it exposes no Standard Validation Capability.
    #[error("unsupported schema: {0}")]
    Unsupported(String),

    /// A reference names a definition its table does not contain.
    #[error("unresolved reference: {0:?}")]
    UnresolvedReference(String),

    /// The lowered JSON Schema was rejected by the validator backend.
    #[error("validator build error: {0}")]
    Build(String),

    /// The lowered schema could not be canonicalized for the cache key.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Why a bridge could not convert a foreign schema.
///
/// Both variants mean "conversion unavailable" to the compiler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// The bridge does not handle this schema.
    #[error("conversion unsupported")]
    Unsupported,

    /// The bridge tried and failed.
    #[error("conversion failed: {0}")]
    Failed(String),
}
