//! # Error Types — Core Error Hierarchy
//!
//! Defines the error types shared by every crate in the morph workspace.
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Vocabulary parse failures name the offending identifier.
//! - Definitions tables are write-once; a second seal is an error, not a
//!   silent overwrite.
//! - Validation issues are never errors. They travel as data
//!   ([`Outcome::Issues`](crate::foreign::Outcome)).

use thiserror::Error;

/// Top-level error type for the core crate.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A kind identifier did not name a known structural kind.
    #[error("unknown schema kind: {0:?}")]
    UnknownKind(String),

    /// A coercion tag identifier did not name a known tag.
    #[error("unknown coercion tag: {0:?}")]
    UnknownCoercionTag(String),

    /// A definitions table was sealed twice.
    #[error("definitions table is already sealed")]
    DefinitionsSealed,
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
