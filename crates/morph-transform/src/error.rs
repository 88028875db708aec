//! # Transformation Errors

use thiserror::Error;

/// Error raised before a rewrite starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Two traversal flags that cannot be combined were both set.
    #[error("conflicting rule flags: `{first}` cannot be combined with `{second}`")]
    ConflictingFlags {
        /// The first flag of the pair.
        first: &'static str,
        /// The second flag of the pair.
        second: &'static str,
    },
}
