//! # Coercion Tags
//!
//! The vocabulary stamped on nodes produced by a coercion pass. Consumers
//! read these tags to decide how a raw transport value is decoded before
//! validation.
//!
//! Tags are set only by coercion rewriting. Raw schema input (documents
//! converted by a bridge, hand-built nodes) never carries one.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// Marks a node as requiring string-transport decode/encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoercionTag {
    /// Object transported as a JSON string.
    ObjectString,
    /// Array transported as a JSON string.
    ArrayString,
    /// Array transported as repeated or comma-separated query values.
    ArrayQuery,
    /// Boolean transported as `"true"` / `"false"`.
    BooleanString,
    /// Number transported as a numeric string.
    NumericString,
}

impl CoercionTag {
    /// Returns all tags in canonical order.
    pub fn all() -> &'static [CoercionTag] {
        &[
            Self::ObjectString,
            Self::ArrayString,
            Self::ArrayQuery,
            Self::BooleanString,
            Self::NumericString,
        ]
    }

    /// Returns the identifier for this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ObjectString => "ObjectString",
            Self::ArrayString => "ArrayString",
            Self::ArrayQuery => "ArrayQuery",
            Self::BooleanString => "BooleanString",
            Self::NumericString => "NumericString",
        }
    }
}

impl std::fmt::Display for CoercionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoercionTag {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| CoreError::UnknownCoercionTag(s.to_string()))
    }
}
