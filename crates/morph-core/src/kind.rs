//! # Structural Kinds — Single Source of Truth
//!
//! Defines the `Kind` enum: the structural tag carried by every schema
//! node. Capability checks and rule matching are enum comparisons on this
//! type, never runtime probes of a node's fields.
//!
//! The identifiers (`"File"`, `"Object"`, `"AnyOf"`, ...) are the ones
//! used across schema ecosystems for the same shapes, so a foreign schema
//! can declare its kind by name and still be matched.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// The structural kind of a schema node.
///
/// # Kinds
///
/// | Kind | Shape |
/// |------|-------|
/// | String, Number, Integer, Boolean, Null, File | primitive leaves |
/// | Object | ordered named properties |
/// | Array | homogeneous items |
/// | AnyOf, OneOf, AllOf | compositions over ordered branches |
/// | Optional, Nullable | wrappers with their own kind |
/// | Ref | lazy named reference into a definitions table |
/// | Foreign | opaque schema from another representation |
/// | Invalidated | explicit null marker left by a rewrite |
///
/// Codec wrappers have no kind of their own; they report the kind of the
/// node they wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// UTF-8 string leaf.
    String,
    /// Floating point number leaf.
    Number,
    /// Integer leaf.
    Integer,
    /// Boolean leaf.
    Boolean,
    /// Null leaf.
    Null,
    /// Binary upload leaf.
    File,
    /// Object with named properties.
    Object,
    /// Array with a single item schema.
    Array,
    /// Matches when at least one branch matches.
    AnyOf,
    /// Matches when exactly one branch matches.
    OneOf,
    /// Matches when every branch matches.
    AllOf,
    /// Wrapper marking an object property as not required.
    Optional,
    /// Wrapper admitting `null` in addition to the inner schema.
    Nullable,
    /// Named reference, resolved lazily.
    Ref,
    /// Opaque foreign schema.
    Foreign,
    /// Null marker produced by a rewrite whose replacement was empty.
    Invalidated,
}

impl Kind {
    /// Returns all kinds in canonical order.
    pub fn all() -> &'static [Kind] {
        &[
            Self::String,
            Self::Number,
            Self::Integer,
            Self::Boolean,
            Self::Null,
            Self::File,
            Self::Object,
            Self::Array,
            Self::AnyOf,
            Self::OneOf,
            Self::AllOf,
            Self::Optional,
            Self::Nullable,
            Self::Ref,
            Self::Foreign,
            Self::Invalidated,
        ]
    }

    /// Returns the identifier for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Number => "Number",
            Self::Integer => "Integer",
            Self::Boolean => "Boolean",
            Self::Null => "Null",
            Self::File => "File",
            Self::Object => "Object",
            Self::Array => "Array",
            Self::AnyOf => "AnyOf",
            Self::OneOf => "OneOf",
            Self::AllOf => "AllOf",
            Self::Optional => "Optional",
            Self::Nullable => "Nullable",
            Self::Ref => "Ref",
            Self::Foreign => "Foreign",
            Self::Invalidated => "Invalidated",
        }
    }

    /// Whether this kind is a primitive leaf.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Number | Self::Integer | Self::Boolean | Self::Null | Self::File
        )
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = CoreError;

    /// Parse a kind from its identifier. Case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| CoreError::UnknownKind(s.to_string()))
    }
}

/// Sub-kind of a primitive leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    /// UTF-8 string.
    String,
    /// Floating point number.
    Number,
    /// Integer.
    Integer,
    /// Boolean.
    Boolean,
    /// Null.
    Null,
    /// Binary upload.
    File,
}

impl PrimitiveKind {
    /// The structural kind of a leaf with this sub-kind.
    pub fn kind(&self) -> Kind {
        match self {
            Self::String => Kind::String,
            Self::Number => Kind::Number,
            Self::Integer => Kind::Integer,
            Self::Boolean => Kind::Boolean,
            Self::Null => Kind::Null,
            Self::File => Kind::File,
        }
    }
}

/// Kind of a composition node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompositionKind {
    /// At least one branch.
    AnyOf,
    /// Exactly one branch.
    OneOf,
    /// Every branch.
    AllOf,
}

impl CompositionKind {
    /// The structural kind of a composition with this sub-kind.
    pub fn kind(&self) -> Kind {
        match self {
            Self::AnyOf => Kind::AnyOf,
            Self::OneOf => Kind::OneOf,
            Self::AllOf => Kind::AllOf,
        }
    }

    /// The JSON Schema keyword for this composition.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::AnyOf => "anyOf",
            Self::OneOf => "oneOf",
            Self::AllOf => "allOf",
        }
    }
}

/// Kind of a wrapper node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WrapperKind {
    /// Property may be absent.
    Optional,
    /// Value may be `null`.
    Nullable,
    /// Value is decoded/encoded by a codec; reports the inner kind.
    Codec,
}
