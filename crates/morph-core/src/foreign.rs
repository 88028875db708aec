//! # Foreign Schemas and the Standard Validation Capability
//!
//! A foreign schema comes from a representation the engine cannot
//! introspect structurally. It may still expose:
//!
//! - a declared [`Kind`], so capability checks can match it by name;
//! - an embedded JSON Schema document, which a bridge can convert into
//!   native nodes;
//! - the Standard Validation Capability: a uniform
//!   `validate(value) -> {value} | {issues}` contract.
//!
//! Capability presence is detected through the accessor methods of
//! [`ForeignSchema`], never by inspecting the vendor name.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::Kind;

/// A single validation issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Human-readable description of the problem.
    pub message: String,
    /// JSON Pointer to the offending value, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Issue {
    /// An issue at the given path.
    pub fn at(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// An issue with no location.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path.as_deref() {
            None | Some("") => write!(f, "(root): {}", self.message),
            Some(path) => write!(f, "{path}: {}", self.message),
        }
    }
}

/// The result of validating a value: the (possibly decoded) value, or the
/// ordered list of issues. Never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The value conformed.
    Value(Value),
    /// The value did not conform.
    Issues(Vec<Issue>),
}

impl Outcome {
    /// Whether the outcome carries a value.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// The issues, if any.
    pub fn issues(&self) -> &[Issue] {
        match self {
            Self::Value(_) => &[],
            Self::Issues(issues) => issues,
        }
    }

    /// Convert into a `Result`.
    pub fn into_result(self) -> Result<Value, Vec<Issue>> {
        match self {
            Self::Value(v) => Ok(v),
            Self::Issues(issues) => Err(issues),
        }
    }
}

/// The Standard Validation Capability.
pub trait StandardValidate: Send + Sync {
    /// Validate a value.
    fn validate(&self, value: &Value) -> Outcome;
}

/// A schema from a representation the engine cannot introspect.
pub trait ForeignSchema: fmt::Debug + Send + Sync {
    /// Identifier of the originating ecosystem (diagnostics only).
    fn vendor(&self) -> &str;

    /// The kind this schema declares for itself, if any.
    fn declared_kind(&self) -> Option<Kind> {
        None
    }

    /// An embedded JSON Schema document, if the payload carries one.
    fn document(&self) -> Option<&Value> {
        None
    }

    /// The Standard Validation Capability, if exposed.
    fn standard(&self) -> Option<&dyn StandardValidate> {
        None
    }
}

/// A raw JSON Schema document treated as a foreign schema.
///
/// The engine cannot rewrite it until a bridge converts it into native
/// nodes. Its declared kind is read from the document's `type` keyword.
#[derive(Debug, Clone)]
pub struct JsonSchemaDocument {
    document: Value,
    declared: Option<Kind>,
}

impl JsonSchemaDocument {
    /// Wrap a JSON Schema document.
    pub fn new(document: Value) -> Self {
        let declared = match document.get("type").and_then(Value::as_str) {
            Some("object") => Some(Kind::Object),
            Some("array") => Some(Kind::Array),
            Some("string") => match document.get("format").and_then(Value::as_str) {
                Some("binary") => Some(Kind::File),
                _ => Some(Kind::String),
            },
            Some("number") => Some(Kind::Number),
            Some("integer") => Some(Kind::Integer),
            Some("boolean") => Some(Kind::Boolean),
            Some("null") => Some(Kind::Null),
            _ => None,
        };
        Self { document, declared }
    }
}

impl ForeignSchema for JsonSchemaDocument {
    fn vendor(&self) -> &str {
        "json-schema"
    }

    fn declared_kind(&self) -> Option<Kind> {
        self.declared
    }

    fn document(&self) -> Option<&Value> {
        Some(&self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_display() {
        assert_eq!(Issue::new("bad").to_string(), "(root): bad");
        assert_eq!(Issue::at("/a/0", "bad").to_string(), "/a/0: bad");
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = Outcome::Value(json!(1));
        assert!(ok.is_valid());
        assert!(ok.issues().is_empty());

        let bad = Outcome::Issues(vec![Issue::new("nope")]);
        assert!(!bad.is_valid());
        assert_eq!(bad.issues().len(), 1);
        assert!(bad.into_result().is_err());
    }

    #[test]
    fn test_outcome_serde_shape() {
        let json = serde_json::to_value(Outcome::Value(json!({"a": 1}))).unwrap();
        assert_eq!(json, json!({"value": {"a": 1}}));
        let json = serde_json::to_value(Outcome::Issues(vec![Issue::new("x")])).unwrap();
        assert_eq!(json, json!({"issues": [{"message": "x"}]}));
    }

    #[test]
    fn test_json_schema_document_declared_kind() {
        let doc = JsonSchemaDocument::new(json!({"type": "string", "format": "binary"}));
        assert_eq!(doc.declared_kind(), Some(Kind::File));
        assert_eq!(doc.vendor(), "json-schema");
        assert!(doc.standard().is_none());

        let doc = JsonSchemaDocument::new(json!({"anyOf": []}));
        assert_eq!(doc.declared_kind(), None);
        assert!(doc.document().is_some());
    }
}
