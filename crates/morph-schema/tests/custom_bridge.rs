//! Registering a custom bridge replaces the built-in one for the whole
//! process. Kept in its own test binary so the write-once handle is not
//! shared with other tests.

use std::sync::Arc;

use morph_core::{Foreign, ForeignSchema, Kind, Schema};
use morph_schema::{
    has_bridge, install_bridge, to_validator, ConversionError, JsonSchemaBridge, SchemaBridge,
};
use serde_json::json;

/// A foreign schema from a message-envelope format.
#[derive(Debug)]
struct Envelope;

impl ForeignSchema for Envelope {
    fn vendor(&self) -> &str {
        "envelope"
    }

    fn declared_kind(&self) -> Option<Kind> {
        Some(Kind::Object)
    }
}

#[derive(Debug)]
struct EnvelopeBridge;

impl SchemaBridge for EnvelopeBridge {
    fn name(&self) -> &str {
        "envelope"
    }

    fn convert(&self, foreign: &Foreign) -> Result<Schema, ConversionError> {
        match foreign.payload().vendor() {
            "envelope" => Ok(Schema::object([
                ("id", Schema::string()),
                ("body", Schema::string()),
            ])),
            _ => Err(ConversionError::Unsupported),
        }
    }
}

#[test]
fn installed_bridge_serves_every_compiler() {
    assert!(install_bridge(Arc::new(EnvelopeBridge)));
    assert!(!install_bridge(Arc::new(JsonSchemaBridge)));
    assert!(has_bridge());

    let validator = to_validator(&Schema::foreign(Envelope)).unwrap();
    assert!(validator.is_compiled());
    assert!(validator.check(&json!({"id": "1", "body": "hi"})));
    assert!(!validator.check(&json!({"id": 1, "body": "hi"})));

    // The custom bridge does not understand embedded documents, and the
    // built-in one was never installed.
    let doc = Schema::foreign(morph_core::JsonSchemaDocument::new(json!({"type": "string"})));
    assert!(to_validator(&doc).is_err());
}
