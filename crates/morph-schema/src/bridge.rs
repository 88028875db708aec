//! # Schema Bridge — Foreign → Native Conversion
//!
//! A bridge is an optional, process-wide collaborator that converts a
//! foreign schema into native nodes so it can take the compiled fast path.
//!
//! ## Lifecycle
//!
//! The handle is write-once. [`install_bridge`] registers a collaborator
//! before first use; otherwise the first [`probe`] installs the built-in
//! [`JsonSchemaBridge`] when the `json-schema-bridge` feature is enabled
//! and records absence when it is not. Concurrent first probes compute the
//! same value, so whichever wins is immaterial.
//!
//! Absence is never an error anywhere in the engine.

use std::cell::Cell;
use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use morph_core::{
    CompositionKind, Constraints, Definitions, Foreign, Meta, Node, Object, PrimitiveKind, Schema,
};
use serde_json::{Map, Value};

use crate::error::ConversionError;

/// Deepest subschema nesting [`from_json_schema`] converts.
pub const MAX_NESTING: usize = 128;

/// Converts foreign schemas into native nodes.
pub trait SchemaBridge: fmt::Debug + Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &str;

    /// Convert `foreign` into a native schema.
    ///
    /// # Errors
    ///
    /// `ConversionError::Unsupported` when this bridge does not handle the
    /// payload, `ConversionError::Failed` when conversion was attempted.
    fn convert(&self, foreign: &Foreign) -> Result<Schema, ConversionError>;
}

static BRIDGE: OnceLock<Option<Arc<dyn SchemaBridge>>> = OnceLock::new();

/// Register `bridge` as the process-wide collaborator.
///
/// Returns `false` when a bridge was already installed or probed.
pub fn install_bridge(bridge: Arc<dyn SchemaBridge>) -> bool {
    let name = bridge.name().to_string();
    let installed = BRIDGE.set(Some(bridge)).is_ok();
    tracing::debug!(bridge = %name, installed, "schema bridge registration");
    installed
}

/// The process-wide bridge, probing on first call.
pub fn probe() -> Option<Arc<dyn SchemaBridge>> {
    BRIDGE
        .get_or_init(|| {
            let found = builtin();
            tracing::debug!(available = found.is_some(), "schema bridge probed");
            found
        })
        .clone()
}

/// Whether a bridge is available, without converting anything.
pub fn has_bridge() -> bool {
    probe().is_some()
}

#[cfg(feature = "json-schema-bridge")]
fn builtin() -> Option<Arc<dyn SchemaBridge>> {
    Some(Arc::new(JsonSchemaBridge))
}

#[cfg(not(feature = "json-schema-bridge"))]
fn builtin() -> Option<Arc<dyn SchemaBridge>> {
    None
}

/// Bridge for foreign schemas that embed a JSON Schema document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaBridge;

impl SchemaBridge for JsonSchemaBridge {
    fn name(&self) -> &str {
        "json-schema"
    }

    fn convert(&self, foreign: &Foreign) -> Result<Schema, ConversionError> {
        let document = foreign
            .payload()
            .document()
            .ok_or(ConversionError::Unsupported)?;
        from_json_schema(document)
    }
}

/// Convert a JSON Schema document into native nodes.
///
/// Supports `type` (single or list), `properties` / `required` /
/// `additionalProperties`, `items`, `anyOf` / `oneOf` / `allOf`, `enum` /
/// `const`, the usual string and numeric bounds, OpenAPI `nullable`, and
/// local `$ref`s into `$defs` or `definitions`. `format: binary` strings
/// become file leaves. Coercion annotations in the document are ignored.
///
/// # Errors
///
/// `ConversionError::Unsupported` for constructs with no native
/// counterpart (e.g. the unconstrained `true` schema or remote `$ref`s);
/// `ConversionError::Failed` for malformed keywords and for subschemas
/// nested deeper than [`MAX_NESTING`].
pub fn from_json_schema(document: &Value) -> Result<Schema, ConversionError> {
    let defs = Definitions::new();
    let converter = Converter {
        defs: &defs,
        depth: Cell::new(0),
    };
    let root = converter.convert(document)?;

    let table = document
        .get("$defs")
        .or_else(|| document.get("definitions"))
        .and_then(Value::as_object);
    let mut entries = Vec::new();
    if let Some(table) = table {
        for (name, sub) in table {
            entries.push((name.clone(), converter.convert(sub)?));
        }
    }
    defs.seal(entries)
        .map_err(|e| ConversionError::Failed(e.to_string()))?;
    Ok(root)
}

struct Converter<'d> {
    defs: &'d Definitions,
    depth: Cell<usize>,
}

impl Converter<'_> {
    fn convert(&self, value: &Value) -> Result<Schema, ConversionError> {
        let depth = self.depth.get();
        if depth >= MAX_NESTING {
            return Err(ConversionError::Failed(format!(
                "schema nested deeper than {MAX_NESTING} levels"
            )));
        }
        self.depth.set(depth + 1);
        let converted = self.convert_value(value);
        self.depth.set(depth);
        converted
    }

    fn convert_value(&self, value: &Value) -> Result<Schema, ConversionError> {
        let map = match value {
            Value::Bool(false) => return Ok(Schema::invalidated()),
            Value::Object(map) => map,
            _ => return Err(ConversionError::Unsupported),
        };

        let node = self.convert_map(map)?;
        let node = if map.get("nullable").and_then(Value::as_bool) == Some(true) {
            Schema::nullable(node)
        } else {
            node
        };

        let title = map.get("title").and_then(Value::as_str);
        let description = map.get("description").and_then(Value::as_str);
        if title.is_none() && description.is_none() {
            return Ok(node);
        }
        let mut meta = Meta::default();
        meta.title = title.map(str::to_string);
        meta.description = description.map(str::to_string);
        Ok(Schema::with_meta(node.node().clone(), meta))
    }

    fn convert_map(&self, map: &Map<String, Value>) -> Result<Schema, ConversionError> {
        if let Some(target) = map.get("$ref").and_then(Value::as_str) {
            let name = target
                .strip_prefix("#/$defs/")
                .or_else(|| target.strip_prefix("#/definitions/"))
                .ok_or(ConversionError::Unsupported)?;
            return Ok(self.defs.reference(unescape_pointer(name)));
        }

        for kind in [CompositionKind::AnyOf, CompositionKind::OneOf, CompositionKind::AllOf] {
            if let Some(branches) = map.get(kind.keyword()) {
                let branches = branches.as_array().ok_or_else(|| {
                    ConversionError::Failed(format!("{} must be an array", kind.keyword()))
                })?;
                let converted = branches
                    .iter()
                    .map(|b| self.convert(b))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Schema::composition(kind, converted));
            }
        }

        match map.get("type") {
            Some(Value::String(ty)) => self.typed(ty, map),
            Some(Value::Array(types)) => {
                let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
                if names.len() != types.len() || names.is_empty() {
                    return Err(ConversionError::Failed("type list must hold strings".into()));
                }
                let non_null: Vec<&str> = names.iter().copied().filter(|t| *t != "null").collect();
                let nullable = non_null.len() < names.len();
                let inner = match non_null.as_slice() {
                    [] => return Ok(Schema::null()),
                    [single] => self.typed(single, map)?,
                    many => Schema::any_of(
                        many.iter()
                            .map(|t| self.typed(t, map))
                            .collect::<Result<Vec<_>, _>>()?,
                    ),
                };
                Ok(if nullable { Schema::nullable(inner) } else { inner })
            }
            Some(_) => Err(ConversionError::Failed("type must be a string or list".into())),
            None => {
                if map.contains_key("properties") {
                    self.typed("object", map)
                } else if let Some(values) = literal_values(map) {
                    let ty = infer_literal_type(&values).ok_or(ConversionError::Unsupported)?;
                    self.typed(ty, map)
                } else {
                    Err(ConversionError::Unsupported)
                }
            }
        }
    }

    fn typed(&self, ty: &str, map: &Map<String, Value>) -> Result<Schema, ConversionError> {
        let kind = match ty {
            "string" if map.get("format").and_then(Value::as_str) == Some("binary") => {
                PrimitiveKind::File
            }
            "string" => PrimitiveKind::String,
            "number" => PrimitiveKind::Number,
            "integer" => PrimitiveKind::Integer,
            "boolean" => PrimitiveKind::Boolean,
            "null" => PrimitiveKind::Null,
            "object" => return self.object(map),
            "array" => return self.array(map),
            other => return Err(ConversionError::Failed(format!("unknown type {other:?}"))),
        };
        Ok(Schema::primitive(kind, constraints(map)))
    }

    fn object(&self, map: &Map<String, Value>) -> Result<Schema, ConversionError> {
        let required: Vec<&str> = map
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut properties = IndexMap::new();
        if let Some(props) = map.get("properties").and_then(Value::as_object) {
            for (name, sub) in props {
                let schema = self.convert(sub)?;
                let schema = if required.contains(&name.as_str()) {
                    schema
                } else {
                    Schema::optional(schema)
                };
                properties.insert(name.clone(), schema);
            }
        }

        Ok(Schema::new(Node::Object(Object {
            properties,
            additional_properties: map.get("additionalProperties") != Some(&Value::Bool(false)),
        })))
    }

    fn array(&self, map: &Map<String, Value>) -> Result<Schema, ConversionError> {
        let items = map.get("items").ok_or(ConversionError::Unsupported)?;
        let items = self.convert(items)?;
        let min_items = map.get("minItems").and_then(Value::as_u64);
        let max_items = map.get("maxItems").and_then(Value::as_u64);
        if min_items.is_none() && max_items.is_none() {
            return Ok(Schema::array(items));
        }
        Ok(Schema::new(Node::Array(morph_core::Array {
            items,
            min_items,
            max_items,
        })))
    }
}

fn constraints(map: &Map<String, Value>) -> Constraints {
    let mut c = Constraints::default()
        .length(
            map.get("minLength").and_then(Value::as_u64),
            map.get("maxLength").and_then(Value::as_u64),
        )
        .range(
            map.get("minimum").and_then(Value::as_f64),
            map.get("maximum").and_then(Value::as_f64),
        );
    if let Some(format) = map.get("format").and_then(Value::as_str) {
        if format != "binary" {
            c = c.format(format);
        }
    }
    if let Some(pattern) = map.get("pattern").and_then(Value::as_str) {
        c = c.pattern(pattern);
    }
    if let Some(values) = literal_values(map) {
        c = c.one_of_values(values);
    }
    c.default = map.get("default").cloned();
    c
}

fn literal_values(map: &Map<String, Value>) -> Option<Vec<Value>> {
    if let Some(Value::Array(values)) = map.get("enum") {
        return Some(values.clone());
    }
    map.get("const").map(|c| vec![c.clone()])
}

fn infer_literal_type(values: &[Value]) -> Option<&'static str> {
    let ty = |v: &Value| match v {
        Value::String(_) => Some("string"),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some("integer"),
        Value::Number(_) => Some("number"),
        Value::Bool(_) => Some("boolean"),
        Value::Null => Some("null"),
        _ => None,
    };
    let first = ty(values.first()?)?;
    values
        .iter()
        .all(|v| ty(v) == Some(first))
        .then_some(first)
}

fn unescape_pointer(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_core::{JsonSchemaDocument, Kind};
    use serde_json::json;

    #[test]
    fn test_object_with_required_and_optional() {
        let schema = from_json_schema(&json!({
            "type": "object",
            "title": "User",
            "properties": {
                "name": {"type": "string", "minLength": 1},
                "age": {"type": "integer"}
            },
            "required": ["name"],
            "additionalProperties": false
        }))
        .unwrap();

        assert_eq!(schema.meta().title.as_deref(), Some("User"));
        let obj = schema.as_object().unwrap();
        assert!(!obj.additional_properties);
        assert_eq!(obj.properties["name"].kind(), Kind::String);
        assert_eq!(obj.properties["age"].kind(), Kind::Optional);
        assert_eq!(obj.required().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn test_binary_string_is_file() {
        let schema = from_json_schema(&json!({"type": "string", "format": "binary"})).unwrap();
        assert_eq!(schema.kind(), Kind::File);
    }

    #[test]
    fn test_nullable_forms() {
        let a = from_json_schema(&json!({"type": ["string", "null"]})).unwrap();
        assert_eq!(a.kind(), Kind::Nullable);
        let b = from_json_schema(&json!({"type": "number", "nullable": true})).unwrap();
        assert_eq!(b.kind(), Kind::Nullable);
    }

    #[test]
    fn test_local_refs_resolve_lazily() {
        let schema = from_json_schema(&json!({
            "$ref": "#/$defs/Node",
            "$defs": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "children": {"type": "array", "items": {"$ref": "#/$defs/Node"}}
                    }
                }
            }
        }))
        .unwrap();
        let target = schema.as_reference().unwrap().target().unwrap();
        assert_eq!(target.kind(), Kind::Object);
    }

    #[test]
    fn test_enum_without_type() {
        let schema = from_json_schema(&json!({"enum": ["a", "b"]})).unwrap();
        assert_eq!(schema.kind(), Kind::String);
        assert!(from_json_schema(&json!({"enum": ["a", 1]})).is_err());
    }

    #[test]
    fn test_unsupported_constructs() {
        assert_eq!(from_json_schema(&json!(true)).unwrap_err(), ConversionError::Unsupported);
        assert_eq!(from_json_schema(&json!({})).unwrap_err(), ConversionError::Unsupported);
        assert_eq!(
            from_json_schema(&json!({"$ref": "https://example.com/x.json"})).unwrap_err(),
            ConversionError::Unsupported
        );
        assert!(from_json_schema(&json!(false)).unwrap().is_invalidated());
    }

    #[test]
    fn test_coercion_annotations_ignored() {
        let schema =
            from_json_schema(&json!({"type": "object", "x-coercion": "ObjectString"})).unwrap();
        assert_eq!(schema.coercion(), None);
    }

    #[test]
    fn test_bridge_requires_document() {
        #[derive(Debug)]
        struct Opaque;
        impl morph_core::ForeignSchema for Opaque {
            fn vendor(&self) -> &str {
                "opaque"
            }
        }

        let opaque = Schema::foreign(Opaque);
        let foreign = opaque.as_foreign().unwrap();
        assert_eq!(
            JsonSchemaBridge.convert(foreign).unwrap_err(),
            ConversionError::Unsupported
        );

        let doc = Schema::foreign(JsonSchemaDocument::new(json!({"type": "boolean"})));
        let converted = JsonSchemaBridge.convert(doc.as_foreign().unwrap()).unwrap();
        assert_eq!(converted.kind(), Kind::Boolean);
    }

    fn nested_document(depth: usize) -> Value {
        (0..depth).fold(json!({"type": "string"}), |inner, _| {
            json!({"type": "object", "properties": {"child": inner}})
        })
    }

    #[test]
    fn test_nesting_is_bounded() {
        let schema = from_json_schema(&nested_document(MAX_NESTING - 1)).unwrap();
        assert_eq!(schema.kind(), Kind::Object);

        let err = from_json_schema(&nested_document(MAX_NESTING + 50)).unwrap_err();
        assert!(matches!(err, ConversionError::Failed(msg) if msg.contains("nested deeper")));
    }

    #[cfg(feature = "json-schema-bridge")]
    #[test]
    fn test_builtin_bridge_probed() {
        assert!(has_bridge());
        assert_eq!(probe().unwrap().name(), "json-schema");
    }
}
