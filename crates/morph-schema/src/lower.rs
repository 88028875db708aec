//! # Lowering — Native Nodes → JSON Schema
//!
//! Produces a Draft 2020-12 document the `jsonschema` backend compiles.
//!
//! ## Mapping
//!
//! - Primitives map to `type` plus their constraints. File leaves are
//!   binary strings.
//! - Object properties wrapped in `Optional` are left out of `required`.
//! - `Nullable` becomes `anyOf [inner, null]`.
//! - A codec wrapper lowers to its inner (decoded) schema with an `x-codec`
//!   annotation. Validators decode wire values before checking them.
//! - References become `$ref`s into a root-level `$defs` table. Each
//!   (table, name) pair is lowered once, which is what makes recursive
//!   schemas finite.
//! - The null marker lowers to `false`.
//! - A nested foreign node is converted through the bridge when one is
//!   available, else embedded through its JSON Schema document.
//!
//! Lowering runs on an explicit task stack, so schema depth never grows
//! the call stack.

use std::collections::{HashMap, HashSet};

use morph_core::{Foreign, Meta, Node, PrimitiveKind, Reference, Schema, WrapperKind};
use serde_json::{json, Map, Value};

use crate::bridge::SchemaBridge;
use crate::error::CompileError;

/// Lower `schema` without a bridge.
///
/// # Errors
///
/// See [`lower_with`].
pub fn lower(schema: &Schema) -> Result<Value, CompileError> {
    lower_with(schema, None)
}

/// Lower `schema`, converting nested foreign nodes through `bridge`.
///
/// # Errors
///
/// `CompileError::UnresolvedReference` for a reference its table does not
/// define; `CompileError::Unsupported` for a nested foreign node that
/// neither the bridge nor an embedded document can express.
pub fn lower_with(schema: &Schema, bridge: Option<&dyn SchemaBridge>) -> Result<Value, CompileError> {
    let mut cx = Lowering {
        bridge,
        names: HashMap::new(),
        taken: HashSet::new(),
        pending: Vec::new(),
        defs: Map::new(),
    };

    let mut root = cx.run(schema)?;
    while let Some((name, target)) = cx.pending.pop() {
        let lowered = cx.run(&target)?;
        cx.defs.insert(name, lowered);
    }

    if !cx.defs.is_empty() {
        let defs = Value::Object(std::mem::take(&mut cx.defs));
        root = match root {
            Value::Object(mut map) => {
                map.insert("$defs".to_string(), defs);
                Value::Object(map)
            }
            other => json!({ "allOf": [other], "$defs": defs }),
        };
    }
    Ok(root)
}

struct Lowering<'b> {
    bridge: Option<&'b dyn SchemaBridge>,
    /// (definitions table id, name) → `$defs` key.
    names: HashMap<(usize, String), String>,
    taken: HashSet<String>,
    pending: Vec<(String, Schema)>,
    defs: Map<String, Value>,
}

enum Task {
    Visit(Schema),
    /// Build `schema` from the last `arity` lowered values.
    Assemble { schema: Schema, arity: usize },
}

/// What a nested foreign node lowers through.
enum ForeignForm {
    Native(Schema),
    Document(Value),
}

impl Lowering<'_> {
    fn run(&mut self, root: &Schema) -> Result<Value, CompileError> {
        let mut tasks = vec![Task::Visit(root.clone())];
        let mut results: Vec<Value> = Vec::new();

        while let Some(task) = tasks.pop() {
            match task {
                Task::Visit(schema) => self.visit(schema, &mut tasks, &mut results)?,
                Task::Assemble { schema, arity } => {
                    let children = results.split_off(results.len().saturating_sub(arity));
                    results.push(with_meta(assemble(&schema, children), schema.meta()));
                }
            }
        }

        Ok(results.pop().unwrap_or(Value::Bool(false)))
    }

    fn visit(
        &mut self,
        schema: Schema,
        tasks: &mut Vec<Task>,
        results: &mut Vec<Value>,
    ) -> Result<(), CompileError> {
        let leaf = match schema.node() {
            Node::Primitive(p) => Some(primitive(p.kind, &p.constraints)),
            Node::Reference(r) => Some(self.reference(r)?),
            Node::Invalidated => Some(Value::Bool(false)),
            Node::Foreign(f) => match self.foreign(f)? {
                ForeignForm::Document(document) => Some(document),
                ForeignForm::Native(native) => {
                    tasks.push(Task::Assemble {
                        schema: schema.clone(),
                        arity: 1,
                    });
                    tasks.push(Task::Visit(native));
                    return Ok(());
                }
            },
            Node::Object(_) | Node::Array(_) | Node::Composition(_) | Node::Wrapper(_) => None,
        };
        if let Some(value) = leaf {
            results.push(with_meta(value, schema.meta()));
            return Ok(());
        }

        // Optional properties lower to their inner schema; `assemble`
        // leaves them out of `required`.
        let children: Vec<Schema> = match schema.as_object() {
            Some(o) => o.properties.values().map(unwrap_optional).collect(),
            None => schema.children(),
        };
        tasks.push(Task::Assemble {
            arity: children.len(),
            schema,
        });
        tasks.extend(children.into_iter().rev().map(Task::Visit));
        Ok(())
    }

    fn reference(&mut self, r: &Reference) -> Result<Value, CompileError> {
        let key = (r.definitions().id(), r.name().to_string());
        let name = match self.names.get(&key).cloned() {
            Some(name) => name,
            None => {
                let target = r
                    .target()
                    .ok_or_else(|| CompileError::UnresolvedReference(r.name().to_string()))?;
                let name = self.allocate(r.name());
                self.names.insert(key, name.clone());
                self.pending.push((name.clone(), target));
                name
            }
        };
        Ok(json!({ "$ref": format!("#/$defs/{}", escape_pointer(&name)) }))
    }

    fn foreign(&self, f: &Foreign) -> Result<ForeignForm, CompileError> {
        let payload = f.payload();
        let converted = self.bridge.and_then(|bridge| match bridge.convert(f) {
            Ok(native) => Some(native),
            Err(e) => {
                tracing::debug!(
                    vendor = payload.vendor(),
                    error = %e,
                    "nested foreign schema not converted"
                );
                None
            }
        });
        match (converted, payload.document()) {
            (Some(native), _) => Ok(ForeignForm::Native(native)),
            (None, Some(document)) => Ok(ForeignForm::Document(document.clone())),
            (None, None) => Err(CompileError::Unsupported(format!(
                "nested {} schema has no JSON Schema form",
                payload.vendor()
            ))),
        }
    }

    fn allocate(&mut self, name: &str) -> String {
        let mut candidate = name.to_string();
        let mut n = 2;
        while !self.taken.insert(candidate.clone()) {
            candidate = format!("{name}_{n}");
            n += 1;
        }
        candidate
    }
}

fn unwrap_optional(prop: &Schema) -> Schema {
    match prop.as_wrapper() {
        Some(w) if w.kind() == WrapperKind::Optional => w.inner().clone(),
        _ => prop.clone(),
    }
}

/// Build a composite node's document from its lowered children.
fn assemble(schema: &Schema, children: Vec<Value>) -> Value {
    match schema.node() {
        Node::Object(o) => {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for ((name, prop), value) in o.properties.iter().zip(children) {
                let optional = prop
                    .as_wrapper()
                    .is_some_and(|w| w.kind() == WrapperKind::Optional);
                if !optional {
                    required.push(Value::String(name.clone()));
                }
                properties.insert(name.clone(), value);
            }
            let mut out = json!({ "type": "object", "properties": properties });
            if !required.is_empty() {
                out["required"] = Value::Array(required);
            }
            if !o.additional_properties {
                out["additionalProperties"] = Value::Bool(false);
            }
            out
        }
        Node::Array(a) => {
            let mut out = json!({ "type": "array", "items": single(children) });
            if let Some(min) = a.min_items {
                out["minItems"] = json!(min);
            }
            if let Some(max) = a.max_items {
                out["maxItems"] = json!(max);
            }
            out
        }
        Node::Composition(c) => {
            let mut out = Map::new();
            out.insert(c.kind.keyword().to_string(), Value::Array(children));
            Value::Object(out)
        }
        Node::Wrapper(w) => {
            let inner = single(children);
            match (w.kind(), w.codec()) {
                (WrapperKind::Nullable, _) => json!({ "anyOf": [inner, { "type": "null" }] }),
                (WrapperKind::Codec, Some(codec)) => annotate_codec(inner, codec.name()),
                _ => inner,
            }
        }
        _ => single(children),
    }
}

fn single(children: Vec<Value>) -> Value {
    children.into_iter().next().unwrap_or(Value::Bool(false))
}

fn primitive(kind: PrimitiveKind, c: &morph_core::Constraints) -> Value {
    let mut out = match kind {
        PrimitiveKind::String => json!({ "type": "string" }),
        PrimitiveKind::Number => json!({ "type": "number" }),
        PrimitiveKind::Integer => json!({ "type": "integer" }),
        PrimitiveKind::Boolean => json!({ "type": "boolean" }),
        PrimitiveKind::Null => json!({ "type": "null" }),
        PrimitiveKind::File => json!({ "type": "string", "format": "binary" }),
    };
    if let Some(format) = &c.format {
        out["format"] = json!(format);
    }
    if let Some(pattern) = &c.pattern {
        out["pattern"] = json!(pattern);
    }
    if let Some(min) = c.min_length {
        out["minLength"] = json!(min);
    }
    if let Some(max) = c.max_length {
        out["maxLength"] = json!(max);
    }
    if let Some(min) = c.minimum {
        out["minimum"] = json!(min);
    }
    if let Some(max) = c.maximum {
        out["maximum"] = json!(max);
    }
    if !c.enum_values.is_empty() {
        out["enum"] = Value::Array(c.enum_values.clone());
    }
    if let Some(default) = &c.default {
        out["default"] = default.clone();
    }
    out
}

fn annotate_codec(inner: Value, name: &str) -> Value {
    match inner {
        Value::Object(mut map) => {
            map.insert("x-codec".to_string(), json!(name));
            Value::Object(map)
        }
        other => json!({ "allOf": [other], "x-codec": name }),
    }
}

fn with_meta(value: Value, meta: &Meta) -> Value {
    match value {
        Value::Object(mut map) => {
            if let Some(title) = &meta.title {
                map.insert("title".to_string(), json!(title));
            }
            if let Some(description) = &meta.description {
                map.insert("description".to_string(), json!(description));
            }
            Value::Object(map)
        }
        other => other,
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_core::{Codec, CoercionTag, Constraints, CustomCodec, Definitions, JsonSchemaDocument};

    #[test]
    fn test_object_required_and_optional() {
        let schema = Schema::object([
            ("id", Schema::integer()),
            ("nick", Schema::optional(Schema::string())),
        ]);
        let lowered = lower(&schema).unwrap();
        assert_eq!(
            lowered,
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "integer"},
                    "nick": {"type": "string"}
                },
                "required": ["id"]
            })
        );
    }

    #[test]
    fn test_constraints_and_meta() {
        let schema = Schema::primitive(
            PrimitiveKind::String,
            Constraints::default().format("email").length(Some(3), None),
        )
        .titled("Email");
        let lowered = lower(&schema).unwrap();
        assert_eq!(lowered["format"], "email");
        assert_eq!(lowered["minLength"], 3);
        assert_eq!(lowered["title"], "Email");
        assert!(lowered.get("maxLength").is_none());
    }

    #[test]
    fn test_codec_lowers_to_annotated_inner() {
        let schema = Schema::codec(Schema::empty_object(), Codec::ObjectString)
            .with_coercion(CoercionTag::ObjectString);
        let lowered = lower(&schema).unwrap();
        assert_eq!(lowered["type"], "object");
        assert_eq!(lowered["x-codec"], "ObjectString");
        assert!(lowered.get("anyOf").is_none());
    }

    #[test]
    fn test_custom_codec_annotates_inner() {
        let codec = Codec::Custom(CustomCodec::new("trim", Ok, Ok));
        let lowered = lower(&Schema::codec(Schema::string(), codec)).unwrap();
        assert_eq!(lowered, json!({"type": "string", "x-codec": "trim"}));
    }

    #[test]
    fn test_recursive_reference() {
        let defs = Definitions::new();
        let node = Schema::object([("next", Schema::optional(defs.reference("Node")))]);
        defs.seal([("Node", node.clone())]).unwrap();

        let lowered = lower(&defs.reference("Node")).unwrap();
        assert_eq!(lowered["$ref"], "#/$defs/Node");
        assert_eq!(lowered["$defs"]["Node"]["properties"]["next"]["$ref"], "#/$defs/Node");
    }

    #[test]
    fn test_same_name_in_two_tables() {
        let a = Definitions::sealed([("Item", Schema::string())]);
        let b = Definitions::sealed([("Item", Schema::number())]);
        let schema = Schema::object([("a", a.reference("Item")), ("b", b.reference("Item"))]);
        let lowered = lower(&schema).unwrap();
        let defs = lowered["$defs"].as_object().unwrap();
        assert_eq!(defs.len(), 2);
        assert!(defs.contains_key("Item"));
        assert!(defs.contains_key("Item_2"));
    }

    #[test]
    fn test_unresolved_reference() {
        let defs = Definitions::new();
        let err = lower(&defs.reference("Ghost")).unwrap_err();
        assert!(matches!(err, CompileError::UnresolvedReference(name) if name == "Ghost"));
    }

    #[test]
    fn test_invalidated_is_false() {
        let schema = Schema::object([("gone", Schema::invalidated())]);
        let lowered = lower(&schema).unwrap();
        assert_eq!(lowered["properties"]["gone"], json!(false));
    }

    #[test]
    fn test_nested_foreign_document_embedded() {
        let doc = json!({"type": "string", "maxLength": 4});
        let schema = Schema::object([("code", Schema::foreign(JsonSchemaDocument::new(doc.clone())))]);
        let lowered = lower(&schema).unwrap();
        assert_eq!(lowered["properties"]["code"], doc);
    }

    #[test]
    fn test_nested_opaque_foreign_unsupported() {
        #[derive(Debug)]
        struct Opaque;
        impl morph_core::ForeignSchema for Opaque {
            fn vendor(&self) -> &str {
                "opaque"
            }
        }
        let schema = Schema::object([("x", Schema::foreign(Opaque))]);
        assert!(matches!(lower(&schema), Err(CompileError::Unsupported(_))));
    }

    fn nested(depth: usize) -> Schema {
        (0..depth).fold(Schema::string(), |inner, _| {
            Schema::object([("child", Schema::optional(inner))])
        })
    }

    #[test]
    fn test_deep_nesting_lowers_iteratively() {
        let lowered = lower(&nested(1_000)).unwrap();
        let mut cursor = &lowered;
        let mut levels = 0;
        while let Some(child) = cursor.get("properties").and_then(|p| p.get("child")) {
            cursor = child;
            levels += 1;
        }
        assert_eq!(levels, 1_000);
        assert_eq!(cursor["type"], "string");
    }

    #[test]
    fn test_property_order_and_nested_meta() {
        let schema = Schema::object([
            ("b", Schema::optional(Schema::integer())),
            ("a", Schema::array(Schema::nullable(Schema::string())).titled("Names")),
        ]);
        let lowered = lower(&schema).unwrap();
        let keys: Vec<&String> = lowered["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(lowered["required"], json!(["a"]));
        assert_eq!(lowered["properties"]["a"]["title"], "Names");
        assert_eq!(
            lowered["properties"]["a"]["items"],
            json!({"anyOf": [{"type": "string"}, {"type": "null"}]})
        );
    }
}
