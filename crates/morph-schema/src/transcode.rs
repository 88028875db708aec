//! # Transcoding — Schema-Guided Decode / Encode
//!
//! Walks a value alongside its schema and applies every codec wrapper it
//! meets. Decoding turns wire values (`"{\"a\":1}"`, `"1,2,3"`, `"true"`)
//! into structural ones; encoding reverses it.
//!
//! Only the value's own structure is walked. Chains of references that
//! consume no value structure are cut off after [`MAX_REFERENCE_HOPS`], and
//! a walk nested deeper than [`MAX_WALK_DEPTH`] is rejected with an issue.

use morph_core::{
    codec::parse_number, Codec, CompositionKind, Issue, Kind, Node, Schema, WrapperKind,
};
use morph_transform::has_codec;
use serde_json::Value;

/// References followed in a row before a value is left as-is.
pub const MAX_REFERENCE_HOPS: usize = 64;

/// Deepest schema/value nesting a decode or encode walks.
pub const MAX_WALK_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Decode,
    Encode,
}

/// Convert a wire value into its structural form.
///
/// # Errors
///
/// Returns an [`Issue`] located at the offending value when a codec
/// rejects its input.
pub fn decode_value(schema: &Schema, value: Value) -> Result<Value, Issue> {
    Walker::new(Direction::Decode).walk(schema, value, 0)
}

/// Convert a structural value into its wire form.
///
/// # Errors
///
/// Returns an [`Issue`] when a codec cannot encode its input.
pub fn encode_value(schema: &Schema, value: Value) -> Result<Value, Issue> {
    Walker::new(Direction::Encode).walk(schema, value, 0)
}

struct Walker {
    direction: Direction,
    path: Vec<String>,
    depth: usize,
}

impl Walker {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            path: Vec::new(),
            depth: 0,
        }
    }

    fn issue(&self, message: String) -> Issue {
        let pointer: String = self
            .path
            .iter()
            .map(|seg| format!("/{}", seg.replace('~', "~0").replace('/', "~1")))
            .collect();
        Issue::at(pointer, message)
    }

    fn walk(&mut self, schema: &Schema, value: Value, hops: usize) -> Result<Value, Issue> {
        if self.depth >= MAX_WALK_DEPTH {
            return Err(self.issue(format!("value nested deeper than {MAX_WALK_DEPTH} levels")));
        }
        self.depth += 1;
        let walked = self.step(schema, value, hops);
        self.depth -= 1;
        walked
    }

    fn step(&mut self, schema: &Schema, value: Value, hops: usize) -> Result<Value, Issue> {
        match schema.node() {
            Node::Wrapper(w) => match (w.kind(), w.codec()) {
                (WrapperKind::Codec, Some(codec)) => self.codec(codec, w.inner(), value, hops),
                _ if value.is_null() => Ok(value),
                _ => self.walk(w.inner(), value, hops),
            },
            Node::Object(o) => match value {
                Value::Object(mut map) => {
                    for (name, prop) in &o.properties {
                        if let Some(slot) = map.get_mut(name) {
                            self.path.push(name.clone());
                            let walked = self.walk(prop, slot.take(), 0);
                            self.path.pop();
                            *slot = walked?;
                        }
                    }
                    Ok(Value::Object(map))
                }
                other => Ok(other),
            },
            Node::Array(a) => match value {
                Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for (i, item) in items.into_iter().enumerate() {
                        self.path.push(i.to_string());
                        let walked = self.walk(&a.items, item, 0);
                        self.path.pop();
                        out.push(walked?);
                    }
                    Ok(Value::Array(out))
                }
                other => Ok(other),
            },
            Node::Composition(c) => match c.kind {
                CompositionKind::AllOf => c
                    .branches
                    .iter()
                    .try_fold(value, |acc, branch| self.walk(branch, acc, hops)),
                CompositionKind::AnyOf | CompositionKind::OneOf => {
                    for branch in c.branches.iter().filter(|b| has_codec(Some(*b))) {
                        if let Ok(walked) = self.walk(branch, value.clone(), hops) {
                            if walked != value {
                                return Ok(walked);
                            }
                        }
                    }
                    Ok(value)
                }
            },
            Node::Reference(r) if hops < MAX_REFERENCE_HOPS => match r.target() {
                Some(target) => self.walk(&target, value, hops + 1),
                None => Ok(value),
            },
            _ => Ok(value),
        }
    }

    fn codec(
        &mut self,
        codec: &Codec,
        inner: &Schema,
        value: Value,
        hops: usize,
    ) -> Result<Value, Issue> {
        match self.direction {
            Direction::Decode => {
                let decoded = codec.decode(value).map_err(|m| self.issue(m))?;
                let decoded = match codec {
                    Codec::ArrayQuery => coerce_query_items(inner, decoded),
                    _ => decoded,
                };
                self.walk(inner, decoded, hops)
            }
            Direction::Encode => {
                let walked = self.walk(inner, value, hops)?;
                codec.encode(walked).map_err(|m| self.issue(m))
            }
        }
    }
}

/// Query values split into strings; nudge them toward the item kind.
fn coerce_query_items(array: &Schema, value: Value) -> Value {
    let item_kind = match array.as_array() {
        Some(a) => a.items.kind(),
        None => return value,
    };
    let Value::Array(items) = value else {
        return value;
    };
    Value::Array(
        items
            .into_iter()
            .map(|item| {
                let Value::String(s) = &item else {
                    return item;
                };
                let coerced = match item_kind {
                    Kind::Number | Kind::Integer => parse_number(s),
                    Kind::Boolean => match s.as_str() {
                        "true" => Some(Value::Bool(true)),
                        "false" => Some(Value::Bool(false)),
                        _ => None,
                    },
                    _ => None,
                };
                coerced.unwrap_or(item)
            })
            .collect(),
    )
}
