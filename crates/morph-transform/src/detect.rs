//! # Capability Detection
//!
//! Answers "does this schema reach a node of kind K?" over arbitrarily
//! nested and recursive schema graphs.
//!
//! The walk follows object properties, array items, composition branches,
//! wrapped nodes, and reference targets. It uses an explicit work stack and
//! a visited set keyed by node identity, so it terminates on cyclic
//! reference graphs and its stack usage does not grow with nesting depth.
//!
//! The root itself counts as reachable: an empty object has the `Object`
//! capability and nothing else.

use std::collections::HashSet;

use morph_core::{CoercionTag, Kind, Node, Schema, WrapperKind};

/// Whether any node satisfying `predicate` is reachable from `schema`.
///
/// Branches are explored in declaration order and the walk stops at the
/// first hit. `None` reaches nothing.
pub fn reaches<P>(schema: Option<&Schema>, predicate: P) -> bool
where
    P: Fn(&Schema) -> bool,
{
    let Some(root) = schema else {
        return false;
    };

    let mut visited: HashSet<usize> = HashSet::new();
    let mut stack: Vec<Schema> = vec![root.clone()];

    while let Some(node) = stack.pop() {
        if !visited.insert(node.id()) {
            continue;
        }
        if predicate(&node) {
            return true;
        }
        match node.node() {
            Node::Reference(r) => {
                if let Some(target) = r.target() {
                    stack.push(target);
                }
            }
            _ => stack.extend(node.children().into_iter().rev()),
        }
    }
    false
}

/// Whether `schema` reaches a node of kind `kind`.
///
/// Foreign nodes contribute no structure but match when their declared
/// kind equals `kind`.
pub fn has_capability(kind: Kind, schema: Option<&Schema>) -> bool {
    reaches(schema, |s| {
        s.kind() == kind
            || s.as_foreign()
                .and_then(|f| f.payload().declared_kind())
                .is_some_and(|declared| declared == kind)
    })
}

/// Whether `schema` reaches a codec wrapper, i.e. whether validated values
/// need a decode step.
pub fn has_codec(schema: Option<&Schema>) -> bool {
    reaches(schema, |s| {
        s.as_wrapper()
            .is_some_and(|w| w.kind() == WrapperKind::Codec)
    })
}

/// Whether `schema` reaches a node stamped with coercion tag `tag`.
pub fn has_coercion(tag: CoercionTag, schema: Option<&Schema>) -> bool {
    reaches(schema, |s| s.coercion() == Some(tag))
}
