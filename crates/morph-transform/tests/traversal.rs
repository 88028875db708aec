//! # Traversal Scale & Termination Tests
//!
//! Deep, wide, and cyclic schemas through the detector and the engine,
//! plus property tests comparing the detector against a naive recursive
//! oracle and checking policy idempotence on generated trees.

use morph_core::{CoercionTag, Definitions, Kind, Schema};
use morph_transform::{
    coerce_form_data, coerce_query, coerce_structural_string, has_capability, replace_schema,
    Rule,
};
use proptest::prelude::*;

fn nested_objects(depth: usize, leaf: Schema) -> Schema {
    (0..depth).fold(leaf, |inner, i| Schema::object([(format!("level{i}"), inner)]))
}

// ---------------------------------------------------------------------------
// Scale
// ---------------------------------------------------------------------------

#[test]
fn test_fifty_levels_deep() {
    let schema = nested_objects(50, Schema::file());
    assert!(has_capability(Kind::File, Some(&schema)));
    assert!(!has_capability(Kind::Boolean, Some(&schema)));

    let out = coerce_structural_string(Some(&schema)).unwrap();
    assert_eq!(out.coercion(), None);
    let first = out.as_object().unwrap().properties.values().next().unwrap().clone();
    assert_eq!(first.coercion(), Some(CoercionTag::ObjectString));
}

#[test]
fn test_very_deep_nesting_does_not_overflow() {
    let schema = nested_objects(2_000, Schema::string());
    assert!(has_capability(Kind::String, Some(&schema)));
    let out = coerce_form_data(Some(&schema)).unwrap();
    assert!(!out.ptr_eq(&schema));
}

#[test]
fn test_hundred_properties_wide() {
    let mut props: Vec<(String, Schema)> =
        (0..100).map(|i| (format!("field{i}"), Schema::string())).collect();
    props.push(("last".to_string(), Schema::array(Schema::file())));
    let schema = Schema::object(props);

    assert!(has_capability(Kind::File, Some(&schema)));
    assert!(has_capability(Kind::Array, Some(&schema)));

    let out = coerce_query(Some(&schema)).unwrap();
    let props = &out.as_object().unwrap().properties;
    assert_eq!(props.len(), 101);
    assert_eq!(props["last"].coercion(), Some(CoercionTag::ArrayQuery));
    assert_eq!(props["field0"].coercion(), None);
    // Property order survives the rewrite.
    assert_eq!(props.keys().last().map(String::as_str), Some("last"));
}

// ---------------------------------------------------------------------------
// Cycles
// ---------------------------------------------------------------------------

#[test]
fn test_self_reference_through_detector_and_engine() {
    let defs = Definitions::new();
    let node = Schema::object([
        ("label", Schema::string()),
        ("children", Schema::array(defs.reference("Node"))),
        ("meta", Schema::object([("size", Schema::integer())])),
    ]);
    defs.seal([("Node", node.clone())]).unwrap();

    assert!(has_capability(Kind::Integer, Some(&node)));
    assert!(!has_capability(Kind::File, Some(&node)));

    let out = coerce_structural_string(Some(&node)).unwrap();
    let props = &out.as_object().unwrap().properties;
    assert_eq!(props["children"].coercion(), Some(CoercionTag::ArrayString));
    assert_eq!(props["meta"].coercion(), Some(CoercionTag::ObjectString));
}

#[test]
fn test_reference_cycle_with_custom_rule() {
    let defs = Definitions::new();
    let a = Schema::object([("next", defs.reference("B")), ("n", Schema::number())]);
    let b = Schema::object([("next", defs.reference("A")), ("flag", Schema::boolean())]);
    defs.seal([("A", a.clone()), ("B", b)]).unwrap();

    let rule = Rule::new(Schema::number(), |_| Some(Schema::string()));
    let out = replace_schema(Some(&a), &[rule]).unwrap().unwrap();
    assert_eq!(out.as_object().unwrap().properties["n"].kind(), Kind::String);
    assert!(has_capability(Kind::Boolean, Some(&out)));
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

fn arb_schema() -> impl Strategy<Value = Schema> {
    let leaf = prop_oneof![
        Just(Schema::string()),
        Just(Schema::number()),
        Just(Schema::integer()),
        Just(Schema::boolean()),
        Just(Schema::file()),
        Just(Schema::empty_object()),
    ];
    leaf.prop_recursive(5, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(("[a-z]{1,6}", inner.clone()), 0..6)
                .prop_map(|props| Schema::object(props)),
            inner.clone().prop_map(Schema::array),
            inner.clone().prop_map(Schema::optional),
            inner.clone().prop_map(Schema::nullable),
            prop::collection::vec(inner.clone(), 1..4).prop_map(|b| Schema::any_of(b)),
            prop::collection::vec(inner, 1..4).prop_map(|b| Schema::one_of(b)),
        ]
    })
}

fn naive_kinds(schema: &Schema, out: &mut Vec<Kind>) {
    out.push(schema.kind());
    for child in schema.children() {
        naive_kinds(&child, out);
    }
}

fn arb_kind() -> impl Strategy<Value = Kind> {
    prop::sample::select(Kind::all().to_vec())
}

proptest! {
    /// The detector agrees with a plain recursive walk on acyclic trees.
    #[test]
    fn capability_matches_naive_walk(schema in arb_schema(), kind in arb_kind()) {
        let mut kinds = Vec::new();
        naive_kinds(&schema, &mut kinds);
        prop_assert_eq!(has_capability(kind, Some(&schema)), kinds.contains(&kind));
    }

    /// Applying a policy to its own output changes nothing.
    #[test]
    fn policies_idempotent(schema in arb_schema()) {
        for coerce in [coerce_structural_string, coerce_query, coerce_form_data] {
            let once = coerce(Some(&schema)).unwrap();
            let twice = coerce(Some(&once)).unwrap();
            prop_assert!(twice.ptr_eq(&once));
        }
    }

    /// Rewriting never changes the root's kind under root-excluding policies.
    #[test]
    fn root_kind_preserved(schema in arb_schema()) {
        let out = coerce_form_data(Some(&schema)).unwrap();
        prop_assert_eq!(out.kind(), schema.kind());
        prop_assert_eq!(out.coercion(), None);
    }
}
