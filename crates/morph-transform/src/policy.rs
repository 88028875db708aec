//! # Coercion Policies — Transport Rewrites
//!
//! Four canonical rule sets, each built once per process and shared by
//! reference. A policy wraps matching nodes in a codec wrapper stamped with
//! a coercion tag, telling the validator layer how the value travels on the
//! wire.
//!
//! | Policy | Objects | Arrays | Root |
//! |---|---|---|---|
//! | [`structural_string`] | `ObjectString` | `ArrayString` | untouched |
//! | [`query`] | `ObjectString` | `ArrayQuery` | untouched |
//! | [`root_primitive`] | n/a | n/a | number → `NumericString`, boolean → `BooleanString` |
//! | [`form_data`] | `ObjectString`, first level | `ArrayString`, first level | untouched |
//!
//! Coerced nodes carry a tag the untagged patterns no longer match, so
//! applying a policy to its own output is a no-op.

use std::sync::OnceLock;

use morph_core::{Codec, CoercionTag, Kind, Schema};

use crate::engine::{Rule, RuleSet};

/// Wrap `node` in the built-in codec for `tag` and stamp the tag.
pub fn encode_as(node: &Schema, tag: CoercionTag) -> Schema {
    Schema::codec(node.clone(), Codec::for_tag(tag)).with_coercion(tag)
}

fn encoder(tag: CoercionTag) -> impl Fn(&Schema) -> Option<Schema> + Send + Sync + 'static {
    move |node| Some(encode_as(node, tag))
}

fn object_rule() -> Rule {
    Rule::new(Schema::empty_object(), encoder(CoercionTag::ObjectString))
}

fn array_rule(tag: CoercionTag) -> Rule {
    Rule::new(Schema::array(Schema::string()), encoder(tag))
}

fn build(name: &'static str, rules: Vec<Rule>) -> RuleSet {
    tracing::debug!(policy = name, rules = rules.len(), "coercion policy initialized");
    RuleSet::trusted(rules)
}

/// Nested objects and arrays travel as JSON strings.
pub fn structural_string() -> &'static RuleSet {
    static POLICY: OnceLock<RuleSet> = OnceLock::new();
    POLICY.get_or_init(|| {
        build(
            "structural_string",
            vec![
                object_rule().exclude_root(),
                array_rule(CoercionTag::ArrayString).exclude_root(),
            ],
        )
    })
}

/// Query-string transport: arrays may be comma-separated.
pub fn query() -> &'static RuleSet {
    static POLICY: OnceLock<RuleSet> = OnceLock::new();
    POLICY.get_or_init(|| {
        build(
            "query",
            vec![
                object_rule().exclude_root(),
                array_rule(CoercionTag::ArrayQuery).exclude_root(),
            ],
        )
    })
}

/// A bare numeric or boolean root travels as a string (path parameters,
/// single-value bodies).
pub fn root_primitive() -> &'static RuleSet {
    static POLICY: OnceLock<RuleSet> = OnceLock::new();
    POLICY.get_or_init(|| {
        build(
            "root_primitive",
            vec![
                Rule::new(Schema::number(), encoder(CoercionTag::NumericString)).root_only(),
                Rule::new(Schema::boolean(), encoder(CoercionTag::BooleanString)).root_only(),
            ],
        )
    })
}

/// Multipart form fields: only first-level objects and arrays are encoded,
/// deeper structure stays inside the encoded JSON.
pub fn form_data() -> &'static RuleSet {
    static POLICY: OnceLock<RuleSet> = OnceLock::new();
    POLICY.get_or_init(|| {
        build(
            "form_data",
            vec![
                object_rule().only_first(Kind::Object).exclude_root(),
                array_rule(CoercionTag::ArrayString)
                    .only_first(Kind::Array)
                    .exclude_root(),
            ],
        )
    })
}

/// Apply [`structural_string`].
pub fn coerce_structural_string(schema: Option<&Schema>) -> Option<Schema> {
    structural_string().apply(schema)
}

/// Apply [`query`].
pub fn coerce_query(schema: Option<&Schema>) -> Option<Schema> {
    query().apply(schema)
}

/// Apply [`root_primitive`].
pub fn coerce_root_primitive(schema: Option<&Schema>) -> Option<Schema> {
    root_primitive().apply(schema)
}

/// Apply [`form_data`].
pub fn coerce_form_data(schema: Option<&Schema>) -> Option<Schema> {
    form_data().apply(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_core::Node;

    fn prop(schema: &Schema, name: &str) -> Schema {
        schema.as_object().unwrap().properties[name].clone()
    }

    fn unwrap_codec(schema: &Schema) -> Schema {
        schema.as_wrapper().unwrap().inner().clone()
    }

    #[test]
    fn test_policies_are_memoized() {
        assert!(std::ptr::eq(structural_string(), structural_string()));
        assert!(std::ptr::eq(query(), query()));
        assert!(std::ptr::eq(root_primitive(), root_primitive()));
        assert!(std::ptr::eq(form_data(), form_data()));
        assert_eq!(form_data().len(), 2);
    }

    #[test]
    fn test_form_data_encodes_first_level_only() {
        let schema = Schema::object([(
            "user",
            Schema::object([("profile", Schema::object([("bio", Schema::string())]))]),
        )]);
        let out = coerce_form_data(Some(&schema)).unwrap();

        let user = prop(&out, "user");
        assert_eq!(user.coercion(), Some(CoercionTag::ObjectString));
        let profile = prop(&unwrap_codec(&user), "profile");
        assert_eq!(profile.coercion(), None);
        assert!(matches!(profile.node(), Node::Object(_)));
    }

    #[test]
    fn test_form_data_arrays() {
        let schema = Schema::object([
            ("arr1", Schema::array(Schema::array(Schema::string()))),
            ("arr2", Schema::array(Schema::string())),
        ]);
        let out = coerce_form_data(Some(&schema)).unwrap();

        let arr1 = prop(&out, "arr1");
        let arr2 = prop(&out, "arr2");
        assert_eq!(arr1.coercion(), Some(CoercionTag::ArrayString));
        assert_eq!(arr2.coercion(), Some(CoercionTag::ArrayString));
        let nested = unwrap_codec(&arr1).as_array().unwrap().items.clone();
        assert_eq!(nested.coercion(), None);
        assert_eq!(nested.kind(), Kind::Array);
    }

    #[test]
    fn test_root_never_transformed() {
        let schema = Schema::object([("n", Schema::number())]);
        for policy in [structural_string(), query(), form_data()] {
            let out = policy.apply(Some(&schema)).unwrap();
            assert_eq!(out.coercion(), None);
            assert!(out.ptr_eq(&schema));
        }
    }

    #[test]
    fn test_structural_string_nesting() {
        let schema = Schema::object([
            (
                "outer",
                Schema::object([
                    ("inner", Schema::empty_object()),
                    ("list", Schema::array(Schema::string())),
                ]),
            ),
            ("tags", Schema::array(Schema::empty_object())),
        ]);
        let out = coerce_structural_string(Some(&schema)).unwrap();

        // The object pass encodes every object level it reaches.
        let outer = prop(&out, "outer");
        assert_eq!(outer.coercion(), Some(CoercionTag::ObjectString));
        let outer_obj = unwrap_codec(&outer);
        assert_eq!(prop(&outer_obj, "inner").coercion(), Some(CoercionTag::ObjectString));
        // The array pass does not enter an already encoded object.
        assert_eq!(prop(&outer_obj, "list").coercion(), None);

        let tags = prop(&out, "tags");
        assert_eq!(tags.coercion(), Some(CoercionTag::ArrayString));
        let item = unwrap_codec(&tags).as_array().unwrap().items.clone();
        assert_eq!(item.coercion(), Some(CoercionTag::ObjectString));
    }

    #[test]
    fn test_query_uses_distinct_array_tag() {
        let schema = Schema::object([("ids", Schema::array(Schema::integer()))]);
        let out = coerce_query(Some(&schema)).unwrap();
        assert_eq!(prop(&out, "ids").coercion(), Some(CoercionTag::ArrayQuery));
    }

    #[test]
    fn test_root_primitive() {
        let n = coerce_root_primitive(Some(&Schema::number())).unwrap();
        assert_eq!(n.coercion(), Some(CoercionTag::NumericString));
        let b = coerce_root_primitive(Some(&Schema::boolean())).unwrap();
        assert_eq!(b.coercion(), Some(CoercionTag::BooleanString));

        for untouched in [
            Schema::string(),
            Schema::integer(),
            Schema::empty_object(),
            Schema::array(Schema::number()),
        ] {
            let out = coerce_root_primitive(Some(&untouched)).unwrap();
            assert!(out.ptr_eq(&untouched));
        }
    }

    #[test]
    fn test_root_primitive_does_not_descend() {
        let schema = Schema::object([("n", Schema::number())]);
        let out = coerce_root_primitive(Some(&schema)).unwrap();
        assert!(out.ptr_eq(&schema));
    }

    #[test]
    fn test_policies_are_idempotent() {
        let schema = Schema::object([
            ("a", Schema::object([("b", Schema::array(Schema::string()))])),
            ("c", Schema::optional(Schema::array(Schema::boolean()))),
        ]);
        for policy in [structural_string(), query(), root_primitive(), form_data()] {
            let once = policy.apply(Some(&schema)).unwrap();
            let twice = policy.apply(Some(&once)).unwrap();
            assert!(twice.ptr_eq(&once));
        }
    }

    #[test]
    fn test_absent_schema() {
        assert!(coerce_form_data(None).is_none());
        assert!(coerce_root_primitive(None).is_none());
    }
}
