//! # Validators
//!
//! The executable products of compilation.
//!
//! - [`CompiledValidator`]: a lowered schema compiled by the `jsonschema`
//!   backend (Draft 2020-12), plus the source schema for codec decode and
//!   encode. `check` and `errors` decode wire values through the schema's
//!   codecs before the backend sees them.
//! - [`StandardValidator`]: delegates to a foreign schema's Standard
//!   Validation Capability.
//! - [`Validator`]: either of the two behind one `validate` contract.
//!
//! ## Thread Safety
//!
//! Validators are immutable after construction and `Send + Sync`; one
//! instance serves any number of concurrent requests.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use morph_core::{ContentDigest, Issue, Outcome, Schema};
use morph_transform::has_codec;
use serde_json::Value;

use crate::error::CompileError;
use crate::options::CompilerOptions;
use crate::transcode::{decode_value, encode_value};

/// A natively compiled validator.
pub struct CompiledValidator {
    schema: Schema,
    lowered: Value,
    digest: ContentDigest,
    backend: jsonschema::Validator,
    decodes: bool,
    max_issues: usize,
}

impl CompiledValidator {
    /// Compile an already lowered schema.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::Build` if the backend rejects the document
    /// (e.g. an invalid `pattern`).
    pub fn build(
        schema: Schema,
        lowered: Value,
        digest: ContentDigest,
        options: &CompilerOptions,
    ) -> Result<Self, CompileError> {
        let backend = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .should_validate_formats(options.validate_formats)
            .build(&lowered)
            .map_err(|e| CompileError::Build(e.to_string()))?;

        Ok(Self {
            decodes: has_codec(Some(&schema)),
            schema,
            lowered,
            digest,
            backend,
            max_issues: options.max_issues,
        })
    }

    /// Whether `value` conforms. Wire forms of coerced nodes are decoded
    /// first; a value that does not decode does not conform.
    pub fn check(&self, value: &Value) -> bool {
        match self.decoded(value) {
            Ok(decoded) => self.backend.is_valid(&decoded),
            Err(_) => false,
        }
    }

    /// Issues for `value`. Lazy for schemas without codecs; otherwise the
    /// decoded value's issues are gathered up front, and a decode failure is
    /// the single issue.
    pub fn errors<'a>(&'a self, value: &'a Value) -> impl Iterator<Item = Issue> + 'a {
        let (direct, gathered) = match self.decoded(value) {
            Ok(Cow::Borrowed(value)) => (Some(self.backend_errors(value)), Vec::new()),
            Ok(Cow::Owned(decoded)) => (None, self.backend_issues(&decoded, usize::MAX)),
            Err(issue) => (None, vec![issue]),
        };
        direct.into_iter().flatten().chain(gathered)
    }

    /// At most `limit` issues for `value`.
    pub fn errors_limited(&self, value: &Value, limit: usize) -> Vec<Issue> {
        match self.decoded(value) {
            Ok(decoded) => self.backend_issues(&decoded, limit),
            Err(issue) => std::iter::once(issue).take(limit).collect(),
        }
    }

    fn decoded<'v>(&self, value: &'v Value) -> Result<Cow<'v, Value>, Issue> {
        if !self.decodes {
            return Ok(Cow::Borrowed(value));
        }
        decode_value(&self.schema, value.clone()).map(Cow::Owned)
    }

    fn backend_errors<'a>(&'a self, value: &'a Value) -> impl Iterator<Item = Issue> + 'a {
        self.backend
            .iter_errors(value)
            .map(|e| Issue::at(e.instance_path.to_string(), e.to_string()))
    }

    fn backend_issues(&self, value: &Value, limit: usize) -> Vec<Issue> {
        self.backend_errors(value).take(limit).collect()
    }

    /// Whether the schema contains codecs, i.e. whether `decode` does
    /// anything.
    pub fn has_codec(&self) -> bool {
        self.decodes
    }

    /// Convert a wire value into its structural form.
    ///
    /// # Errors
    ///
    /// Returns the codec's [`Issue`] when a wire value cannot be decoded.
    pub fn decode(&self, value: Value) -> Result<Value, Issue> {
        if !self.decodes {
            return Ok(value);
        }
        decode_value(&self.schema, value)
    }

    /// Convert a structural value into its wire form.
    ///
    /// # Errors
    ///
    /// Returns the codec's [`Issue`] when a value cannot be encoded.
    pub fn encode(&self, value: Value) -> Result<Value, Issue> {
        if !self.decodes {
            return Ok(value);
        }
        encode_value(&self.schema, value)
    }

    /// Decode, then check the decoded value.
    pub fn validate(&self, value: &Value) -> Outcome {
        let decoded = match self.decode(value.clone()) {
            Ok(decoded) => decoded,
            Err(issue) => return Outcome::Issues(vec![issue]),
        };
        if self.backend.is_valid(&decoded) {
            Outcome::Value(decoded)
        } else {
            Outcome::Issues(self.backend_issues(&decoded, self.max_issues))
        }
    }

    /// The source schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The lowered JSON Schema document.
    pub fn lowered(&self) -> &Value {
        &self.lowered
    }

    /// Structural digest of the lowered document.
    pub fn digest(&self) -> ContentDigest {
        self.digest
    }
}

impl fmt::Debug for CompiledValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledValidator")
            .field("digest", &self.digest.to_string())
            .field("decodes", &self.decodes)
            .finish_non_exhaustive()
    }
}

/// A validator delegating to a foreign schema's Standard Validation
/// Capability.
#[derive(Debug, Clone)]
pub struct StandardValidator {
    schema: Schema,
}

impl StandardValidator {
    /// Wrap `schema` if it is foreign and exposes the capability.
    pub fn new(schema: Schema) -> Option<Self> {
        let capable = schema
            .as_foreign()
            .is_some_and(|f| f.payload().standard().is_some());
        capable.then_some(Self { schema })
    }

    /// Validate through the foreign schema.
    pub fn validate(&self, value: &Value) -> Outcome {
        match self
            .schema
            .as_foreign()
            .and_then(|f| f.payload().standard())
        {
            Some(standard) => standard.validate(value),
            None => Outcome::Issues(vec![Issue::new("standard validation unavailable")]),
        }
    }

    /// The wrapped foreign schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// A compiled or standard validator.
#[derive(Debug, Clone)]
pub enum Validator {
    /// Native compiled validator (shared with the compiler cache).
    Compiled(Arc<CompiledValidator>),
    /// Foreign Standard Validation Capability.
    Standard(StandardValidator),
}

impl Validator {
    /// Validate `value`: the (decoded) value on success, issues otherwise.
    pub fn validate(&self, value: &Value) -> Outcome {
        match self {
            Self::Compiled(v) => v.validate(value),
            Self::Standard(v) => v.validate(value),
        }
    }

    /// Whether `value` conforms.
    pub fn check(&self, value: &Value) -> bool {
        match self {
            Self::Compiled(v) => v.check(value),
            Self::Standard(v) => v.validate(value).is_valid(),
        }
    }

    /// The compiled validator, if this is one.
    pub fn as_compiled(&self) -> Option<&CompiledValidator> {
        match self {
            Self::Compiled(v) => Some(v.as_ref()),
            Self::Standard(_) => None,
        }
    }

    /// Whether this validator took the compiled path.
    pub fn is_compiled(&self) -> bool {
        matches!(self, Self::Compiled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::lower;
    use morph_core::{sha256_digest, CanonicalBytes};
    use morph_transform::{coerce_form_data, coerce_query, coerce_root_primitive};
    use serde_json::json;

    fn compile(schema: &Schema) -> CompiledValidator {
        let lowered = lower(schema).unwrap();
        let digest = sha256_digest(&CanonicalBytes::new(&lowered).unwrap());
        CompiledValidator::build(schema.clone(), lowered, digest, &CompilerOptions::default())
            .unwrap()
    }

    #[test]
    fn test_check_and_errors() {
        let v = compile(&Schema::object([
            ("name", Schema::string()),
            ("age", Schema::optional(Schema::integer())),
        ]));
        assert!(v.check(&json!({"name": "ada"})));
        assert!(v.check(&json!({"name": "ada", "age": 36})));
        assert!(!v.check(&json!({"age": 36})));

        let issues = v.errors_limited(&json!({"name": 1, "age": "x"}), 10);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.path.as_deref() == Some("/name")));
        assert!(v.errors(&json!({"name": "ok"})).next().is_none());
    }

    #[test]
    fn test_errors_limited_bounds_output() {
        let v = compile(&Schema::array(Schema::integer()));
        let bad = json!(["a", "b", "c", "d"]);
        assert_eq!(v.errors_limited(&bad, 2).len(), 2);
    }

    #[test]
    fn test_validate_decodes_wire_form() {
        let schema = coerce_form_data(Some(&Schema::object([(
            "profile",
            Schema::object([("bio", Schema::string())]),
        )])))
        .unwrap();
        let v = compile(&schema);
        assert!(v.has_codec());

        let wire = json!({"profile": "{\"bio\":\"hi\"}"});
        assert!(v.check(&wire));
        assert_eq!(
            v.validate(&wire),
            Outcome::Value(json!({"profile": {"bio": "hi"}}))
        );

        let wrong = json!({"profile": "{\"bio\":3}"});
        let outcome = v.validate(&wrong);
        assert!(!outcome.is_valid());
        assert_eq!(outcome.issues()[0].path.as_deref(), Some("/profile/bio"));

        let encoded = v.encode(json!({"profile": {"bio": "hi"}})).unwrap();
        assert_eq!(encoded, json!({"profile": "{\"bio\":\"hi\"}"}));
    }

    #[test]
    fn test_undecodable_value_is_an_issue() {
        let schema =
            coerce_form_data(Some(&Schema::object([("meta", Schema::empty_object())]))).unwrap();
        let v = compile(&schema);
        let outcome = v.validate(&json!({"meta": "not json"}));
        assert_eq!(outcome.issues().len(), 1);
        assert_eq!(outcome.issues()[0].path.as_deref(), Some("/meta"));
    }

    #[test]
    fn test_invalidated_rejects_everything() {
        let v = compile(&Schema::invalidated());
        assert!(!v.check(&json!(null)));
        assert!(!v.check(&json!({})));
    }

    #[test]
    fn test_standard_validator_requires_capability() {
        let plain = Schema::string();
        assert!(StandardValidator::new(plain).is_none());
    }

    #[test]
    fn test_check_rejects_wire_values_that_fail_the_schema() {
        let user = Schema::object([("user", Schema::object([("name", Schema::string())]))]);
        let v = compile(&coerce_form_data(Some(&user)).unwrap());

        assert!(v.check(&json!({"user": "{\"name\":\"ada\"}"})));
        for bad in [
            json!({"user": "{}"}),
            json!({"user": "not json"}),
            json!({"user": "{\"name\": 5}"}),
        ] {
            assert!(!v.check(&bad), "{bad}");
            assert!(v.errors(&bad).next().is_some(), "{bad}");
            assert!(!v.validate(&bad).is_valid(), "{bad}");
        }

        let issues: Vec<Issue> = v.errors(&json!({"user": "not json"})).collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path.as_deref(), Some("/user"));
    }

    #[test]
    fn test_check_rejects_bad_query_items_and_numbers() {
        let listing = Schema::object([("ids", Schema::array(Schema::integer()))]);
        let v = compile(&coerce_query(Some(&listing)).unwrap());
        assert!(v.check(&json!({"ids": "1,2"})));
        assert!(!v.check(&json!({"ids": "1,x"})));
        assert_eq!(v.errors_limited(&json!({"ids": "1,x"}), 5)[0].path.as_deref(), Some("/ids/1"));

        let number = compile(&coerce_root_primitive(Some(&Schema::number())).unwrap());
        assert!(number.check(&json!("12.5")));
        assert!(!number.check(&json!("1e400")));
        assert_eq!(number.errors_limited(&json!("1e400"), 5).len(), 1);
        assert!(number.errors_limited(&json!("1e400"), 0).is_empty());
    }
}
