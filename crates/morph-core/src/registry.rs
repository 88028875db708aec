//! # Schema Registries and Resolution
//!
//! Route definitions name their schemas either literally or by name. Names
//! resolve against two layered registries:
//!
//! 1. **modules** — a pre-compiled namespace of mutually referable
//!    definitions. Lookups yield a lazy [`Reference`](crate::node::Reference)
//!    into the namespace, so members may be recursive.
//! 2. **models** — flat user registrations.
//!
//! Modules win when both define a name. Absent or empty registries are not
//! an error; lookup simply yields `None`.
//!
//! A name ending in `[]` is array shorthand: `"Product[]"` resolves
//! `"Product"` through the same layers and wraps it in an array.

use indexmap::IndexMap;

use crate::node::{Definitions, Schema};

/// Flat, insertion-ordered model registrations.
pub type Models = IndexMap<String, Schema>;

const ARRAY_SUFFIX: &str = "[]";

/// A named definitions namespace.
#[derive(Debug, Clone, Default)]
pub struct Module {
    defs: Definitions,
}

impl Module {
    /// A module over an existing definitions table.
    pub fn new(defs: Definitions) -> Self {
        Self { defs }
    }

    /// A module sealed with the given entries.
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Self::new(Definitions::sealed(entries))
    }

    /// The underlying definitions.
    pub fn definitions(&self) -> &Definitions {
        &self.defs
    }

    /// Whether the module defines `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.defs.get(name).is_some()
    }

    /// A lazy reference to `name`, if defined.
    pub fn import(&self, name: &str) -> Option<Schema> {
        self.contains(name).then(|| self.defs.reference(name))
    }
}

/// A schema given by name or literally.
#[derive(Debug, Clone)]
pub enum SchemaSource {
    /// Registry name, optionally with the `[]` array suffix.
    Name(String),
    /// A concrete node (native or foreign).
    Literal(Schema),
}

impl From<&str> for SchemaSource {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for SchemaSource {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Schema> for SchemaSource {
    fn from(schema: Schema) -> Self {
        Self::Literal(schema)
    }
}

/// Resolve a schema source against the layered registries.
///
/// Literal schemas pass through unchanged. Names are looked up in
/// `modules` first, then `models`.
///
/// A module hit comes back as a [`Kind::Ref`](crate::Kind::Ref) node into
/// the module's table, not as the member itself. Coercion policies never
/// rewrite beneath a reference root, so a body imported from a module is
/// not coerced; resolve the reference's target first when it should be.
pub fn resolve_schema(
    source: Option<&SchemaSource>,
    models: Option<&Models>,
    modules: Option<&Module>,
) -> Option<Schema> {
    match source? {
        SchemaSource::Literal(schema) => Some(schema.clone()),
        SchemaSource::Name(name) => match name.strip_suffix(ARRAY_SUFFIX) {
            Some(element) => lookup(element, models, modules).map(Schema::array),
            None => lookup(name, models, modules),
        },
    }
}

fn lookup(name: &str, models: Option<&Models>, modules: Option<&Module>) -> Option<Schema> {
    modules
        .and_then(|m| m.import(name))
        .or_else(|| models.and_then(|m| m.get(name)).cloned())
}

/// Models and modules bundled for route compilation.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Flat model registrations.
    pub models: Models,
    /// Optional module namespace.
    pub modules: Option<Module>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model, replacing any previous registration of `name`.
    pub fn model(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.models.insert(name.into(), schema);
        self
    }

    /// Attach a module namespace.
    pub fn with_module(mut self, module: Module) -> Self {
        self.modules = Some(module);
        self
    }

    /// Resolve a schema source against this registry.
    pub fn resolve(&self, source: &SchemaSource) -> Option<Schema> {
        resolve_schema(Some(source), Some(&self.models), self.modules.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Kind;

    #[test]
    fn test_modules_take_priority() {
        let schema_a = Schema::string();
        let schema_b = Schema::number();
        let models: Models = [("Product".to_string(), schema_a)].into_iter().collect();
        let modules = Module::from_entries([("Product", schema_b.clone())]);

        let resolved =
            resolve_schema(Some(&"Product".into()), Some(&models), Some(&modules)).unwrap();
        assert_eq!(resolved.kind(), Kind::Ref);
        let target = resolved.as_reference().unwrap().target().unwrap();
        assert!(target.ptr_eq(&schema_b));
    }

    #[test]
    fn test_falls_back_to_models() {
        let schema_a = Schema::string();
        let models: Models = [("User".to_string(), schema_a.clone())].into_iter().collect();
        let modules = Module::from_entries([("Product", Schema::number())]);

        let resolved =
            resolve_schema(Some(&"User".into()), Some(&models), Some(&modules)).unwrap();
        assert!(resolved.ptr_eq(&schema_a));
    }

    #[test]
    fn test_missing_name_is_none() {
        let models = Models::new();
        assert!(resolve_schema(Some(&"Ghost".into()), Some(&models), None).is_none());
        assert!(resolve_schema(Some(&"Ghost".into()), None, None).is_none());
    }

    #[test]
    fn test_absent_source_is_none() {
        assert!(resolve_schema(None, None, None).is_none());
    }

    #[test]
    fn test_literal_passes_through() {
        let literal = Schema::boolean();
        let resolved =
            resolve_schema(Some(&literal.clone().into()), None, None).unwrap();
        assert!(resolved.ptr_eq(&literal));
    }

    #[test]
    fn test_array_shorthand() {
        let registry = Registry::new().model("Tag", Schema::string());
        let resolved = registry.resolve(&"Tag[]".into()).unwrap();
        assert_eq!(resolved.kind(), Kind::Array);
        assert_eq!(resolved.as_array().unwrap().items.kind(), Kind::String);
        assert!(registry.resolve(&"Missing[]".into()).is_none());
    }

    #[test]
    fn test_module_members_can_recurse() {
        let defs = Definitions::new();
        let tree = Schema::object([("children", Schema::array(defs.reference("Tree")))]);
        defs.seal([("Tree", tree.clone())]).unwrap();
        let registry = Registry::new().with_module(Module::new(defs));

        let resolved = registry.resolve(&"Tree".into()).unwrap();
        assert_eq!(resolved.kind(), Kind::Ref);
        assert!(resolved.as_reference().unwrap().target().unwrap().ptr_eq(&tree));
    }
}
