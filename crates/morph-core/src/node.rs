//! # Schema Node Model
//!
//! The tagged-variant representation shared by every component of the
//! engine. A [`Schema`] is a cheap, clonable handle to an immutable node;
//! handles are shared freely across threads and caches.
//!
//! ## Invariants
//!
//! - Nodes are never mutated after construction. Rewrites build new nodes
//!   for changed branches and share unchanged sub-nodes by handle.
//! - Node identity is handle identity ([`Schema::id`], [`Schema::ptr_eq`]).
//! - Property keys are unique and insertion-ordered.
//! - Composition branch order is significant.
//! - A [`Reference`] is resolved lazily against its [`Definitions`]; its
//!   target is never inlined. References are the only way to build a
//!   cyclic schema graph.
//! - Coercion tags are attached only through [`Schema::with_coercion`],
//!   which the coercion layer alone calls.

use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use serde_json::Value;

use crate::codec::Codec;
use crate::error::CoreError;
use crate::foreign::ForeignSchema;
use crate::kind::{CompositionKind, Kind, PrimitiveKind, WrapperKind};
use crate::tag::CoercionTag;

/// Descriptive metadata carried by every node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    /// Short human-readable title.
    pub title: Option<String>,
    /// Longer description.
    pub description: Option<String>,
    coercion: Option<CoercionTag>,
}

impl Meta {
    /// The coercion tag, if this node was produced by a coercion pass.
    pub fn coercion(&self) -> Option<CoercionTag> {
        self.coercion
    }
}

/// Constraint metadata on a primitive leaf.
///
/// Ignored by rule matching, which is shape-based.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    /// Named format (`"email"`, `"date-time"`, ...).
    pub format: Option<String>,
    /// Regular expression the value must match.
    pub pattern: Option<String>,
    /// Minimum string length.
    pub min_length: Option<u64>,
    /// Maximum string length.
    pub max_length: Option<u64>,
    /// Inclusive numeric lower bound.
    pub minimum: Option<f64>,
    /// Inclusive numeric upper bound.
    pub maximum: Option<f64>,
    /// Permitted literal values. Empty means unrestricted.
    pub enum_values: Vec<Value>,
    /// Default value.
    pub default: Option<Value>,
}

impl Constraints {
    /// Set the format.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set the pattern.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Set the string length bounds.
    pub fn length(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    /// Set the numeric bounds.
    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.minimum = min;
        self.maximum = max;
        self
    }

    /// Restrict to literal values.
    pub fn one_of_values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.enum_values = values.into_iter().collect();
        self
    }
}

/// A primitive leaf.
#[derive(Debug, Clone)]
pub struct Primitive {
    /// Sub-kind.
    pub kind: PrimitiveKind,
    /// Constraint metadata.
    pub constraints: Constraints,
}

/// An object with ordered named properties.
#[derive(Debug, Clone)]
pub struct Object {
    /// Property schemas, in declaration order.
    pub properties: IndexMap<String, Schema>,
    /// Whether undeclared properties are permitted.
    pub additional_properties: bool,
}

impl Object {
    /// Names of required properties: every property not wrapped in
    /// `Optional`, in declaration order.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter(|(_, s)| s.kind() != Kind::Optional)
            .map(|(k, _)| k.as_str())
    }
}

/// An array with a single item schema.
#[derive(Debug, Clone)]
pub struct Array {
    /// Item schema.
    pub items: Schema,
    /// Minimum item count.
    pub min_items: Option<u64>,
    /// Maximum item count.
    pub max_items: Option<u64>,
}

/// A composition over ordered branches.
#[derive(Debug, Clone)]
pub struct Composition {
    /// anyOf / oneOf / allOf.
    pub kind: CompositionKind,
    /// Branches, in order. First structural match wins ties.
    pub branches: Vec<Schema>,
}

/// A wrapper around an inner node.
#[derive(Debug, Clone)]
pub struct Wrapper {
    kind: WrapperKind,
    inner: Schema,
    codec: Option<Codec>,
}

impl Wrapper {
    /// Optional wrapper.
    pub fn optional(inner: Schema) -> Self {
        Self {
            kind: WrapperKind::Optional,
            inner,
            codec: None,
        }
    }

    /// Nullable wrapper.
    pub fn nullable(inner: Schema) -> Self {
        Self {
            kind: WrapperKind::Nullable,
            inner,
            codec: None,
        }
    }

    /// Codec wrapper.
    pub fn with_codec(inner: Schema, codec: Codec) -> Self {
        Self {
            kind: WrapperKind::Codec,
            inner,
            codec: Some(codec),
        }
    }

    /// Wrapper kind.
    pub fn kind(&self) -> WrapperKind {
        self.kind
    }

    /// The wrapped node.
    pub fn inner(&self) -> &Schema {
        &self.inner
    }

    /// The codec, for codec wrappers.
    pub fn codec(&self) -> Option<&Codec> {
        self.codec.as_ref()
    }

    /// The same wrapper around a different inner node.
    pub fn rewrap(&self, inner: Schema) -> Self {
        Self {
            kind: self.kind,
            inner,
            codec: self.codec.clone(),
        }
    }
}

/// A write-once, shared table of named definitions.
///
/// Create the table, build nodes that reference it, then [`seal`] it.
/// Definitions may therefore refer to themselves or to each other.
/// A table whose entries reference it forms a reference cycle and lives
/// for the rest of the process, like the schemas it defines.
///
/// [`seal`]: Definitions::seal
#[derive(Clone, Default)]
pub struct Definitions(Arc<OnceLock<IndexMap<String, Schema>>>);

impl Definitions {
    /// An empty, unsealed table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table sealed with the given entries.
    pub fn sealed<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        let defs = Self::new();
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        // A fresh table cannot already be sealed.
        let _ = defs.0.set(map);
        defs
    }

    /// Seal the table with its entries.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::DefinitionsSealed` if the table was sealed before.
    pub fn seal<K, I>(&self, entries: I) -> Result<(), CoreError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.0.set(map).map_err(|_| CoreError::DefinitionsSealed)
    }

    /// Whether the table has been sealed.
    pub fn is_sealed(&self) -> bool {
        self.0.get().is_some()
    }

    /// Look up a definition. Unsealed tables resolve nothing.
    pub fn get(&self, name: &str) -> Option<Schema> {
        self.0.get().and_then(|m| m.get(name)).cloned()
    }

    /// Iterate definitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.0
            .get()
            .into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// A reference node into this table.
    pub fn reference(&self, name: impl Into<String>) -> Schema {
        Schema::new(Node::Reference(Reference {
            name: name.into(),
            defs: self.clone(),
        }))
    }

    /// Identity of the table.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Whether two handles share a table.
    pub fn ptr_eq(&self, other: &Definitions) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Definitions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Names only: entries may reference this table.
        f.debug_list().entries(self.iter().map(|(k, _)| k)).finish()
    }
}

/// A lazy named reference.
#[derive(Debug, Clone)]
pub struct Reference {
    name: String,
    defs: Definitions,
}

impl Reference {
    /// Referenced name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The definitions table the name resolves against.
    pub fn definitions(&self) -> &Definitions {
        &self.defs
    }

    /// Resolve the target.
    pub fn target(&self) -> Option<Schema> {
        self.defs.get(&self.name)
    }
}

/// An opaque foreign schema.
#[derive(Debug, Clone)]
pub struct Foreign {
    payload: Arc<dyn ForeignSchema>,
}

impl Foreign {
    /// The foreign payload.
    pub fn payload(&self) -> &dyn ForeignSchema {
        self.payload.as_ref()
    }
}

/// The tagged node variants.
#[derive(Debug, Clone)]
pub enum Node {
    /// Primitive leaf.
    Primitive(Primitive),
    /// Object.
    Object(Object),
    /// Array.
    Array(Array),
    /// anyOf / oneOf / allOf.
    Composition(Composition),
    /// Optional / Nullable / Codec wrapper.
    Wrapper(Wrapper),
    /// Lazy named reference.
    Reference(Reference),
    /// Opaque foreign schema.
    Foreign(Foreign),
    /// Null marker left where a rewrite's replacement was empty.
    Invalidated,
}

struct SchemaNode {
    node: Node,
    meta: Meta,
}

/// Shared handle to an immutable schema node.
#[derive(Clone)]
pub struct Schema(Arc<SchemaNode>);

impl Schema {
    /// Wrap a node with default metadata.
    pub fn new(node: Node) -> Self {
        Self::with_meta(node, Meta::default())
    }

    /// Wrap a node with metadata.
    pub fn with_meta(node: Node, meta: Meta) -> Self {
        Self(Arc::new(SchemaNode { node, meta }))
    }

    /// Primitive leaf.
    pub fn primitive(kind: PrimitiveKind, constraints: Constraints) -> Self {
        Self::new(Node::Primitive(Primitive { kind, constraints }))
    }

    /// Unconstrained string.
    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String, Constraints::default())
    }

    /// Unconstrained number.
    pub fn number() -> Self {
        Self::primitive(PrimitiveKind::Number, Constraints::default())
    }

    /// Unconstrained integer.
    pub fn integer() -> Self {
        Self::primitive(PrimitiveKind::Integer, Constraints::default())
    }

    /// Boolean.
    pub fn boolean() -> Self {
        Self::primitive(PrimitiveKind::Boolean, Constraints::default())
    }

    /// Null.
    pub fn null() -> Self {
        Self::primitive(PrimitiveKind::Null, Constraints::default())
    }

    /// Binary upload.
    pub fn file() -> Self {
        Self::primitive(PrimitiveKind::File, Constraints::default())
    }

    /// Object permitting additional properties.
    pub fn object<K, I>(properties: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Self::new(Node::Object(Object {
            properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            additional_properties: true,
        }))
    }

    /// Object with no properties.
    pub fn empty_object() -> Self {
        Self::object(Vec::<(String, Schema)>::new())
    }

    /// Array of `items`.
    pub fn array(items: Schema) -> Self {
        Self::new(Node::Array(Array {
            items,
            min_items: None,
            max_items: None,
        }))
    }

    /// Composition node.
    pub fn composition(kind: CompositionKind, branches: impl IntoIterator<Item = Schema>) -> Self {
        Self::new(Node::Composition(Composition {
            kind,
            branches: branches.into_iter().collect(),
        }))
    }

    /// `anyOf` composition.
    pub fn any_of(branches: impl IntoIterator<Item = Schema>) -> Self {
        Self::composition(CompositionKind::AnyOf, branches)
    }

    /// `oneOf` composition.
    pub fn one_of(branches: impl IntoIterator<Item = Schema>) -> Self {
        Self::composition(CompositionKind::OneOf, branches)
    }

    /// `allOf` composition.
    pub fn all_of(branches: impl IntoIterator<Item = Schema>) -> Self {
        Self::composition(CompositionKind::AllOf, branches)
    }

    /// Optional wrapper.
    pub fn optional(inner: Schema) -> Self {
        Self::new(Node::Wrapper(Wrapper::optional(inner)))
    }

    /// Nullable wrapper.
    pub fn nullable(inner: Schema) -> Self {
        Self::new(Node::Wrapper(Wrapper::nullable(inner)))
    }

    /// Codec wrapper.
    pub fn codec(inner: Schema, codec: Codec) -> Self {
        Self::new(Node::Wrapper(Wrapper::with_codec(inner, codec)))
    }

    /// Foreign schema.
    pub fn foreign(payload: impl ForeignSchema + 'static) -> Self {
        Self::foreign_arc(Arc::new(payload))
    }

    /// Foreign schema from a shared payload.
    pub fn foreign_arc(payload: Arc<dyn ForeignSchema>) -> Self {
        Self::new(Node::Foreign(Foreign { payload }))
    }

    /// Explicit null marker.
    pub fn invalidated() -> Self {
        Self::new(Node::Invalidated)
    }

    /// The same node with a title.
    pub fn titled(&self, title: impl Into<String>) -> Self {
        let mut meta = self.0.meta.clone();
        meta.title = Some(title.into());
        Self::with_meta(self.0.node.clone(), meta)
    }

    /// The same node stamped with a coercion tag.
    ///
    /// Reserved for coercion rewriting; raw schema input never carries a tag.
    pub fn with_coercion(&self, tag: CoercionTag) -> Self {
        let mut meta = self.0.meta.clone();
        meta.coercion = Some(tag);
        Self::with_meta(self.0.node.clone(), meta)
    }

    /// The node.
    pub fn node(&self) -> &Node {
        &self.0.node
    }

    /// Metadata.
    pub fn meta(&self) -> &Meta {
        &self.0.meta
    }

    /// Coercion tag, if any.
    pub fn coercion(&self) -> Option<CoercionTag> {
        self.0.meta.coercion
    }

    /// Structural kind. Codec wrappers report the kind of what they wrap.
    pub fn kind(&self) -> Kind {
        let mut current = self;
        loop {
            match current.node() {
                Node::Primitive(p) => return p.kind.kind(),
                Node::Object(_) => return Kind::Object,
                Node::Array(_) => return Kind::Array,
                Node::Composition(c) => return c.kind.kind(),
                Node::Wrapper(w) => match w.kind {
                    WrapperKind::Optional => return Kind::Optional,
                    WrapperKind::Nullable => return Kind::Nullable,
                    WrapperKind::Codec => current = &w.inner,
                },
                Node::Reference(_) => return Kind::Ref,
                Node::Foreign(_) => return Kind::Foreign,
                Node::Invalidated => return Kind::Invalidated,
            }
        }
    }

    /// Identity of this node.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Whether two handles point at the same node.
    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The object node, if this is one.
    pub fn as_object(&self) -> Option<&Object> {
        match self.node() {
            Node::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The array node, if this is one.
    pub fn as_array(&self) -> Option<&Array> {
        match self.node() {
            Node::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The wrapper node, if this is one.
    pub fn as_wrapper(&self) -> Option<&Wrapper> {
        match self.node() {
            Node::Wrapper(w) => Some(w),
            _ => None,
        }
    }

    /// The composition node, if this is one.
    pub fn as_composition(&self) -> Option<&Composition> {
        match self.node() {
            Node::Composition(c) => Some(c),
            _ => None,
        }
    }

    /// The reference node, if this is one.
    pub fn as_reference(&self) -> Option<&Reference> {
        match self.node() {
            Node::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// The foreign node, if this is one.
    pub fn as_foreign(&self) -> Option<&Foreign> {
        match self.node() {
            Node::Foreign(f) => Some(f),
            _ => None,
        }
    }

    /// Whether this is the explicit null marker.
    pub fn is_invalidated(&self) -> bool {
        matches!(self.node(), Node::Invalidated)
    }

    /// Direct structural children, in order: property values, array
    /// items, composition branches, or the wrapped node. References and
    /// foreign nodes have none.
    pub fn children(&self) -> Vec<Schema> {
        match self.node() {
            Node::Object(o) => o.properties.values().cloned().collect(),
            Node::Array(a) => vec![a.items.clone()],
            Node::Composition(c) => c.branches.clone(),
            Node::Wrapper(w) => vec![w.inner.clone()],
            Node::Primitive(_) | Node::Reference(_) | Node::Foreign(_) | Node::Invalidated => {
                Vec::new()
            }
        }
    }

    /// Rebuild this node around new children, positionally matching
    /// [`children`](Schema::children). Metadata is preserved. Returns this
    /// handle when every child is identical, so unchanged branches keep
    /// their identity.
    pub fn with_children(&self, children: Vec<Schema>) -> Schema {
        let current = self.children();
        if current.len() != children.len()
            || current.iter().zip(&children).all(|(a, b)| a.ptr_eq(b))
        {
            return self.clone();
        }
        let node = match self.node() {
            Node::Object(o) => Node::Object(Object {
                properties: o.properties.keys().cloned().zip(children).collect(),
                additional_properties: o.additional_properties,
            }),
            Node::Array(a) => Node::Array(Array {
                items: children.into_iter().next().unwrap_or_else(|| a.items.clone()),
                min_items: a.min_items,
                max_items: a.max_items,
            }),
            Node::Composition(c) => Node::Composition(Composition {
                kind: c.kind,
                branches: children,
            }),
            Node::Wrapper(w) => Node::Wrapper(
                w.rewrap(children.into_iter().next().unwrap_or_else(|| w.inner.clone())),
            ),
            _ => return self.clone(),
        };
        Schema::with_meta(node, self.0.meta.clone())
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.meta == Meta::default() {
            self.0.node.fmt(f)
        } else {
            f.debug_struct("Schema")
                .field("node", &self.0.node)
                .field("meta", &self.0.meta)
                .finish()
        }
    }
}

impl From<Node> for Schema {
    fn from(node: Node) -> Self {
        Schema::new(node)
    }
}
