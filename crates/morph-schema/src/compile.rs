//! # Validator Compiler
//!
//! Turns any schema into the fastest validator available for it.
//!
//! ## Strategy
//!
//! 1. **Native.** Introspectable nodes are lowered and compiled directly.
//! 2. **Bridge.** A foreign schema is offered to the bridging collaborator.
//!    An `Unsupported` answer and a failed conversion are the same thing:
//!    the next strategy runs.
//! 3. **Standard.** A foreign schema exposing the Standard Validation
//!    Capability is wrapped as-is.
//! 4. Otherwise compilation fails with `CompileError::Unsupported`.
//!
//! ## Caching
//!
//! Compiled validators are cached by the SHA-256 digest of the canonical
//! lowered document, so structurally identical schemas share one
//! validator. Concurrent misses may compile twice; the first insert wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use morph_core::{sha256_digest, CanonicalBytes, ContentDigest, Schema};
use parking_lot::RwLock;

use crate::bridge::{self, SchemaBridge};
use crate::error::CompileError;
use crate::lower::lower_with;
use crate::options::CompilerOptions;
use crate::validate::{CompiledValidator, StandardValidator, Validator};

/// A configured validator compiler with its cache.
pub struct Compiler {
    options: CompilerOptions,
    bridge: Option<Arc<dyn SchemaBridge>>,
    cache: RwLock<HashMap<ContentDigest, Arc<CompiledValidator>>>,
}

impl Compiler {
    /// A compiler using the process-wide bridge when `options.use_bridge`.
    pub fn new(options: CompilerOptions) -> Self {
        let bridge = if options.use_bridge {
            bridge::probe()
        } else {
            None
        };
        Self::with_bridge(options, bridge)
    }

    /// A compiler with an explicit bridge (or none).
    pub fn with_bridge(options: CompilerOptions, bridge: Option<Arc<dyn SchemaBridge>>) -> Self {
        Self {
            options,
            bridge,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The options this compiler was built with.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Whether this compiler has a bridge.
    pub fn has_bridge(&self) -> bool {
        self.bridge.is_some()
    }

    /// Number of cached validators.
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }

    /// Compile `schema`.
    ///
    /// # Errors
    ///
    /// `CompileError::Unsupported` when no strategy applies. Lowering and
    /// backend failures on the native path propagate as they are.
    pub fn compile(&self, schema: &Schema) -> Result<Validator, CompileError> {
        let Some(foreign) = schema.as_foreign() else {
            tracing::trace!(kind = %schema.kind(), "compiling native schema");
            return self.compile_native(schema).map(Validator::Compiled);
        };
        let vendor = foreign.payload().vendor();

        if let Some(bridge) = &self.bridge {
            match bridge.convert(foreign) {
                Ok(native) => {
                    tracing::debug!(vendor, bridge = bridge.name(), "foreign schema bridged");
                    return self.compile_native(&native).map(Validator::Compiled);
                }
                Err(e) => {
                    tracing::debug!(
                        vendor,
                        bridge = bridge.name(),
                        error = %e,
                        "bridge conversion unavailable"
                    );
                }
            }
        }

        if let Some(standard) = StandardValidator::new(schema.clone()) {
            tracing::debug!(vendor, "using standard validation capability");
            return Ok(Validator::Standard(standard));
        }

        tracing::warn!(vendor, "no compilation strategy for schema");
        Err(CompileError::Unsupported(format!(
            "{vendor} schema is not native, not bridgeable, and exposes no standard validation"
        )))
    }

    fn compile_native(&self, schema: &Schema) -> Result<Arc<CompiledValidator>, CompileError> {
        let lowered = lower_with(schema, self.bridge.as_deref())?;
        let digest = sha256_digest(&CanonicalBytes::new(&lowered)?);

        if self.options.cache {
            if let Some(hit) = self.cache.read().get(&digest) {
                tracing::trace!(%digest, "validator cache hit");
                return Ok(Arc::clone(hit));
            }
        }

        let compiled = Arc::new(CompiledValidator::build(
            schema.clone(),
            lowered,
            digest,
            &self.options,
        )?);
        if !self.options.cache {
            return Ok(compiled);
        }
        tracing::trace!(%digest, "validator cache miss");
        let mut cache = self.cache.write();
        Ok(Arc::clone(cache.entry(digest).or_insert(compiled)))
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerOptions::default())
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("options", &self.options)
            .field("bridge", &self.bridge.as_ref().map(|b| b.name().to_string()))
            .field("cached", &self.cached())
            .finish()
    }
}

/// The process-wide default compiler.
pub fn default_compiler() -> &'static Compiler {
    static COMPILER: OnceLock<Compiler> = OnceLock::new();
    COMPILER.get_or_init(Compiler::default)
}

/// Compile `schema` with the process-wide default compiler.
///
/// # Errors
///
/// See [`Compiler::compile`].
pub fn to_validator(schema: &Schema) -> Result<Validator, CompileError> {
    default_compiler().compile(schema)
}
