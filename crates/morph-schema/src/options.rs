//! # Compiler Options
//!
//! Serde-loadable configuration for [`Compiler`](crate::compile::Compiler).
//! Every field has a default, so an empty document is a valid
//! configuration.

use serde::{Deserialize, Serialize};

/// Validator compiler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
    /// Enforce `format` keywords (`email`, `date-time`, ...).
    #[serde(default = "default_validate_formats")]
    pub validate_formats: bool,

    /// Try the bridging collaborator for foreign schemas.
    #[serde(default = "default_use_bridge")]
    pub use_bridge: bool,

    /// Reuse compiled validators for structurally identical schemas.
    #[serde(default = "default_cache")]
    pub cache: bool,

    /// Upper bound on issues collected by `validate`.
    #[serde(default = "default_max_issues")]
    pub max_issues: usize,
}

fn default_validate_formats() -> bool {
    true
}

fn default_use_bridge() -> bool {
    true
}

fn default_cache() -> bool {
    true
}

fn default_max_issues() -> usize {
    100
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            validate_formats: default_validate_formats(),
            use_bridge: default_use_bridge(),
            cache: default_cache(),
            max_issues: default_max_issues(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let opts: CompilerOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, CompilerOptions::default());
        assert_eq!(opts.max_issues, 100);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let opts: CompilerOptions =
            serde_yaml::from_str("use_bridge: false\nmax_issues: 5\n").unwrap();
        assert!(!opts.use_bridge);
        assert_eq!(opts.max_issues, 5);
        assert!(opts.cache);
    }
}
