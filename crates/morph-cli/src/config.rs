//! # Compiler Configuration
//!
//! Loads [`CompilerOptions`] from the `--config` file. Missing keys take
//! their defaults; with no file the defaults are used as-is.

use std::path::Path;

use anyhow::{Context, Result};
use morph_schema::CompilerOptions;

/// Load compiler options from `path`, or the defaults when `None`.
pub fn load_options(path: Option<&Path>) -> Result<CompilerOptions> {
    let Some(path) = path else {
        return Ok(CompilerOptions::default());
    };
    let value = crate::read_value(path)?;
    let options: CompilerOptions = serde_json::from_value(value)
        .with_context(|| format!("invalid compiler options in {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        validate_formats = options.validate_formats,
        use_bridge = options.use_bridge,
        cache = options.cache,
        max_issues = options.max_issues,
        "loaded compiler options"
    );
    Ok(options)
}
