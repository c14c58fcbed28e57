#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! frigate-cfg: schema, validation and storage core for Frigate NVR configuration files.
//!
//! This crate organizes the codebase into cohesive modules and exposes a convenient prelude
//! for downstream crates/binaries. Most implementation details live under the internal modules:
//! - `config`: Schema tree, validator/normalizer, YAML codec and typed model.
//! - `error`: Parse, validation and store error types.
//! - `store`: The `ConfigStore` facade and its local, file and remote backends.
//! - `utils`: Small helpers over untyped YAML values.
//!
//! Use `frigate_cfg::prelude::*` to bring commonly used items into scope quickly.

/// Public module: configuration (schema, validation, codec, models).
pub mod config;
/// Public module: error taxonomy.
pub mod error;
/// Public module: configuration store facade and backends.
pub mod store;
/// Public module: utilities.
pub mod utils;

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "0.1.0").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Parse a level name (trace|debug|info|warn|error), case-insensitively.
pub fn parse_level(s: &str) -> Option<tracing::Level> {
    use tracing::Level;
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize tracing (logging) with a reasonable default.
/// - `level` wins when given.
/// - Otherwise honors the `RUST_LOG` environment variable if set.
/// - Falls back to `info` level.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing(level: Option<&str>) {
    use tracing::Level;
    use tracing_subscriber::fmt;

    let level = level
        .and_then(parse_level)
        .or_else(|| std::env::var("RUST_LOG").ok().as_deref().and_then(parse_level))
        .unwrap_or(Level::INFO);

    // Ignore the error if the global subscriber was already set.
    let _ = fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use frigate_cfg::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};

    // Serialization
    pub use serde::{Deserialize, Serialize};

    // Tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    // External crates (namespaced) if callers want direct access
    pub use crate as frigate_cfg;
    pub use serde_yaml;

    // Core types
    pub use crate::config::{Camera, Configuration, ValidationReport};
    pub use crate::error::{ConfigValidationError, ParseError, StoreError, Violation};
    pub use crate::store::{
        ConfigDestination, ConfigSource, ConfigStore, Outcome, RemoteLocation, SaveReceipt,
    };

    // Frequently used internal modules
    pub use crate::{config, error, store, utils};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(parse_level("WARNING"), Some(tracing::Level::WARN));
        assert_eq!(parse_level("debug"), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level("loud"), None);
        assert_eq!(version(), PKG_VERSION);
    }
}
