use anyhow::{Context, Result};
use schemars::{Schema, schema_for};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, trace};

use super::codec;
use super::models::Configuration;
use super::validate::normalize;

/// Load configuration from a string slice.
pub fn load_from_str(s: &str) -> Result<Configuration> {
    let tree = codec::decode(s).context("Failed to parse YAML config string")?;
    let cfg = normalize(&tree)?;
    Ok(migrate(cfg))
}

/// Load configuration from any reader (e.g., a file).
pub fn load_from_reader<R: Read>(mut reader: R) -> Result<Configuration> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .context("Failed to read YAML config from reader")?;
    load_from_str(&text)
}

/// Load configuration from a file path synchronously.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Configuration> {
    let path_ref = path.as_ref();
    let file = std::fs::File::open(path_ref)
        .with_context(|| format!("Failed to open config file {}", path_ref.display()))?;
    let cfg = load_from_reader(file)
        .with_context(|| format!("Invalid config file {}", path_ref.display()))?;
    debug!("Loaded config from {}", path_ref.display());
    Ok(cfg)
}

/// Load configuration from a file path asynchronously (Tokio).
pub async fn load_from_path_async<P: AsRef<Path>>(path: P) -> Result<Configuration> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let text = fs::read_to_string(path_ref)
        .await
        .with_context(|| format!("Failed to read config file {}", path_ref.display()))?;
    let cfg = load_from_str(&text)
        .with_context(|| format!("Invalid config file {}", path_ref.display()))?;
    debug!("Loaded config from {}", path_ref.display());
    Ok(cfg)
}

/// Upgrade a freshly validated configuration to the current layout.
///
/// The current layout is the only one, so this returns its input. Version
/// specific rewrites belong here, after validation and before the value is
/// handed to callers.
pub fn migrate(config: Configuration) -> Configuration {
    trace!("No configuration migration required");
    config
}

/// Generate the JSON Schema for the Configuration model (for editors and tooling).
pub fn generate_schema() -> Schema {
    schema_for!(Configuration)
}

/// Write the JSON Schema for the Configuration model to any writer (pretty-printed).
pub fn write_schema_to_writer<W: Write>(mut writer: W) -> Result<()> {
    let schema = generate_schema();
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
    writer
        .write_all(json.as_bytes())
        .context("Failed to write schema to writer")?;
    Ok(())
}
