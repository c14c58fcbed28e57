//! User-file access.
//!
//! Reads and writes configuration files chosen by the user, plus a
//! `FilePicker` that answers the open/save dialogs with fixed paths (the
//! command line supplies them up front; tests use it to simulate cancel).
//!
//! Accepted file types are `.yml` and `.yaml`. Saving to a path without one
//! of those extensions appends `.yml`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs as afs;
use tracing::debug;

use super::FilePicker;
use crate::error::StoreError;

/// Extensions offered by the open and save dialogs.
pub const YAML_EXTENSIONS: &[&str] = &["yml", "yaml"];

/// Name suggested to the save dialog.
pub const DEFAULT_FILE_NAME: &str = "frigate_config.yml";

pub fn has_yaml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            YAML_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// `path` unchanged when it already ends in a YAML extension, else `path.yml`.
pub fn with_yaml_extension(path: PathBuf) -> PathBuf {
    if has_yaml_extension(&path) {
        return path;
    }
    let mut name = path.clone().into_os_string();
    name.push(".yml");
    PathBuf::from(name)
}

/// Read a configuration file as text.
pub async fn read_config_file(path: &Path) -> Result<String, StoreError> {
    let text = afs::read_to_string(path)
        .await
        .map_err(|e| StoreError::from_io(e, path.display()))?;
    debug!(
        target: "frigate_cfg::store",
        path = %path.display(),
        bytes = text.len(),
        "Read config file"
    );
    Ok(text)
}

/// Write a configuration file, replacing any existing content.
pub async fn write_config_file(path: &Path, text: &str) -> Result<(), StoreError> {
    afs::write(path, text)
        .await
        .map_err(|e| StoreError::from_io(e, path.display()))?;
    debug!(
        target: "frigate_cfg::store",
        path = %path.display(),
        bytes = text.len(),
        "Wrote config file"
    );
    Ok(())
}

/// Picker that returns preset paths instead of asking the user.
///
/// A dialog without a preset path behaves as if the user cancelled it.
#[derive(Debug, Clone, Default)]
pub struct FixedPathPicker {
    open: Option<PathBuf>,
    save: Option<PathBuf>,
}

impl FixedPathPicker {
    pub fn new(open: Option<PathBuf>, save: Option<PathBuf>) -> Self {
        Self { open, save }
    }

    /// Answer only the open dialog.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(Some(path.into()), None)
    }

    /// Answer only the save dialog.
    pub fn save(path: impl Into<PathBuf>) -> Self {
        Self::new(None, Some(path.into()))
    }

    /// Cancel every dialog.
    pub fn cancelling() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FilePicker for FixedPathPicker {
    async fn pick_open(&self) -> Result<Option<PathBuf>, StoreError> {
        Ok(self.open.clone())
    }

    async fn pick_save(&self, suggested_name: &str) -> Result<Option<PathBuf>, StoreError> {
        debug!(target: "frigate_cfg::store", suggested_name, "Save dialog");
        Ok(self.save.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ConfigDestination, ConfigSource, ConfigStore, MemorySlotStore};

    const DOC: &str = "mqtt:\n  host: test\ncameras:\n  cam1:\n    ffmpeg:\n      inputs:\n        - path: rtsp://x\n          roles: [detect]\n";

    #[test]
    fn extension_handling() {
        assert!(has_yaml_extension(Path::new("a/b.yml")));
        assert!(has_yaml_extension(Path::new("b.YAML")));
        assert!(!has_yaml_extension(Path::new("b.json")));
        assert!(!has_yaml_extension(Path::new("frigate")));

        assert_eq!(
            with_yaml_extension(PathBuf::from("out/frigate")),
            PathBuf::from("out/frigate.yml")
        );
        assert_eq!(
            with_yaml_extension(PathBuf::from("config.yaml")),
            PathBuf::from("config.yaml")
        );
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_config_file(&dir.path().join("nope.yml"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn user_file_round_trip_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.yaml");
        write_config_file(&source, DOC).await.unwrap();

        let target = dir.path().join("out");
        let picker = FixedPathPicker::new(Some(source), Some(target));
        let mut store = ConfigStore::new(MemorySlotStore::new(), picker);

        let cfg = store
            .load(ConfigSource::UserFile)
            .await
            .unwrap()
            .done()
            .unwrap();
        assert_eq!(store.current_source(), Some(&ConfigSource::UserFile));

        let receipt = store
            .save(&cfg, ConfigDestination::UserFile)
            .await
            .unwrap()
            .done()
            .unwrap();
        let written = dir.path().join("out.yml");
        assert_eq!(receipt.target, written.display().to_string());
        let text = read_config_file(&written).await.unwrap();
        assert!(text.contains("port: 1883"));
        assert_eq!(receipt.bytes, text.len());
    }
}
