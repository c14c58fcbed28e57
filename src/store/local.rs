//! Local cache backed by a directory on disk.
//!
//! Each slot is a file `<dir>/<slot>.yml`. Writes go to a temporary sibling
//! first and are renamed into place, so a crash never leaves a half-written
//! slot behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs as afs;
use tracing::{debug, trace};

use super::SlotStore;
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct FsSlotStore {
    dir: PathBuf,
}

impl FsSlotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the platform config directory (`~/.config/frigate-cfg` on Linux).
    pub fn at_default_location() -> Result<Self, StoreError> {
        default_location()
            .map(Self::new)
            .ok_or_else(|| StoreError::NotFound("no user configuration directory".into()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{slot}.yml"))
    }
}

/// Platform default directory for the local cache.
pub fn default_location() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(crate::PKG_NAME))
}

#[async_trait]
impl SlotStore for FsSlotStore {
    fn name(&self) -> &'static str {
        "fs"
    }

    async fn read(&self, slot: &str) -> Result<Option<String>, StoreError> {
        let path = self.slot_path(slot);
        match afs::read_to_string(&path).await {
            Ok(text) => {
                trace!(target: "frigate_cfg::store", path = %path.display(), "Slot read");
                Ok(Some(text))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::from_io(e, path.display())),
        }
    }

    async fn write(&self, slot: &str, text: &str) -> Result<(), StoreError> {
        afs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::from_io(e, self.dir.display()))?;

        let path = self.slot_path(slot);
        let tmp = self.dir.join(format!(".{slot}.yml.tmp"));
        afs::write(&tmp, text)
            .await
            .map_err(|e| StoreError::from_io(e, tmp.display()))?;
        afs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::from_io(e, path.display()))?;

        debug!(
            target: "frigate_cfg::store",
            path = %path.display(),
            bytes = text.len(),
            "Slot written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unwritten_slot_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSlotStore::new(dir.path());
        assert_eq!(store.read("frigate_config").await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_creates_directory_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSlotStore::new(dir.path().join("nested"));
        store.write("frigate_config", "a: 1\n").await.unwrap();
        store.write("frigate_config", "a: 2\n").await.unwrap();

        assert_eq!(
            store.read("frigate_config").await.unwrap().as_deref(),
            Some("a: 2\n")
        );
        assert!(store.slot_path("frigate_config").ends_with("frigate_config.yml"));
        let leftovers: Vec<_> = std::fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
