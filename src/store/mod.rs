/*!
Configuration store facade.

`ConfigStore` is the single place the rest of the application obtains or
persists the current configuration. It talks to three kinds of backend, each
behind its own trait so callers can inject real or fake implementations:

- `SlotStore`   -> named text slots (the local cache, slot `frigate_config`)
- `FilePicker`  -> the user's choice of file to open or save
- `RemoteStore` -> a file in a remote repository, addressed by owner, repo, path and branch

Concrete backends live in their own files:

- `local.rs`  -> `FsSlotStore`       (slots as files in a directory)
- `file.rs`   -> `FixedPathPicker` and the YAML file helpers
- `remote.rs` -> `GithubStore`       (GitHub contents API)
- `memory.rs` -> `MemorySlotStore`, `MemoryRemoteStore` (in-process fakes)

Every load goes text -> `decode` -> `normalize`; every save re-validates
before encoding. The cached "current" configuration, its source and the
remote revisions are only updated once an operation fully succeeded.
*/

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

use crate::config::{self, Configuration, ValidationReport};
use crate::error::{ConfigValidationError, StoreError};

pub mod file;
pub mod local;
pub mod memory;
pub mod remote;

pub use file::FixedPathPicker;
pub use local::FsSlotStore;
pub use memory::{MemoryRemoteStore, MemorySlotStore};
pub use remote::GithubStore;

/// Name of the local slot holding the last saved configuration.
pub const LOCAL_SLOT: &str = "frigate_config";

/// Commit message used when the caller does not supply one.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update Frigate configuration";

/// Opaque token identifying one version of a remote file (a blob SHA for GitHub).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(pub String);

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of a file in a remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteLocation {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub branch: String,
}

impl RemoteLocation {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        path: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            path: path.into(),
            branch: branch.into(),
        }
    }
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}@{}", self.owner, self.repo, self.path, self.branch)
    }
}

/// Text of a remote file together with its revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    pub content: String,
    pub revision: Revision,
}

/// Where `ConfigStore::load` reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    LocalCache,
    /// A file chosen through the `FilePicker`.
    UserFile,
    Remote(RemoteLocation),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::LocalCache => write!(f, "local:{LOCAL_SLOT}"),
            ConfigSource::UserFile => f.write_str("user-file"),
            ConfigSource::Remote(location) => write!(f, "remote:{location}"),
        }
    }
}

/// Where `ConfigStore::save` writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigDestination {
    LocalCache,
    /// A file chosen through the `FilePicker`.
    UserFile,
    Remote {
        location: RemoteLocation,
        message: String,
    },
}

impl fmt::Display for ConfigDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigDestination::LocalCache => write!(f, "local:{LOCAL_SLOT}"),
            ConfigDestination::UserFile => f.write_str("user-file"),
            ConfigDestination::Remote { location, .. } => write!(f, "remote:{location}"),
        }
    }
}

/// Result of an operation the user may cancel. Cancelling is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(v) => Some(v),
            Outcome::Cancelled => None,
        }
    }
}

/// What a successful save wrote and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    /// Human-readable destination (slot name, file path or remote location).
    pub target: String,
    /// New remote revision, for remote saves.
    pub revision: Option<Revision>,
    pub bytes: usize,
}

/// Named text slots (browser-storage style key/value persistence).
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Static human-readable identifier (used in logs).
    fn name(&self) -> &'static str;

    /// Text stored in `slot`, or `None` when the slot was never written.
    async fn read(&self, slot: &str) -> Result<Option<String>, StoreError>;

    /// Replace the content of `slot`.
    async fn write(&self, slot: &str, text: &str) -> Result<(), StoreError>;
}

/// The user's choice of file. `None` means the user cancelled.
#[async_trait]
pub trait FilePicker: Send + Sync {
    async fn pick_open(&self) -> Result<Option<PathBuf>, StoreError>;

    async fn pick_save(&self, suggested_name: &str) -> Result<Option<PathBuf>, StoreError>;
}

/// A file in a remote repository with optimistic concurrency.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Static human-readable identifier (used in logs).
    fn name(&self) -> &'static str;

    /// Fetch the file's text and revision. A missing file is `NotFound`.
    async fn get(&self, location: &RemoteLocation) -> Result<RemoteDocument, StoreError>;

    /// Current revision of the file, or `None` when it does not exist.
    async fn revision(&self, location: &RemoteLocation) -> Result<Option<Revision>, StoreError> {
        match self.get(location).await {
            Ok(doc) => Ok(Some(doc.revision)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Write `content` to the file.
    ///
    /// `expected` is a precondition: `None` creates the file and must fail
    /// with `Conflict` if it already exists; `Some(rev)` updates it and must
    /// fail with `Conflict` unless `rev` is still the current revision.
    /// Returns the new revision.
    async fn put(
        &self,
        location: &RemoteLocation,
        content: &str,
        message: &str,
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError>;
}

/// The configuration held for the session and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Current {
    pub config: Configuration,
    pub source: ConfigSource,
}

/// Facade over the local cache, user files and a remote repository.
///
/// Construct one per session and inject its backends:
///
/// ```no_run
/// use frigate_cfg::store::{ConfigStore, ConfigSource, FixedPathPicker, MemorySlotStore};
///
/// # async fn demo() -> Result<(), frigate_cfg::error::StoreError> {
/// let mut store = ConfigStore::new(MemorySlotStore::new(), FixedPathPicker::open("frigate.yml"));
/// let loaded = store.load(ConfigSource::UserFile).await?;
/// # Ok(()) }
/// ```
pub struct ConfigStore {
    local: Box<dyn SlotStore>,
    picker: Box<dyn FilePicker>,
    remote: Option<Box<dyn RemoteStore>>,
    current: Option<Current>,
    revisions: HashMap<RemoteLocation, Revision>,
}

impl ConfigStore {
    pub fn new(local: impl SlotStore + 'static, picker: impl FilePicker + 'static) -> Self {
        Self {
            local: Box::new(local),
            picker: Box::new(picker),
            remote: None,
            current: None,
            revisions: HashMap::new(),
        }
    }

    /// Attach a remote backend. Without one, remote operations fail with `Auth`.
    pub fn with_remote(mut self, remote: impl RemoteStore + 'static) -> Self {
        self.remote = Some(Box::new(remote));
        self
    }

    /// The last successfully loaded configuration, if any.
    pub fn current(&self) -> Option<&Configuration> {
        self.current.as_ref().map(|c| &c.config)
    }

    /// Where the current configuration came from.
    pub fn current_source(&self) -> Option<&ConfigSource> {
        self.current.as_ref().map(|c| &c.source)
    }

    /// Revision remembered for `location` from the last load or save.
    pub fn known_revision(&self, location: &RemoteLocation) -> Option<&Revision> {
        self.revisions.get(location)
    }

    /// Check a typed configuration without saving it.
    pub fn validate(&self, config: &Configuration) -> Result<Configuration, ConfigValidationError> {
        config::validate(config)
    }

    /// Check an arbitrary untyped value (the programmatic validation entry point).
    pub fn check_value(&self, value: &serde_yaml::Value) -> ValidationReport {
        config::check(value)
    }

    fn remote(&self) -> Result<&dyn RemoteStore, StoreError> {
        self.remote
            .as_deref()
            .ok_or_else(|| StoreError::Auth("no remote repository credential configured".into()))
    }

    /// Fetch, decode and validate a configuration, making it the current one.
    ///
    /// On any failure the current configuration stays as it was.
    #[instrument(name = "config_store.load", skip(self, source), fields(source = %source))]
    pub async fn load(&mut self, source: ConfigSource) -> Result<Outcome<Configuration>, StoreError> {
        let (text, revision) = match &source {
            ConfigSource::LocalCache => {
                let text = self.local.read(LOCAL_SLOT).await?.ok_or_else(|| {
                    StoreError::NotFound(format!("local slot '{LOCAL_SLOT}' is empty"))
                })?;
                (text, None)
            }
            ConfigSource::UserFile => {
                let Some(path) = self.picker.pick_open().await? else {
                    info!(target: "frigate_cfg::store", "Open dialog cancelled");
                    return Ok(Outcome::Cancelled);
                };
                (file::read_config_file(&path).await?, None)
            }
            ConfigSource::Remote(location) => {
                let doc = self.remote()?.get(location).await?;
                (doc.content, Some(doc.revision))
            }
        };

        let config = parse_and_validate(&text)?;

        if let (ConfigSource::Remote(location), Some(revision)) = (&source, revision) {
            self.revisions.insert(location.clone(), revision);
        }
        info!(
            target: "frigate_cfg::store",
            cameras = config.cameras.len(),
            "Configuration loaded"
        );
        self.current = Some(Current {
            config: config.clone(),
            source,
        });
        Ok(Outcome::Done(config))
    }

    /// Validate, encode and write `config` to `destination`.
    ///
    /// Validation always runs, even for values that came out of `load`.
    /// Remote writes are conditional on the revision last seen for that
    /// location; without one, the current remote revision is fetched first
    /// and a missing file is created.
    #[instrument(name = "config_store.save", skip(self, config, destination), fields(destination = %destination))]
    pub async fn save(
        &mut self,
        config: &Configuration,
        destination: ConfigDestination,
    ) -> Result<Outcome<SaveReceipt>, StoreError> {
        let config = config::validate(config)?;
        let text = config::encode(&config)?;

        let receipt = match destination {
            ConfigDestination::LocalCache => {
                self.local.write(LOCAL_SLOT, &text).await?;
                SaveReceipt {
                    target: format!("{}:{LOCAL_SLOT}", self.local.name()),
                    revision: None,
                    bytes: text.len(),
                }
            }
            ConfigDestination::UserFile => {
                let Some(path) = self.picker.pick_save(file::DEFAULT_FILE_NAME).await? else {
                    info!(target: "frigate_cfg::store", "Save dialog cancelled");
                    return Ok(Outcome::Cancelled);
                };
                let path = file::with_yaml_extension(path);
                file::write_config_file(&path, &text).await?;
                SaveReceipt {
                    target: path.display().to_string(),
                    revision: None,
                    bytes: text.len(),
                }
            }
            ConfigDestination::Remote { location, message } => {
                let remote = self.remote()?;
                let expected = match self.revisions.get(&location) {
                    Some(known) => Some(known.clone()),
                    None => {
                        debug!(
                            target: "frigate_cfg::store",
                            %location,
                            "No known revision; probing remote"
                        );
                        remote.revision(&location).await?
                    }
                };
                let revision = remote
                    .put(&location, &text, &message, expected.as_ref())
                    .await
                    .inspect_err(|err| {
                        if let StoreError::Conflict { .. } = err {
                            warn!(target: "frigate_cfg::store", %location, "Remote changed since last read");
                        }
                    })?;
                let target = format!("{}:{location}", remote.name());
                self.revisions.insert(location, revision.clone());
                SaveReceipt {
                    target,
                    revision: Some(revision),
                    bytes: text.len(),
                }
            }
        };

        info!(
            target: "frigate_cfg::store",
            target_name = %receipt.target,
            bytes = receipt.bytes,
            "Configuration saved"
        );
        Ok(Outcome::Done(receipt))
    }
}

fn parse_and_validate(text: &str) -> Result<Configuration, StoreError> {
    let tree = config::decode(text)?;
    let config = config::normalize(&tree)?;
    Ok(config::migrate(config))
}
