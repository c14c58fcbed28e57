//! Configuration core: schema, validation, YAML codec and typed model.
//!
//! This module wires together the pieces that turn YAML text into a
//! validated [`Configuration`] and back. Import from here for a convenient,
//! stable API.
//!
//! Example:
//! use frigate_cfg::config::{decode, normalize, encode};
//!
//! let cfg = normalize(&decode(text)?)?;
//! let yaml = encode(&cfg)?;

pub mod codec;
pub mod loader;
pub mod models;
pub mod schema;
pub mod validate;

// Re-export core data models
pub use models::{
    AudioConfig, Camera, CameraInput, Cameras, Configuration, DatabaseConfig, DetectConfig,
    DetectorConfig, Extra, FfmpegConfig, InputRole, MotionConfig, MqttConfig, ObjectFilter,
    ObjectsConfig, OpenAiConfig, OutputArgs, RecordConfig, RecordEvents, RecordRetain, RetainMode,
    SearchProvider, SemanticSearchConfig, SnapshotRetain, SnapshotsConfig, Zone, ZoneFilter,
};

// Re-export the codec and validator entry points
pub use codec::{decode, encode, encode_value};
pub use loader::{
    generate_schema, load_from_path, load_from_path_async, load_from_reader, load_from_str,
    migrate, write_schema_to_writer,
};
pub use schema::is_valid_camera_name;
pub use validate::{
    ValidationReport, camera_template, check, normalize, normalize_camera, normalize_value,
    validate,
};
