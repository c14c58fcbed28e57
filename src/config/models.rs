use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigValidationError;

use super::schema::{CAMERA_NAME_PATTERN, is_valid_camera_name};

/// Keys the schema does not know about, kept verbatim so they survive a
/// load/save cycle.
pub type Extra = BTreeMap<String, serde_yaml::Value>;

/// Cameras by name.
pub type Cameras = BTreeMap<String, Camera>;

/// Root of a Frigate configuration document.
///
/// Values of this type are produced by `config::validate::normalize`, which
/// fills every defaulted field. Field declaration order is the order in
/// which fields are written back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Configuration {
    /// MQTT broker connection.
    pub mqtt: MqttConfig,

    /// Cameras keyed by name. Each key equals the camera's `name`.
    pub cameras: Cameras,

    /// Object detectors (e.g. `coral: { type: edgetpu, device: usb }`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detectors: Option<BTreeMap<String, DetectorConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_search: Option<SemanticSearchConfig>,

    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MqttConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub topic_prefix: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca_certs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_client_cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_client_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_insecure: Option<bool>,
    /// Seconds between stats messages.
    pub stats_interval: u32,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectorConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioConfig {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

/// Embedding-based search over tracked objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SemanticSearchConfig {
    pub enabled: bool,
    pub model: String,
    pub provider: SearchProvider,
    pub batch_size: u32,
    /// Seconds between index refreshes.
    pub refresh_interval: u32,
    /// Required when `provider` is `openai`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAiConfig>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    Transformers,
    OpenAi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

/// A single camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Camera {
    /// Matches `^[a-zA-Z0-9_-]+$` and the key under `cameras`.
    pub name: String,
    pub enabled: bool,
    pub ffmpeg: FfmpegConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect: Option<DetectConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<MotionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<ObjectsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<BTreeMap<String, Zone>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<SnapshotsConfig>,
    /// Seconds before a tracked object's best image is considered stale.
    pub best_image_timeout: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webui_url: Option<String>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FfmpegConfig {
    /// At least one input.
    pub inputs: Vec<CameraInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hwaccel_args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_args: Option<OutputArgs>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CameraInput {
    pub path: String,
    /// Non-empty, no duplicates.
    pub roles: Vec<InputRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hwaccel_args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_args: Option<String>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InputRole {
    Detect,
    Record,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutputArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectConfig {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub fps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_initialized: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_disappeared: Option<u32>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MotionConfig {
    pub enabled: bool,
    /// Pixel difference threshold, 1-255.
    pub threshold: u8,
    pub contour_area: u32,
    /// Background averaging weight, 0-1.
    pub frame_alpha: f64,
    pub frame_height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    pub improve_contrast: bool,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectsConfig {
    pub track: Vec<String>,
    pub filters: BTreeMap<String, ObjectFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectFilter {
    pub min_area: u64,
    pub max_area: u64,
    pub min_ratio: f64,
    pub max_ratio: f64,
    pub min_score: f64,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

/// A named polygonal region of a camera frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Zone {
    /// Normalized polygon as a comma-separated list; opaque to validation.
    pub coordinates: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<String>>,
    pub inertia: u32,
    /// Seconds an object must stay in the zone to count as loitering.
    pub loitering_time: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<BTreeMap<String, ZoneFilter>>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ZoneFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecordConfig {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retain: Option<RecordRetain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<RecordEvents>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecordRetain {
    pub days: u32,
    pub mode: RetainMode,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetainMode {
    All,
    Motion,
    ActiveObjects,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecordEvents {
    /// Seconds kept before the event starts.
    pub pre_capture: u32,
    /// Seconds kept after the event ends.
    pub post_capture: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_zones: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<String>>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotsConfig {
    pub enabled: bool,
    pub clean_copy: bool,
    pub timestamp: bool,
    pub bounding_box: bool,
    pub crop: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_zones: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retain: Option<SnapshotRetain>,
    /// JPEG quality, 0-100.
    pub quality: u8,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotRetain {
    /// Days to keep snapshots of any object.
    pub default: u32,
    /// Per-label overrides of `default`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<BTreeMap<String, u32>>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Extra,
}

impl Configuration {
    pub fn camera(&self, name: &str) -> Option<&Camera> {
        self.cameras.get(name)
    }

    /// Copy of this configuration with `camera` inserted (or replaced) under
    /// its own name.
    pub fn with_camera(&self, camera: Camera) -> Configuration {
        let mut next = self.clone();
        next.cameras.insert(camera.name.clone(), camera);
        next
    }

    /// Copy of this configuration without the camera called `name`.
    pub fn without_camera(&self, name: &str) -> Configuration {
        let mut next = self.clone();
        next.cameras.remove(name);
        next
    }

    /// Copy of this configuration with camera `from` renamed to `to`.
    ///
    /// The map key and `Camera::name` move together.
    pub fn renamed_camera(&self, from: &str, to: &str) -> Result<Configuration, ConfigValidationError> {
        if !is_valid_camera_name(to) {
            return Err(ConfigValidationError::single(
                format!("cameras.{to}.name"),
                format!("must match {CAMERA_NAME_PATTERN}"),
            ));
        }
        if from != to && self.cameras.contains_key(to) {
            return Err(ConfigValidationError::single(
                format!("cameras.{to}"),
                "a camera with this name already exists",
            ));
        }

        let mut next = self.clone();
        let mut camera = next.cameras.remove(from).ok_or_else(|| {
            ConfigValidationError::single(format!("cameras.{from}"), "no such camera")
        })?;
        camera.name = to.to_string();
        next.cameras.insert(to.to_string(), camera);
        Ok(next)
    }
}
