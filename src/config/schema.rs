//! Declarative description of every configuration field.
//!
//! The tree built here is the single source of truth for field names, types,
//! bounds and defaults. `config::validate` walks it against untyped YAML and
//! `config::models` mirrors it as Rust types. The drift test at the bottom of
//! `config::validate` keeps the two shapes in step.
//!
//! Nothing in this module performs I/O or holds mutable state; the trees are
//! built once on first use and shared afterwards.

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::error::Violation;

/// Pattern every camera name must match.
pub const CAMERA_NAME_PATTERN: &str = "^[a-zA-Z0-9_-]+$";

static CAMERA_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CAMERA_NAME_PATTERN).expect("camera name pattern is valid"));

/// Whether `name` is usable as a camera name (and thus as a key under `cameras`).
pub fn is_valid_camera_name(name: &str) -> bool {
    CAMERA_NAME.is_match(name)
}

/// Input roles accepted in `ffmpeg.inputs[].roles`.
pub const INPUT_ROLES: &[&str] = &["detect", "record", "audio"];

/// Accepted values for `record.retain.mode`.
pub const RETAIN_MODES: &[&str] = &["all", "motion", "active_objects"];

/// Accepted values for `semantic_search.provider`.
pub const SEARCH_PROVIDERS: &[&str] = &["transformers", "openai"];

const U32_MAX: i64 = u32::MAX as i64;

/// Cross-field check run on an object after its fields were normalized.
///
/// Receives the normalized mapping and the path of the object itself.
pub type ObjectRule = fn(&Mapping, &str) -> Option<Violation>;

/// One node of the schema tree.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    /// A record with a fixed set of known fields. Unknown keys pass through.
    Object {
        fields: Vec<Field>,
        rules: Vec<ObjectRule>,
    },
    /// A string-keyed mapping whose values all share one schema.
    ///
    /// With `key_field` set, the key is copied into that field of each value
    /// when absent and must equal it when present.
    Map {
        value: Box<SchemaNode>,
        key_field: Option<&'static str>,
    },
    /// An ordered sequence.
    Seq {
        item: Box<SchemaNode>,
        non_empty: bool,
        unique: bool,
    },
    Str(StrRule),
    Int {
        min: Option<i64>,
        max: Option<i64>,
    },
    Float {
        min: Option<f64>,
        max: Option<f64>,
    },
    Bool,
    /// A string restricted to a fixed set of variants.
    Enum {
        variants: &'static [&'static str],
        case_insensitive: bool,
    },
}

/// Constraint applied to string leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrRule {
    Any,
    NonEmpty,
    CameraName,
}

/// Whether a field must be present and what fills it in when it is not.
#[derive(Debug, Clone)]
pub enum Requirement {
    Required,
    Optional,
    Default(Value),
}

/// A named field inside an [`SchemaNode::Object`].
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub node: SchemaNode,
    pub requirement: Requirement,
}

impl Field {
    pub fn required(name: &'static str, node: SchemaNode) -> Self {
        Self {
            name,
            node,
            requirement: Requirement::Required,
        }
    }

    pub fn optional(name: &'static str, node: SchemaNode) -> Self {
        Self {
            name,
            node,
            requirement: Requirement::Optional,
        }
    }

    pub fn with_default(name: &'static str, node: SchemaNode, default: impl Into<Value>) -> Self {
        Self {
            name,
            node,
            requirement: Requirement::Default(default.into()),
        }
    }
}

impl SchemaNode {
    pub fn object(fields: impl IntoIterator<Item = Field>) -> Self {
        SchemaNode::Object {
            fields: fields.into_iter().collect(),
            rules: Vec::new(),
        }
    }

    /// Attach a cross-field rule to an object node. No-op on other nodes.
    pub fn with_rule(mut self, rule: ObjectRule) -> Self {
        if let SchemaNode::Object { rules, .. } = &mut self {
            rules.push(rule);
        }
        self
    }

    pub fn map(value: SchemaNode) -> Self {
        SchemaNode::Map {
            value: Box::new(value),
            key_field: None,
        }
    }

    pub fn keyed_map(value: SchemaNode, key_field: &'static str) -> Self {
        SchemaNode::Map {
            value: Box::new(value),
            key_field: Some(key_field),
        }
    }

    pub fn seq(item: SchemaNode) -> Self {
        SchemaNode::Seq {
            item: Box::new(item),
            non_empty: false,
            unique: false,
        }
    }

    pub fn non_empty_seq(item: SchemaNode) -> Self {
        SchemaNode::Seq {
            item: Box::new(item),
            non_empty: true,
            unique: false,
        }
    }

    /// Make a sequence node reject duplicate entries.
    pub fn unique(mut self) -> Self {
        if let SchemaNode::Seq { unique, .. } = &mut self {
            *unique = true;
        }
        self
    }

    pub fn string() -> Self {
        SchemaNode::Str(StrRule::Any)
    }

    pub fn non_empty_string() -> Self {
        SchemaNode::Str(StrRule::NonEmpty)
    }

    pub fn int(min: Option<i64>, max: Option<i64>) -> Self {
        SchemaNode::Int { min, max }
    }

    /// Integer in `1..=u32::MAX`, the range of the typed `u32` fields.
    pub fn positive_int() -> Self {
        SchemaNode::int(Some(1), Some(U32_MAX))
    }

    /// Integer in `0..=u32::MAX`.
    pub fn non_negative_int() -> Self {
        SchemaNode::int(Some(0), Some(U32_MAX))
    }

    /// Integer in `0..=i64::MAX`, for `u64` fields such as object areas.
    pub fn non_negative_long() -> Self {
        SchemaNode::int(Some(0), Some(i64::MAX))
    }

    pub fn float(min: Option<f64>, max: Option<f64>) -> Self {
        SchemaNode::Float { min, max }
    }

    pub fn one_of(variants: &'static [&'static str]) -> Self {
        SchemaNode::Enum {
            variants,
            case_insensitive: false,
        }
    }

    /// Short human-readable name of the expected type, used in violations.
    pub fn expected(&self) -> &'static str {
        match self {
            SchemaNode::Object { .. } | SchemaNode::Map { .. } => "a mapping",
            SchemaNode::Seq { .. } => "a sequence",
            SchemaNode::Str(_) | SchemaNode::Enum { .. } => "a string",
            SchemaNode::Int { .. } => "an integer",
            SchemaNode::Float { .. } => "a number",
            SchemaNode::Bool => "a boolean",
        }
    }
}

static ROOT: LazyLock<SchemaNode> = LazyLock::new(root_node);
static CAMERA: LazyLock<SchemaNode> = LazyLock::new(camera_node);

/// Schema of the whole configuration document.
pub fn root() -> &'static SchemaNode {
    &ROOT
}

/// Schema of a single camera entry (the value under `cameras.<name>`).
pub fn camera() -> &'static SchemaNode {
    &CAMERA
}

fn root_node() -> SchemaNode {
    SchemaNode::object([
        Field::required("mqtt", mqtt_node()),
        Field::required("cameras", SchemaNode::keyed_map(camera_node(), "name")),
        Field::optional("detectors", SchemaNode::map(detector_node())),
        Field::optional(
            "database",
            SchemaNode::object([Field::with_default(
                "path",
                SchemaNode::non_empty_string(),
                "/config/frigate.db",
            )]),
        ),
        Field::optional("audio", audio_node()),
        Field::optional("semantic_search", semantic_search_node()),
    ])
}

fn mqtt_node() -> SchemaNode {
    SchemaNode::object([
        Field::with_default("enabled", SchemaNode::Bool, true),
        Field::required("host", SchemaNode::non_empty_string()),
        Field::with_default("port", SchemaNode::int(Some(1), Some(65535)), 1883),
        Field::with_default("topic_prefix", SchemaNode::string(), "frigate"),
        Field::with_default("client_id", SchemaNode::string(), "frigate"),
        Field::optional("user", SchemaNode::string()),
        Field::optional("password", SchemaNode::string()),
        Field::optional("tls_ca_certs", SchemaNode::string()),
        Field::optional("tls_client_cert", SchemaNode::string()),
        Field::optional("tls_client_key", SchemaNode::string()),
        Field::optional("tls_insecure", SchemaNode::Bool),
        Field::with_default("stats_interval", SchemaNode::positive_int(), 60),
    ])
}

fn detector_node() -> SchemaNode {
    SchemaNode::object([
        Field::required("type", SchemaNode::non_empty_string()),
        Field::optional("device", SchemaNode::string()),
    ])
}

fn audio_node() -> SchemaNode {
    SchemaNode::object([
        Field::with_default("enabled", SchemaNode::Bool, false),
        Field::optional("device", SchemaNode::string()),
        Field::optional("threshold", SchemaNode::float(Some(0.0), None)),
        Field::optional("duration", SchemaNode::positive_int()),
    ])
}

fn semantic_search_node() -> SchemaNode {
    SchemaNode::object([
        Field::with_default("enabled", SchemaNode::Bool, false),
        Field::with_default("model", SchemaNode::non_empty_string(), "all-MiniLM-L6-v2"),
        Field::with_default(
            "provider",
            SchemaNode::Enum {
                variants: SEARCH_PROVIDERS,
                case_insensitive: true,
            },
            "transformers",
        ),
        Field::with_default("batch_size", SchemaNode::positive_int(), 50),
        Field::with_default("refresh_interval", SchemaNode::positive_int(), 60),
        Field::optional(
            "openai",
            SchemaNode::object([
                Field::required("api_key", SchemaNode::non_empty_string()),
                Field::with_default(
                    "model",
                    SchemaNode::non_empty_string(),
                    "text-embedding-ada-002",
                ),
            ]),
        ),
    ])
    .with_rule(openai_settings_present)
}

fn openai_settings_present(search: &Mapping, path: &str) -> Option<Violation> {
    let provider = search.get("provider").and_then(Value::as_str)?;
    if provider == "openai" && search.get("openai").is_none_or(Value::is_null) {
        return Some(Violation::new(
            format!("{path}.openai"),
            "required when provider is \"openai\"",
        ));
    }
    None
}

fn camera_node() -> SchemaNode {
    SchemaNode::object([
        Field::required("name", SchemaNode::Str(StrRule::CameraName)),
        Field::with_default("enabled", SchemaNode::Bool, true),
        Field::required("ffmpeg", ffmpeg_node()),
        Field::optional("detect", detect_node()),
        Field::optional("motion", motion_node()),
        Field::optional("objects", objects_node()),
        Field::optional("zones", SchemaNode::map(zone_node())),
        Field::optional("record", record_node()),
        Field::optional("snapshots", snapshots_node()),
        Field::with_default("best_image_timeout", SchemaNode::positive_int(), 60),
        Field::optional("webui_url", SchemaNode::string()),
    ])
}

fn ffmpeg_args() -> [Field; 3] {
    [
        Field::optional("global_args", SchemaNode::string()),
        Field::optional("hwaccel_args", SchemaNode::string()),
        Field::optional("input_args", SchemaNode::string()),
    ]
}

fn ffmpeg_node() -> SchemaNode {
    let input = SchemaNode::object(
        [
            Field::required("path", SchemaNode::non_empty_string()),
            Field::required(
                "roles",
                SchemaNode::non_empty_seq(SchemaNode::one_of(INPUT_ROLES)).unique(),
            ),
        ]
        .into_iter()
        .chain(ffmpeg_args()),
    );

    SchemaNode::object(
        [Field::required("inputs", SchemaNode::non_empty_seq(input))]
            .into_iter()
            .chain(ffmpeg_args())
            .chain([Field::optional(
                "output_args",
                SchemaNode::object([
                    Field::optional("detect", SchemaNode::string()),
                    Field::optional("record", SchemaNode::string()),
                ]),
            )]),
    )
}

fn detect_node() -> SchemaNode {
    SchemaNode::object([
        Field::with_default("enabled", SchemaNode::Bool, true),
        Field::optional("width", SchemaNode::positive_int()),
        Field::optional("height", SchemaNode::positive_int()),
        Field::with_default("fps", SchemaNode::positive_int(), 5),
        Field::optional("min_initialized", SchemaNode::positive_int()),
        Field::optional("max_disappeared", SchemaNode::positive_int()),
    ])
}

fn motion_node() -> SchemaNode {
    SchemaNode::object([
        Field::with_default("enabled", SchemaNode::Bool, true),
        Field::with_default("threshold", SchemaNode::int(Some(1), Some(255)), 30),
        Field::with_default("contour_area", SchemaNode::positive_int(), 10),
        Field::with_default("frame_alpha", SchemaNode::float(Some(0.0), Some(1.0)), 0.01),
        Field::with_default("frame_height", SchemaNode::positive_int(), 100),
        Field::optional("mask", SchemaNode::string()),
        Field::with_default("improve_contrast", SchemaNode::Bool, true),
    ])
}

fn objects_node() -> SchemaNode {
    let filter = SchemaNode::object([
        Field::with_default("min_area", SchemaNode::non_negative_long(), 0),
        Field::with_default("max_area", SchemaNode::non_negative_long(), 24_000_000),
        Field::with_default("min_ratio", SchemaNode::float(Some(0.0), None), 0.0),
        Field::with_default("max_ratio", SchemaNode::float(Some(0.0), None), 24_000_000.0),
        Field::with_default("min_score", SchemaNode::float(Some(0.0), Some(1.0)), 0.5),
        Field::with_default("threshold", SchemaNode::float(Some(0.0), Some(1.0)), 0.7),
        Field::optional("mask", SchemaNode::string()),
    ]);

    SchemaNode::object([
        Field::with_default(
            "track",
            SchemaNode::seq(SchemaNode::non_empty_string()),
            vec!["person"],
        ),
        Field::with_default("filters", SchemaNode::map(filter), Mapping::new()),
        Field::optional("mask", SchemaNode::string()),
    ])
}

fn zone_node() -> SchemaNode {
    let filter = SchemaNode::object([
        Field::optional("min_area", SchemaNode::float(Some(0.0), None)),
        Field::optional("max_area", SchemaNode::float(Some(0.0), None)),
        Field::optional("threshold", SchemaNode::float(Some(0.0), Some(1.0))),
    ]);

    SchemaNode::object([
        Field::required("coordinates", SchemaNode::non_empty_string()),
        Field::optional("objects", SchemaNode::seq(SchemaNode::string())),
        Field::with_default("inertia", SchemaNode::non_negative_int(), 3),
        Field::with_default("loitering_time", SchemaNode::non_negative_int(), 0),
        Field::optional("filters", SchemaNode::map(filter)),
    ])
}

fn record_node() -> SchemaNode {
    SchemaNode::object([
        Field::with_default("enabled", SchemaNode::Bool, false),
        Field::optional(
            "retain",
            SchemaNode::object([
                Field::with_default("days", SchemaNode::non_negative_int(), 0),
                Field::with_default("mode", SchemaNode::one_of(RETAIN_MODES), "all"),
            ]),
        ),
        Field::optional(
            "events",
            SchemaNode::object([
                Field::with_default("pre_capture", SchemaNode::non_negative_int(), 5),
                Field::with_default("post_capture", SchemaNode::non_negative_int(), 5),
                Field::optional("required_zones", SchemaNode::seq(SchemaNode::string())),
                Field::optional("objects", SchemaNode::seq(SchemaNode::string())),
            ]),
        ),
    ])
}

fn snapshots_node() -> SchemaNode {
    SchemaNode::object([
        Field::with_default("enabled", SchemaNode::Bool, false),
        Field::with_default("clean_copy", SchemaNode::Bool, true),
        Field::with_default("timestamp", SchemaNode::Bool, false),
        Field::with_default("bounding_box", SchemaNode::Bool, true),
        Field::with_default("crop", SchemaNode::Bool, false),
        Field::optional("height", SchemaNode::positive_int()),
        Field::optional("required_zones", SchemaNode::seq(SchemaNode::string())),
        Field::optional(
            "retain",
            SchemaNode::object([
                Field::with_default("default", SchemaNode::non_negative_int(), 10),
                Field::optional("objects", SchemaNode::map(SchemaNode::non_negative_int())),
            ]),
        ),
        Field::with_default("quality", SchemaNode::int(Some(0), Some(100)), 70),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(node: &'a SchemaNode, name: &str) -> &'a Field {
        match node {
            SchemaNode::Object { fields, .. } => fields
                .iter()
                .find(|f| f.name == name)
                .unwrap_or_else(|| panic!("no field {name}")),
            other => panic!("not an object: {other:?}"),
        }
    }

    #[test]
    fn mqtt_port_defaults_to_1883() {
        let mqtt = &field(root(), "mqtt").node;
        match &field(mqtt, "port").requirement {
            Requirement::Default(v) => assert_eq!(v.as_u64(), Some(1883)),
            other => panic!("unexpected requirement {other:?}"),
        }
        assert!(matches!(
            field(mqtt, "host").requirement,
            Requirement::Required
        ));
    }

    #[test]
    fn cameras_are_keyed_by_name() {
        match &field(root(), "cameras").node {
            SchemaNode::Map { key_field, value } => {
                assert_eq!(*key_field, Some("name"));
                assert!(matches!(value.as_ref(), SchemaNode::Object { .. }));
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn roles_are_a_unique_non_empty_enum_sequence() {
        let ffmpeg = &field(camera(), "ffmpeg").node;
        let inputs = &field(ffmpeg, "inputs").node;
        let SchemaNode::Seq { item, non_empty, .. } = inputs else {
            panic!("inputs is not a sequence");
        };
        assert!(*non_empty);
        match &field(item, "roles").node {
            SchemaNode::Seq {
                item,
                non_empty,
                unique,
            } => {
                assert!(*non_empty && *unique);
                assert!(matches!(
                    item.as_ref(),
                    SchemaNode::Enum { variants, .. } if *variants == INPUT_ROLES
                ));
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn camera_name_pattern() {
        for ok in ["front_door", "cam-1", "A"] {
            assert!(is_valid_camera_name(ok), "{ok}");
        }
        for bad in ["", "front door", "cam.1", "caméra", "cam/1"] {
            assert!(!is_valid_camera_name(bad), "{bad}");
        }
    }

    #[test]
    fn openai_rule_only_fires_for_openai_provider() {
        let mut search = Mapping::new();
        search.insert("provider".into(), "transformers".into());
        assert!(openai_settings_present(&search, "semantic_search").is_none());

        search.insert("provider".into(), "openai".into());
        let violation = openai_settings_present(&search, "semantic_search").unwrap();
        assert_eq!(violation.path, "semantic_search.openai");
    }
}
