//! Validation and normalization of untyped configuration trees.
//!
//! The walker visits every node of the schema against the decoded YAML,
//! collects all violations (never stopping at the first) and builds the
//! normalized tree with defaults filled in. Only a tree without violations
//! is lifted into the typed [`Configuration`].
//!
//! Unknown keys are tolerated at every level and copied through unchanged,
//! except that tagged values (`!custom {...}`) inside them are rejected at
//! their own path. Scalar mapping keys are read as strings, so `101:` names a
//! camera or zone just like `"101":`. A YAML `null` counts as an absent field.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Number, Value};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, trace};

use crate::error::{ConfigValidationError, Violation};
use crate::utils::yaml::value_kind;

use super::models::{Camera, Configuration};
use super::schema::{self, CAMERA_NAME_PATTERN, Requirement, SchemaNode, StrRule};

/// Result of the programmatic validation entry point.
///
/// Serializes to `{"valid": true}` or
/// `{"valid": false, "error": "...", "violations": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
            violations: Vec::new(),
        }
    }

    pub fn failed(err: &ConfigValidationError) -> Self {
        Self {
            valid: false,
            error: Some(err.to_string()),
            violations: err.violations.clone(),
        }
    }
}

/// Check an arbitrary value without keeping the normalized result.
pub fn check(value: &Value) -> ValidationReport {
    match normalize(value) {
        Ok(_) => ValidationReport::ok(),
        Err(err) => ValidationReport::failed(&err),
    }
}

/// Validate `value` against the root schema and return the normalized tree.
pub fn normalize_value(value: &Value) -> Result<Value, ConfigValidationError> {
    let mut walker = Walker::default();
    let normalized = walker.walk(schema::root(), value);
    walker.finish(normalized)
}

/// Validate `value` against the root schema and lift it into a [`Configuration`].
pub fn normalize(value: &Value) -> Result<Configuration, ConfigValidationError> {
    let normalized = normalize_value(value)?;
    let config: Configuration = lift(normalized, "")?;
    debug!(
        target: "frigate_cfg::config",
        cameras = config.cameras.len(),
        "Configuration validated"
    );
    Ok(config)
}

/// Re-validate a typed configuration.
///
/// Edits made through the typed API bypass the schema, so the value is
/// lowered back to a tree and walked again. The returned value is the
/// normalized form.
pub fn validate(config: &Configuration) -> Result<Configuration, ConfigValidationError> {
    let value = lower(config, "")?;
    normalize(&value)
}

/// Validate a single camera entry as if it lived under `cameras.<name>`.
pub fn normalize_camera(name: &str, value: &Value) -> Result<Camera, ConfigValidationError> {
    let mut walker = Walker::default();
    walker.path.push_key("cameras");
    walker.path.push_key(name);
    let value = walker.with_key_field(value, name, "name");
    let normalized = walker.walk(schema::camera(), &value);
    let normalized = walker.finish(normalized)?;
    lift(normalized, &format!("cameras.{name}"))
}

/// A normalized camera with one RTSP input and default `detect`/`snapshots`
/// sections, the starting point for a newly added camera.
pub fn camera_template(name: &str) -> Result<Camera, ConfigValidationError> {
    let template: Value = serde_yaml::from_str(
        "ffmpeg:\n  inputs:\n    - path: rtsp://example.com/stream\n      roles: [detect, record]\ndetect: {}\nsnapshots: {}\n",
    )
    .map_err(|err| ConfigValidationError::single("", err.to_string()))?;
    normalize_camera(name, &template)
}

fn lift<T: DeserializeOwned>(normalized: Value, path: &str) -> Result<T, ConfigValidationError> {
    serde_yaml::from_value(normalized)
        .map_err(|err| ConfigValidationError::single(path, format!("normalized value is unusable: {err}")))
}

fn lower<T: Serialize>(typed: &T, path: &str) -> Result<Value, ConfigValidationError> {
    serde_yaml::to_value(typed)
        .map_err(|err| ConfigValidationError::single(path, format!("value cannot be represented: {err}")))
}

/// Dot/bracket path into the document being walked.
#[derive(Debug, Default, Clone)]
struct FieldPath(Vec<Segment>);

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

impl FieldPath {
    fn push_key(&mut self, key: &str) {
        self.0.push(Segment::Key(key.to_string()));
    }

    fn push_index(&mut self, index: usize) {
        self.0.push(Segment::Index(index));
    }

    fn pop(&mut self) {
        self.0.pop();
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct Walker {
    path: FieldPath,
    violations: Vec<Violation>,
}

impl Walker {
    fn report(&mut self, reason: impl Into<String>) {
        let violation = Violation::new(self.path.to_string(), reason);
        trace!(target: "frigate_cfg::config", %violation, "Schema violation");
        self.violations.push(violation);
    }

    fn finish(self, normalized: Value) -> Result<Value, ConfigValidationError> {
        if self.violations.is_empty() {
            Ok(normalized)
        } else {
            debug!(
                target: "frigate_cfg::config",
                violations = self.violations.len(),
                "Configuration rejected"
            );
            Err(ConfigValidationError::new(self.violations))
        }
    }

    /// Walk `value` against `node`, returning its normalized form.
    ///
    /// On a violation the original value is returned so that sibling checks
    /// can still run; the caller discards the tree anyway.
    fn walk(&mut self, node: &SchemaNode, value: &Value) -> Value {
        match (node, value) {
            (SchemaNode::Object { fields, rules }, Value::Mapping(map)) => {
                let mut out = Mapping::new();
                for field in fields {
                    self.path.push_key(field.name);
                    match (present(map.get(field.name)), &field.requirement) {
                        (Some(v), _) => {
                            let normalized = self.walk(&field.node, v);
                            out.insert(field.name.into(), normalized);
                        }
                        (None, Requirement::Required) => self.report("required field is missing"),
                        (None, Requirement::Optional) => {}
                        (None, Requirement::Default(default)) => {
                            out.insert(field.name.into(), default.clone());
                        }
                    }
                    self.path.pop();
                }

                for (key, v) in map {
                    let Some(k) = self.key_string(key) else {
                        continue;
                    };
                    if key.is_string() && fields.iter().any(|f| f.name == k) {
                        continue;
                    }
                    self.path.push_key(&k);
                    if out.contains_key(k.as_str()) {
                        self.report("duplicate key");
                    } else {
                        self.reject_tags(v);
                        out.insert(Value::String(k), v.clone());
                    }
                    self.path.pop();
                }

                let here = self.path.to_string();
                for rule in rules {
                    if let Some(violation) = rule(&out, &here) {
                        self.violations.push(violation);
                    }
                }
                Value::Mapping(out)
            }

            (SchemaNode::Map { value: item, key_field }, Value::Mapping(map)) => {
                let mut out = Mapping::new();
                for (key, v) in map {
                    let Some(k) = self.key_string(key) else {
                        continue;
                    };
                    self.path.push_key(&k);
                    if out.contains_key(k.as_str()) {
                        self.report("duplicate key");
                        self.path.pop();
                        continue;
                    }
                    let normalized = match key_field {
                        Some(field) => {
                            let keyed = self.with_key_field(v, &k, field);
                            self.walk(item, &keyed)
                        }
                        None => self.walk(item, v),
                    };
                    self.path.pop();
                    out.insert(Value::String(k), normalized);
                }
                Value::Mapping(out)
            }

            (
                SchemaNode::Seq {
                    item,
                    non_empty,
                    unique,
                },
                Value::Sequence(seq),
            ) => {
                if *non_empty && seq.is_empty() {
                    self.report("must contain at least one entry");
                }
                let mut seen = HashSet::new();
                let mut out = Vec::with_capacity(seq.len());
                for (idx, v) in seq.iter().enumerate() {
                    self.path.push_index(idx);
                    let normalized = self.walk(item, v);
                    if *unique {
                        if let Some(s) = normalized.as_str() {
                            if !seen.insert(s.to_string()) {
                                self.report(format!("duplicate entry '{s}'"));
                            }
                        }
                    }
                    self.path.pop();
                    out.push(normalized);
                }
                Value::Sequence(out)
            }

            (SchemaNode::Str(rule), Value::String(s)) => {
                match rule {
                    StrRule::Any => {}
                    StrRule::NonEmpty if s.is_empty() => self.report("must not be empty"),
                    StrRule::NonEmpty => {}
                    StrRule::CameraName if !schema::is_valid_camera_name(s) => {
                        self.report(format!("'{s}' must match {CAMERA_NAME_PATTERN}"))
                    }
                    StrRule::CameraName => {}
                }
                value.clone()
            }

            (SchemaNode::Int { min, max }, Value::Number(n)) => match as_integer(n) {
                Some(i) => {
                    self.check_bounds(i, *min, *max);
                    Value::Number(Number::from(i))
                }
                None if n.as_u64().is_some() => {
                    self.report("integer is out of range");
                    value.clone()
                }
                None => {
                    self.report(format!("expected an integer, found {n}"));
                    value.clone()
                }
            },

            (SchemaNode::Float { min, max }, Value::Number(n)) => {
                let Some(f) = n.as_f64().filter(|f| f.is_finite()) else {
                    self.report("must be a finite number");
                    return value.clone();
                };
                self.check_bounds(f, *min, *max);
                Value::Number(Number::from(f))
            }

            (SchemaNode::Bool, Value::Bool(_)) => value.clone(),

            (
                SchemaNode::Enum {
                    variants,
                    case_insensitive,
                },
                Value::String(s),
            ) => {
                let candidate = if *case_insensitive {
                    s.to_lowercase()
                } else {
                    s.clone()
                };
                if variants.contains(&candidate.as_str()) {
                    Value::String(candidate)
                } else {
                    self.report(format!(
                        "'{s}' must be one of: {}",
                        variants.join(", ")
                    ));
                    value.clone()
                }
            }

            (node, other) => {
                self.report(format!(
                    "expected {}, found {}",
                    node.expected(),
                    value_kind(other)
                ));
                other.clone()
            }
        }
    }

    /// String form of a mapping key. Scalar keys (`101`, `true`) are read as
    /// their text; sequence, mapping and tagged keys are a violation.
    fn key_string(&mut self, key: &Value) -> Option<String> {
        match key {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => {
                self.report(format!(
                    "keys must be scalars, found {}",
                    value_kind(other)
                ));
                None
            }
        }
    }

    /// Report every tagged value inside passed-through content.
    ///
    /// The typed model stores unknown keys as plain YAML, which cannot carry
    /// tags, so `!tag` values are rejected at their own path.
    fn reject_tags(&mut self, value: &Value) {
        match value {
            Value::Tagged(tagged) => {
                self.report(format!("tagged value '{}' is not supported", tagged.tag));
            }
            Value::Sequence(seq) => {
                for (idx, v) in seq.iter().enumerate() {
                    self.path.push_index(idx);
                    self.reject_tags(v);
                    self.path.pop();
                }
            }
            Value::Mapping(map) => {
                for (key, v) in map {
                    let k = match key {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        other => value_kind(other).to_string(),
                    };
                    self.path.push_key(&k);
                    self.reject_tags(v);
                    self.path.pop();
                }
            }
            _ => {}
        }
    }

    /// Inject the map key into `field` of `value`, or check it matches.
    fn with_key_field(&mut self, value: &Value, key: &str, field: &str) -> Value {
        let Value::Mapping(map) = value else {
            return value.clone();
        };
        let mut map = map.clone();
        match present(map.get(field)) {
            Some(Value::String(given)) if given != key => {
                self.path.push_key(field);
                self.report(format!("'{given}' does not match its key '{key}'"));
                self.path.pop();
            }
            Some(_) => {}
            None => {
                map.insert(field.into(), key.into());
            }
        }
        Value::Mapping(map)
    }

    fn check_bounds<T>(&mut self, v: T, min: Option<T>, max: Option<T>)
    where
        T: PartialOrd + Copy + fmt::Display,
    {
        match (min, max) {
            (Some(lo), Some(hi)) if v < lo || v > hi => {
                self.report(format!("{v} must be between {lo} and {hi}"))
            }
            (Some(lo), None) if v < lo => self.report(format!("{v} must be at least {lo}")),
            (None, Some(hi)) if v > hi => self.report(format!("{v} must be at most {hi}")),
            _ => {}
        }
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Integer value of `n`, accepting integral floats such as `5.0`.
fn as_integer(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.is_f64() {
        let f = n.as_f64()?;
        if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            return Some(f as i64);
        }
    }
    None
}
