//! Error taxonomy shared by the codec, the validator and the store facade.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// One schema violation, located by a dot/bracket path into the document
/// (e.g. `cameras.front_door.motion.threshold`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    pub reason: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

/// Well-formed input that does not satisfy the schema.
///
/// Always carries every violation found in one pass, never just the first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("configuration is invalid: {}", render_violations(.violations))]
pub struct ConfigValidationError {
    pub violations: Vec<Violation>,
}

impl ConfigValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn single(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(vec![Violation::new(path, reason)])
    }

    /// Paths of all violations, in discovery order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().map(|v| v.path.as_str())
    }

    /// Whether any violation points exactly at `path`.
    pub fn mentions(&self, path: &str) -> bool {
        self.paths().any(|p| p == path)
    }
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Malformed YAML text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    /// 1-based line of the problem, when the parser reports one.
    pub line: Option<usize>,
    /// 1-based column of the problem, when the parser reports one.
    pub column: Option<usize>,
}

impl From<serde_yaml::Error> for ParseError {
    fn from(err: serde_yaml::Error) -> Self {
        let location = err.location();
        Self {
            message: err.to_string(),
            line: location.as_ref().map(|l| l.line()),
            column: location.as_ref().map(|l| l.column()),
        }
    }
}

/// A validated configuration could not be rendered as YAML.
///
/// Not expected for anything that passed validation; kept as an error so
/// the codec never panics.
#[derive(Debug, Error)]
#[error("failed to encode configuration: {0}")]
pub struct EncodeError(#[from] pub serde_yaml::Error);

/// Every failure the store facade can surface to its caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ConfigValidationError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication error: {0}")]
    Auth(String),

    /// The remote destination changed since the revision we hold.
    #[error("conflict on {location}: {message}")]
    Conflict { location: String, message: String },
}

impl StoreError {
    /// Stable tag for the error kind, suitable for UI mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::Parse(_) => "parse",
            StoreError::Validation(_) => "validation",
            StoreError::Encode(_) => "encode",
            StoreError::Transport(_) => "transport",
            StoreError::Auth(_) => "auth",
            StoreError::Conflict { .. } => "conflict",
        }
    }

    /// Field-level violations, empty unless this is a validation failure.
    pub fn violations(&self) -> &[Violation] {
        match self {
            StoreError::Validation(err) => &err.violations,
            _ => &[],
        }
    }

    /// Map an I/O failure on `what` to `NotFound` or `Transport`.
    pub fn from_io(err: std::io::Error, what: impl fmt::Display) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound(what.to_string()),
            _ => StoreError::Transport(format!("{what}: {err}")),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_violation() {
        let err = ConfigValidationError::new(vec![
            Violation::new("mqtt.host", "required field is missing"),
            Violation::new("cameras.cam 1.name", "must match ^[a-zA-Z0-9_-]+$"),
        ]);
        let text = err.to_string();
        assert!(text.contains("mqtt.host: required field is missing"));
        assert!(text.contains("cameras.cam 1.name"));
        assert!(err.mentions("mqtt.host"));
        assert!(!err.mentions("mqtt"));
    }

    #[test]
    fn parse_error_keeps_location() {
        let err: ParseError = serde_yaml::from_str::<serde_yaml::Value>("a: [1, 2")
            .unwrap_err()
            .into();
        assert!(err.line.is_some());
        assert!(!err.message.is_empty());
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(StoreError::from_io(io, "config.yml").kind(), "not_found");

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = StoreError::from_io(io, "config.yml");
        assert_eq!(err.kind(), "transport");
        assert!(err.to_string().contains("config.yml"));
    }

    #[test]
    fn root_violation_renders_placeholder() {
        assert_eq!(
            Violation::new("", "expected a mapping").to_string(),
            "<root>: expected a mapping"
        );
    }
}
