//! YAML text <-> configuration tree.
//!
//! `encode` relies on `serde_yaml`'s emitter: block style, two-space mapping
//! indent, no anchors or aliases and no line wrapping. Struct fields come out
//! in declaration order and every map in the typed model is a `BTreeMap`, so
//! encoding an unchanged configuration is byte-for-byte stable.

use serde_yaml::{Mapping, Value};

use crate::error::{EncodeError, ParseError};

use super::models::Configuration;

/// Parse YAML text into an untyped tree.
///
/// Blank input yields an empty mapping, which the validator then rejects
/// for its missing required sections.
pub fn decode(text: &str) -> Result<Value, ParseError> {
    if text.trim().is_empty() {
        return Ok(Value::Mapping(Mapping::new()));
    }
    Ok(serde_yaml::from_str(text)?)
}

/// Render a configuration as YAML text.
pub fn encode(config: &Configuration) -> Result<String, EncodeError> {
    Ok(serde_yaml::to_string(config)?)
}

/// Render an untyped tree as YAML text.
pub fn encode_value(value: &Value) -> Result<String, EncodeError> {
    Ok(serde_yaml::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validate::normalize;

    const SAMPLE: &str = r#"
mqtt:
  host: mqtt.local
  user: frigate
cameras:
  back:
    ffmpeg:
      inputs:
        - path: rtsp://example.com/back
          roles: [detect, record]
    detect:
      width: 1280
      height: 720
    motion:
      frame_alpha: 0.02
    zones:
      yard:
        coordinates: 0.1,0.1,0.9,0.1,0.9,0.9
        loitering_time: 10
    snapshots:
      enabled: true
  front:
    ffmpeg:
      inputs:
        - path: rtsp://example.com/front
          roles: [detect]
go2rtc:
  streams:
    front: rtsp://example.com/front
"#;

    #[test]
    fn decode_reports_location_on_malformed_text() {
        let err = decode("mqtt:\n  host: [unterminated\n").unwrap_err();
        assert!(err.line.is_some(), "{err:?}");
    }

    #[test]
    fn decode_blank_is_empty_mapping() {
        assert_eq!(decode("  \n").unwrap(), Value::Mapping(Mapping::new()));
    }

    #[test]
    fn decode_rejects_multiple_documents() {
        assert!(decode("a: 1\n---\nb: 2\n").is_err());
    }

    #[test]
    fn round_trip_is_semantically_equal() {
        let cfg = normalize(&decode(SAMPLE).unwrap()).unwrap();
        let text = encode(&cfg).unwrap();
        let again = normalize(&decode(&text).unwrap()).unwrap();
        assert_eq!(cfg, again);
        assert!(again.extra.contains_key("go2rtc"));
    }

    #[test]
    fn encode_is_stable() {
        let cfg = normalize(&decode(SAMPLE).unwrap()).unwrap();
        let first = encode(&cfg).unwrap();
        let second = encode(&normalize(&decode(&first).unwrap()).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn encode_uses_block_style_and_sorted_cameras() {
        let cfg = normalize(&decode(SAMPLE).unwrap()).unwrap();
        let text = encode(&cfg).unwrap();
        assert!(text.starts_with("mqtt:\n  enabled: true\n  host: mqtt.local\n"));
        assert!(!text.contains('&') && !text.contains('*'));
        assert!(!text.contains('{'));
        let back = text.find("\n  back:\n").unwrap();
        let front = text.find("\n  front:\n").unwrap();
        assert!(back < front);
        assert!(!text.contains("null"));
    }

    #[test]
    fn long_values_are_not_wrapped() {
        let long = "x".repeat(300);
        let doc = format!(
            "mqtt:\n  host: h\ncameras:\n  c:\n    ffmpeg:\n      input_args: {long} {long}\n      inputs:\n        - path: rtsp://x\n          roles: [record]\n"
        );
        let cfg = normalize(&decode(&doc).unwrap()).unwrap();
        let text = encode(&cfg).unwrap();
        assert!(text.contains(&format!("input_args: {long} {long}\n")));
    }
}
