use serde_yaml::Value;

/// Name of a value's YAML type, as used in violation messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_f64() => "a number",
        Value::Number(_) => "an integer",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Get a value by a dotted path (e.g., "cameras.front.motion.threshold").
///
/// Numeric segments index into sequences, so `"ffmpeg.inputs.0.path"` works.
/// An empty path returns the value itself.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    let mut current = value;
    for seg in path.split('.') {
        current = match current {
            Value::Mapping(map) => map.get(seg)?,
            Value::Sequence(seq) => seq.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Value {
        serde_yaml::from_str(
            "cameras:\n  front:\n    ffmpeg:\n      inputs:\n        - path: rtsp://a\n    motion:\n      threshold: 25\n",
        )
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let v = doc();
        assert_eq!(
            lookup(&v, "cameras.front.motion.threshold").and_then(Value::as_u64),
            Some(25)
        );
        assert_eq!(
            lookup(&v, "cameras.front.ffmpeg.inputs.0.path").and_then(Value::as_str),
            Some("rtsp://a")
        );
        assert!(lookup(&v, "cameras.back").is_none());
        assert!(lookup(&v, "cameras.front.motion.threshold.x").is_none());
        assert_eq!(lookup(&v, ""), Some(&v));
    }

    #[test]
    fn test_value_kind() {
        assert_eq!(value_kind(&Value::from(1)), "an integer");
        assert_eq!(value_kind(&Value::from(1.5)), "a number");
        assert_eq!(value_kind(&Value::from("x")), "a string");
        assert_eq!(value_kind(&Value::Null), "null");
    }
}
