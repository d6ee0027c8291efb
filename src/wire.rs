//! Wire values and the paths that locate nodes inside them.
//!
//! The engine never parses bytes itself: `serde_json` is the tokenizer and
//! printer, and everything downstream works on materialized [`WireValue`] trees.
use std::fmt;

use serde::Serialize;

pub use serde_json::{Map, Value};

/// A parsed JSON-like value tree.
pub type WireValue = Value;

pub fn parse(bytes: &[u8]) -> serde_json::Result<WireValue> {
    serde_json::from_slice(bytes)
}

pub fn parse_str(source: &str) -> serde_json::Result<WireValue> {
    serde_json::from_str(source)
}

pub fn to_string(value: &WireValue) -> String {
    // Serializing a `Value` into a `String` cannot fail.
    value.to_string()
}

pub fn to_string_pretty(value: &WireValue) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

// ————————————————————————————————————————————————————————————————————————————
// KINDS
// ————————————————————————————————————————————————————————————————————————————

/// Structural kind of a wire node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Object,
    Array,
    String,
    Number,
    Bool,
    Null,
}

impl Kind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Bool => "bool",
            Kind::Null => "null",
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PATHS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    pub fn key(name: impl Into<String>) -> Self {
        Segment::Key(name.into())
    }
}

/// Object keys and array indices from the root down to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
    /// Errors are built at the failure point and gain segments while they
    /// bubble up, so segments are added at the front.
    pub(crate) fn prepend(&mut self, segment: Segment) {
        self.segments.insert(0, segment);
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self { segments: iter.into_iter().collect() }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                Segment::Key(key) if is_plain_key(key) => write!(f, ".{key}")?,
                Segment::Key(key) => {
                    let quoted = serde_json::to_string(key).map_err(|_| fmt::Error)?;
                    write!(f, "[{quoted}]")?
                }
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_follow_value_variants() {
        assert_eq!(Kind::of(&json!({})), Kind::Object);
        assert_eq!(Kind::of(&json!([1])), Kind::Array);
        assert_eq!(Kind::of(&json!(1.5)), Kind::Number);
        assert_eq!(Kind::of(&json!(null)), Kind::Null);
        assert_eq!(Kind::Bool.to_string(), "bool");
    }

    #[test]
    fn path_display_quotes_unusual_keys() {
        let path: Path = [Segment::key("contents"), Segment::Index(2), Segment::key("first name")]
            .into_iter()
            .collect();
        assert_eq!(path.to_string(), r#"$.contents[2]["first name"]"#);
        assert_eq!(Path::root().to_string(), "$");
    }

    #[test]
    fn path_display_uses_json_string_escapes() {
        let path: Path = [Segment::key("a\"b"), Segment::key("\u{1}tab\t")].into_iter().collect();
        assert_eq!(path.to_string(), r#"$["a\"b"]["\u0001tab\t"]"#);
    }

    #[test]
    fn prepend_builds_outermost_first() {
        let mut path = Path::root();
        path.prepend(Segment::key("Age"));
        path.prepend(Segment::key("contents"));
        assert_eq!(path.segments(), &[Segment::key("contents"), Segment::key("Age")]);
    }

    #[test]
    fn parse_and_print_preserve_key_order() {
        let value = parse_str(r#"{"b":1,"a":2}"#).unwrap();
        assert_eq!(to_string(&value), r#"{"b":1,"a":2}"#);
        assert_eq!(parse(br#"[true]"#).unwrap(), json!([true]));
    }
}
