//! Decode interpreter: wire value tree → typed value.
//!
//! Failures are returned with the path of keys and indices leading to the
//! offending node. Sums dispatch on their `"tag"` key and never fall back to
//! trying other alternatives.
use serde_json::{Map, Value};

use crate::primitive::PrimitiveKind;
use crate::schema::{CONTENTS_KEY, Field, Node, Schema, Sum, TAG_KEY};
use crate::wire::{Kind, Path, Segment};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Matches `serde_json`'s own parser recursion limit.
pub const DEFAULT_MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Deepest nesting of records, sums and lists accepted.
    pub max_depth: usize,
    /// Reject record objects carrying keys no field declares.
    pub deny_unknown_fields: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH, deny_unknown_fields: false }
    }
}

/// Per-call decoding state threaded through the recursion.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    options: &'a DecodeOptions,
    depth: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("at {path}: {reason}")]
pub struct DecodeError {
    path: Path,
    reason: Reason,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Reason {
    #[error("expected {expected}, found {found}")]
    WrongType { expected: Kind, found: Kind },
    #[error("missing field `{field}`")]
    MissingField { field: String },
    #[error("unexpected field `{field}`")]
    UnexpectedField { field: String },
    #[error("unrecognized tag `{tag}`, expected one of: {}", .expected.join(", "))]
    UnrecognizedTag { tag: String, expected: Vec<String> },
    #[error("{primitive} rejected the value: {message}")]
    PrimitiveRejected { primitive: PrimitiveKind, message: String },
    #[error("nesting exceeds the depth limit of {limit}")]
    DepthExceeded { limit: usize },
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

pub fn decode<A>(schema: &Schema<A>, value: &Value) -> Result<A, DecodeError> {
    decode_with(schema, value, &DecodeOptions::default())
}

pub fn decode_with<A>(schema: &Schema<A>, value: &Value, options: &DecodeOptions) -> Result<A, DecodeError> {
    let result = decode_node(schema, value, Scope { options, depth: 0 });
    if let Err(error) = &result {
        tracing::trace!(path = %error.path(), reason = %error.reason(), "decode failed");
    }
    result
}

// ————————————————————————————————————————————————————————————————————————————
// INTERPRETER
// ————————————————————————————————————————————————————————————————————————————

pub(crate) fn decode_node<A>(schema: &Schema<A>, value: &Value, scope: Scope<'_>) -> Result<A, DecodeError> {
    match &schema.node {
        Node::Leaf(primitive) => primitive.decode_value(value).map_err(|rejection| {
            DecodeError::new(Reason::PrimitiveRejected {
                primitive: primitive.kind(),
                message: rejection.message().to_string(),
            })
        }),
        Node::Record(record) => {
            let object = expect_object(value)?;
            let scope = scope.descend()?;
            if scope.options.deny_unknown_fields {
                let names = record.names();
                if let Some(key) = object.keys().find(|key| !names.contains(&key.as_str())) {
                    return Err(DecodeError::new(Reason::UnexpectedField { field: key.clone() }));
                }
            }
            record.decode(object, scope)
        }
        Node::Sum(sum) => decode_sum(sum, value, scope),
        Node::List(list) => match value {
            Value::Array(items) => list.decode(items, scope.descend()?),
            other => Err(wrong_type(Kind::Array, other)),
        },
        Node::Mapped(mapped) => mapped.decode(value, scope),
    }
}

fn decode_sum<A>(sum: &Sum<A>, value: &Value, scope: Scope<'_>) -> Result<A, DecodeError> {
    let object = expect_object(value)?;
    let scope = scope.descend()?;
    let tag = object.get(TAG_KEY).ok_or_else(|| missing(TAG_KEY))?;
    let contents = object.get(CONTENTS_KEY).ok_or_else(|| missing(CONTENTS_KEY))?;
    if let Some(key) = object.keys().find(|key| *key != TAG_KEY && *key != CONTENTS_KEY) {
        return Err(DecodeError::new(Reason::UnexpectedField { field: key.clone() }));
    }
    let tag = match tag {
        Value::String(tag) => tag,
        other => return Err(wrong_type(Kind::String, other).within(Segment::key(TAG_KEY))),
    };
    let Some(alternative) = sum.get(tag) else {
        return Err(DecodeError::new(Reason::UnrecognizedTag {
            tag: tag.clone(),
            expected: sum.sorted_tags(),
        }));
    };
    tracing::trace!(%tag, "decoding sum alternative");
    alternative
        .decode(contents, scope)
        .map_err(|error| error.within(Segment::key(CONTENTS_KEY)))
}

impl<A, X> Field<A, X> {
    pub(crate) fn decode_step(&self, object: &Map<String, Value>, scope: Scope<'_>) -> Result<X, DecodeError> {
        let value = object.get(&self.name).ok_or_else(|| missing(&self.name))?;
        decode_node(&self.schema, value, scope).map_err(|error| error.within(Segment::key(&self.name)))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

impl Scope<'_> {
    fn descend(self) -> Result<Self, DecodeError> {
        if self.depth >= self.options.max_depth {
            return Err(DecodeError::new(Reason::DepthExceeded { limit: self.options.max_depth }));
        }
        Ok(Self { depth: self.depth + 1, ..self })
    }
}

impl DecodeError {
    pub fn new(reason: Reason) -> Self {
        Self { path: Path::root(), reason }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn reason(&self) -> &Reason {
        &self.reason
    }
    /// Re-anchor an error raised inside `segment` at the enclosing node.
    pub fn within(mut self, segment: Segment) -> Self {
        self.path.prepend(segment);
        self
    }
}

fn expect_object(value: &Value) -> Result<&Map<String, Value>, DecodeError> {
    match value {
        Value::Object(object) => Ok(object),
        other => Err(wrong_type(Kind::Object, other)),
    }
}

fn wrong_type(expected: Kind, found: &Value) -> DecodeError {
    DecodeError::new(Reason::WrongType { expected, found: Kind::of(found) })
}

fn missing(field: &str) -> DecodeError {
    DecodeError::new(Reason::MissingField { field: field.to_string() })
}
