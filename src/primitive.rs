//! Leaf descriptors for scalar types.
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Number, Value};

use crate::wire::Kind;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    String,
    Number,
    Bool,
}

impl PrimitiveKind {
    /// Name used in generated documentation.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Bool => "bool",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a primitive refused a wire scalar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    message: String,
}

impl Rejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
    pub fn message(&self) -> &str {
        &self.message
    }
    fn wrong_kind(expected: &str, found: &Value) -> Self {
        Self::new(format!("expected {expected}, found {}", Kind::of(found)))
    }
}

type DecodeFn<T> = dyn Fn(&Value) -> Result<T, Rejection> + Send + Sync;
type EncodeFn<T> = dyn Fn(&T) -> Value + Send + Sync;

/// A scalar leaf: a partial `wire → T` conversion and a total `T → wire` one.
pub struct Primitive<T> {
    kind: PrimitiveKind,
    decode: Arc<DecodeFn<T>>,
    encode: Arc<EncodeFn<T>>,
}

impl<T> Clone for Primitive<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            decode: Arc::clone(&self.decode),
            encode: Arc::clone(&self.encode),
        }
    }
}

impl<T> fmt::Debug for Primitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitive").field("kind", &self.kind).finish_non_exhaustive()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<T> Primitive<T> {
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    pub fn decode_value(&self, value: &Value) -> Result<T, Rejection> {
        (self.decode)(value)
    }

    pub fn encode_value(&self, value: &T) -> Value {
        (self.encode)(value)
    }
}

impl<T: 'static> Primitive<T> {
    pub fn new<D, E>(kind: PrimitiveKind, decode: D, encode: E) -> Self
    where
        D: Fn(&Value) -> Result<T, Rejection> + Send + Sync + 'static,
        E: Fn(&T) -> Value + Send + Sync + 'static,
    {
        Self { kind, decode: Arc::new(decode), encode: Arc::new(encode) }
    }

    /// Narrow this primitive to a type carrying extra invariants, e.g. an
    /// integer that must fit in a `u8`.
    pub fn try_map<U, F, G>(self, into: F, from: G) -> Primitive<U>
    where
        U: 'static,
        F: Fn(T) -> Result<U, String> + Send + Sync + 'static,
        G: Fn(&U) -> T + Send + Sync + 'static,
    {
        let decoder = self.clone();
        Primitive::new(
            self.kind,
            move |value| decoder.decode_value(value).and_then(|x| into(x).map_err(Rejection::new)),
            move |value| self.encode_value(&from(value)),
        )
    }
}

impl Primitive<String> {
    pub fn string() -> Self {
        Primitive::new(
            PrimitiveKind::String,
            |value| match value {
                Value::String(s) => Ok(s.clone()),
                other => Err(Rejection::wrong_kind("a string", other)),
            },
            |s| Value::String(s.clone()),
        )
    }
}

impl Primitive<i64> {
    /// Signed integer; integral floats such as `40.0` are accepted.
    pub fn integer() -> Self {
        Primitive::new(
            PrimitiveKind::Number,
            |value| {
                let number = as_number(value)?;
                if let Some(n) = number.as_i64() {
                    return Ok(n);
                }
                match number.as_f64() {
                    Some(f) if is_integral(f) && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
                    Some(f) if is_integral(f) => Err(Rejection::new(format!("{number} is out of range for a signed integer"))),
                    _ => Err(Rejection::new(format!("expected an integral number, found {number}"))),
                }
            },
            |n| Value::from(*n),
        )
    }
}

impl Primitive<u64> {
    pub fn unsigned() -> Self {
        Primitive::new(
            PrimitiveKind::Number,
            |value| {
                let number = as_number(value)?;
                if let Some(n) = number.as_u64() {
                    return Ok(n);
                }
                match number.as_f64() {
                    Some(f) if is_integral(f) && f >= 0.0 && f < u64::MAX as f64 => Ok(f as u64),
                    Some(f) if is_integral(f) => Err(Rejection::new(format!("{number} is out of range for an unsigned integer"))),
                    _ => Err(Rejection::new(format!("expected an integral number, found {number}"))),
                }
            },
            |n| Value::from(*n),
        )
    }
}

impl Primitive<f64> {
    /// Non-finite floats have no JSON form and encode as `null`.
    pub fn float() -> Self {
        Primitive::new(
            PrimitiveKind::Number,
            |value| {
                as_number(value)?
                    .as_f64()
                    .ok_or_else(|| Rejection::new("number is not representable as f64"))
            },
            |f| Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        )
    }
}

impl Primitive<bool> {
    pub fn boolean() -> Self {
        Primitive::new(
            PrimitiveKind::Bool,
            |value| match value {
                Value::Bool(b) => Ok(*b),
                other => Err(Rejection::wrong_kind("a bool", other)),
            },
            |b| Value::Bool(*b),
        )
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn as_number(value: &Value) -> Result<&Number, Rejection> {
    match value {
        Value::Number(n) => Ok(n),
        other => Err(Rejection::wrong_kind("a number", other)),
    }
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_rejects_fractions_but_accepts_integral_floats() {
        let int = Primitive::integer();
        assert_eq!(int.decode_value(&json!(40)), Ok(40));
        assert_eq!(int.decode_value(&json!(40.0)), Ok(40));
        let rejection = int.decode_value(&json!(40.5)).unwrap_err();
        assert_eq!(rejection.message(), "expected an integral number, found 40.5");
    }

    #[test]
    fn kind_mismatch_names_found_kind() {
        let rejection = Primitive::integer().decode_value(&json!("old")).unwrap_err();
        assert_eq!(rejection.message(), "expected a number, found string");
        let rejection = Primitive::string().decode_value(&json!(null)).unwrap_err();
        assert_eq!(rejection.message(), "expected a string, found null");
    }

    #[test]
    fn unsigned_rejects_negative_numbers() {
        let uint = Primitive::unsigned();
        assert_eq!(uint.decode_value(&json!(7)), Ok(7));
        assert!(uint.decode_value(&json!(-1)).is_err());
    }

    #[test]
    fn float_encodes_non_finite_as_null() {
        let float = Primitive::float();
        assert_eq!(float.encode_value(&1.5), json!(1.5));
        assert_eq!(float.encode_value(&f64::NAN), Value::Null);
        assert_eq!(float.decode_value(&json!(3)), Ok(3.0));
    }

    #[test]
    fn try_map_narrows_and_keeps_kind() {
        let byte = Primitive::integer().try_map(
            |n| u8::try_from(n).map_err(|_| format!("{n} does not fit in a byte")),
            |b| i64::from(*b),
        );
        assert_eq!(byte.kind(), PrimitiveKind::Number);
        assert_eq!(byte.decode_value(&json!(200)), Ok(200u8));
        assert_eq!(byte.decode_value(&json!(300)).unwrap_err().message(), "300 does not fit in a byte");
        assert_eq!(byte.encode_value(&9), json!(9));
    }

    fn accessor_kind<T>(primitive: &Primitive<T>) -> PrimitiveKind {
        primitive.kind()
    }

    #[test]
    fn accessors_need_no_static_bound() {
        assert_eq!(accessor_kind(&Primitive::string()), PrimitiveKind::String);
    }

    #[test]
    fn boolean_round_trips() {
        let b = Primitive::boolean();
        assert_eq!(b.decode_value(&b.encode_value(&true)), Ok(true));
        assert_eq!(PrimitiveKind::Bool.to_string(), "bool");
    }
}
