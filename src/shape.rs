//! Shapes described at runtime.
//!
//! A [`Shape`] is a plain serde description of a schema, e.g.
//!
//! ```json
//! {"sum": [
//!     {"tag": "Person", "shape": {"record": [
//!         {"name": "Name", "shape": "string"},
//!         {"name": "Age", "shape": "integer"}
//!     ]}}
//! ]}
//! ```
//!
//! [`Shape::compile`] turns it into a `Schema<Dyn>` through the same record and
//! sum builders typed code uses, so every interpreter works on it unchanged.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path_de::{PathError, from_slice_with_path, from_str_with_path};
use crate::primitive::Primitive;
use crate::schema::{Schema, SchemaError, choice, field};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    String,
    Integer,
    Number,
    Bool,
    Record(Vec<NamedShape>),
    Sum(Vec<TaggedShape>),
    List(Box<Shape>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamedShape {
    pub name: String,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaggedShape {
    pub tag: String,
    pub shape: Shape,
}

/// A value whose type is only known through a runtime [`Shape`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dyn {
    /// Stand-in for a slot a hand-built value left empty; encodes as `null`.
    Unit,
    Bool(bool),
    Int(i64),
    Num(f64),
    Str(String),
    Record(IndexMap<String, Dyn>),
    Variant(String, Box<Dyn>),
    List(Vec<Dyn>),
}

static UNIT: Dyn = Dyn::Unit;
static NO_ITEMS: Vec<Dyn> = Vec::new();

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Shape {
    pub fn from_json_str(source: &str) -> Result<Self, PathError> {
        from_str_with_path(source)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, PathError> {
        from_slice_with_path(bytes)
    }

    pub fn compile(&self) -> Result<Schema<Dyn>, SchemaError> {
        let schema = match self {
            Shape::String => Schema::leaf(dyn_leaf(Primitive::string(), Dyn::Str, |d| match d {
                Dyn::Str(s) => Some(s),
                _ => None,
            })),
            Shape::Integer => Schema::leaf(dyn_leaf(Primitive::integer(), Dyn::Int, |d| match d {
                Dyn::Int(n) => Some(n),
                _ => None,
            })),
            Shape::Number => Schema::leaf(dyn_leaf(json_number(), Dyn::Num, |d| match d {
                Dyn::Num(f) => Some(f),
                _ => None,
            })),
            Shape::Bool => Schema::leaf(dyn_leaf(Primitive::boolean(), Dyn::Bool, |d| match d {
                Dyn::Bool(b) => Some(b),
                _ => None,
            })),
            Shape::Record(fields) => {
                let names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
                let slots = fields
                    .iter()
                    .map(|f| -> Result<_, SchemaError> {
                        let key = f.name.clone();
                        let schema = f.shape.compile()?;
                        Ok(field(f.name.clone(), schema, move |d: &Dyn| d.get(&key).unwrap_or(&UNIT)))
                    })
                    .collect::<Result<Vec<_>, SchemaError>>()?;
                Schema::record(slots, move |values: Vec<Dyn>| {
                    Dyn::Record(names.iter().cloned().zip(values).collect())
                })?
            }
            Shape::Sum(choices) => {
                let alternatives = choices
                    .iter()
                    .map(|c| -> Result<_, SchemaError> {
                        let (inject_tag, extract_tag) = (c.tag.clone(), c.tag.clone());
                        let schema = c.shape.compile()?;
                        Ok(choice(
                            c.tag.clone(),
                            schema,
                            move |contents| Dyn::Variant(inject_tag.clone(), Box::new(contents)),
                            move |d: &Dyn| match d {
                                Dyn::Variant(tag, contents) if *tag == extract_tag => Some(&**contents),
                                _ => None,
                            },
                        ))
                    })
                    .collect::<Result<Vec<_>, SchemaError>>()?;
                Schema::sum(alternatives)?
            }
            Shape::List(item) => Schema::list(item.compile()?).map(Dyn::List, |d: &Dyn| match d {
                Dyn::List(items) => items,
                _ => &NO_ITEMS,
            }),
        };
        Ok(schema)
    }
}

impl Dyn {
    /// Field lookup on records; `None` for anything else.
    pub fn get(&self, key: &str) -> Option<&Dyn> {
        match self {
            Dyn::Record(fields) => fields.get(key),
            _ => None,
        }
    }
}

/// `f64` leaf whose integral values encode without a fraction, so `3` comes
/// back out as `3` rather than `3.0`.
fn json_number() -> Primitive<f64> {
    let float = Primitive::float();
    let decoder = float.clone();
    Primitive::new(
        float.kind(),
        move |value| decoder.decode_value(value),
        move |f| {
            if f.fract() == 0.0 && f.abs() <= MAX_EXACT_INTEGER {
                Value::from(*f as i64)
            } else {
                float.encode_value(f)
            }
        },
    )
}

/// Largest magnitude below which every integer has an exact `f64` form.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Lift a typed primitive to `Dyn`. Values of the wrong variant encode as
/// `null`; values produced by decoding never are.
fn dyn_leaf<T: 'static>(base: Primitive<T>, into: fn(T) -> Dyn, from: fn(&Dyn) -> Option<&T>) -> Primitive<Dyn> {
    let decoder = base.clone();
    Primitive::new(
        base.kind(),
        move |value| decoder.decode_value(value).map(into),
        move |d| from(d).map(|x| base.encode_value(x)).unwrap_or(Value::Null),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{Reason, decode};
    use crate::doc::documentation;
    use crate::encode::encode;
    use serde_json::json;

    const CUSTOMER: &str = r#"{"sum": [
        {"tag": "Person", "shape": {"record": [
            {"name": "Name", "shape": "string"},
            {"name": "Age", "shape": "integer"}
        ]}},
        {"tag": "Business", "shape": {"record": [
            {"name": "Employees", "shape": "integer"},
            {"name": "Sites", "shape": {"list": "string"}}
        ]}}
    ]}"#;

    #[test]
    fn compiled_shape_round_trips_wire_values() {
        let schema = Shape::from_json_str(CUSTOMER).unwrap().compile().unwrap();
        let wire = json!({"tag": "Business", "contents": {"Employees": 12, "Sites": ["Leeds", "York"]}});
        let value = decode(&schema, &wire).unwrap();
        assert_eq!(
            value.clone(),
            Dyn::Variant(
                "Business".into(),
                Box::new(Dyn::Record(IndexMap::from([
                    ("Employees".to_string(), Dyn::Int(12)),
                    ("Sites".to_string(), Dyn::List(vec![Dyn::Str("Leeds".into()), Dyn::Str("York".into())])),
                ]))),
            )
        );
        assert_eq!(encode(&schema, &value), wire);
    }

    #[test]
    fn compiled_shape_documents_like_typed_schemas() {
        let schema = Shape::from_json_str(CUSTOMER).unwrap().compile().unwrap();
        assert_eq!(
            documentation("Customer", &schema).render(),
            "(Customer)\nChoice of:\n  - Person\n    - Name: string\n    - Age: number\n  - Business\n    - Employees: number\n    - [Sites]\n      Each item:\n      - item: string\n"
        );
    }

    #[test]
    fn encoding_reorders_keys_into_declaration_order() {
        let schema = Shape::from_json_str(r#"{"record": [{"name": "b", "shape": "bool"}, {"name": "a", "shape": "number"}]}"#)
            .unwrap()
            .compile()
            .unwrap();
        let value = decode(&schema, &json!({"a": 1.5, "b": false})).unwrap();
        assert_eq!(crate::wire::to_string(&encode(&schema, &value)), r#"{"b":false,"a":1.5}"#);
    }

    #[test]
    fn integral_numbers_stay_integral() {
        let schema = Shape::Number.compile().unwrap();
        let value = decode(&schema, &json!(3)).unwrap();
        assert_eq!(value, Dyn::Num(3.0));
        assert_eq!(crate::wire::to_string(&encode(&schema, &value)), "3");
        assert_eq!(crate::wire::to_string(&encode(&schema, &Dyn::Num(2.5))), "2.5");
        assert_eq!(encode(&schema, &Dyn::Num(f64::INFINITY)), Value::Null);
    }

    #[test]
    fn hand_built_values_with_gaps_encode_null() {
        let schema = Shape::from_json_str(r#"{"record": [{"name": "n", "shape": "integer"}]}"#)
            .unwrap()
            .compile()
            .unwrap();
        assert_eq!(encode(&schema, &Dyn::Record(IndexMap::new())), json!({"n": null}));
    }

    #[test]
    fn duplicate_tags_surface_as_schema_errors() {
        let shape = Shape::Sum(vec![
            TaggedShape { tag: "A".into(), shape: Shape::Bool },
            TaggedShape { tag: "A".into(), shape: Shape::String },
        ]);
        assert_eq!(shape.compile().unwrap_err(), SchemaError::DuplicateTag("A".into()));
    }

    #[test]
    fn decode_errors_name_the_tag_set() {
        let schema = Shape::from_json_str(CUSTOMER).unwrap().compile().unwrap();
        let error = decode(&schema, &json!({"tag": "Grape", "contents": {}})).unwrap_err();
        assert_eq!(
            error.reason(),
            &Reason::UnrecognizedTag { tag: "Grape".into(), expected: vec!["Business".into(), "Person".into()] }
        );
    }

    #[test]
    fn malformed_descriptor_reports_location() {
        let error = Shape::from_json_slice(br#"{"record": [{"name": "a", "shape": "strng"}]}"#).unwrap_err();
        let message = error.to_string();
        assert!(message.contains("strng"), "{message}");
        assert!(error.path().contains("[0]"), "{message}");
    }
}
