//! Encode interpreter: typed value → wire value tree.
use serde_json::{Map, Value};

use crate::schema::{CONTENTS_KEY, Field, Node, Schema, Sum, TAG_KEY};
use crate::wire::{Path, Segment};

/// Only raised by schemas whose sum alternatives do not cover every value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("at {path}: no alternative matched the value (declared: {})", .tags.join(", "))]
pub struct EncodeError {
    path: Path,
    tags: Vec<String>,
}

/// Encode `value` with `schema`.
///
/// # Panics
///
/// Panics if a sum reached during encoding has no alternative recognising the
/// value, which means the schema was built non-exhaustively. Use [`try_encode`]
/// to get that as an error instead.
pub fn encode<A>(schema: &Schema<A>, value: &A) -> Value {
    match try_encode(schema, value) {
        Ok(encoded) => encoded,
        Err(error) => panic!("schema is not exhaustive: {error}"),
    }
}

pub fn try_encode<A>(schema: &Schema<A>, value: &A) -> Result<Value, EncodeError> {
    encode_node(schema, value)
}

pub(crate) fn encode_node<A>(schema: &Schema<A>, value: &A) -> Result<Value, EncodeError> {
    match &schema.node {
        Node::Leaf(primitive) => Ok(primitive.encode_value(value)),
        Node::Record(record) => {
            let mut out = Map::new();
            record.encode(value, &mut out)?;
            Ok(Value::Object(out))
        }
        Node::Sum(sum) => encode_sum(sum, value),
        Node::List(list) => list.encode(value),
        Node::Mapped(mapped) => mapped.encode(value),
    }
}

fn encode_sum<A>(sum: &Sum<A>, value: &A) -> Result<Value, EncodeError> {
    for (position, alternative) in sum.alternatives().enumerate() {
        if let Some(contents) = alternative.encode(value) {
            debug_assert!(
                sum.alternatives().skip(position + 1).all(|other| !other.matches(value)),
                "alternative `{}` and a later one both claim the same value",
                alternative.tag(),
            );
            let contents = contents.map_err(|error| error.within(Segment::key(CONTENTS_KEY)))?;
            let mut out = Map::new();
            out.insert(TAG_KEY.to_string(), Value::String(alternative.tag().to_string()));
            out.insert(CONTENTS_KEY.to_string(), contents);
            return Ok(Value::Object(out));
        }
    }
    Err(EncodeError { path: Path::root(), tags: sum.alternatives().map(|alt| alt.tag().to_string()).collect() })
}

impl<A, X> Field<A, X> {
    pub(crate) fn encode_step(&self, value: &A, out: &mut Map<String, Value>) -> Result<(), EncodeError> {
        let encoded = encode_node(&self.schema, (self.get)(value))
            .map_err(|error| error.within(Segment::key(&self.name)))?;
        out.insert(self.name.clone(), encoded);
        Ok(())
    }
}

impl EncodeError {
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
    pub(crate) fn within(mut self, segment: Segment) -> Self {
        self.path.prepend(segment);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Primitive;
    use crate::schema::{choice, field};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    enum Token {
        Word(String),
        Count(u64),
        Blank,
    }

    fn word() -> crate::schema::Choice<Token> {
        choice("Word", Schema::leaf(Primitive::string()), Token::Word, |t| match t {
            Token::Word(w) => Some(w),
            _ => None,
        })
    }

    fn count() -> crate::schema::Choice<Token> {
        choice("Count", Schema::leaf(Primitive::unsigned()), Token::Count, |t| match t {
            Token::Count(n) => Some(n),
            _ => None,
        })
    }

    #[test]
    fn record_keys_follow_field_order() {
        struct Pair {
            z: String,
            a: bool,
        }
        let schema = Schema::record(
            (
                field("z", Schema::leaf(Primitive::string()), |p: &Pair| &p.z),
                field("a", Schema::leaf(Primitive::boolean()), |p: &Pair| &p.a),
            ),
            |(z, a)| Pair { z, a },
        )
        .unwrap();
        let encoded = encode(&schema, &Pair { z: "last".into(), a: true });
        assert_eq!(crate::wire::to_string(&encoded), r#"{"z":"last","a":true}"#);
    }

    #[test]
    fn sum_wraps_payload_in_tag_and_contents() {
        let schema = Schema::sum([word(), count()]).unwrap();
        assert_eq!(
            encode(&schema, &Token::Count(3)),
            json!({"tag": "Count", "contents": 3})
        );
        let list = Schema::list(schema);
        assert_eq!(
            encode(&list, &vec![Token::Word("hi".into())]),
            json!([{"tag": "Word", "contents": "hi"}])
        );
    }

    #[test]
    fn uncovered_variant_is_an_error_with_path() {
        let schema = Schema::list(Schema::sum([word(), count()]).unwrap());
        let error = try_encode(&schema, &vec![Token::Word("a".into()), Token::Blank]).unwrap_err();
        assert_eq!(error.path().segments(), &[Segment::Index(1)]);
        assert_eq!(error.tags(), &["Word".to_string(), "Count".to_string()]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "alternative `Word` and a later one both claim the same value")]
    fn overlapping_extractors_are_caught_in_debug_builds() {
        let greedy = choice("Any", Schema::leaf(Primitive::string()), Token::Word, |t| match t {
            Token::Word(w) => Some(w),
            _ => None,
        });
        let schema = Schema::sum([word(), greedy]).unwrap();
        encode(&schema, &Token::Word("hi".into()));
    }

    #[test]
    #[should_panic(expected = "schema is not exhaustive")]
    fn encode_panics_on_uncovered_variant() {
        let schema = Schema::sum([word()]).unwrap();
        encode(&schema, &Token::Blank);
    }
}
