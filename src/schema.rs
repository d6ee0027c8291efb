//! The shape description shared by every interpreter.
//!
//! A [`Schema<A>`] is built once, bottom-up, and then read by
//! [`documentation`](crate::doc::documentation), [`decode`](crate::decode::decode)
//! and [`encode`](crate::encode::encode). Records pair a list of typed
//! [`Field`]s with one assembling closure; sums are a list of [`Choice`]s, each
//! knowing how to inject its payload into `A` and how to recognise it again.
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde_json::{Map, Value};

use crate::decode::{DecodeError, Scope, decode_node};
use crate::doc::{Document, documentation};
use crate::encode::{EncodeError, encode_node};
use crate::primitive::Primitive;
use crate::wire::Segment;

/// Wire key holding a sum's discriminant.
pub const TAG_KEY: &str = "tag";
/// Wire key holding a sum's payload.
pub const CONTENTS_KEY: &str = "contents";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub struct Schema<A> {
    pub(crate) node: Node<A>,
}

pub(crate) enum Node<A> {
    Record(Arc<dyn RecordShape<A>>),
    Sum(Arc<Sum<A>>),
    Leaf(Primitive<A>),
    List(Arc<dyn Sequence<A>>),
    Mapped(Arc<dyn Conversion<A>>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("record field names must be non-empty")]
    EmptyName,
    #[error("duplicate record field `{0}`")]
    DuplicateField(String),
    #[error("sum tags must be non-empty")]
    EmptyTag,
    #[error("duplicate sum tag `{0}`")]
    DuplicateTag(String),
    #[error("a sum needs at least one alternative")]
    NoAlternatives,
}

/// One named slot of a record: where to find `X` on the wire and inside `A`.
pub struct Field<A, X> {
    pub(crate) name: String,
    pub(crate) schema: Schema<X>,
    pub(crate) get: Box<dyn Fn(&A) -> &X + Send + Sync>,
}

/// One tagged alternative of a sum, with its payload type hidden.
pub struct Choice<A> {
    alt: Box<dyn Alternative<A>>,
}

pub(crate) struct Sum<A> {
    alternatives: IndexMap<String, Box<dyn Alternative<A>>>,
}

/// An ordered, heterogeneous list of fields: tuples of up to twelve
/// [`Field`]s, or a `Vec` of fields sharing one value type.
///
/// `Values` is what the record's assembling closure receives.
pub trait Fields<A>: Send + Sync + 'static {
    type Values;

    #[doc(hidden)]
    fn names(&self) -> Vec<&str>;
    #[doc(hidden)]
    fn describe(&self) -> Vec<Document>;
    #[doc(hidden)]
    fn decode(&self, object: &Map<String, Value>, scope: Scope<'_>) -> Result<Self::Values, DecodeError>;
    #[doc(hidden)]
    fn encode(&self, value: &A, out: &mut Map<String, Value>) -> Result<(), EncodeError>;
}

pub(crate) trait RecordShape<A>: Send + Sync {
    fn names(&self) -> Vec<&str>;
    fn describe(&self) -> Vec<Document>;
    fn decode(&self, object: &Map<String, Value>, scope: Scope<'_>) -> Result<A, DecodeError>;
    fn encode(&self, value: &A, out: &mut Map<String, Value>) -> Result<(), EncodeError>;
}

pub(crate) trait Alternative<A>: Send + Sync {
    fn tag(&self) -> &str;
    fn describe(&self) -> Document;
    fn decode(&self, contents: &Value, scope: Scope<'_>) -> Result<A, DecodeError>;
    /// `None` when `value` belongs to another alternative.
    fn encode(&self, value: &A) -> Option<Result<Value, EncodeError>>;
    fn matches(&self, value: &A) -> bool;
}

pub(crate) trait Sequence<A>: Send + Sync {
    fn describe_item(&self) -> Document;
    fn decode(&self, items: &[Value], scope: Scope<'_>) -> Result<A, DecodeError>;
    fn encode(&self, value: &A) -> Result<Value, EncodeError>;
}

pub(crate) trait Conversion<A>: Send + Sync {
    fn describe(&self, name: &str) -> Document;
    fn decode(&self, value: &Value, scope: Scope<'_>) -> Result<A, DecodeError>;
    fn encode(&self, value: &A) -> Result<Value, EncodeError>;
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

impl<A: 'static> Schema<A> {
    pub fn leaf(primitive: Primitive<A>) -> Self {
        Self { node: Node::Leaf(primitive) }
    }

    /// A record decoded by feeding every field's value to `assemble` and
    /// encoded through each field's projection.
    pub fn record<F, B>(fields: F, assemble: B) -> Result<Self, SchemaError>
    where
        F: Fields<A>,
        B: Fn(F::Values) -> A + Send + Sync + 'static,
    {
        check_field_names(&fields.names())?;
        Ok(Self { node: Node::Record(Arc::new(Assembled { fields, assemble })) })
    }

    /// A tagged union. Exactly one choice must recognise any given `A`.
    pub fn sum<I>(choices: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = Choice<A>>,
    {
        let mut alternatives = IndexMap::new();
        for choice in choices {
            let tag = choice.alt.tag().to_string();
            if tag.is_empty() {
                return Err(SchemaError::EmptyTag);
            }
            match alternatives.entry(tag) {
                Entry::Occupied(entry) => return Err(SchemaError::DuplicateTag(entry.key().clone())),
                Entry::Vacant(entry) => {
                    entry.insert(choice.alt);
                }
            }
        }
        if alternatives.is_empty() {
            return Err(SchemaError::NoAlternatives);
        }
        Ok(Self { node: Node::Sum(Arc::new(Sum { alternatives })) })
    }

    /// Present this schema as a schema of `B`: decoded values pass through
    /// `into`, and `from` recovers the inner value for encoding.
    pub fn map<B, F, G>(self, into: F, from: G) -> Schema<B>
    where
        B: 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
        G: Fn(&B) -> &A + Send + Sync + 'static,
    {
        Schema {
            node: Node::Mapped(Arc::new(Converted {
                inner: self,
                into: Box::new(into),
                from: Box::new(from),
            })),
        }
    }
}

impl<X: 'static> Schema<Vec<X>> {
    pub fn list(item: Schema<X>) -> Self {
        Self { node: Node::List(Arc::new(ListOf { item })) }
    }
}

pub fn field<A, X, G>(name: impl Into<String>, schema: Schema<X>, get: G) -> Field<A, X>
where
    G: Fn(&A) -> &X + Send + Sync + 'static,
{
    Field { name: name.into(), schema, get: Box::new(get) }
}

/// `inject` lifts a decoded payload into `A`; `extract` returns the payload
/// when `A` is this alternative.
pub fn choice<A, X, I, E>(tag: impl Into<String>, schema: Schema<X>, inject: I, extract: E) -> Choice<A>
where
    A: 'static,
    X: 'static,
    I: Fn(X) -> A + Send + Sync + 'static,
    E: Fn(&A) -> Option<&X> + Send + Sync + 'static,
{
    Choice {
        alt: Box::new(Alt {
            tag: tag.into(),
            schema,
            inject: Box::new(inject),
            extract: Box::new(extract),
        }),
    }
}

impl<A, X> Field<A, X> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<A> Choice<A> {
    pub fn tag(&self) -> &str {
        self.alt.tag()
    }
}

impl<A> Sum<A> {
    pub(crate) fn alternatives(&self) -> impl Iterator<Item = &dyn Alternative<A>> {
        self.alternatives.values().map(unboxed)
    }
    pub(crate) fn get(&self, tag: &str) -> Option<&dyn Alternative<A>> {
        self.alternatives.get(tag).map(unboxed)
    }
    pub(crate) fn sorted_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.alternatives.keys().cloned().collect();
        tags.sort();
        tags
    }
}

#[allow(clippy::borrowed_box)]
fn unboxed<A>(alt: &Box<dyn Alternative<A>>) -> &dyn Alternative<A> {
    alt.as_ref()
}

impl<A> Clone for Schema<A> {
    fn clone(&self) -> Self {
        let node = match &self.node {
            Node::Record(record) => Node::Record(Arc::clone(record)),
            Node::Sum(sum) => Node::Sum(Arc::clone(sum)),
            Node::Leaf(primitive) => Node::Leaf(primitive.clone()),
            Node::List(list) => Node::List(Arc::clone(list)),
            Node::Mapped(mapped) => Node::Mapped(Arc::clone(mapped)),
        };
        Self { node }
    }
}

impl<A> fmt::Debug for Schema<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Node::Record(record) => f.debug_tuple("Record").field(&record.names()).finish(),
            Node::Sum(sum) => f.debug_tuple("Sum").field(&sum.alternatives.keys().collect::<Vec<_>>()).finish(),
            Node::Leaf(primitive) => f.debug_tuple("Leaf").field(&primitive.kind()).finish(),
            Node::List(_) => f.write_str("List"),
            Node::Mapped(_) => f.write_str("Mapped"),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RECORDS
// ————————————————————————————————————————————————————————————————————————————

struct Assembled<F, B> {
    fields: F,
    assemble: B,
}

impl<A, F, B> RecordShape<A> for Assembled<F, B>
where
    F: Fields<A>,
    B: Fn(F::Values) -> A + Send + Sync,
{
    fn names(&self) -> Vec<&str> {
        self.fields.names()
    }
    fn describe(&self) -> Vec<Document> {
        self.fields.describe()
    }
    fn decode(&self, object: &Map<String, Value>, scope: Scope<'_>) -> Result<A, DecodeError> {
        let values = self.fields.decode(object, scope)?;
        Ok((self.assemble)(values))
    }
    fn encode(&self, value: &A, out: &mut Map<String, Value>) -> Result<(), EncodeError> {
        self.fields.encode(value, out)
    }
}

fn check_field_names(names: &[&str]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if !seen.insert(*name) {
            return Err(SchemaError::DuplicateField(name.to_string()));
        }
    }
    Ok(())
}

// Tuple elements are visited left to right, so the first failing field in
// declaration order is the one reported.
macro_rules! impl_fields_for_tuple {
    ($($idx:tt => $X:ident),+) => {
        impl<A: 'static, $($X: 'static),+> Fields<A> for ($(Field<A, $X>,)+) {
            type Values = ($($X,)+);

            fn names(&self) -> Vec<&str> {
                vec![$(self.$idx.name()),+]
            }
            fn describe(&self) -> Vec<Document> {
                vec![$(self.$idx.describe()),+]
            }
            fn decode(&self, object: &Map<String, Value>, scope: Scope<'_>) -> Result<Self::Values, DecodeError> {
                Ok(($(self.$idx.decode_step(object, scope)?,)+))
            }
            fn encode(&self, value: &A, out: &mut Map<String, Value>) -> Result<(), EncodeError> {
                $(self.$idx.encode_step(value, out)?;)+
                Ok(())
            }
        }
    };
}

impl_fields_for_tuple!(0 => X0);
impl_fields_for_tuple!(0 => X0, 1 => X1);
impl_fields_for_tuple!(0 => X0, 1 => X1, 2 => X2);
impl_fields_for_tuple!(0 => X0, 1 => X1, 2 => X2, 3 => X3);
impl_fields_for_tuple!(0 => X0, 1 => X1, 2 => X2, 3 => X3, 4 => X4);
impl_fields_for_tuple!(0 => X0, 1 => X1, 2 => X2, 3 => X3, 4 => X4, 5 => X5);
impl_fields_for_tuple!(0 => X0, 1 => X1, 2 => X2, 3 => X3, 4 => X4, 5 => X5, 6 => X6);
impl_fields_for_tuple!(0 => X0, 1 => X1, 2 => X2, 3 => X3, 4 => X4, 5 => X5, 6 => X6, 7 => X7);
impl_fields_for_tuple!(0 => X0, 1 => X1, 2 => X2, 3 => X3, 4 => X4, 5 => X5, 6 => X6, 7 => X7, 8 => X8);
impl_fields_for_tuple!(0 => X0, 1 => X1, 2 => X2, 3 => X3, 4 => X4, 5 => X5, 6 => X6, 7 => X7, 8 => X8, 9 => X9);
impl_fields_for_tuple!(0 => X0, 1 => X1, 2 => X2, 3 => X3, 4 => X4, 5 => X5, 6 => X6, 7 => X7, 8 => X8, 9 => X9, 10 => X10);
impl_fields_for_tuple!(0 => X0, 1 => X1, 2 => X2, 3 => X3, 4 => X4, 5 => X5, 6 => X6, 7 => X7, 8 => X8, 9 => X9, 10 => X10, 11 => X11);

/// Records whose field list is only known at runtime.
impl<A: 'static, X: 'static> Fields<A> for Vec<Field<A, X>> {
    type Values = Vec<X>;

    fn names(&self) -> Vec<&str> {
        self.iter().map(Field::name).collect()
    }
    fn describe(&self) -> Vec<Document> {
        self.iter().map(Field::describe).collect()
    }
    fn decode(&self, object: &Map<String, Value>, scope: Scope<'_>) -> Result<Self::Values, DecodeError> {
        self.iter().map(|field| field.decode_step(object, scope)).collect()
    }
    fn encode(&self, value: &A, out: &mut Map<String, Value>) -> Result<(), EncodeError> {
        self.iter().try_for_each(|field| field.encode_step(value, out))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SUMS, LISTS, CONVERSIONS
// ————————————————————————————————————————————————————————————————————————————

struct Alt<A, X> {
    tag: String,
    schema: Schema<X>,
    inject: Box<dyn Fn(X) -> A + Send + Sync>,
    extract: Box<dyn Fn(&A) -> Option<&X> + Send + Sync>,
}

impl<A, X> Alternative<A> for Alt<A, X> {
    fn tag(&self) -> &str {
        &self.tag
    }
    fn describe(&self) -> Document {
        documentation(&self.tag, &self.schema)
    }
    fn decode(&self, contents: &Value, scope: Scope<'_>) -> Result<A, DecodeError> {
        decode_node(&self.schema, contents, scope).map(|x| (self.inject)(x))
    }
    fn encode(&self, value: &A) -> Option<Result<Value, EncodeError>> {
        (self.extract)(value).map(|payload| encode_node(&self.schema, payload))
    }
    fn matches(&self, value: &A) -> bool {
        (self.extract)(value).is_some()
    }
}

struct ListOf<X> {
    item: Schema<X>,
}

impl<X> Sequence<Vec<X>> for ListOf<X> {
    fn describe_item(&self) -> Document {
        documentation("item", &self.item)
    }
    fn decode(&self, items: &[Value], scope: Scope<'_>) -> Result<Vec<X>, DecodeError> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| decode_node(&self.item, item, scope).map_err(|error| error.within(Segment::Index(index))))
            .collect()
    }
    fn encode(&self, value: &Vec<X>) -> Result<Value, EncodeError> {
        value
            .iter()
            .enumerate()
            .map(|(index, item)| encode_node(&self.item, item).map_err(|error| error.within(Segment::Index(index))))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

struct Converted<X, A> {
    inner: Schema<X>,
    into: Box<dyn Fn(X) -> A + Send + Sync>,
    from: Box<dyn Fn(&A) -> &X + Send + Sync>,
}

impl<X, A> Conversion<A> for Converted<X, A> {
    fn describe(&self, name: &str) -> Document {
        documentation(name, &self.inner)
    }
    fn decode(&self, value: &Value, scope: Scope<'_>) -> Result<A, DecodeError> {
        decode_node(&self.inner, value, scope).map(|x| (self.into)(x))
    }
    fn encode(&self, value: &A) -> Result<Value, EncodeError> {
        encode_node(&self.inner, (self.from)(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Shape {
        Circle(f64),
        Square(f64),
    }

    fn radius() -> Schema<f64> {
        Schema::leaf(Primitive::float())
    }

    fn circle() -> Choice<Shape> {
        choice("Circle", radius(), Shape::Circle, |s| match s {
            Shape::Circle(r) => Some(r),
            _ => None,
        })
    }

    #[test]
    fn duplicate_tags_fail_at_build_time() {
        let error = Schema::sum([circle(), circle()]).unwrap_err();
        assert_eq!(error, SchemaError::DuplicateTag("Circle".into()));
    }

    #[test]
    fn empty_sum_is_rejected() {
        let error = Schema::<Shape>::sum(Vec::new()).unwrap_err();
        assert_eq!(error, SchemaError::NoAlternatives);
    }

    #[test]
    fn empty_tag_is_rejected() {
        let blank = choice("", radius(), Shape::Square, |s| match s {
            Shape::Square(side) => Some(side),
            _ => None,
        });
        assert_eq!(Schema::sum([blank]).unwrap_err(), SchemaError::EmptyTag);
    }

    #[test]
    fn duplicate_field_names_fail_at_build_time() {
        let error = Schema::record(
            (
                field("x", radius(), |p: &(f64, f64)| &p.0),
                field("x", radius(), |p: &(f64, f64)| &p.1),
            ),
            |(a, b)| (a, b),
        )
        .unwrap_err();
        assert_eq!(error, SchemaError::DuplicateField("x".into()));
    }

    #[test]
    fn empty_field_name_is_rejected() {
        let error = Schema::record((field("", radius(), |r: &f64| r),), |(r,)| r).unwrap_err();
        assert_eq!(error, SchemaError::EmptyName);
    }

    #[test]
    fn debug_lists_structure() {
        let square = choice("Square", radius(), Shape::Square, |s| match s {
            Shape::Square(side) => Some(side),
            _ => None,
        });
        let schema = Schema::sum([circle(), square]).unwrap();
        assert_eq!(format!("{schema:?}"), r#"Sum(["Circle", "Square"])"#);
        assert_eq!(format!("{:?}", radius()), "Leaf(Number)");
    }

    #[test]
    fn schemas_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema<Shape>>();
        assert_send_sync::<Schema<Vec<String>>>();
    }
}
