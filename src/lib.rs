//! Schema-driven JSON codecs.
//!
//! Describe a data shape once as a [`Schema`] (records, tagged sums, scalar
//! leaves), then interpret it three ways:
//!
//! - [`documentation`] renders a human-readable outline,
//! - [`decode`] turns a wire value into a typed value, reporting failures with
//!   the path to the offending node,
//! - [`encode`] turns a typed value back into a wire value.
//!
//! ```
//! use json_shape::{Primitive, Schema, choice, decode, encode, field};
//! use serde_json::json;
//!
//! #[derive(Debug, PartialEq)]
//! struct Person { name: String, age: i64 }
//!
//! #[derive(Debug, PartialEq)]
//! enum Customer { Person(Person), Business { employees: i64 } }
//!
//! let person = Schema::record(
//!     (
//!         field("Name", Schema::leaf(Primitive::string()), |p: &Person| &p.name),
//!         field("Age", Schema::leaf(Primitive::integer()), |p: &Person| &p.age),
//!     ),
//!     |(name, age)| Person { name, age },
//! )?;
//! let business = Schema::record(
//!     (field("Employees", Schema::leaf(Primitive::integer()), |n: &i64| n),),
//!     |(employees,)| employees,
//! )?;
//! let customer = Schema::sum([
//!     choice("Person", person, Customer::Person, |c| match c {
//!         Customer::Person(p) => Some(p),
//!         _ => None,
//!     }),
//!     choice("Business", business, |employees| Customer::Business { employees }, |c| match c {
//!         Customer::Business { employees } => Some(employees),
//!         _ => None,
//!     }),
//! ])?;
//!
//! let sam = Customer::Person(Person { name: "Sam".into(), age: 40 });
//! let wire = encode(&customer, &sam);
//! assert_eq!(wire, json!({"tag": "Person", "contents": {"Name": "Sam", "Age": 40}}));
//! assert_eq!(decode(&customer, &wire)?, sam);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
pub mod decode;
pub mod doc;
pub mod encode;
pub mod path_de;
pub mod primitive;
pub mod schema;
pub mod shape;
pub mod wire;

pub use decode::{DecodeError, DecodeOptions, Reason, decode, decode_with};
pub use doc::{Document, documentation};
pub use encode::{EncodeError, encode, try_encode};
pub use primitive::{Primitive, PrimitiveKind, Rejection};
pub use schema::{Choice, Field, Fields, Schema, SchemaError, choice, field};
pub use shape::{Dyn, Shape};
pub use wire::{Kind, Path, Segment, WireValue};
