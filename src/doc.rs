//! Documentation interpreter.
//!
//! Walks a [`Schema`] and produces an abstract [`Document`]: heading lines plus
//! nested bulleted items. Layout into text is a separate, deliberately dumb
//! step ([`Document::render`]).
use std::fmt;

use serde::Serialize;

use crate::schema::{Field, Node, Schema};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Document {
    /// A single line, e.g. `Age: number`.
    Line { text: String },
    /// Heading lines followed by an indented bulleted list.
    Section { heading: Vec<String>, items: Vec<Document> },
}

pub const DEFAULT_INDENT: usize = 2;

// ————————————————————————————————————————————————————————————————————————————
// INTERPRETER
// ————————————————————————————————————————————————————————————————————————————

pub fn documentation<A>(name: &str, schema: &Schema<A>) -> Document {
    match &schema.node {
        Node::Record(record) => Document::Section {
            heading: vec![name.to_string()],
            items: record.describe(),
        },
        Node::Sum(sum) => Document::Section {
            heading: vec![format!("({name})"), "Choice of:".to_string()],
            items: sum.alternatives().map(|alt| alt.describe()).collect(),
        },
        Node::Leaf(primitive) => Document::Line {
            text: format!("{name}: {}", primitive.kind().name()),
        },
        Node::List(list) => Document::Section {
            heading: vec![format!("[{name}]"), "Each item:".to_string()],
            items: vec![list.describe_item()],
        },
        Node::Mapped(mapped) => mapped.describe(name),
    }
}

impl<A, X> Field<A, X> {
    pub(crate) fn describe(&self) -> Document {
        documentation(&self.name, &self.schema)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LAYOUT
// ————————————————————————————————————————————————————————————————————————————

impl Document {
    pub fn render(&self) -> String {
        self.render_with(DEFAULT_INDENT)
    }

    pub fn render_with(&self, indent: usize) -> String {
        let mut lines = Vec::new();
        self.layout(0, false, indent, &mut lines);
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Bulleted entries put `- ` before their first line and align any other
    /// heading lines with the text after the bullet; children go one level
    /// deeper than the entry itself.
    fn layout(&self, level: usize, bulleted: bool, indent: usize, out: &mut Vec<String>) {
        let pad = " ".repeat(level * indent);
        let (first, rest) = if bulleted { ("- ", "  ") } else { ("", "") };
        match self {
            Document::Line { text } => out.push(format!("{pad}{first}{text}")),
            Document::Section { heading, items } => {
                for (i, line) in heading.iter().enumerate() {
                    let lead = if i == 0 { first } else { rest };
                    out.push(format!("{pad}{lead}{line}"));
                }
                for item in items {
                    item.layout(level + 1, true, indent, out);
                }
            }
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Primitive;
    use crate::schema::{Schema, field};

    struct Point {
        x: i64,
        label: String,
    }

    fn point() -> Schema<Point> {
        Schema::record(
            (
                field("x", Schema::leaf(Primitive::integer()), |p: &Point| &p.x),
                field("label", Schema::leaf(Primitive::string()), |p: &Point| &p.label),
            ),
            |(x, label)| Point { x, label },
        )
        .unwrap()
    }

    #[test]
    fn leaf_is_a_single_line() {
        let doc = documentation("Flag", &Schema::leaf(Primitive::boolean()));
        assert_eq!(doc, Document::Line { text: "Flag: bool".into() });
    }

    #[test]
    fn record_lists_fields_in_order() {
        let doc = documentation("Point", &point());
        assert_eq!(doc.render(), "Point\n  - x: number\n  - label: string\n");
    }

    #[test]
    fn list_names_its_item() {
        let doc = documentation("Points", &Schema::list(point()));
        assert_eq!(
            doc.render(),
            "[Points]\nEach item:\n  - item\n    - x: number\n    - label: string\n"
        );
    }

    #[test]
    fn render_with_custom_indent() {
        let doc = documentation("Point", &point());
        assert_eq!(doc.render_with(4), "Point\n    - x: number\n    - label: string\n");
    }

    #[test]
    fn serializes_as_tagged_tree() {
        let doc = documentation("Flag", &Schema::leaf(Primitive::boolean()));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json, serde_json::json!({"type": "line", "text": "Flag: bool"}));
    }
}
