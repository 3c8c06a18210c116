//! Literal values, evaluated values and unevaluated operands.
//!
//! - [`Scalar`] is a leaf literal as it appears in a template document.
//! - [`Value`] is the result of evaluating an operand.
//! - [`Operand`] is an unevaluated expression slot: a literal, a collection of
//!   operands, or an [`Intrinsic`] function call.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_yaml::Value as Document;

use crate::{
    eval::{EvalError, Evaluator},
    intrinsic::{Intrinsic, Reference},
};

/// A leaf literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Converts a document leaf into a scalar, returning `None` for collections
    /// and tagged nodes.
    pub fn from_document(node: &Document) -> Option<Self> {
        match node {
            Document::Null => Some(Scalar::Null),
            Document::Bool(b) => Some(Scalar::Bool(*b)),
            Document::Number(n) => Some(match n.as_i64() {
                Some(i) => Scalar::Integer(i),
                None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            Document::String(s) => Some(Scalar::String(s.clone())),
            Document::Sequence(_) | Document::Mapping(_) | Document::Tagged(_) => None,
        }
    }

    /// The textual form used for string concatenation and equality.
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::String(s) => s.clone(),
        }
    }

    /// Returns the string slice if this is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_document(&self) -> Document {
        match self {
            Scalar::Null => Document::Null,
            Scalar::Bool(b) => Document::Bool(*b),
            Scalar::Integer(i) => Document::Number((*i).into()),
            Scalar::Float(f) => Document::Number((*f).into()),
            Scalar::String(s) => Document::String(s.clone()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// The result of evaluating an [`Operand`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Value::Scalar(Scalar::String(value.into()))
    }

    pub fn null() -> Self {
        Value::Scalar(Scalar::Null)
    }

    /// Converts an untagged document node into a value.
    ///
    /// Tagged nodes are not values; they yield `None`.
    pub fn from_document(node: &Document) -> Option<Self> {
        match node {
            Document::Sequence(items) => items
                .iter()
                .map(Value::from_document)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            Document::Mapping(mapping) => mapping
                .iter()
                .map(|(key, value)| {
                    let key = Scalar::from_document(key)?.to_text();
                    Some((key, Value::from_document(value)?))
                })
                .collect::<Option<IndexMap<_, _>>>()
                .map(Value::Map),
            Document::Tagged(_) => None,
            leaf => Scalar::from_document(leaf).map(Value::Scalar),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Interprets the value as a boolean.
    ///
    /// Accepts native booleans and the strings `"true"` / `"false"`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Scalar(Scalar::Bool(b)) => Some(*b),
            Value::Scalar(Scalar::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Textual form of a scalar value, `None` for collections.
    pub fn as_text(&self) -> Option<String> {
        self.as_scalar().map(Scalar::to_text)
    }

    /// Loose equality: scalars compare by textual form, lists element-wise.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => a.to_text() == b.to_text(),
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(key, x)| b.get(key).is_some_and(|y| x.loosely_equals(y)))
            }
            _ => false,
        }
    }

    /// Short human readable description of the value's shape.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Scalar(Scalar::Null) => "null",
            Value::Scalar(Scalar::Bool(_)) => "boolean",
            Value::Scalar(Scalar::Integer(_)) | Value::Scalar(Scalar::Float(_)) => "number",
            Value::Scalar(Scalar::String(_)) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn to_document(&self) -> Document {
        match self {
            Value::Scalar(scalar) => scalar.to_document(),
            Value::List(items) => {
                Document::Sequence(items.iter().map(Value::to_document).collect())
            }
            Value::Map(entries) => Document::Mapping(
                entries
                    .iter()
                    .map(|(key, value)| (Document::String(key.clone()), value.to_document()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(scalar) => write!(f, "{scalar}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

/// Identifies a placeholder operand awaiting the fixup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingId(pub usize);

impl fmt::Display for PendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Location of a child operand inside its parent.
///
/// Used as the write-back target of placeholders: an entry of an ordered
/// collection, a value under a key of a mapping, or a named field of an
/// intrinsic function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Index(usize),
    Key(String),
    Field(&'static str),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Index(index) => write!(f, "[{index}]"),
            Slot::Key(key) => write!(f, ".{key}"),
            Slot::Field(field) => write!(f, "::{field}"),
        }
    }
}

/// An unevaluated expression slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(Scalar),
    List(Vec<Operand>),
    Map(IndexMap<String, Operand>),
    Intrinsic(Box<Intrinsic>),
    /// Construction-time placeholder. A fully built template never contains one.
    Pending(PendingId),
}

impl Operand {
    pub fn string(value: impl Into<String>) -> Self {
        Operand::Scalar(Scalar::String(value.into()))
    }

    pub fn intrinsic(intrinsic: Intrinsic) -> Self {
        Operand::Intrinsic(Box::new(intrinsic))
    }

    /// Returns the literal string if this operand is a string scalar.
    pub fn as_literal_str(&self) -> Option<&str> {
        match self {
            Operand::Scalar(scalar) => scalar.as_str(),
            _ => None,
        }
    }

    pub fn as_intrinsic(&self) -> Option<&Intrinsic> {
        match self {
            Operand::Intrinsic(intrinsic) => Some(intrinsic),
            _ => None,
        }
    }

    /// Evaluates the operand against the evaluator's template and inputs.
    pub fn evaluate(&self, evaluator: &mut Evaluator<'_>) -> Result<Value, EvalError> {
        match self {
            Operand::Scalar(scalar) => Ok(Value::Scalar(scalar.clone())),
            Operand::List(items) => items
                .iter()
                .map(|item| item.evaluate(evaluator))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Operand::Map(entries) => entries
                .iter()
                .map(|(key, value)| Ok((key.clone(), value.evaluate(evaluator)?)))
                .collect::<Result<IndexMap<_, _>, EvalError>>()
                .map(Value::Map),
            Operand::Intrinsic(intrinsic) => intrinsic.evaluate(evaluator),
            Operand::Pending(id) => Err(EvalError::UnresolvedPlaceholder { id: id.0 }),
        }
    }

    /// Collects every reference made anywhere inside this operand.
    pub fn collect_references(&self, out: &mut IndexSet<Reference>) {
        match self {
            Operand::Scalar(_) | Operand::Pending(_) => {}
            Operand::List(items) => items.iter().for_each(|item| item.collect_references(out)),
            Operand::Map(entries) => entries
                .values()
                .for_each(|value| value.collect_references(out)),
            Operand::Intrinsic(intrinsic) => intrinsic.collect_references(out),
        }
    }

    /// Returns the set of references made by this operand.
    pub fn referenced_objects(&self) -> IndexSet<Reference> {
        let mut out = IndexSet::new();
        self.collect_references(&mut out);
        out
    }

    /// Mutable access to the direct children of this operand, with their
    /// location inside it.
    pub fn children_mut(&mut self) -> Vec<(Slot, &mut Operand)> {
        match self {
            Operand::Scalar(_) | Operand::Pending(_) => Vec::new(),
            Operand::List(items) => items
                .iter_mut()
                .enumerate()
                .map(|(i, item)| (Slot::Index(i), item))
                .collect(),
            Operand::Map(entries) => entries
                .iter_mut()
                .map(|(key, value)| (Slot::Key(key.clone()), value))
                .collect(),
            Operand::Intrinsic(intrinsic) => intrinsic.children_mut(),
        }
    }

    /// Returns `true` if any placeholder remains in this operand tree.
    pub fn has_pending(&self) -> bool {
        match self {
            Operand::Pending(_) => true,
            Operand::Scalar(_) => false,
            Operand::List(items) => items.iter().any(Operand::has_pending),
            Operand::Map(entries) => entries.values().any(Operand::has_pending),
            Operand::Intrinsic(intrinsic) => intrinsic.has_pending(),
        }
    }

    /// Converts the operand back into a long-form document node.
    pub fn to_document(&self) -> Document {
        match self {
            Operand::Scalar(scalar) => scalar.to_document(),
            Operand::List(items) => {
                Document::Sequence(items.iter().map(Operand::to_document).collect())
            }
            Operand::Map(entries) => Document::Mapping(
                entries
                    .iter()
                    .map(|(key, value)| (Document::String(key.clone()), value.to_document()))
                    .collect(),
            ),
            Operand::Intrinsic(intrinsic) => intrinsic.to_document(),
            Operand::Pending(id) => Document::String(format!("<pending {id}>")),
        }
    }
}

impl From<Scalar> for Operand {
    fn from(scalar: Scalar) -> Self {
        Operand::Scalar(scalar)
    }
}

impl From<Intrinsic> for Operand {
    fn from(intrinsic: Intrinsic) -> Self {
        Operand::intrinsic(intrinsic)
    }
}
