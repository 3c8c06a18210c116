//! The intrinsic function catalog.
//!
//! Intrinsic functions are the expression language embedded in templates. The
//! set is closed: [`Tag`] enumerates every function together with its short
//! (`Join`) and long (`Fn::Join`) spelling, and [`Intrinsic`] holds the typed
//! operands of one call.
//!
//! Every intrinsic supports two operations:
//! - [`Intrinsic::evaluate`] produces a [`Value`] using an [`Evaluator`].
//! - [`Intrinsic::referenced_objects`] lists the logical names it touches,
//!   which drives dependency graph construction.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use indexmap::{IndexMap, IndexSet};
use log::trace;
use serde_yaml::{Mapping, Value as Document};

use crate::{
    cidr,
    eval::{EvalError, Evaluator},
    identifier::Id,
    sub::{self, SubSegment},
    value::{Operand, Scalar, Slot, Value},
};

/// Attribute label used when a `GetAtt` attribute is computed at evaluation time.
pub const DYNAMIC_ATTRIBUTE: &str = "*";

/// Broad category of an intrinsic function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// Produces a boolean (`And`, `Or`, `Not`, `Equals`).
    Boolean,
    /// Names another entity (`Ref`, `Condition`, `GetAtt`, `ImportValue`).
    Reference,
    /// Computes a value from its operands.
    Derived,
}

/// Identity of an intrinsic function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    And,
    Or,
    Not,
    Equals,
    Ref,
    Condition,
    GetAtt,
    ImportValue,
    FindInMap,
    GetAZs,
    Cidr,
    Select,
    Split,
    Join,
    Sub,
    Base64,
    If,
}

impl Tag {
    const ALL: [Tag; 17] = [
        Tag::And,
        Tag::Or,
        Tag::Not,
        Tag::Equals,
        Tag::Ref,
        Tag::Condition,
        Tag::GetAtt,
        Tag::ImportValue,
        Tag::FindInMap,
        Tag::GetAZs,
        Tag::Cidr,
        Tag::Select,
        Tag::Split,
        Tag::Join,
        Tag::Sub,
        Tag::Base64,
        Tag::If,
    ];

    /// Every intrinsic function tag.
    pub fn all() -> &'static [Tag] {
        &Self::ALL
    }

    /// The short spelling, as used in YAML local tags (`!Join`).
    pub fn short_name(&self) -> &'static str {
        match self {
            Tag::And => "And",
            Tag::Or => "Or",
            Tag::Not => "Not",
            Tag::Equals => "Equals",
            Tag::Ref => "Ref",
            Tag::Condition => "Condition",
            Tag::GetAtt => "GetAtt",
            Tag::ImportValue => "ImportValue",
            Tag::FindInMap => "FindInMap",
            Tag::GetAZs => "GetAZs",
            Tag::Cidr => "Cidr",
            Tag::Select => "Select",
            Tag::Split => "Split",
            Tag::Join => "Join",
            Tag::Sub => "Sub",
            Tag::Base64 => "Base64",
            Tag::If => "If",
        }
    }

    /// The long spelling, as used for mapping keys (`Fn::Join`).
    ///
    /// `Ref` and `Condition` conventionally carry no `Fn::` prefix.
    pub fn long_name(&self) -> &'static str {
        match self {
            Tag::Ref => "Ref",
            Tag::Condition => "Condition",
            Tag::And => "Fn::And",
            Tag::Or => "Fn::Or",
            Tag::Not => "Fn::Not",
            Tag::Equals => "Fn::Equals",
            Tag::GetAtt => "Fn::GetAtt",
            Tag::ImportValue => "Fn::ImportValue",
            Tag::FindInMap => "Fn::FindInMap",
            Tag::GetAZs => "Fn::GetAZs",
            Tag::Cidr => "Fn::Cidr",
            Tag::Select => "Fn::Select",
            Tag::Split => "Fn::Split",
            Tag::Join => "Fn::Join",
            Tag::Sub => "Fn::Sub",
            Tag::Base64 => "Fn::Base64",
            Tag::If => "Fn::If",
        }
    }

    /// Looks up a tag by any accepted spelling: `Join`, `Fn::Join`, `!Join`
    /// or `!Fn::Join`.
    pub fn from_name(name: &str) -> Option<Tag> {
        let name = name.strip_prefix('!').unwrap_or(name);
        let name = name.strip_prefix("Fn::").unwrap_or(name);
        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.short_name() == name)
    }

    /// Returns `true` if `key` is a mapping key that denotes an intrinsic call.
    pub fn is_intrinsic_key(key: &str) -> bool {
        key.starts_with("Fn::") || key == "Ref" || key == "Condition"
    }

    pub fn kind(&self) -> TagKind {
        match self {
            Tag::And | Tag::Or | Tag::Not | Tag::Equals => TagKind::Boolean,
            Tag::Ref | Tag::Condition | Tag::GetAtt | Tag::ImportValue => TagKind::Reference,
            _ => TagKind::Derived,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long_name())
    }
}

/// How an expression refers to another entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `Ref` (also `${Name}` in `Fn::Sub`).
    Ref,
    /// `Fn::GetAtt` with the attribute name.
    GetAtt(Id),
    /// The `Condition` intrinsic or the condition name of `Fn::If`.
    Condition,
}

/// A logical name touched by an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    pub name: Id,
    pub kind: ReferenceKind,
}

impl Reference {
    pub fn to_ref(name: Id) -> Self {
        Self {
            name,
            kind: ReferenceKind::Ref,
        }
    }

    pub fn to_attribute(name: Id, attribute: Id) -> Self {
        Self {
            name,
            kind: ReferenceKind::GetAtt(attribute),
        }
    }

    pub fn to_condition(name: Id) -> Self {
        Self {
            name,
            kind: ReferenceKind::Condition,
        }
    }
}

/// A typed intrinsic function call.
#[derive(Debug, Clone, PartialEq)]
pub enum Intrinsic {
    And(Vec<Operand>),
    Or(Vec<Operand>),
    Not(Operand),
    Equals(Operand, Operand),
    Ref(Id),
    Condition(Id),
    GetAtt {
        resource: Id,
        attribute: Operand,
    },
    ImportValue(Operand),
    FindInMap {
        map: Operand,
        top_key: Operand,
        second_key: Operand,
    },
    GetAZs(Operand),
    Cidr {
        block: Operand,
        count: Operand,
        bits: Operand,
    },
    Select {
        index: Operand,
        list: Operand,
    },
    Split {
        delimiter: Operand,
        source: Operand,
    },
    Join {
        delimiter: Operand,
        values: Operand,
    },
    Sub {
        template: String,
        variables: IndexMap<String, Operand>,
    },
    Base64(Operand),
    If {
        condition: Id,
        when_true: Operand,
        when_false: Operand,
    },
}

impl Intrinsic {
    pub fn tag(&self) -> Tag {
        match self {
            Intrinsic::And(_) => Tag::And,
            Intrinsic::Or(_) => Tag::Or,
            Intrinsic::Not(_) => Tag::Not,
            Intrinsic::Equals(..) => Tag::Equals,
            Intrinsic::Ref(_) => Tag::Ref,
            Intrinsic::Condition(_) => Tag::Condition,
            Intrinsic::GetAtt { .. } => Tag::GetAtt,
            Intrinsic::ImportValue(_) => Tag::ImportValue,
            Intrinsic::FindInMap { .. } => Tag::FindInMap,
            Intrinsic::GetAZs(_) => Tag::GetAZs,
            Intrinsic::Cidr { .. } => Tag::Cidr,
            Intrinsic::Select { .. } => Tag::Select,
            Intrinsic::Split { .. } => Tag::Split,
            Intrinsic::Join { .. } => Tag::Join,
            Intrinsic::Sub { .. } => Tag::Sub,
            Intrinsic::Base64(_) => Tag::Base64,
            Intrinsic::If { .. } => Tag::If,
        }
    }

    /// Evaluates the function call.
    ///
    /// Operands are evaluated lazily: `Fn::If` only evaluates the selected
    /// branch and `Fn::And` / `Fn::Or` short-circuit.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] when a referenced value is unavailable or an
    /// operand has the wrong shape.
    pub fn evaluate(&self, evaluator: &mut Evaluator<'_>) -> Result<Value, EvalError> {
        trace!(function = self.tag().long_name(); "Evaluating intrinsic");
        let tag = self.tag();
        match self {
            Intrinsic::And(operands) => {
                for operand in operands {
                    if !evaluate_bool(operand, evaluator, tag)? {
                        return Ok(Value::Scalar(Scalar::Bool(false)));
                    }
                }
                Ok(Value::Scalar(Scalar::Bool(true)))
            }
            Intrinsic::Or(operands) => {
                for operand in operands {
                    if evaluate_bool(operand, evaluator, tag)? {
                        return Ok(Value::Scalar(Scalar::Bool(true)));
                    }
                }
                Ok(Value::Scalar(Scalar::Bool(false)))
            }
            Intrinsic::Not(operand) => Ok(Value::Scalar(Scalar::Bool(!evaluate_bool(
                operand, evaluator, tag,
            )?))),
            Intrinsic::Equals(left, right) => {
                let left = left.evaluate(evaluator)?;
                let right = right.evaluate(evaluator)?;
                Ok(Value::Scalar(Scalar::Bool(left.loosely_equals(&right))))
            }
            Intrinsic::Ref(name) => evaluator.resolve_ref(*name),
            Intrinsic::Condition(name) => {
                Ok(Value::Scalar(Scalar::Bool(evaluator.condition(*name)?)))
            }
            Intrinsic::GetAtt {
                resource,
                attribute,
            } => {
                let attribute = evaluate_text(attribute, evaluator, tag)?;
                evaluator.attribute(*resource, &attribute)
            }
            Intrinsic::ImportValue(name) => {
                let name = evaluate_text(name, evaluator, tag)?;
                Ok(evaluator.import(&name))
            }
            Intrinsic::FindInMap {
                map,
                top_key,
                second_key,
            } => {
                let map = evaluate_text(map, evaluator, tag)?;
                let top_key = evaluate_text(top_key, evaluator, tag)?;
                let second_key = evaluate_text(second_key, evaluator, tag)?;
                evaluator.find_in_map(&map, &top_key, &second_key)
            }
            Intrinsic::GetAZs(region) => {
                let region = evaluate_text(region, evaluator, tag)?;
                Ok(evaluator.availability_zones(&region))
            }
            Intrinsic::Cidr { block, count, bits } => {
                let block = evaluate_text(block, evaluator, tag)?;
                let count = evaluate_integer(count, evaluator, tag)?;
                let bits = evaluate_integer(bits, evaluator, tag)?;
                let subnets = cidr::subnets(&block, count, bits)?;
                Ok(Value::List(subnets.into_iter().map(Value::string).collect()))
            }
            Intrinsic::Select { index, list } => {
                let index = evaluate_integer(index, evaluator, tag)?;
                let list = list.evaluate(evaluator)?;
                let Value::List(items) = list else {
                    return Err(EvalError::TypeMismatch {
                        function: tag,
                        expected: "list",
                        found: list.kind_name(),
                    });
                };
                let len = items.len();
                usize::try_from(index)
                    .ok()
                    .and_then(|index| items.into_iter().nth(index))
                    .ok_or(EvalError::IndexOutOfRange { index, len })
            }
            Intrinsic::Split { delimiter, source } => {
                let delimiter = evaluate_text(delimiter, evaluator, tag)?;
                let source = evaluate_text(source, evaluator, tag)?;
                if delimiter.is_empty() {
                    return Ok(Value::List(vec![Value::string(source)]));
                }
                Ok(Value::List(
                    source.split(delimiter.as_str()).map(Value::string).collect(),
                ))
            }
            Intrinsic::Join { delimiter, values } => {
                let delimiter = evaluate_text(delimiter, evaluator, tag)?;
                let values = values.evaluate(evaluator)?;
                let Value::List(items) = values else {
                    return Err(EvalError::TypeMismatch {
                        function: tag,
                        expected: "list",
                        found: values.kind_name(),
                    });
                };
                let parts = items
                    .iter()
                    .map(|item| {
                        item.as_text().ok_or(EvalError::NonScalarJoin {
                            found: item.kind_name(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::string(parts.join(&delimiter)))
            }
            Intrinsic::Sub {
                template,
                variables,
            } => evaluate_sub(template, variables, evaluator),
            Intrinsic::Base64(value) => {
                let value = evaluate_text(value, evaluator, tag)?;
                Ok(Value::string(STANDARD.encode(value.as_bytes())))
            }
            Intrinsic::If {
                condition,
                when_true,
                when_false,
            } => {
                if evaluator.condition(*condition)? {
                    when_true.evaluate(evaluator)
                } else {
                    when_false.evaluate(evaluator)
                }
            }
        }
    }

    /// Returns every logical name this call touches, recursing into nested
    /// intrinsics.
    pub fn referenced_objects(&self) -> IndexSet<Reference> {
        let mut out = IndexSet::new();
        self.collect_references(&mut out);
        out
    }

    pub(crate) fn collect_references(&self, out: &mut IndexSet<Reference>) {
        match self {
            Intrinsic::Ref(name) => {
                out.insert(Reference::to_ref(*name));
            }
            Intrinsic::Condition(name) => {
                out.insert(Reference::to_condition(*name));
            }
            Intrinsic::GetAtt {
                resource,
                attribute,
            } => {
                let label = attribute.as_literal_str().unwrap_or(DYNAMIC_ATTRIBUTE);
                out.insert(Reference::to_attribute(*resource, Id::new(label)));
                attribute.collect_references(out);
            }
            Intrinsic::If {
                condition,
                when_true,
                when_false,
            } => {
                out.insert(Reference::to_condition(*condition));
                when_true.collect_references(out);
                when_false.collect_references(out);
            }
            Intrinsic::Sub {
                template,
                variables,
            } => {
                for segment in sub::parse(template) {
                    match segment {
                        SubSegment::Ref(name) if !variables.contains_key(&name) => {
                            out.insert(Reference::to_ref(Id::new(&name)));
                        }
                        SubSegment::GetAtt {
                            resource,
                            attribute,
                        } if !variables.contains_key(&format!("{resource}.{attribute}")) => {
                            out.insert(Reference::to_attribute(
                                Id::new(&resource),
                                Id::new(&attribute),
                            ));
                        }
                        _ => {}
                    }
                }
                variables
                    .values()
                    .for_each(|value| value.collect_references(out));
            }
            _ => self
                .operands()
                .into_iter()
                .for_each(|operand| operand.collect_references(out)),
        }
    }

    /// The operands of this call, in declaration order.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Intrinsic::And(operands) | Intrinsic::Or(operands) => operands.iter().collect(),
            Intrinsic::Not(operand)
            | Intrinsic::ImportValue(operand)
            | Intrinsic::GetAZs(operand)
            | Intrinsic::Base64(operand) => vec![operand],
            Intrinsic::Equals(left, right) => vec![left, right],
            Intrinsic::Ref(_) | Intrinsic::Condition(_) => Vec::new(),
            Intrinsic::GetAtt { attribute, .. } => vec![attribute],
            Intrinsic::FindInMap {
                map,
                top_key,
                second_key,
            } => vec![map, top_key, second_key],
            Intrinsic::Cidr { block, count, bits } => vec![block, count, bits],
            Intrinsic::Select { index, list } => vec![index, list],
            Intrinsic::Split { delimiter, source } => vec![delimiter, source],
            Intrinsic::Join { delimiter, values } => vec![delimiter, values],
            Intrinsic::Sub { variables, .. } => variables.values().collect(),
            Intrinsic::If {
                when_true,
                when_false,
                ..
            } => vec![when_true, when_false],
        }
    }

    /// Mutable access to the operands of this call with their write-back slot.
    pub fn children_mut(&mut self) -> Vec<(Slot, &mut Operand)> {
        match self {
            Intrinsic::And(operands) | Intrinsic::Or(operands) => operands
                .iter_mut()
                .enumerate()
                .map(|(i, operand)| (Slot::Index(i), operand))
                .collect(),
            Intrinsic::Not(operand) => vec![(Slot::Field("operand"), operand)],
            Intrinsic::ImportValue(operand) => vec![(Slot::Field("name"), operand)],
            Intrinsic::GetAZs(operand) => vec![(Slot::Field("region"), operand)],
            Intrinsic::Base64(operand) => vec![(Slot::Field("value"), operand)],
            Intrinsic::Equals(left, right) => {
                vec![(Slot::Field("left"), left), (Slot::Field("right"), right)]
            }
            Intrinsic::Ref(_) | Intrinsic::Condition(_) => Vec::new(),
            Intrinsic::GetAtt { attribute, .. } => vec![(Slot::Field("attribute"), attribute)],
            Intrinsic::FindInMap {
                map,
                top_key,
                second_key,
            } => vec![
                (Slot::Field("map"), map),
                (Slot::Field("top_key"), top_key),
                (Slot::Field("second_key"), second_key),
            ],
            Intrinsic::Cidr { block, count, bits } => vec![
                (Slot::Field("block"), block),
                (Slot::Field("count"), count),
                (Slot::Field("bits"), bits),
            ],
            Intrinsic::Select { index, list } => {
                vec![(Slot::Field("index"), index), (Slot::Field("list"), list)]
            }
            Intrinsic::Split { delimiter, source } => vec![
                (Slot::Field("delimiter"), delimiter),
                (Slot::Field("source"), source),
            ],
            Intrinsic::Join { delimiter, values } => vec![
                (Slot::Field("delimiter"), delimiter),
                (Slot::Field("values"), values),
            ],
            Intrinsic::Sub { variables, .. } => variables
                .iter_mut()
                .map(|(key, value)| (Slot::Key(key.clone()), value))
                .collect(),
            Intrinsic::If {
                when_true,
                when_false,
                ..
            } => vec![
                (Slot::Field("when_true"), when_true),
                (Slot::Field("when_false"), when_false),
            ],
        }
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.operands().into_iter().any(Operand::has_pending)
    }

    /// Converts the call back into its long-form document node.
    pub fn to_document(&self) -> Document {
        let arguments = match self {
            Intrinsic::Ref(name) | Intrinsic::Condition(name) => Document::String(name.to_name()),
            Intrinsic::Not(operand) => Document::Sequence(vec![operand.to_document()]),
            Intrinsic::ImportValue(operand)
            | Intrinsic::GetAZs(operand)
            | Intrinsic::Base64(operand) => operand.to_document(),
            Intrinsic::GetAtt {
                resource,
                attribute,
            } => Document::Sequence(vec![
                Document::String(resource.to_name()),
                attribute.to_document(),
            ]),
            Intrinsic::Sub {
                template,
                variables,
            } if variables.is_empty() => Document::String(template.clone()),
            Intrinsic::Sub {
                template,
                variables,
            } => Document::Sequence(vec![
                Document::String(template.clone()),
                Operand::Map(variables.clone()).to_document(),
            ]),
            Intrinsic::If {
                condition,
                when_true,
                when_false,
            } => Document::Sequence(vec![
                Document::String(condition.to_name()),
                when_true.to_document(),
                when_false.to_document(),
            ]),
            _ => Document::Sequence(
                self.operands()
                    .into_iter()
                    .map(Operand::to_document)
                    .collect(),
            ),
        };
        let mut mapping = Mapping::new();
        mapping.insert(
            Document::String(self.tag().long_name().to_string()),
            arguments,
        );
        Document::Mapping(mapping)
    }
}

fn evaluate_bool(
    operand: &Operand,
    evaluator: &mut Evaluator<'_>,
    function: Tag,
) -> Result<bool, EvalError> {
    let value = operand.evaluate(evaluator)?;
    value.as_bool().ok_or(EvalError::TypeMismatch {
        function,
        expected: "boolean",
        found: value.kind_name(),
    })
}

fn evaluate_text(
    operand: &Operand,
    evaluator: &mut Evaluator<'_>,
    function: Tag,
) -> Result<String, EvalError> {
    let value = operand.evaluate(evaluator)?;
    value.as_text().ok_or(EvalError::TypeMismatch {
        function,
        expected: "string",
        found: value.kind_name(),
    })
}

fn evaluate_integer(
    operand: &Operand,
    evaluator: &mut Evaluator<'_>,
    function: Tag,
) -> Result<i64, EvalError> {
    let value = operand.evaluate(evaluator)?;
    let integer = match &value {
        Value::Scalar(Scalar::Integer(i)) => Some(*i),
        // 2^63 itself is out of range, so the upper bound is exclusive.
        Value::Scalar(Scalar::Float(f))
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
        {
            Some(*f as i64)
        }
        Value::Scalar(Scalar::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    integer.ok_or(EvalError::TypeMismatch {
        function,
        expected: "integer",
        found: value.kind_name(),
    })
}

fn evaluate_sub(
    template: &str,
    variables: &IndexMap<String, Operand>,
    evaluator: &mut Evaluator<'_>,
) -> Result<Value, EvalError> {
    let mut output = String::with_capacity(template.len());
    for segment in sub::parse(template) {
        let value = match segment {
            SubSegment::Literal(text) => {
                output.push_str(&text);
                continue;
            }
            SubSegment::Ref(name) => match variables.get(&name) {
                Some(operand) => operand.evaluate(evaluator)?,
                None => evaluator.resolve_ref(Id::new(&name))?,
            },
            SubSegment::GetAtt {
                resource,
                attribute,
            } => match variables.get(&format!("{resource}.{attribute}")) {
                Some(operand) => operand.evaluate(evaluator)?,
                None => evaluator.attribute(Id::new(&resource), &attribute)?,
            },
        };
        let text = value.as_text().ok_or(EvalError::TypeMismatch {
            function: Tag::Sub,
            expected: "string",
            found: value.kind_name(),
        })?;
        output.push_str(&text);
    }
    Ok(Value::string(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_lookup_accepts_all_spellings() {
        assert_eq!(Tag::from_name("Join"), Some(Tag::Join));
        assert_eq!(Tag::from_name("Fn::Join"), Some(Tag::Join));
        assert_eq!(Tag::from_name("!Join"), Some(Tag::Join));
        assert_eq!(Tag::from_name("!Fn::Join"), Some(Tag::Join));
        assert_eq!(Tag::from_name("Ref"), Some(Tag::Ref));
        assert_eq!(Tag::from_name("Fn::Ref"), Some(Tag::Ref));
        assert_eq!(Tag::from_name("Fn::Frobnicate"), None);
    }

    #[test]
    fn test_tag_registry_is_complete() {
        assert_eq!(Tag::all().len(), 17);
        for tag in Tag::all() {
            assert_eq!(Tag::from_name(tag.short_name()), Some(*tag));
            assert_eq!(Tag::from_name(tag.long_name()), Some(*tag));
        }
    }

    #[test]
    fn test_tag_kinds() {
        assert_eq!(Tag::Equals.kind(), TagKind::Boolean);
        assert_eq!(Tag::GetAtt.kind(), TagKind::Reference);
        assert_eq!(Tag::Sub.kind(), TagKind::Derived);
    }

    #[test]
    fn test_referenced_objects_recurse() {
        let join = Intrinsic::Join {
            delimiter: Operand::string("-"),
            values: Operand::List(vec![
                Operand::intrinsic(Intrinsic::Ref(Id::new("Env"))),
                Operand::intrinsic(Intrinsic::GetAtt {
                    resource: Id::new("Bucket"),
                    attribute: Operand::string("Arn"),
                }),
            ]),
        };

        let refs: Vec<Reference> = join.referenced_objects().into_iter().collect();
        assert_eq!(
            refs,
            vec![
                Reference::to_ref(Id::new("Env")),
                Reference::to_attribute(Id::new("Bucket"), Id::new("Arn")),
            ]
        );
    }

    #[test]
    fn test_sub_references_skip_variables() {
        let mut variables = IndexMap::new();
        variables.insert(
            "Name".to_string(),
            Operand::intrinsic(Intrinsic::Ref(Id::new("Prefix"))),
        );
        let sub = Intrinsic::Sub {
            template: "${Name}-${AWS::Region}-${Queue.Arn}-${!Literal}".to_string(),
            variables,
        };

        let refs = sub.referenced_objects();
        assert!(refs.contains(&Reference::to_ref(Id::new("AWS::Region"))));
        assert!(refs.contains(&Reference::to_attribute(
            Id::new("Queue"),
            Id::new("Arn")
        )));
        assert!(refs.contains(&Reference::to_ref(Id::new("Prefix"))));
        assert!(!refs.contains(&Reference::to_ref(Id::new("Name"))));
        assert!(!refs.contains(&Reference::to_ref(Id::new("Literal"))));
        assert_eq!(refs.len(), 3);
    }

    #[test]
    fn test_if_references_condition_and_branches() {
        let intrinsic = Intrinsic::If {
            condition: Id::new("IsProd"),
            when_true: Operand::intrinsic(Intrinsic::Ref(Id::new("BigSize"))),
            when_false: Operand::string("small"),
        };
        let refs = intrinsic.referenced_objects();
        assert!(refs.contains(&Reference::to_condition(Id::new("IsProd"))));
        assert!(refs.contains(&Reference::to_ref(Id::new("BigSize"))));
    }

    #[test]
    fn test_dynamic_getatt_label() {
        let intrinsic = Intrinsic::GetAtt {
            resource: Id::new("Table"),
            attribute: Operand::intrinsic(Intrinsic::Ref(Id::new("AttrName"))),
        };
        let refs = intrinsic.referenced_objects();
        assert!(refs.contains(&Reference::to_attribute(
            Id::new("Table"),
            Id::new(DYNAMIC_ATTRIBUTE)
        )));
        assert!(refs.contains(&Reference::to_ref(Id::new("AttrName"))));
    }

    #[test]
    fn test_to_document_long_form() {
        let intrinsic = Intrinsic::Select {
            index: Operand::Scalar(Scalar::Integer(0)),
            list: Operand::intrinsic(Intrinsic::GetAZs(Operand::string(""))),
        };
        let expected: Document =
            serde_yaml::from_str(r#"{"Fn::Select": [0, {"Fn::GetAZs": ""}]}"#).unwrap();
        assert_eq!(intrinsic.to_document(), expected);

        let reference = Intrinsic::Ref(Id::new("Env"));
        let expected: Document = serde_yaml::from_str(r#"{"Ref": "Env"}"#).unwrap();
        assert_eq!(reference.to_document(), expected);
    }
}
