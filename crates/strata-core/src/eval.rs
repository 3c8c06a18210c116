//! Expression evaluation.
//!
//! An [`Evaluator`] binds a [`Template`] to the inputs evaluation needs:
//! runtime parameter values, pseudo-parameter values, import stand-ins and
//! attribute overrides. It memoizes condition results for the lifetime of the
//! evaluator, so each condition is evaluated at most once per pass.
//!
//! Errors are raised lazily: an expression that is never evaluated (for
//! example the untaken branch of `Fn::If`) never fails.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, trace};
use thiserror::Error;

use crate::{
    identifier::Id,
    intrinsic::Tag,
    pseudo::{PseudoParameter, PseudoParameters},
    template::{EntityKind, Template},
    value::{Operand, Scalar, Value},
};

/// Errors raised while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("parameter `{name}` has no runtime value and no default")]
    MissingParameterValue { name: String },

    #[error("`{name}` is not a declared parameter, resource or pseudo-parameter")]
    UnknownReference { name: String },

    #[error("`{name}` is not a declared resource")]
    UnknownResource { name: String },

    #[error("`{name}` is not a declared condition")]
    UnknownCondition { name: String },

    #[error("mapping `{map}` is not declared")]
    MissingMapping { map: String },

    #[error("mapping `{map}` has no key `{key}`")]
    MissingMapKey { map: String, key: String },

    #[error("index {index} is out of range for a list of {len} items")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Fn::Join members must be scalars, found a {found}")]
    NonScalarJoin { found: &'static str },

    #[error("{function} expected a {expected}, found a {found}")]
    TypeMismatch {
        function: Tag,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid CIDR block `{block}`: {reason}")]
    InvalidCidr { block: String, reason: String },

    #[error("condition `{name}` depends on itself")]
    CircularCondition { name: String },

    #[error("condition `{name}` did not evaluate to a boolean")]
    NonBooleanCondition { name: String },

    #[error("unresolved placeholder #{id}")]
    UnresolvedPlaceholder { id: usize },
}

/// Evaluates expressions of one template.
#[derive(Debug)]
pub struct Evaluator<'t> {
    template: &'t Template,
    parameter_values: IndexMap<String, Scalar>,
    pseudo_parameters: PseudoParameters,
    imports: IndexMap<String, Value>,
    attributes: HashMap<(Id, String), Value>,
    conditions: IndexMap<Id, bool>,
    in_progress: Vec<Id>,
}

impl<'t> Evaluator<'t> {
    pub fn new(template: &'t Template) -> Self {
        Self {
            template,
            parameter_values: IndexMap::new(),
            pseudo_parameters: PseudoParameters::default(),
            imports: IndexMap::new(),
            attributes: HashMap::new(),
            conditions: IndexMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Supplies runtime parameter values, which take precedence over declared defaults.
    pub fn with_parameter_values(mut self, values: IndexMap<String, Scalar>) -> Self {
        self.parameter_values = values;
        self
    }

    pub fn with_pseudo_parameters(mut self, pseudo_parameters: PseudoParameters) -> Self {
        self.pseudo_parameters = pseudo_parameters;
        self
    }

    /// Supplies stand-in values for `Fn::ImportValue`, keyed by export name.
    pub fn with_imports(mut self, imports: IndexMap<String, Value>) -> Self {
        self.imports = imports;
        self
    }

    /// Overrides the value `Fn::GetAtt` returns for one resource attribute.
    pub fn with_attribute(mut self, resource: Id, attribute: &str, value: Value) -> Self {
        self.attributes
            .insert((resource, attribute.to_string()), value);
        self
    }

    pub fn template(&self) -> &'t Template {
        self.template
    }

    /// Evaluates an operand.
    pub fn evaluate(&mut self, operand: &Operand) -> Result<Value, EvalError> {
        operand.evaluate(self)
    }

    /// Value of a declared parameter: the runtime value, else the default.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::MissingParameterValue`] if neither exists.
    pub fn parameter_value(&self, name: Id) -> Result<Value, EvalError> {
        let parameter = self
            .template
            .parameter(name)
            .ok_or_else(|| EvalError::UnknownReference {
                name: name.to_name(),
            })?;
        let raw = self
            .parameter_values
            .get(&name.to_name())
            .or(parameter.default())
            .ok_or_else(|| EvalError::MissingParameterValue {
                name: name.to_name(),
            })?;
        Ok(parameter.shape_value(raw))
    }

    /// Evaluates `Ref name`.
    ///
    /// Resources evaluate to their logical name, standing in for the physical id.
    pub fn resolve_ref(&self, name: Id) -> Result<Value, EvalError> {
        match self.template.resolve_name(name) {
            Some(EntityKind::Parameter) => self.parameter_value(name),
            Some(EntityKind::PseudoParameter) => {
                let pseudo = PseudoParameter::from_name(&name.to_name()).ok_or_else(|| {
                    EvalError::UnknownReference {
                        name: name.to_name(),
                    }
                })?;
                Ok(self.pseudo_parameters.value(pseudo))
            }
            Some(EntityKind::Resource) => Ok(Value::string(name.to_name())),
            _ => Err(EvalError::UnknownReference {
                name: name.to_name(),
            }),
        }
    }

    /// Evaluates `Fn::GetAtt [resource, attribute]`.
    ///
    /// Returns the override if one was supplied, otherwise `"<resource>.<attribute>"`.
    pub fn attribute(&self, resource: Id, attribute: &str) -> Result<Value, EvalError> {
        if self.template.resource(resource).is_none() {
            return Err(EvalError::UnknownResource {
                name: resource.to_name(),
            });
        }
        Ok(self
            .attributes
            .get(&(resource, attribute.to_string()))
            .cloned()
            .unwrap_or_else(|| Value::string(format!("{resource}.{attribute}"))))
    }

    /// Evaluates `Fn::ImportValue name`: the supplied stand-in, else `"imported:<name>"`.
    pub fn import(&self, name: &str) -> Value {
        self.imports
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::string(format!("imported:{name}")))
    }

    /// Evaluates `Fn::FindInMap [map, top_key, second_key]`.
    pub fn find_in_map(
        &self,
        map: &str,
        top_key: &str,
        second_key: &str,
    ) -> Result<Value, EvalError> {
        let mapping =
            self.template
                .mapping(Id::new(map))
                .ok_or_else(|| EvalError::MissingMapping {
                    map: map.to_string(),
                })?;
        mapping.lookup(top_key, second_key).cloned()
    }

    /// Evaluates `Fn::GetAZs region`: three zones `a`, `b`, `c` of the region,
    /// the current region when `region` is empty.
    pub fn availability_zones(&self, region: &str) -> Value {
        let region = if region.is_empty() {
            self.pseudo_parameters.region()
        } else {
            region.to_string()
        };
        Value::List(
            ["a", "b", "c"]
                .iter()
                .map(|zone| Value::string(format!("{region}{zone}")))
                .collect(),
        )
    }

    /// Evaluates a named condition, memoizing the result.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::CircularCondition`] if the condition is reached
    /// again while it is being evaluated.
    pub fn condition(&mut self, name: Id) -> Result<bool, EvalError> {
        if let Some(value) = self.conditions.get(&name) {
            trace!(condition = name.to_name(); "Condition served from cache");
            return Ok(*value);
        }
        if self.in_progress.contains(&name) {
            return Err(EvalError::CircularCondition {
                name: name.to_name(),
            });
        }

        let template = self.template;
        let condition = template
            .condition(name)
            .ok_or_else(|| EvalError::UnknownCondition {
                name: name.to_name(),
            })?;

        self.in_progress.push(name);
        let result = condition.expression().evaluate(self);
        self.in_progress.pop();

        let value = result?;
        let value = value.as_bool().ok_or_else(|| EvalError::NonBooleanCondition {
            name: name.to_name(),
        })?;

        debug!(condition = name.to_name(), value; "Condition evaluated");
        self.conditions.insert(name, value);
        Ok(value)
    }

    /// The memoized result of a condition, if it has been evaluated.
    pub fn cached_condition(&self, name: Id) -> Option<bool> {
        self.conditions.get(&name).copied()
    }

    /// Every condition evaluated so far, in evaluation order.
    pub fn condition_values(&self) -> &IndexMap<Id, bool> {
        &self.conditions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        intrinsic::Intrinsic,
        template::{Condition, Mapping, Parameter, Resource},
    };

    fn reference(name: &str) -> Operand {
        Operand::intrinsic(Intrinsic::Ref(Id::new(name)))
    }

    fn template_with_env() -> Template {
        let mut template = Template::new();
        template.add_parameter(Parameter::new(Id::new("Env"), "String"));
        template.add_parameter(
            Parameter::new(Id::new("Size"), "String").with_default(Scalar::from("small")),
        );
        template.add_condition(Condition::new(
            Id::new("IsProd"),
            Operand::intrinsic(Intrinsic::Equals(reference("Env"), Operand::string("prod"))),
        ));
        template.add_resource(Resource::new(Id::new("Bucket"), "AWS::S3::Bucket"));
        template
    }

    #[test]
    fn test_parameter_runtime_value_wins() {
        let template = template_with_env();
        let mut values = IndexMap::new();
        values.insert("Size".to_string(), Scalar::from("large"));
        let mut evaluator = Evaluator::new(&template).with_parameter_values(values);

        assert_eq!(
            evaluator.evaluate(&reference("Size")).unwrap(),
            Value::string("large")
        );
    }

    #[test]
    fn test_parameter_falls_back_to_default() {
        let template = template_with_env();
        let mut evaluator = Evaluator::new(&template);

        assert_eq!(
            evaluator.evaluate(&reference("Size")).unwrap(),
            Value::string("small")
        );
    }

    #[test]
    fn test_parameter_without_value_or_default_fails() {
        let template = template_with_env();
        let mut evaluator = Evaluator::new(&template);

        assert_eq!(
            evaluator.evaluate(&reference("Env")),
            Err(EvalError::MissingParameterValue {
                name: "Env".to_string()
            })
        );
    }

    #[test]
    fn test_ref_resource_and_pseudo() {
        let template = template_with_env();
        let mut evaluator = Evaluator::new(&template);

        assert_eq!(
            evaluator.evaluate(&reference("Bucket")).unwrap(),
            Value::string("Bucket")
        );
        assert_eq!(
            evaluator.evaluate(&reference("AWS::Region")).unwrap(),
            Value::string("us-east-1")
        );
        assert!(matches!(
            evaluator.evaluate(&reference("Nope")),
            Err(EvalError::UnknownReference { .. })
        ));
    }

    #[test]
    fn test_getatt_placeholder_and_override() {
        let template = template_with_env();
        let operand = Operand::intrinsic(Intrinsic::GetAtt {
            resource: Id::new("Bucket"),
            attribute: Operand::string("Arn"),
        });

        let mut evaluator = Evaluator::new(&template);
        assert_eq!(
            evaluator.evaluate(&operand).unwrap(),
            Value::string("Bucket.Arn")
        );

        let mut evaluator = Evaluator::new(&template).with_attribute(
            Id::new("Bucket"),
            "Arn",
            Value::string("arn:aws:s3:::bucket"),
        );
        assert_eq!(
            evaluator.evaluate(&operand).unwrap(),
            Value::string("arn:aws:s3:::bucket")
        );
    }

    #[test]
    fn test_if_does_not_evaluate_false_branch() {
        let template = template_with_env();
        let mut values = IndexMap::new();
        values.insert("Env".to_string(), Scalar::from("prod"));
        let mut evaluator = Evaluator::new(&template).with_parameter_values(values);

        let operand = Operand::intrinsic(Intrinsic::If {
            condition: Id::new("IsProd"),
            when_true: Operand::string("big"),
            when_false: reference("DoesNotExist"),
        });
        assert_eq!(evaluator.evaluate(&operand).unwrap(), Value::string("big"));
    }

    #[test]
    fn test_condition_memoized() {
        let template = template_with_env();
        let mut values = IndexMap::new();
        values.insert("Env".to_string(), Scalar::from("dev"));
        let mut evaluator = Evaluator::new(&template).with_parameter_values(values);

        assert_eq!(evaluator.cached_condition(Id::new("IsProd")), None);
        assert!(!evaluator.condition(Id::new("IsProd")).unwrap());
        assert_eq!(evaluator.cached_condition(Id::new("IsProd")), Some(false));
        assert_eq!(evaluator.condition_values().len(), 1);
    }

    #[test]
    fn test_self_referencing_condition_fails() {
        let mut template = Template::new();
        template.add_condition(Condition::new(
            Id::new("Loop"),
            Operand::intrinsic(Intrinsic::Not(Operand::intrinsic(Intrinsic::Condition(
                Id::new("Loop"),
            )))),
        ));
        let mut evaluator = Evaluator::new(&template);

        assert_eq!(
            evaluator.condition(Id::new("Loop")),
            Err(EvalError::CircularCondition {
                name: "Loop".to_string()
            })
        );
    }

    #[test]
    fn test_find_in_map() {
        let mut template = Template::new();
        template.add_mapping(Mapping::new(Id::new("Region")).with_entry(
            "eu-west-1",
            "AMI",
            Value::string("ami-0abc"),
        ));
        let mut evaluator = Evaluator::new(&template);

        let lookup = |top: &str| {
            Operand::intrinsic(Intrinsic::FindInMap {
                map: Operand::string("Region"),
                top_key: Operand::string(top),
                second_key: Operand::string("AMI"),
            })
        };

        assert_eq!(
            evaluator.evaluate(&lookup("eu-west-1")).unwrap(),
            Value::string("ami-0abc")
        );
        assert_eq!(
            evaluator.evaluate(&lookup("ap-south-1")),
            Err(EvalError::MissingMapKey {
                map: "Region".to_string(),
                key: "ap-south-1".to_string()
            })
        );
    }

    #[test]
    fn test_select_out_of_range() {
        let template = Template::new();
        let mut evaluator = Evaluator::new(&template);
        let operand = Operand::intrinsic(Intrinsic::Select {
            index: Operand::Scalar(Scalar::Integer(3)),
            list: Operand::List(vec![Operand::string("a"), Operand::string("b")]),
        });

        assert_eq!(
            evaluator.evaluate(&operand),
            Err(EvalError::IndexOutOfRange { index: 3, len: 2 })
        );
    }

    #[test]
    fn test_select_rejects_float_index_beyond_integer_range() {
        let template = Template::new();
        let mut evaluator = Evaluator::new(&template);
        let select = |index: f64| {
            Operand::intrinsic(Intrinsic::Select {
                index: Operand::Scalar(Scalar::Float(index)),
                list: Operand::List(vec![Operand::string("a"), Operand::string("b")]),
            })
        };

        assert_eq!(
            evaluator.evaluate(&select(1e300)),
            Err(EvalError::TypeMismatch {
                function: Tag::Select,
                expected: "integer",
                found: "number"
            })
        );
        assert_eq!(evaluator.evaluate(&select(1.0)).unwrap(), Value::string("b"));
    }

    #[test]
    fn test_select_accepts_numeric_string_index() {
        let template = Template::new();
        let mut evaluator = Evaluator::new(&template);
        let operand = Operand::intrinsic(Intrinsic::Select {
            index: Operand::string("1"),
            list: Operand::intrinsic(Intrinsic::GetAZs(Operand::string("eu-west-1"))),
        });

        assert_eq!(
            evaluator.evaluate(&operand).unwrap(),
            Value::string("eu-west-1b")
        );
    }

    #[test]
    fn test_join_and_split() {
        let template = Template::new();
        let mut evaluator = Evaluator::new(&template);
        let split = Operand::intrinsic(Intrinsic::Split {
            delimiter: Operand::string(","),
            source: Operand::string("a,b,c"),
        });
        let join = Operand::intrinsic(Intrinsic::Join {
            delimiter: Operand::string("-"),
            values: split,
        });

        assert_eq!(evaluator.evaluate(&join).unwrap(), Value::string("a-b-c"));
    }

    #[test]
    fn test_join_rejects_non_scalar_members() {
        let template = Template::new();
        let mut evaluator = Evaluator::new(&template);
        let join = Operand::intrinsic(Intrinsic::Join {
            delimiter: Operand::string(""),
            values: Operand::List(vec![Operand::List(vec![Operand::string("x")])]),
        });

        assert_eq!(
            evaluator.evaluate(&join),
            Err(EvalError::NonScalarJoin { found: "list" })
        );
    }

    #[test]
    fn test_sub_with_variables() {
        let template = template_with_env();
        let mut variables = IndexMap::new();
        variables.insert("Suffix".to_string(), Operand::string("logs"));
        let operand = Operand::intrinsic(Intrinsic::Sub {
            template: "${Bucket}-${Size}-${Suffix}-${AWS::AccountId}-${!Raw}".to_string(),
            variables,
        });
        let mut evaluator = Evaluator::new(&template);

        assert_eq!(
            evaluator.evaluate(&operand).unwrap(),
            Value::string("Bucket-small-logs-123456789012-${Raw}")
        );
    }

    #[test]
    fn test_boolean_functions() {
        let template = Template::new();
        let mut evaluator = Evaluator::new(&template);
        let truthy = || Operand::Scalar(Scalar::Bool(true));
        let falsy = || Operand::string("false");

        let and = Operand::intrinsic(Intrinsic::And(vec![truthy(), falsy()]));
        let or = Operand::intrinsic(Intrinsic::Or(vec![falsy(), truthy()]));
        let not = Operand::intrinsic(Intrinsic::Not(falsy()));

        assert_eq!(evaluator.evaluate(&and).unwrap().as_bool(), Some(false));
        assert_eq!(evaluator.evaluate(&or).unwrap().as_bool(), Some(true));
        assert_eq!(evaluator.evaluate(&not).unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_base64_and_import() {
        let template = Template::new();
        let mut evaluator = Evaluator::new(&template);

        let encoded = Operand::intrinsic(Intrinsic::Base64(Operand::string("hello")));
        assert_eq!(
            evaluator.evaluate(&encoded).unwrap(),
            Value::string("aGVsbG8=")
        );

        let import = Operand::intrinsic(Intrinsic::ImportValue(Operand::string("SharedVpc")));
        assert_eq!(
            evaluator.evaluate(&import).unwrap(),
            Value::string("imported:SharedVpc")
        );
    }

    #[test]
    fn test_list_parameter_evaluates_to_list() {
        let mut template = Template::new();
        template.add_parameter(
            Parameter::new(Id::new("Zones"), "CommaDelimitedList")
                .with_default(Scalar::from("a,b")),
        );
        let mut evaluator = Evaluator::new(&template);
        let operand = Operand::intrinsic(Intrinsic::Select {
            index: Operand::Scalar(Scalar::Integer(1)),
            list: reference("Zones"),
        });

        assert_eq!(evaluator.evaluate(&operand).unwrap(), Value::string("b"));
    }

    #[test]
    fn test_pending_operand_fails() {
        let template = Template::new();
        let mut evaluator = Evaluator::new(&template);

        assert_eq!(
            evaluator.evaluate(&Operand::Pending(crate::value::PendingId(7))),
            Err(EvalError::UnresolvedPlaceholder { id: 7 })
        );
    }
}
