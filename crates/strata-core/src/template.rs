//! Template semantic model.
//!
//! A [`Template`] owns ordered collections of parameters, mappings,
//! conditions, resources and outputs keyed by logical name. Insertion order
//! follows the source document so the model can be written back faithfully.

use indexmap::IndexMap;
use serde_yaml::{Mapping as DocumentMapping, Value as Document};

use crate::{
    eval::EvalError,
    identifier::Id,
    pseudo::PseudoParameter,
    value::{Operand, Scalar, Value},
};

/// What a logical name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Parameter,
    PseudoParameter,
    Resource,
    Output,
    Condition,
}

/// A declared template parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: Id,
    parameter_type: String,
    default: Option<Scalar>,
    description: Option<String>,
    allowed_values: Vec<Scalar>,
    no_echo: bool,
}

impl Parameter {
    pub fn new(name: Id, parameter_type: impl Into<String>) -> Self {
        Self {
            name,
            parameter_type: parameter_type.into(),
            default: None,
            description: None,
            allowed_values: Vec::new(),
            no_echo: false,
        }
    }

    pub fn with_default(mut self, default: Scalar) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_allowed_values(mut self, allowed_values: Vec<Scalar>) -> Self {
        self.allowed_values = allowed_values;
        self
    }

    pub fn with_no_echo(mut self, no_echo: bool) -> Self {
        self.no_echo = no_echo;
        self
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn parameter_type(&self) -> &str {
        &self.parameter_type
    }

    pub fn default(&self) -> Option<&Scalar> {
        self.default.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn allowed_values(&self) -> &[Scalar] {
        &self.allowed_values
    }

    pub fn no_echo(&self) -> bool {
        self.no_echo
    }

    /// Returns `true` for list-shaped parameter types, whose values are
    /// comma-delimited strings.
    pub fn is_list(&self) -> bool {
        self.parameter_type == "CommaDelimitedList" || self.parameter_type.starts_with("List<")
    }

    /// Shapes a raw scalar into the parameter's value: list types split on
    /// commas, everything else is passed through.
    pub fn shape_value(&self, raw: &Scalar) -> Value {
        if self.is_list() {
            let text = raw.to_text();
            if text.is_empty() {
                return Value::List(Vec::new());
            }
            Value::List(text.split(',').map(|item| Value::string(item.trim())).collect())
        } else {
            Value::Scalar(raw.clone())
        }
    }

    fn to_document(&self) -> Document {
        let mut node = DocumentMapping::new();
        node.insert("Type".into(), self.parameter_type.clone().into());
        if let Some(default) = &self.default {
            node.insert("Default".into(), default.to_document());
        }
        if let Some(description) = &self.description {
            node.insert("Description".into(), description.clone().into());
        }
        if !self.allowed_values.is_empty() {
            node.insert(
                "AllowedValues".into(),
                Document::Sequence(self.allowed_values.iter().map(Scalar::to_document).collect()),
            );
        }
        if self.no_echo {
            node.insert("NoEcho".into(), true.into());
        }
        Document::Mapping(node)
    }
}

/// A declared cloud resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    name: Id,
    resource_type: String,
    properties: IndexMap<String, Operand>,
    condition: Option<Id>,
    depends_on: Vec<Id>,
    deletion_policy: Option<String>,
    update_replace_policy: Option<String>,
    metadata: Option<Operand>,
    creation_policy: Option<Operand>,
    update_policy: Option<Operand>,
}

impl Resource {
    pub fn new(name: Id, resource_type: impl Into<String>) -> Self {
        Self {
            name,
            resource_type: resource_type.into(),
            properties: IndexMap::new(),
            condition: None,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
            metadata: None,
            creation_policy: None,
            update_policy: None,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Operand) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_condition(mut self, condition: Id) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_depends_on(mut self, depends_on: Vec<Id>) -> Self {
        self.depends_on = depends_on;
        self
    }

    pub fn with_deletion_policy(mut self, policy: impl Into<String>) -> Self {
        self.deletion_policy = Some(policy.into());
        self
    }

    pub fn with_update_replace_policy(mut self, policy: impl Into<String>) -> Self {
        self.update_replace_policy = Some(policy.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Operand) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_creation_policy(mut self, policy: Operand) -> Self {
        self.creation_policy = Some(policy);
        self
    }

    pub fn with_update_policy(mut self, policy: Operand) -> Self {
        self.update_policy = Some(policy);
        self
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn properties(&self) -> &IndexMap<String, Operand> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Operand> {
        self.properties.get(name)
    }

    pub fn condition(&self) -> Option<Id> {
        self.condition
    }

    pub fn depends_on(&self) -> &[Id] {
        &self.depends_on
    }

    pub fn deletion_policy(&self) -> Option<&str> {
        self.deletion_policy.as_deref()
    }

    pub fn update_replace_policy(&self) -> Option<&str> {
        self.update_replace_policy.as_deref()
    }

    pub fn metadata(&self) -> Option<&Operand> {
        self.metadata.as_ref()
    }

    pub fn creation_policy(&self) -> Option<&Operand> {
        self.creation_policy.as_ref()
    }

    pub fn update_policy(&self) -> Option<&Operand> {
        self.update_policy.as_ref()
    }

    /// Every operand held by the resource, labelled with its attribute path.
    pub fn operands(&self) -> impl Iterator<Item = (String, &Operand)> {
        self.properties
            .iter()
            .map(|(name, operand)| (format!("Properties.{name}"), operand))
            .chain(self.metadata.iter().map(|m| ("Metadata".to_string(), m)))
            .chain(
                self.creation_policy
                    .iter()
                    .map(|p| ("CreationPolicy".to_string(), p)),
            )
            .chain(
                self.update_policy
                    .iter()
                    .map(|p| ("UpdatePolicy".to_string(), p)),
            )
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = (String, &mut Operand)> {
        self.properties
            .iter_mut()
            .map(|(name, operand)| (format!("Properties.{name}"), operand))
            .chain(self.metadata.iter_mut().map(|m| ("Metadata".to_string(), m)))
            .chain(
                self.creation_policy
                    .iter_mut()
                    .map(|p| ("CreationPolicy".to_string(), p)),
            )
            .chain(
                self.update_policy
                    .iter_mut()
                    .map(|p| ("UpdatePolicy".to_string(), p)),
            )
    }

    fn to_document(&self) -> Document {
        let mut node = DocumentMapping::new();
        node.insert("Type".into(), self.resource_type.clone().into());
        if let Some(condition) = self.condition {
            node.insert("Condition".into(), condition.to_name().into());
        }
        if !self.depends_on.is_empty() {
            node.insert(
                "DependsOn".into(),
                Document::Sequence(
                    self.depends_on
                        .iter()
                        .map(|name| name.to_name().into())
                        .collect(),
                ),
            );
        }
        if !self.properties.is_empty() {
            node.insert(
                "Properties".into(),
                Operand::Map(self.properties.clone()).to_document(),
            );
        }
        if let Some(policy) = &self.deletion_policy {
            node.insert("DeletionPolicy".into(), policy.clone().into());
        }
        if let Some(policy) = &self.update_replace_policy {
            node.insert("UpdateReplacePolicy".into(), policy.clone().into());
        }
        if let Some(metadata) = &self.metadata {
            node.insert("Metadata".into(), metadata.to_document());
        }
        if let Some(policy) = &self.creation_policy {
            node.insert("CreationPolicy".into(), policy.to_document());
        }
        if let Some(policy) = &self.update_policy {
            node.insert("UpdatePolicy".into(), policy.to_document());
        }
        Document::Mapping(node)
    }
}

/// A declared stack output.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    name: Id,
    value: Operand,
    description: Option<String>,
    export_name: Option<Operand>,
    condition: Option<Id>,
}

impl Output {
    pub fn new(name: Id, value: Operand) -> Self {
        Self {
            name,
            value,
            description: None,
            export_name: None,
            condition: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_export_name(mut self, export_name: Operand) -> Self {
        self.export_name = Some(export_name);
        self
    }

    pub fn with_condition(mut self, condition: Id) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn value(&self) -> &Operand {
        &self.value
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn export_name(&self) -> Option<&Operand> {
        self.export_name.as_ref()
    }

    pub fn condition(&self) -> Option<Id> {
        self.condition
    }

    pub fn operands(&self) -> impl Iterator<Item = (String, &Operand)> {
        std::iter::once(("Value".to_string(), &self.value)).chain(
            self.export_name
                .iter()
                .map(|name| ("Export.Name".to_string(), name)),
        )
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = (String, &mut Operand)> {
        std::iter::once(("Value".to_string(), &mut self.value)).chain(
            self.export_name
                .iter_mut()
                .map(|name| ("Export.Name".to_string(), name)),
        )
    }

    fn to_document(&self) -> Document {
        let mut node = DocumentMapping::new();
        if let Some(description) = &self.description {
            node.insert("Description".into(), description.clone().into());
        }
        if let Some(condition) = self.condition {
            node.insert("Condition".into(), condition.to_name().into());
        }
        node.insert("Value".into(), self.value.to_document());
        if let Some(export_name) = &self.export_name {
            let mut export = DocumentMapping::new();
            export.insert("Name".into(), export_name.to_document());
            node.insert("Export".into(), Document::Mapping(export));
        }
        Document::Mapping(node)
    }
}

/// A three-level lookup table consumed by `Fn::FindInMap`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    name: Id,
    entries: IndexMap<String, IndexMap<String, Value>>,
}

impl Mapping {
    pub fn new(name: Id) -> Self {
        Self {
            name,
            entries: IndexMap::new(),
        }
    }

    pub fn with_entry(
        mut self,
        top_key: impl Into<String>,
        second_key: impl Into<String>,
        value: Value,
    ) -> Self {
        self.entries
            .entry(top_key.into())
            .or_default()
            .insert(second_key.into(), value);
        self
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn entries(&self) -> &IndexMap<String, IndexMap<String, Value>> {
        &self.entries
    }

    /// Looks up `top_key` then `second_key`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::MissingMapKey`] naming the first key that is absent.
    pub fn lookup(&self, top_key: &str, second_key: &str) -> Result<&Value, EvalError> {
        let level = self
            .entries
            .get(top_key)
            .ok_or_else(|| EvalError::MissingMapKey {
                map: self.name.to_name(),
                key: top_key.to_string(),
            })?;
        level
            .get(second_key)
            .ok_or_else(|| EvalError::MissingMapKey {
                map: self.name.to_name(),
                key: second_key.to_string(),
            })
    }

    fn to_document(&self) -> Document {
        let node: DocumentMapping = self
            .entries
            .iter()
            .map(|(top_key, level)| {
                let level: DocumentMapping = level
                    .iter()
                    .map(|(key, value)| (key.clone().into(), value.to_document()))
                    .collect();
                (top_key.clone().into(), Document::Mapping(level))
            })
            .collect();
        Document::Mapping(node)
    }
}

/// A named boolean expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    name: Id,
    expression: Operand,
}

impl Condition {
    pub fn new(name: Id, expression: Operand) -> Self {
        Self { name, expression }
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn expression(&self) -> &Operand {
        &self.expression
    }
}

/// The root of the semantic model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    format_version: Option<String>,
    description: Option<String>,
    parameters: IndexMap<Id, Parameter>,
    mappings: IndexMap<Id, Mapping>,
    conditions: IndexMap<Id, Condition>,
    resources: IndexMap<Id, Resource>,
    outputs: IndexMap<Id, Output>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_format_version(&mut self, version: impl Into<String>) {
        self.format_version = Some(version.into());
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Adds a parameter, returning the one previously declared under the same name.
    pub fn add_parameter(&mut self, parameter: Parameter) -> Option<Parameter> {
        self.parameters.insert(parameter.name(), parameter)
    }

    pub fn add_mapping(&mut self, mapping: Mapping) -> Option<Mapping> {
        self.mappings.insert(mapping.name(), mapping)
    }

    pub fn add_condition(&mut self, condition: Condition) -> Option<Condition> {
        self.conditions.insert(condition.name(), condition)
    }

    pub fn add_resource(&mut self, resource: Resource) -> Option<Resource> {
        self.resources.insert(resource.name(), resource)
    }

    pub fn add_output(&mut self, output: Output) -> Option<Output> {
        self.outputs.insert(output.name(), output)
    }

    pub fn format_version(&self) -> Option<&str> {
        self.format_version.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parameters(&self) -> &IndexMap<Id, Parameter> {
        &self.parameters
    }

    pub fn parameter(&self, name: Id) -> Option<&Parameter> {
        self.parameters.get(&name)
    }

    pub fn mappings(&self) -> &IndexMap<Id, Mapping> {
        &self.mappings
    }

    pub fn mapping(&self, name: Id) -> Option<&Mapping> {
        self.mappings.get(&name)
    }

    pub fn conditions(&self) -> &IndexMap<Id, Condition> {
        &self.conditions
    }

    pub fn condition(&self, name: Id) -> Option<&Condition> {
        self.conditions.get(&name)
    }

    pub fn resources(&self) -> &IndexMap<Id, Resource> {
        &self.resources
    }

    pub fn resource(&self, name: Id) -> Option<&Resource> {
        self.resources.get(&name)
    }

    pub fn outputs(&self) -> &IndexMap<Id, Output> {
        &self.outputs
    }

    pub fn output(&self, name: Id) -> Option<&Output> {
        self.outputs.get(&name)
    }

    /// Resolves the target of a `Ref` to the kind of entity it names.
    ///
    /// Outputs and mappings cannot be referenced and are never returned.
    pub fn resolve_name(&self, name: Id) -> Option<EntityKind> {
        if self.parameters.contains_key(&name) {
            Some(EntityKind::Parameter)
        } else if self.resources.contains_key(&name) {
            Some(EntityKind::Resource)
        } else if PseudoParameter::from_name(&name.to_name()).is_some() {
            Some(EntityKind::PseudoParameter)
        } else {
            None
        }
    }

    /// Removes the named resources and outputs.
    ///
    /// This is the only mutation applied to a built template.
    pub fn exclude(&mut self, resources: &[Id], outputs: &[Id]) {
        for name in resources {
            self.resources.shift_remove(name);
        }
        for name in outputs {
            self.outputs.shift_remove(name);
        }
    }

    /// Mutable access to every operand of the template, labelled with its
    /// document path.
    pub fn operands_mut(&mut self) -> Vec<(String, &mut Operand)> {
        let conditions = self.conditions.iter_mut().map(|(name, condition)| {
            (format!("Conditions.{name}"), &mut condition.expression)
        });
        let resources = self.resources.iter_mut().flat_map(|(name, resource)| {
            resource
                .operands_mut()
                .map(move |(path, operand)| (format!("Resources.{name}.{path}"), operand))
        });
        let outputs = self.outputs.iter_mut().flat_map(|(name, output)| {
            output
                .operands_mut()
                .map(move |(path, operand)| (format!("Outputs.{name}.{path}"), operand))
        });
        conditions.chain(resources).chain(outputs).collect()
    }

    /// Converts the model back into a long-form document tree.
    pub fn to_document(&self) -> Document {
        let mut root = DocumentMapping::new();
        if let Some(version) = &self.format_version {
            root.insert("AWSTemplateFormatVersion".into(), version.clone().into());
        }
        if let Some(description) = &self.description {
            root.insert("Description".into(), description.clone().into());
        }
        insert_section(&mut root, "Parameters", &self.parameters, Parameter::to_document);
        insert_section(&mut root, "Mappings", &self.mappings, Mapping::to_document);
        insert_section(&mut root, "Conditions", &self.conditions, |condition| {
            condition.expression.to_document()
        });
        insert_section(&mut root, "Resources", &self.resources, Resource::to_document);
        insert_section(&mut root, "Outputs", &self.outputs, Output::to_document);
        Document::Mapping(root)
    }
}

fn insert_section<T>(
    root: &mut DocumentMapping,
    section: &str,
    entries: &IndexMap<Id, T>,
    convert: impl Fn(&T) -> Document,
) {
    if entries.is_empty() {
        return;
    }
    let node: DocumentMapping = entries
        .iter()
        .map(|(name, entry)| (name.to_name().into(), convert(entry)))
        .collect();
    root.insert(section.into(), Document::Mapping(node));
}
