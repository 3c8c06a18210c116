//! Elaboration of a template document into the semantic model.
//!
//! Walks the top-level sections, validates each entity's shape, and hands
//! every expression slot to the [`Resolver`]. Errors are collected per entity
//! so a single run reports every malformed entity.

use indexmap::IndexMap;
use log::{debug, info, trace};
use serde_yaml::{Mapping as DocumentMapping, Value as Document};

use strata_core::{
    identifier::Id,
    template::{Condition, Mapping, Output, Parameter, Resource, Template},
    value::{Scalar, Value},
};

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError, Result},
    resolver::Resolver,
    section::{ResolveContext, Section},
};

/// Parameter attributes that constrain input values but play no part in
/// analysis.
const PARAMETER_CONSTRAINTS: [&str; 6] = [
    "AllowedPattern",
    "ConstraintDescription",
    "MaxLength",
    "MaxValue",
    "MinLength",
    "MinValue",
];

pub struct Builder<'r> {
    resolver: &'r mut Resolver,
    collector: DiagnosticCollector,
}

impl<'r> Builder<'r> {
    pub fn new(resolver: &'r mut Resolver) -> Self {
        Self {
            resolver,
            collector: DiagnosticCollector::new(),
        }
    }

    // ============================================================================
    // Main Entry Methods
    // ============================================================================

    pub fn build(mut self, document: &Document) -> std::result::Result<Template, ParseError> {
        debug!("Building template from document");
        let Document::Mapping(root) = document else {
            return Err(Diagnostic::error("template document must be a mapping")
                .with_code(ErrorCode::E002)
                .with_label("", "document root")
                .into());
        };

        let sections = self.split_sections(root)?;
        let mut template = Template::new();

        if let Some(node) = sections.get(&Section::FormatVersion) {
            if let Some(version) = self.collector.check(text(node, Section::FormatVersion.key())) {
                template.set_format_version(version);
            }
        }
        if let Some(node) = sections.get(&Section::Description) {
            if let Some(description) = self.collector.check(text(node, Section::Description.key()))
            {
                template.set_description(description);
            }
        }
        if let Some(node) = sections.get(&Section::Metadata) {
            let ctx = ResolveContext::new(Section::Metadata, Section::Metadata.key());
            self.collector.check(self.resolver.check_literal(node, &ctx));
        }
        if sections.contains_key(&Section::Rules) {
            debug!(section = Section::Rules.key(); "Skipping section without analysable content");
        }

        if let Some(node) = sections.get(&Section::Parameters) {
            for (name, body) in self.entities(node, Section::Parameters) {
                let parameter = self.parameter(name, body);
                if let Some(parameter) = self.collector.check(parameter) {
                    template.add_parameter(parameter);
                }
            }
        }
        if let Some(node) = sections.get(&Section::Mappings) {
            for (name, body) in self.entities(node, Section::Mappings) {
                let mapping = self.mapping(name, body);
                if let Some(mapping) = self.collector.check(mapping) {
                    template.add_mapping(mapping);
                }
            }
        }
        if let Some(node) = sections.get(&Section::Conditions) {
            for (name, body) in self.entities(node, Section::Conditions) {
                let ctx = ResolveContext::new(Section::Conditions, format!("Conditions.{name}"));
                let expression = self.resolver.resolve(body, &ctx);
                if let Some(expression) = self.collector.check(expression) {
                    template.add_condition(Condition::new(name, expression));
                }
            }
        }
        match sections.get(&Section::Resources) {
            Some(node) => {
                for (name, body) in self.entities(node, Section::Resources) {
                    let resource = self.resource(name, body);
                    if let Some(resource) = self.collector.check(resource) {
                        template.add_resource(resource);
                    }
                }
            }
            None => self.collector.emit(
                Diagnostic::error("template has no Resources section")
                    .with_code(ErrorCode::E202)
                    .with_label("", "document root")
                    .with_help("every template declares at least one resource"),
            ),
        }
        if let Some(node) = sections.get(&Section::Outputs) {
            for (name, body) in self.entities(node, Section::Outputs) {
                let output = self.output(name, body);
                if let Some(output) = self.collector.check(output) {
                    template.add_output(output);
                }
            }
        }

        self.collector.finish()?;

        info!(
            parameters = template.parameters().len(),
            mappings = template.mappings().len(),
            conditions = template.conditions().len(),
            resources = template.resources().len(),
            outputs = template.outputs().len();
            "Template elaboration completed",
        );
        Ok(template)
    }

    /// Indexes the top-level sections, rejecting unknown and unsupported ones.
    fn split_sections<'d>(
        &mut self,
        root: &'d DocumentMapping,
    ) -> std::result::Result<IndexMap<Section, &'d Document>, ParseError> {
        let mut sections = IndexMap::new();
        for (key, node) in root {
            let Some(key) = key.as_str() else {
                self.collector.emit(
                    Diagnostic::error("top-level keys must be strings")
                        .with_code(ErrorCode::E207)
                        .with_label("", "document root"),
                );
                continue;
            };
            match Section::from_key(key) {
                Some(Section::Transform) => self.collector.emit(
                    Diagnostic::error("template macros are not supported")
                        .with_code(ErrorCode::E204)
                        .with_label(key, "Transform section declared here")
                        .with_help("expand the transform before analysing the template"),
                ),
                Some(section) => {
                    sections.insert(section, node);
                }
                None => self.collector.emit(
                    Diagnostic::error(format!("unknown top-level section `{key}`"))
                        .with_code(ErrorCode::E207)
                        .with_label(key, "unknown section"),
                ),
            }
        }
        // A broken section layout makes every later error noise.
        std::mem::take(&mut self.collector).finish()?;
        Ok(sections)
    }

    /// Iterates the named entities of a section, reporting malformed names.
    fn entities<'d>(&mut self, node: &'d Document, section: Section) -> Vec<(Id, &'d Document)> {
        let Document::Mapping(entries) = node else {
            if !node.is_null() {
                self.collector.emit(
                    Diagnostic::error(format!("the {section} section must be a mapping"))
                        .with_code(ErrorCode::E208)
                        .with_label(section.key(), "declared here"),
                );
            }
            return Vec::new();
        };

        let mut out = Vec::with_capacity(entries.len());
        for (key, body) in entries {
            match logical_name(key, section) {
                Ok(name) => out.push((name, body)),
                Err(diag) => self.collector.emit(diag),
            }
        }
        trace!(section = section.key(), entities = out.len(); "Collected section entities");
        out
    }

    // ============================================================================
    // Entity Builders
    // ============================================================================

    fn parameter(&mut self, name: Id, body: &Document) -> Result<Parameter> {
        let path = format!("Parameters.{name}");
        self.resolver
            .check_literal(body, &ResolveContext::new(Section::Parameters, path.as_str()))?;
        let attributes = attributes(body, &path)?;

        let parameter_type = attributes
            .get("Type")
            .ok_or_else(|| missing_field(&path, "Type"))
            .and_then(|node| text(node, &format!("{path}.Type")))?;
        let mut parameter = Parameter::new(name, parameter_type);

        for (key, node) in &attributes {
            let field_path = format!("{path}.{key}");
            match key.as_str() {
                "Type" => {}
                "Default" => parameter = parameter.with_default(scalar(node, &field_path)?),
                "Description" => parameter = parameter.with_description(text(node, &field_path)?),
                "AllowedValues" => {
                    let Document::Sequence(items) = node else {
                        return Err(malformed(&field_path, "expected a list of values"));
                    };
                    let values = items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| scalar(item, &format!("{field_path}[{i}]")))
                        .collect::<Result<Vec<_>>>()?;
                    parameter = parameter.with_allowed_values(values);
                }
                "NoEcho" => {
                    let no_echo = Value::Scalar(scalar(node, &field_path)?)
                        .as_bool()
                        .ok_or_else(|| malformed(&field_path, "expected `true` or `false`"))?;
                    parameter = parameter.with_no_echo(no_echo);
                }
                key if PARAMETER_CONSTRAINTS.contains(&key) => {
                    trace!(parameter:% = name, attribute = key; "Ignoring value constraint");
                }
                other => {
                    return Err(Diagnostic::error(format!(
                        "unknown parameter attribute `{other}`"
                    ))
                    .with_code(ErrorCode::E208)
                    .with_label(field_path, "declared here"));
                }
            }
        }
        Ok(parameter)
    }

    fn mapping(&mut self, name: Id, body: &Document) -> Result<Mapping> {
        let path = format!("Mappings.{name}");
        self.resolver
            .check_literal(body, &ResolveContext::new(Section::Mappings, path.as_str()))?;

        let mut mapping = Mapping::new(name);
        for (top_key, level) in attributes(body, &path)? {
            let level_path = format!("{path}.{top_key}");
            for (second_key, node) in attributes(level, &level_path)? {
                let value = Value::from_document(node).ok_or_else(|| {
                    malformed(&format!("{level_path}.{second_key}"), "expected a literal value")
                })?;
                mapping = mapping.with_entry(top_key.clone(), second_key, value);
            }
        }
        Ok(mapping)
    }

    fn resource(&mut self, name: Id, body: &Document) -> Result<Resource> {
        let path = format!("Resources.{name}");
        let attributes = attributes(body, &path)?;

        let resource_type = attributes
            .get("Type")
            .ok_or_else(|| missing_field(&path, "Type"))
            .and_then(|node| text(node, &format!("{path}.Type")))?;
        let mut resource = Resource::new(name, resource_type);

        for (key, node) in &attributes {
            let field_path = format!("{path}.{key}");
            let ctx = ResolveContext::new(Section::Resources, field_path.as_str());
            match key.as_str() {
                "Type" => {}
                "Properties" => {
                    if node.is_null() {
                        continue;
                    }
                    for (property, value) in self::attributes(node, &field_path)? {
                        let operand = self
                            .resolver
                            .resolve(value, &ctx.plain(format!(".{property}")))?;
                        resource = resource.with_property(property, operand);
                    }
                }
                "Condition" => {
                    resource = resource.with_condition(Id::new(&text(node, &field_path)?));
                }
                "DependsOn" => resource = resource.with_depends_on(depends_on(node, &field_path)?),
                "DeletionPolicy" => {
                    resource = resource.with_deletion_policy(text(node, &field_path)?);
                }
                "UpdateReplacePolicy" => {
                    resource = resource.with_update_replace_policy(text(node, &field_path)?);
                }
                "Metadata" => resource = resource.with_metadata(self.resolver.resolve(node, &ctx)?),
                "CreationPolicy" => {
                    resource = resource.with_creation_policy(self.resolver.resolve(node, &ctx)?);
                }
                "UpdatePolicy" => {
                    resource = resource.with_update_policy(self.resolver.resolve(node, &ctx)?);
                }
                other => {
                    return Err(Diagnostic::error(format!(
                        "unknown resource attribute `{other}`"
                    ))
                    .with_code(ErrorCode::E203)
                    .with_label(field_path, "declared here")
                    .with_help(
                        "resource attributes are Type, Properties, Condition, DependsOn, \
                         DeletionPolicy, UpdateReplacePolicy, Metadata, CreationPolicy \
                         and UpdatePolicy; template macros are not expanded",
                    ));
                }
            }
        }
        Ok(resource)
    }

    fn output(&mut self, name: Id, body: &Document) -> Result<Output> {
        let path = format!("Outputs.{name}");
        let attributes = attributes(body, &path)?;

        let value = attributes
            .get("Value")
            .ok_or_else(|| missing_field(&path, "Value"))?;
        let value = self.resolver.resolve(
            value,
            &ResolveContext::new(Section::Outputs, format!("{path}.Value")),
        )?;
        let mut output = Output::new(name, value);

        for (key, node) in &attributes {
            let field_path = format!("{path}.{key}");
            match key.as_str() {
                "Value" => {}
                "Description" => output = output.with_description(text(node, &field_path)?),
                "Condition" => output = output.with_condition(Id::new(&text(node, &field_path)?)),
                "Export" => {
                    let export = self::attributes(node, &field_path)?;
                    let export_name = export
                        .get("Name")
                        .ok_or_else(|| missing_field(&field_path, "Name"))?;
                    let export_name = self.resolver.resolve(
                        export_name,
                        &ResolveContext::new(Section::Outputs, format!("{field_path}.Name")),
                    )?;
                    output = output.with_export_name(export_name);
                }
                other => {
                    return Err(Diagnostic::error(format!("unknown output attribute `{other}`"))
                        .with_code(ErrorCode::E208)
                        .with_label(field_path, "declared here"));
                }
            }
        }
        Ok(output)
    }
}

// ============================================================================
// Node Extraction Helpers
// ============================================================================

fn logical_name(key: &Document, section: Section) -> Result<Id> {
    let Some(name) = key.as_str() else {
        return Err(Diagnostic::error(format!(
            "logical names in the {section} section must be strings"
        ))
        .with_code(ErrorCode::E205)
        .with_label(section.key(), "in this section"));
    };
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(
            Diagnostic::error(format!("invalid logical name `{name}`"))
                .with_code(ErrorCode::E205)
                .with_label(format!("{section}.{name}"), "declared here")
                .with_help("logical names may only contain ASCII letters and digits"),
        );
    }
    Ok(Id::new(name))
}

/// Reads an entity body as a string-keyed mapping.
fn attributes<'d>(node: &'d Document, path: &str) -> Result<IndexMap<String, &'d Document>> {
    let Document::Mapping(entries) = node else {
        return Err(malformed(path, "expected a mapping"));
    };
    entries
        .iter()
        .map(|(key, value)| match Scalar::from_document(key) {
            Some(Scalar::Null) | None => Err(malformed(path, "mapping keys must be scalars")),
            Some(key) => Ok((key.to_text(), value)),
        })
        .collect()
}

fn text(node: &Document, path: &str) -> Result<String> {
    match Scalar::from_document(node) {
        Some(Scalar::Null) | None => Err(malformed(path, "expected a string")),
        Some(scalar) => Ok(scalar.to_text()),
    }
}

fn scalar(node: &Document, path: &str) -> Result<Scalar> {
    Scalar::from_document(node).ok_or_else(|| malformed(path, "expected a literal scalar"))
}

fn depends_on(node: &Document, path: &str) -> Result<Vec<Id>> {
    match node {
        Document::String(name) => Ok(vec![Id::new(name)]),
        Document::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Document::String(name) => Ok(Id::new(name)),
                _ => Err(malformed(&format!("{path}[{i}]"), "expected a logical name")),
            })
            .collect(),
        _ => Err(malformed(path, "expected a logical name or a list of them")),
    }
}

fn missing_field(path: &str, field: &str) -> Diagnostic {
    Diagnostic::error(format!("missing required field `{field}`"))
        .with_code(ErrorCode::E202)
        .with_label(path, "declared here")
}

fn malformed(path: &str, detail: &str) -> Diagnostic {
    Diagnostic::error(format!("malformed template entry: {detail}"))
        .with_code(ErrorCode::E208)
        .with_label(path, "found here")
}
