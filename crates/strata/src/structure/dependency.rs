//! The template dependency graph.
//!
//! One vertex per declared parameter, resource, output and condition, plus
//! one per pseudo-parameter that is actually referenced. An edge points from
//! the entity that holds a reference to the entity it names.

use std::fmt;

use indexmap::IndexSet;
use log::{debug, trace};

use strata_core::{
    identifier::Id,
    intrinsic::{Reference, ReferenceKind},
    pseudo::PseudoParameter,
    template::{Condition, EntityKind, Output, Parameter, Resource, Template},
};

use super::graph_base::{Edge as BaseEdge, GraphInternal};
use crate::error::GraphError;

/// The kind of entity a vertex stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexKind {
    Parameter,
    PseudoParameter,
    Condition,
    Resource,
    Output,
}

impl VertexKind {
    pub fn section(&self) -> &'static str {
        match self {
            VertexKind::Parameter => "Parameters",
            VertexKind::PseudoParameter => "PseudoParameters",
            VertexKind::Condition => "Conditions",
            VertexKind::Resource => "Resources",
            VertexKind::Output => "Outputs",
        }
    }
}

impl From<EntityKind> for VertexKind {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Parameter => VertexKind::Parameter,
            EntityKind::PseudoParameter => VertexKind::PseudoParameter,
            EntityKind::Resource => VertexKind::Resource,
            EntityKind::Output => VertexKind::Output,
            EntityKind::Condition => VertexKind::Condition,
        }
    }
}

impl fmt::Display for VertexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VertexKind::Parameter => "parameter",
            VertexKind::PseudoParameter => "pseudo-parameter",
            VertexKind::Condition => "condition",
            VertexKind::Resource => "resource",
            VertexKind::Output => "output",
        };
        f.write_str(name)
    }
}

/// Rendering shape of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Box,
    Ellipse,
    Note,
    Parallelogram,
    Diamond,
}

impl Shape {
    /// The Graphviz shape name.
    pub fn dot_name(&self) -> &'static str {
        match self {
            Shape::Box => "box",
            Shape::Ellipse => "ellipse",
            Shape::Note => "note",
            Shape::Parallelogram => "parallelogram",
            Shape::Diamond => "diamond",
        }
    }
}

/// A vertex of the dependency graph, identified by its kind and logical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vertex {
    kind: VertexKind,
    name: Id,
}

impl Vertex {
    pub fn new(kind: VertexKind, name: Id) -> Self {
        Self { kind, name }
    }

    pub fn parameter(name: Id) -> Self {
        Self::new(VertexKind::Parameter, name)
    }

    pub fn pseudo_parameter(name: Id) -> Self {
        Self::new(VertexKind::PseudoParameter, name)
    }

    pub fn condition(name: Id) -> Self {
        Self::new(VertexKind::Condition, name)
    }

    pub fn resource(name: Id) -> Self {
        Self::new(VertexKind::Resource, name)
    }

    pub fn output(name: Id) -> Self {
        Self::new(VertexKind::Output, name)
    }

    pub fn kind(&self) -> VertexKind {
        self.kind
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn shape(&self) -> Shape {
        match self.kind {
            VertexKind::Resource => Shape::Box,
            VertexKind::Parameter => Shape::Ellipse,
            VertexKind::PseudoParameter => Shape::Note,
            VertexKind::Output => Shape::Parallelogram,
            VertexKind::Condition => Shape::Diamond,
        }
    }

    /// Looks up the model entity this vertex stands for.
    pub fn entity<'t>(&self, template: &'t Template) -> Option<Entity<'t>> {
        match self.kind {
            VertexKind::Parameter => template.parameter(self.name).map(Entity::Parameter),
            VertexKind::PseudoParameter => {
                PseudoParameter::from_name(&self.name.to_name()).map(Entity::PseudoParameter)
            }
            VertexKind::Condition => template.condition(self.name).map(Entity::Condition),
            VertexKind::Resource => template.resource(self.name).map(Entity::Resource),
            VertexKind::Output => template.output(self.name).map(Entity::Output),
        }
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.kind, self.name)
    }
}

/// A model entity behind a vertex.
#[derive(Debug, Clone, Copy)]
pub enum Entity<'t> {
    Parameter(&'t Parameter),
    PseudoParameter(PseudoParameter),
    Condition(&'t Condition),
    Resource(&'t Resource),
    Output(&'t Output),
}

/// Why one entity depends on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeDetail {
    /// `Ref` to a resource.
    DirectReference,
    /// `Ref` to a parameter or pseudo-parameter.
    ParameterReference,
    /// `Fn::GetAtt` of the given attribute.
    AttributeReference(Id),
    /// An explicit `DependsOn` entry.
    DependsOn,
    /// A `Condition` intrinsic, the condition of `Fn::If`, or an entity's
    /// governing `Condition` attribute.
    ConditionReference,
}

impl EdgeDetail {
    pub fn label(&self) -> String {
        match self {
            EdgeDetail::DirectReference => "Ref".to_string(),
            EdgeDetail::ParameterReference => "Ref".to_string(),
            EdgeDetail::AttributeReference(attribute) => format!("GetAtt {attribute}"),
            EdgeDetail::DependsOn => "DependsOn".to_string(),
            EdgeDetail::ConditionReference => "Condition".to_string(),
        }
    }
}

/// A directed edge: `source` depends on `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    source: Vertex,
    target: Vertex,
    detail: EdgeDetail,
}

impl Edge {
    fn from_base(edge: BaseEdge<Vertex, EdgeDetail>) -> Self {
        Self {
            source: edge.source,
            target: edge.target,
            detail: edge.value,
        }
    }

    pub fn source(&self) -> Vertex {
        self.source
    }

    pub fn target(&self) -> Vertex {
        self.target
    }

    pub fn detail(&self) -> EdgeDetail {
        self.detail
    }
}

/// Dependency graph of a template.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: GraphInternal<Vertex, EdgeDetail>,
}

impl DependencyGraph {
    /// Builds the graph for `template`.
    ///
    /// # Errors
    ///
    /// Fails on the first reference to an undeclared name, self reference,
    /// condition referencing a resource, or name declared twice.
    pub fn build(template: &Template) -> Result<Self, GraphError> {
        let mut builder = GraphBuilder {
            template,
            graph: GraphInternal::new(),
        };
        builder.add_declared_vertices()?;

        for (name, condition) in template.conditions() {
            let source = Vertex::condition(*name);
            builder.add_references(source, &condition.expression().referenced_objects())?;
        }
        for (name, resource) in template.resources() {
            let source = Vertex::resource(*name);
            let references = resource
                .operands()
                .flat_map(|(_, operand)| operand.referenced_objects())
                .collect::<IndexSet<_>>();
            builder.add_references(source, &references)?;
            for dependency in resource.depends_on() {
                builder.add_depends_on(source, *dependency)?;
            }
            if let Some(condition) = resource.condition() {
                builder.add_governing_condition(source, condition)?;
            }
        }
        for (name, output) in template.outputs() {
            let source = Vertex::output(*name);
            let references = output
                .operands()
                .flat_map(|(_, operand)| operand.referenced_objects())
                .collect::<IndexSet<_>>();
            builder.add_references(source, &references)?;
            if let Some(condition) = output.condition() {
                builder.add_governing_condition(source, condition)?;
            }
        }

        let graph = builder.graph;
        debug!(
            vertices = graph.nodes_count(),
            edges = graph.edges_count();
            "Dependency graph built",
        );
        Ok(Self { graph })
    }

    /// All vertices in insertion order: parameters, resources, outputs and
    /// conditions as declared, then referenced pseudo-parameters.
    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.graph.nodes()
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.nodes_count()
    }

    pub fn contains(&self, vertex: Vertex) -> bool {
        self.graph.contains_node(vertex)
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edges().map(Edge::from_base)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edges_count()
    }

    /// Edges leaving `vertex`: what it depends on.
    pub fn edges_from(&self, vertex: Vertex) -> impl Iterator<Item = Edge> + '_ {
        self.graph.outgoing(vertex).map(Edge::from_base)
    }

    /// Edges entering `vertex`: what depends on it.
    pub fn edges_to(&self, vertex: Vertex) -> impl Iterator<Item = Edge> + '_ {
        self.graph.incoming(vertex).map(Edge::from_base)
    }

    /// Vertices nothing depends on.
    pub fn roots(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.graph.roots()
    }

    /// Declared parameters no entity references.
    pub fn unused_parameters(&self) -> Vec<Id> {
        self.graph
            .roots()
            .filter(|vertex| vertex.kind() == VertexKind::Parameter)
            .map(|vertex| vertex.name())
            .collect()
    }

    /// Resources ordered so that every resource comes after the resources
    /// it depends on.
    pub fn resource_build_order(&self) -> Result<Vec<Id>, GraphError> {
        self.order_of(VertexKind::Resource)
            .map_err(|cycle| GraphError::CircularDependency { cycle })
    }

    /// Conditions ordered so that every condition comes after the conditions
    /// it references.
    pub fn condition_order(&self) -> Result<Vec<Id>, GraphError> {
        self.order_of(VertexKind::Condition)
            .map_err(|cycle| GraphError::CircularCondition { cycle })
    }

    /// Removes `vertices` and every edge touching them.
    pub fn remove_vertices(&mut self, vertices: &[Vertex]) {
        if vertices.is_empty() {
            return;
        }
        self.graph.retain_nodes(|vertex| !vertices.contains(&vertex));
        trace!(removed = vertices.len(); "Removed vertices from dependency graph");
    }

    fn order_of(&self, kind: VertexKind) -> Result<Vec<Id>, Vec<Id>> {
        let names = |vertices: Vec<Vertex>| vertices.iter().map(Vertex::name).collect();
        self.graph
            .dependency_order(|vertex| vertex.kind() == kind)
            .map(names)
            .map_err(names)
    }
}

struct GraphBuilder<'t> {
    template: &'t Template,
    graph: GraphInternal<Vertex, EdgeDetail>,
}

impl GraphBuilder<'_> {
    fn add_declared_vertices(&mut self) -> Result<(), GraphError> {
        let template = self.template;
        for name in template.parameters().keys() {
            self.add_vertex(Vertex::parameter(*name))?;
        }
        for name in template.resources().keys() {
            if template.parameter(*name).is_some() {
                return Err(GraphError::DuplicateVertex {
                    name: *name,
                    first: VertexKind::Parameter,
                    second: VertexKind::Resource,
                });
            }
            self.add_vertex(Vertex::resource(*name))?;
        }
        for name in template.outputs().keys() {
            self.add_vertex(Vertex::output(*name))?;
        }
        for name in template.conditions().keys() {
            self.add_vertex(Vertex::condition(*name))?;
        }
        Ok(())
    }

    fn add_vertex(&mut self, vertex: Vertex) -> Result<(), GraphError> {
        if self.graph.add_node(vertex) {
            Ok(())
        } else {
            Err(GraphError::DuplicateVertex {
                name: vertex.name(),
                first: vertex.kind(),
                second: vertex.kind(),
            })
        }
    }

    fn add_references(
        &mut self,
        source: Vertex,
        references: &IndexSet<Reference>,
    ) -> Result<(), GraphError> {
        for reference in references {
            let (target, detail) = self.resolve(source, reference)?;
            self.add_edge(source, target, detail)?;
        }
        Ok(())
    }

    fn add_depends_on(&mut self, source: Vertex, dependency: Id) -> Result<(), GraphError> {
        if self.template.resource(dependency).is_none() {
            return Err(GraphError::UnresolvedReference {
                referrer: source,
                target: dependency,
            });
        }
        self.add_edge(source, Vertex::resource(dependency), EdgeDetail::DependsOn)
    }

    fn add_governing_condition(&mut self, source: Vertex, condition: Id) -> Result<(), GraphError> {
        if self.template.condition(condition).is_none() {
            return Err(GraphError::UnresolvedReference {
                referrer: source,
                target: condition,
            });
        }
        self.add_edge(
            source,
            Vertex::condition(condition),
            EdgeDetail::ConditionReference,
        )
    }

    fn add_edge(
        &mut self,
        source: Vertex,
        target: Vertex,
        detail: EdgeDetail,
    ) -> Result<(), GraphError> {
        if source == target {
            return Err(GraphError::SelfReference { vertex: source });
        }
        if source.kind() == VertexKind::Condition && target.kind() == VertexKind::Resource {
            return Err(GraphError::IllegalConditionReference {
                condition: source.name(),
                resource: target.name(),
            });
        }
        if target.kind() == VertexKind::PseudoParameter {
            self.graph.add_node(target);
        }
        if self.graph.contains_edge(source, target, detail) {
            return Ok(());
        }
        trace!(source:% = source, target:% = target, detail:? = detail; "Adding dependency edge");
        self.graph.add_edge(source, target, detail);
        Ok(())
    }

    /// Finds the vertex a reference names and the kind of dependency.
    fn resolve(
        &self,
        source: Vertex,
        reference: &Reference,
    ) -> Result<(Vertex, EdgeDetail), GraphError> {
        let name = reference.name;
        let unresolved = || GraphError::UnresolvedReference {
            referrer: source,
            target: name,
        };
        match reference.kind {
            ReferenceKind::Ref => match self.template.resolve_name(name) {
                Some(EntityKind::Parameter) => {
                    Ok((Vertex::parameter(name), EdgeDetail::ParameterReference))
                }
                Some(EntityKind::PseudoParameter) => {
                    Ok((Vertex::pseudo_parameter(name), EdgeDetail::ParameterReference))
                }
                Some(EntityKind::Resource) => {
                    Ok((Vertex::resource(name), EdgeDetail::DirectReference))
                }
                _ => Err(unresolved()),
            },
            ReferenceKind::GetAtt(attribute) => match self.template.resource(name) {
                Some(_) => Ok((
                    Vertex::resource(name),
                    EdgeDetail::AttributeReference(attribute),
                )),
                None => Err(unresolved()),
            },
            ReferenceKind::Condition => match self.template.condition(name) {
                Some(_) => Ok((Vertex::condition(name), EdgeDetail::ConditionReference)),
                None => Err(unresolved()),
            },
        }
    }
}
