//! Dependency structure of a template.

mod dependency;
mod graph_base;

pub use dependency::{DependencyGraph, Edge, EdgeDetail, Entity, Shape, Vertex, VertexKind};
