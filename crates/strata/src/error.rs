//! Error types for Strata operations.
//!
//! This module provides the main error type [`StrataError`] which wraps
//! the errors of every analysis stage, and [`GraphError`] for failures while
//! building or ordering the dependency graph.

use std::io;

use thiserror::Error;

use strata_core::{eval::EvalError, identifier::Id};
use strata_parser::error::ParseError;

use crate::structure::{Vertex, VertexKind};

/// The main error type for Strata operations.
///
/// # Diagnostic Variants
///
/// The `Parse` variant keeps the source text next to the structured
/// diagnostics so that callers can render them against the document.
#[derive(Debug, Error)]
pub enum StrataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Parse { err: ParseError, src: String },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvalError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(Box<dyn std::error::Error>),
}

impl From<crate::export::Error> for StrataError {
    fn from(error: crate::export::Error) -> Self {
        Self::Export(Box::new(error))
    }
}

impl StrataError {
    /// Create a new `Parse` error with the associated source code.
    pub fn new_parse_error(err: ParseError, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            src: src.into(),
        }
    }
}

/// Failures while building or ordering the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("{referrer} references `{target}`, which is not declared")]
    UnresolvedReference { referrer: Vertex, target: Id },

    #[error("{vertex} references itself")]
    SelfReference { vertex: Vertex },

    #[error("condition `{condition}` references resource `{resource}`")]
    IllegalConditionReference { condition: Id, resource: Id },

    #[error("conditions form a cycle: {}", format_cycle(.cycle))]
    CircularCondition { cycle: Vec<Id> },

    #[error("resources form a dependency cycle: {}", format_cycle(.cycle))]
    CircularDependency { cycle: Vec<Id> },

    #[error("`{name}` is declared as both a {first} and a {second}")]
    DuplicateVertex {
        name: Id,
        first: VertexKind,
        second: VertexKind,
    },
}

impl GraphError {
    /// Stable code of the error, continuing the parser's numbering.
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::UnresolvedReference { .. } => "E300",
            GraphError::SelfReference { .. } => "E301",
            GraphError::IllegalConditionReference { .. } => "E302",
            GraphError::CircularCondition { .. } => "E303",
            GraphError::CircularDependency { .. } => "E304",
            GraphError::DuplicateVertex { .. } => "E305",
        }
    }
}

fn format_cycle(cycle: &[Id]) -> String {
    let mut names: Vec<String> = cycle.iter().map(Id::to_name).collect();
    if let Some(first) = names.first().cloned() {
        names.push(first);
    }
    names.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_closes_the_loop() {
        let err = GraphError::CircularCondition {
            cycle: vec![Id::new("C1"), Id::new("C2")],
        };
        assert_eq!(err.to_string(), "conditions form a cycle: C1 -> C2 -> C1");
        assert_eq!(err.code(), "E303");
    }

    #[test]
    fn test_unresolved_reference_names_both_ends() {
        let err = GraphError::UnresolvedReference {
            referrer: Vertex::resource(Id::new("Queue")),
            target: Id::new("Missing"),
        };
        assert_eq!(
            err.to_string(),
            "resource `Queue` references `Missing`, which is not declared"
        );
    }
}
