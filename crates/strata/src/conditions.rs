//! Condition evaluation and pruning of conditional entities.
//!
//! Conditions are evaluated in dependency order so that a condition is only
//! evaluated after every condition it references. Pruning then removes the
//! resources and outputs whose governing condition is false.

use indexmap::IndexMap;
use log::{debug, info};

use strata_core::{
    eval::{EvalError, Evaluator},
    identifier::Id,
    template::Template,
};

use crate::{
    error::StrataError,
    structure::{DependencyGraph, Vertex},
};

/// Evaluated conditions, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionTable {
    values: IndexMap<Id, bool>,
}

impl ConditionTable {
    /// The value of a condition, if it was evaluated.
    pub fn get(&self, name: Id) -> Option<bool> {
        self.values.get(&name).copied()
    }

    /// Conditions in the order they were evaluated.
    pub fn iter(&self) -> impl Iterator<Item = (Id, bool)> + '_ {
        self.values.iter().map(|(name, value)| (*name, *value))
    }

    pub fn order(&self) -> impl Iterator<Item = Id> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn value_of(&self, name: Id) -> Result<bool, EvalError> {
        self.get(name).ok_or_else(|| EvalError::UnknownCondition {
            name: name.to_name(),
        })
    }
}

/// Entities removed by [`prune`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    resources: Vec<Id>,
    outputs: Vec<Id>,
}

impl PruneReport {
    pub fn resources(&self) -> &[Id] {
        &self.resources
    }

    pub fn outputs(&self) -> &[Id] {
        &self.outputs
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.outputs.is_empty()
    }
}

/// Evaluates every condition of the graph in dependency order.
///
/// # Errors
///
/// Returns [`GraphError::CircularCondition`](crate::GraphError::CircularCondition)
/// before anything is evaluated when the conditions form a cycle, or the
/// first evaluation error.
pub fn evaluate_conditions(
    graph: &DependencyGraph,
    evaluator: &mut Evaluator<'_>,
) -> Result<ConditionTable, StrataError> {
    let order = graph.condition_order()?;
    debug!(conditions = order.len(); "Evaluating conditions");

    let mut values = IndexMap::with_capacity(order.len());
    for name in order {
        let value = evaluator.condition(name)?;
        values.insert(name, value);
    }
    Ok(ConditionTable { values })
}

/// Removes resources and outputs whose governing condition is false from the
/// template and the graph.
///
/// Every governing condition is looked up before anything is removed, so on
/// error both the template and the graph are left unchanged.
///
/// # Errors
///
/// Returns an evaluation error when a governing condition is missing from
/// `table`.
pub fn prune(
    template: &mut Template,
    graph: &mut DependencyGraph,
    table: &ConditionTable,
) -> Result<PruneReport, StrataError> {
    let mut report = PruneReport::default();
    for (name, resource) in template.resources() {
        if let Some(condition) = resource.condition() {
            if !table.value_of(condition)? {
                report.resources.push(*name);
            }
        }
    }
    for (name, output) in template.outputs() {
        if let Some(condition) = output.condition() {
            if !table.value_of(condition)? {
                report.outputs.push(*name);
            }
        }
    }

    if report.is_empty() {
        return Ok(report);
    }

    template.exclude(&report.resources, &report.outputs);
    let vertices: Vec<Vertex> = report
        .resources
        .iter()
        .map(|name| Vertex::resource(*name))
        .chain(report.outputs.iter().map(|name| Vertex::output(*name)))
        .collect();
    graph.remove_vertices(&vertices);

    info!(
        resources = report.resources.len(),
        outputs = report.outputs.len();
        "Pruned conditional entities",
    );
    Ok(report)
}
