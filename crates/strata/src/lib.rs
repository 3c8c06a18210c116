//! Strata - dependency analysis for infrastructure templates.
//!
//! Parses YAML or JSON templates into a semantic model, builds the
//! dependency graph between parameters, resources, outputs and conditions,
//! evaluates conditions in dependency order and optionally prunes the
//! entities whose governing condition is false.

pub mod config;
pub mod export;
pub mod structure;

mod conditions;
mod error;

pub use strata_core::{eval, identifier, intrinsic, pseudo, template, value};

pub use conditions::{ConditionTable, PruneReport, evaluate_conditions, prune};
pub use error::{GraphError, StrataError};

use log::{debug, info, trace};

use strata_core::{eval::Evaluator, template::Template};

use config::AppConfig;
use structure::DependencyGraph;

/// Runs the analysis pipeline over template sources.
///
/// # Examples
///
/// ```rust
/// use strata::{Analyzer, config::AppConfig};
///
/// let source = r#"
///     Resources:
///       Queue: {Type: AWS::SQS::Queue}
///       Topic:
///         Type: AWS::SNS::Topic
///         Properties:
///           Subscription:
///             - Endpoint: !GetAtt Queue.Arn
///               Protocol: sqs
/// "#;
///
/// let analyzer = Analyzer::new(AppConfig::default());
/// let analysis = analyzer.analyze(source).expect("Failed to analyze");
///
/// let order = analysis.graph().resource_build_order().expect("Acyclic");
/// assert_eq!(order.len(), 2);
/// assert_eq!(order[0], "Queue");
/// ```
#[derive(Debug, Default)]
pub struct Analyzer {
    config: AppConfig,
}

impl Analyzer {
    /// Create a new analyzer with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Runtime parameter values, pseudo-parameter overrides and
    ///   pruning options
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Parse template source into the semantic model.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Parse`] carrying the diagnostics and the source.
    pub fn parse(&self, source: &str) -> Result<Template, StrataError> {
        info!("Parsing template");

        let template =
            strata_parser::parse(source).map_err(|err| StrataError::new_parse_error(err, source))?;

        debug!(
            parameters = template.parameters().len(),
            resources = template.resources().len(),
            outputs = template.outputs().len(),
            conditions = template.conditions().len();
            "Template parsed successfully",
        );
        trace!(template:?; "Parsed template");

        Ok(template)
    }

    /// Parse and analyze template source.
    ///
    /// # Errors
    ///
    /// Returns the first parse, graph, configuration or evaluation error.
    pub fn analyze(&self, source: &str) -> Result<Analysis, StrataError> {
        let template = self.parse(source)?;
        self.analyze_template(template)
    }

    /// Build the dependency graph of `template`, evaluate its conditions and,
    /// when configured, prune conditional resources and outputs.
    ///
    /// Every condition is evaluated, also when pruning is disabled, so the
    /// [`Analysis`] always carries the full condition table.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Graph`] for unresolved references, self
    /// references and condition cycles, and [`StrataError::Evaluation`] when a
    /// condition cannot be evaluated, for instance because it reads a
    /// parameter with no runtime value and no default. Nothing is pruned on
    /// error.
    pub fn analyze_template(&self, mut template: Template) -> Result<Analysis, StrataError> {
        info!("Building dependency graph");
        let mut graph = DependencyGraph::build(&template)?;

        let conditions = {
            let mut evaluator = self.evaluator(&template)?;
            evaluate_conditions(&graph, &mut evaluator)?
        };
        info!(conditions = conditions.len(); "Conditions evaluated");

        let pruned = if self.config.analysis().exclude_conditional_resources() {
            prune(&mut template, &mut graph, &conditions)?
        } else {
            PruneReport::default()
        };

        Ok(Analysis {
            template,
            graph,
            conditions,
            pruned,
        })
    }

    /// An evaluator for `template` with the configured runtime parameter
    /// values, pseudo-parameter overrides and import stand-ins.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] when a pseudo-parameter override names
    /// an unknown pseudo-parameter.
    pub fn evaluator<'t>(&self, template: &'t Template) -> Result<Evaluator<'t>, StrataError> {
        let analysis = self.config.analysis();
        let pseudo_parameters = analysis.pseudo_parameters().map_err(StrataError::Config)?;
        Ok(Evaluator::new(template)
            .with_parameter_values(analysis.parameter_values().clone())
            .with_pseudo_parameters(pseudo_parameters)
            .with_imports(analysis.imports()))
    }
}

/// The result of analyzing one template.
#[derive(Debug, Clone)]
pub struct Analysis {
    template: Template,
    graph: DependencyGraph,
    conditions: ConditionTable,
    pruned: PruneReport,
}

impl Analysis {
    /// The template, without pruned entities.
    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn conditions(&self) -> &ConditionTable {
        &self.conditions
    }

    /// Entities removed because their condition was false. Empty unless
    /// pruning is enabled.
    pub fn pruned(&self) -> &PruneReport {
        &self.pruned
    }

    pub fn into_template(self) -> Template {
        self.template
    }

    /// Render the dependency graph as Graphviz DOT.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Export`] if rendering fails.
    pub fn to_dot(&self) -> Result<String, StrataError> {
        Ok(export::dot::render(&self.graph)?)
    }
}
