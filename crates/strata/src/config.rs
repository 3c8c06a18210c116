//! Configuration types for Strata template analysis.
//!
//! All types implement [`serde::Deserialize`] so they can be loaded from
//! external sources. Keys are accepted both in `snake_case` and in the
//! `camelCase` spelling used by template tooling.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration root.
//! - [`AnalysisConfig`] - Runtime values and pruning options used while
//!   evaluating a template.
//!
//! # Example
//!
//! ```
//! # use strata::config::AppConfig;
//! let config = AppConfig::default();
//! assert!(!config.analysis().exclude_conditional_resources());
//! ```

use indexmap::IndexMap;
use serde::Deserialize;

use strata_core::{
    pseudo::{PseudoParameter, PseudoParameters},
    value::{Scalar, Value},
};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Analysis configuration section.
    #[serde(default)]
    analysis: AnalysisConfig,
}

impl AppConfig {
    pub fn new(analysis: AnalysisConfig) -> Self {
        Self { analysis }
    }

    /// Returns the analysis configuration.
    pub fn analysis(&self) -> &AnalysisConfig {
        &self.analysis
    }
}

/// Options that control how a template is evaluated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisConfig {
    /// Remove resources and outputs whose governing condition is false.
    #[serde(default, alias = "excludeConditionalResources")]
    exclude_conditional_resources: bool,

    /// Runtime parameter values, taking precedence over declared defaults.
    ///
    /// Conditions are evaluated whether or not pruning is enabled, so a
    /// condition reading a parameter with neither a value here nor a default
    /// fails the analysis.
    #[serde(default, alias = "parameterValues")]
    parameter_values: IndexMap<String, Scalar>,

    /// Overrides of pseudo-parameter values, keyed by `AWS::` name.
    #[serde(default, alias = "pseudoParameters")]
    pseudo_parameters: IndexMap<String, String>,

    /// Values returned by `Fn::ImportValue`, keyed by export name.
    #[serde(default)]
    imports: IndexMap<String, String>,
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exclude_conditional_resources(mut self, exclude: bool) -> Self {
        self.exclude_conditional_resources = exclude;
        self
    }

    pub fn with_parameter_value(mut self, name: impl Into<String>, value: Scalar) -> Self {
        self.parameter_values.insert(name.into(), value);
        self
    }

    pub fn with_pseudo_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.pseudo_parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_import(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.imports.insert(name.into(), value.into());
        self
    }

    pub fn exclude_conditional_resources(&self) -> bool {
        self.exclude_conditional_resources
    }

    pub fn parameter_values(&self) -> &IndexMap<String, Scalar> {
        &self.parameter_values
    }

    /// Builds the pseudo-parameter table from the configured overrides.
    ///
    /// # Errors
    ///
    /// Returns the first override whose name is not a pseudo-parameter.
    pub fn pseudo_parameters(&self) -> Result<PseudoParameters, String> {
        self.pseudo_parameters
            .iter()
            .try_fold(PseudoParameters::new(), |table, (name, value)| {
                let parameter = PseudoParameter::from_name(name)
                    .ok_or_else(|| format!("`{name}` is not a pseudo-parameter"))?;
                Ok(table.with_value(parameter, Value::string(value.as_str())))
            })
    }

    pub fn imports(&self) -> IndexMap<String, Value> {
        self.imports
            .iter()
            .map(|(name, value)| (name.clone(), Value::string(value.as_str())))
            .collect()
    }
}
