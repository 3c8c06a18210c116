//! CLI logic for the Strata template analyzer.
//!
//! This module contains the core CLI logic for the Strata template analyzer.

pub mod error_adapter;

mod args;
mod config;
mod report;

pub use args::{Args, Format};

use std::{fs, io::Write};

use log::info;

use strata::{Analyzer, StrataError, config::AppConfig, value::Scalar};

/// Run the Strata CLI application
///
/// This function analyzes the input template and writes either the report or
/// the DOT rendering of its dependency graph.
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `StrataError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Parsing errors
/// - Dependency graph errors
/// - Condition evaluation errors
pub fn run(args: &Args) -> Result<(), StrataError> {
    info!(
        input_path = args.input,
        format:? = args.format;
        "Analyzing template"
    );

    let app_config = config::load_config(args.config.as_ref())?;
    let app_config = apply_overrides(app_config, args);

    let source = fs::read_to_string(&args.input)?;

    let analyzer = Analyzer::new(app_config);
    let analysis = analyzer.analyze(&source)?;
    let rendered = match args.format {
        Format::Report => report::render(&analyzer, &analysis)?,
        Format::Dot => analysis.to_dot()?,
    };

    match &args.output {
        Some(path) => {
            fs::write(path, rendered)?;
            info!(output_file = path; "Analysis written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Command-line flags take precedence over the configuration file.
fn apply_overrides(config: AppConfig, args: &Args) -> AppConfig {
    let mut analysis = config.analysis().clone();
    if args.exclude_conditional_resources {
        analysis = analysis.with_exclude_conditional_resources(true);
    }
    for (name, value) in &args.parameters {
        analysis = analysis.with_parameter_value(name.clone(), Scalar::String(value.clone()));
    }
    AppConfig::new(analysis)
}
