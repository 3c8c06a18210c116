//! Command-line argument definitions for the Strata CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control input/output paths, configuration file
//! selection, analysis options, and logging verbosity.

use clap::{Parser, ValueEnum};

/// Command-line arguments for the Strata template analyzer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input template (YAML or JSON)
    #[arg(help = "Path to the input file")]
    pub input: String,

    /// Path to the output file; standard output when omitted
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Report)]
    pub format: Format,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Remove resources and outputs whose condition evaluates to false
    #[arg(long)]
    pub exclude_conditional_resources: bool,

    /// Runtime parameter value, as NAME=VALUE (repeatable)
    #[arg(short = 'p', long = "parameter", value_parser = parse_key_value)]
    pub parameters: Vec<(String, String)>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// What the CLI writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable analysis summary
    Report,
    /// Graphviz DOT of the dependency graph
    Dot,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, found `{raw}`"))?;
    if name.is_empty() {
        return Err(format!("missing parameter name in `{raw}`"));
    }
    Ok((name.to_string(), value.to_string()))
}
