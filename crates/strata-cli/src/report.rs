//! Plain-text analysis report.

use strata::{Analysis, Analyzer, StrataError};

/// Renders the analysis summary written by `--format report`.
///
/// Output values are evaluated lazily: a failing output is reported inline
/// and does not fail the report.
pub fn render(analyzer: &Analyzer, analysis: &Analysis) -> Result<String, StrataError> {
    let template = analysis.template();
    let graph = analysis.graph();
    let mut lines = Vec::new();

    if let Some(description) = template.description() {
        lines.push(description.to_string());
        lines.push(String::new());
    }

    lines.push(format!(
        "Dependency graph: {} vertices, {} edges",
        graph.vertex_count(),
        graph.edge_count()
    ));

    lines.push("Resources (build order):".to_string());
    for (position, name) in graph.resource_build_order()?.iter().enumerate() {
        let resource_type = template
            .resource(*name)
            .map(|resource| resource.resource_type())
            .unwrap_or_default();
        lines.push(format!("  {}. {name} ({resource_type})", position + 1));
    }

    if !analysis.conditions().is_empty() {
        lines.push("Conditions:".to_string());
        for (name, value) in analysis.conditions().iter() {
            lines.push(format!("  {name} = {value}"));
        }
    }

    let unused = graph.unused_parameters();
    if !unused.is_empty() {
        lines.push("Unused parameters:".to_string());
        lines.extend(unused.iter().map(|name| format!("  {name}")));
    }

    let pruned = analysis.pruned();
    if !pruned.is_empty() {
        lines.push("Pruned:".to_string());
        lines.extend(pruned.resources().iter().map(|name| format!("  resource {name}")));
        lines.extend(pruned.outputs().iter().map(|name| format!("  output {name}")));
    }

    if !template.outputs().is_empty() {
        lines.push("Outputs:".to_string());
        let mut evaluator = analyzer.evaluator(template)?;
        for (name, output) in template.outputs() {
            match evaluator.evaluate(output.value()) {
                Ok(value) => lines.push(format!("  {name} = {value}")),
                Err(err) => lines.push(format!("  {name} = <error: {err}>")),
            }
        }
    }

    lines.push(String::new());
    Ok(lines.join("\n"))
}
