//! Graphviz DOT rendering of the dependency graph.
//!
//! Vertices are drawn with the shape of their kind and edges are labelled
//! with their [`EdgeDetail`](crate::structure::EdgeDetail).

use std::io::Write;

use log::debug;

use super::{Error, Exporter};
use crate::structure::{DependencyGraph, Vertex};

/// Writes a dependency graph as a DOT digraph.
#[derive(Debug)]
pub struct DotExporter<W: Write> {
    writer: W,
    name: String,
}

impl<W: Write> DotExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            name: "template".to_string(),
        }
    }

    /// Sets the name of the emitted digraph.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_vertex(&mut self, vertex: Vertex) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "    {} [label={}, shape={}];",
            node_id(vertex),
            quote(&vertex.name().to_name()),
            vertex.shape().dot_name(),
        )
    }
}

impl<W: Write> Exporter for DotExporter<W> {
    fn export_graph(&mut self, graph: &DependencyGraph) -> Result<(), Error> {
        writeln!(self.writer, "digraph {} {{", quote(&self.name))?;
        writeln!(self.writer, "    rankdir=LR;")?;
        for vertex in graph.vertices() {
            self.write_vertex(vertex)?;
        }
        for edge in graph.edges() {
            writeln!(
                self.writer,
                "    {} -> {} [label={}];",
                node_id(edge.source()),
                node_id(edge.target()),
                quote(&edge.detail().label()),
            )?;
        }
        writeln!(self.writer, "}}")?;
        self.writer.flush()?;

        debug!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count();
            "Dependency graph exported as DOT",
        );
        Ok(())
    }
}

/// Renders `graph` into a DOT string.
///
/// # Errors
///
/// Returns [`Error::Render`] if the rendered output is not valid UTF-8.
pub fn render(graph: &DependencyGraph) -> Result<String, Error> {
    let mut exporter = DotExporter::new(Vec::new());
    exporter.export_graph(graph)?;
    String::from_utf8(exporter.into_inner()).map_err(|err| Error::Render(err.to_string()))
}

/// Vertices of different kinds may share a logical name, so the section is
/// part of the node identifier.
fn node_id(vertex: Vertex) -> String {
    quote(&format!("{}/{}", vertex.kind().section(), vertex.name()))
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
