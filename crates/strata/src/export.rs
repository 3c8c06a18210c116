//! Export of analysis results.
//!
//! # Available Backends
//!
//! - [`dot`] - Graphviz DOT output of the dependency graph via
//!   [`dot::DotExporter`]
//!
//! # Error Handling
//!
//! Export operations return [`Error`], covering rendering failures and I/O
//! errors. [`Error`] converts into [`StrataError::Export`] at the crate
//! boundary.
//!
//! [`StrataError::Export`]: crate::StrataError::Export

/// Graphviz DOT export backend.
pub mod dot;

use crate::structure::DependencyGraph;

/// Abstraction for dependency graph export backends.
pub trait Exporter {
    /// Exports a dependency graph to the backend's output format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`] if the graph cannot be converted to the
    /// target format, or [`Error::Io`] if writing the output fails.
    fn export_graph(&mut self, graph: &DependencyGraph) -> Result<(), Error>;
}

/// Errors that can occur during export.
#[derive(Debug)]
pub enum Error {
    /// A rendering or conversion failure described by `message`.
    Render(String),
    /// An I/O error encountered while writing output.
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Render(msg) => write!(f, "Render error: {msg}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Render(_) => None,
            Self::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
