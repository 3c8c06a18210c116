//! Error adapter for converting StrataError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.
//!
//! # Locating labels
//!
//! Parser labels carry document paths such as
//! `Resources.Bucket.Properties.Tags[0]::values` rather than byte offsets.
//! The adapter finds each key of the path in turn in the source text and
//! points at the last one found. Labels that cannot be located are folded
//! into the message instead.
//!
//! # Multi-Error Support
//!
//! When a [`strata_parser::error::ParseError`] contains multiple diagnostics,
//! each diagnostic is rendered independently.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use strata::StrataError;
use strata_parser::error::{Diagnostic, Label};

/// Adapter for a single strata diagnostic.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
    src: &'a str,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create a new diagnostic adapter.
    pub fn new(diag: &'a Diagnostic, src: &'a str) -> Self {
        Self { diag, src }
    }

    fn located_labels(&self) -> impl Iterator<Item = (&'a Label, SourceSpan)> + '_ {
        self.diag
            .labels()
            .iter()
            .filter_map(|label| locate(self.src, label.path()).map(|span| (label, span)))
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.message())?;
        if self.located_labels().next().is_none() {
            if let Some(path) = self.diag.primary_path() {
                write!(f, " (at `{path}`)")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let mut labels = self.located_labels().peekable();
        labels.peek()?;

        Some(Box::new(labels.map(|(label, span)| {
            let message = Some(label.message().to_string());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(message, span)
            } else {
                LabeledSpan::new_with_span(message, span)
            }
        })))
    }
}

/// Adapter for non-diagnostic [`StrataError`] variants.
pub struct ErrorAdapter<'a>(pub &'a StrataError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            StrataError::Io(_) => "strata::io",
            StrataError::Parse { .. } => return None,
            StrataError::Graph(err) => err.code(),
            StrataError::Evaluation(_) => "strata::evaluation",
            StrataError::Config(_) => "strata::config",
            StrataError::Export(_) => "strata::export",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        None
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A rich diagnostic with source location information.
    Diagnostic(DiagnosticAdapter<'a>),
    /// A simple error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Convert a [`StrataError`] into a list of reportable errors.
///
/// For [`StrataError::Parse`], this returns one [`Reportable`] for
/// each diagnostic in the error. For other error variants, this returns a
/// single [`Reportable`].
pub fn to_reportables(err: &StrataError) -> Vec<Reportable<'_>> {
    match err {
        StrataError::Parse {
            err: parse_err,
            src,
        } => parse_err
            .diagnostics()
            .iter()
            .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d, src)))
            .collect(),
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

/// Maps a label path to a span of `src`.
fn locate(src: &str, path: &str) -> Option<SourceSpan> {
    if let Some(span) = locate_line_column(src, path) {
        return Some(span);
    }

    let keys = path.split("::").next().unwrap_or(path);
    let mut offset = 0;
    let mut found = None;
    for segment in keys.split('.') {
        let key = segment.split('[').next().unwrap_or(segment);
        if key.is_empty() {
            continue;
        }
        let start = offset + find_key(&src[offset..], key)?;
        found = Some(SourceSpan::new(start.into(), key.len()));
        offset = start + key.len();
    }
    found
}

/// Parses the `line L, column C` locations of document syntax errors.
fn locate_line_column(src: &str, path: &str) -> Option<SourceSpan> {
    let (line, column) = path.strip_prefix("line ")?.split_once(", column ")?;
    let line: usize = line.parse().ok()?;
    let column: usize = column.parse().ok()?;

    let line_start: usize = src
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    let offset = (line_start + column.saturating_sub(1)).min(src.len());
    let len = usize::from(offset < src.len());
    Some(SourceSpan::new(offset.into(), len))
}

/// Finds `key` used as a mapping key: not part of a longer word and followed
/// by a colon, optionally after a closing quote.
fn find_key(haystack: &str, key: &str) -> Option<usize> {
    haystack
        .match_indices(key)
        .find(|(start, _)| {
            let before = haystack[..*start].chars().next_back();
            let after = &haystack[start + key.len()..];
            let after = after
                .strip_prefix('"')
                .or_else(|| after.strip_prefix('\''))
                .unwrap_or(after);
            !before.is_some_and(|c| c.is_alphanumeric() || c == '_' || c == ':')
                && after.trim_start_matches([' ', '\t']).starts_with(':')
        })
        .map(|(start, _)| start)
}

#[cfg(test)]
mod tests {
    use strata::GraphError;
    use strata::identifier::Id;
    use strata::structure::Vertex;
    use strata_parser::error::{ErrorCode, ParseError};

    use super::*;

    const SOURCE: &str = concat!(
        "Resources:\n",
        "  Queue:\n",
        "    Type: AWS::SQS::Queue\n",
        "    Properties:\n",
        "      Name: !Bogus x\n",
    );

    #[test]
    fn test_single_diagnostic() {
        let diag = Diagnostic::error("unknown tag `!Bogus`")
            .with_code(ErrorCode::E100)
            .with_label("Resources.Queue.Properties.Name", "here")
            .with_help("try this");
        let err = StrataError::new_parse_error(ParseError::from(diag), SOURCE);

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);

        match &reportables[0] {
            Reportable::Diagnostic(d) => {
                assert_eq!(d.to_string(), "unknown tag `!Bogus`");
                let labels: Vec<_> = d.labels().unwrap().collect();
                assert_eq!(labels.len(), 1);
                let offset = SOURCE.find("Name").unwrap();
                assert_eq!(labels[0].offset(), offset);
                assert_eq!(labels[0].len(), 4);
                assert!(labels[0].primary());
            }
            Reportable::Error(_) => panic!("Expected Diagnostic"),
        }
    }

    #[test]
    fn test_multiple_diagnostics() {
        let diags = vec![
            Diagnostic::error("first error").with_code(ErrorCode::E200),
            Diagnostic::error("second error").with_code(ErrorCode::E201),
        ];
        let err = StrataError::new_parse_error(ParseError::from(diags), SOURCE);

        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 2);
        assert_eq!(reportables[0].to_string(), "first error");
        assert_eq!(reportables[1].to_string(), "second error");
    }

    #[test]
    fn test_unlocatable_label_is_named_in_message() {
        let diag = Diagnostic::error("missing field").with_label("Outputs.Gone", "here");
        let adapter = DiagnosticAdapter::new(&diag, SOURCE);

        assert!(adapter.labels().is_none());
        assert_eq!(adapter.to_string(), "missing field (at `Outputs.Gone`)");
    }

    #[test]
    fn test_line_column_label() {
        let diag = Diagnostic::error("malformed").with_label("line 3, column 5", "here");
        let adapter = DiagnosticAdapter::new(&diag, SOURCE);

        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels[0].offset(), SOURCE.find("Type").unwrap());
    }

    #[test]
    fn test_secondary_labels() {
        let diag = Diagnostic::error("error with labels")
            .with_label("Resources.Queue.Type", "primary")
            .with_secondary_label("Resources.Queue", "secondary");
        let adapter = DiagnosticAdapter::new(&diag, SOURCE);

        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].primary());
        assert!(!labels[1].primary());
        assert_eq!(labels[1].label(), Some("secondary"));
    }

    #[test]
    fn test_graph_error_code() {
        let err = StrataError::Graph(GraphError::SelfReference {
            vertex: Vertex::resource(Id::new("Queue")),
        });

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);
        let code = reportables[0].code().unwrap().to_string();
        assert_eq!(code, "E301");
        assert_eq!(
            reportables[0].to_string(),
            "Graph error: resource `Queue` references itself"
        );
    }
}
