//! Error and diagnostic system for the Strata parser.
//!
//! This module provides an error handling system with:
//! - Error codes grouped by failure category
//! - Multiple labeled document paths for error context
//! - Diagnostic collector for accumulating multiple errors
//!
//! # Overview
//!
//! The error system is built around the [`Diagnostic`] type, which represents
//! a single error message with optional error code, labeled
//! document locations, and help text. Multiple diagnostics are wrapped in
//! [`ParseError`] for returning from the parsing lifecycle.
//!
//! Template documents carry no byte offsets once they are loaded, so labels
//! point at a dotted document path such as `Resources.Bucket.Properties`.
//!
//! # Example
//!
//! ```
//! # use strata_parser::error::{Diagnostic, ErrorCode};
//! let diag = Diagnostic::error("unknown intrinsic tag `!Reff`")
//!     .with_code(ErrorCode::E100)
//!     .with_label("Resources.Bucket.Properties.BucketName", "used here")
//!     .with_help("did you mean `!Ref`?");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;

pub(crate) use collector::DiagnosticCollector;
pub(crate) use parse_error::Result;

pub use diagnostic::Diagnostic;
pub use error_code::{ErrorCode, ErrorKind};
pub use label::Label;
pub use parse_error::ParseError;
