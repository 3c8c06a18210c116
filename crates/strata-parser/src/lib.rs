//! # Strata Parser
//!
//! Parser for infrastructure templates written in YAML or JSON. This crate
//! turns template source text into the [`strata_core::template::Template`]
//! semantic model, resolving every intrinsic function into its typed form.
//!
//! ## Usage
//!
//! ```
//! # use strata_parser::{parse, error::ParseError};
//! fn main() -> Result<(), ParseError> {
//!     let source = r#"
//!         Parameters:
//!           Env: {Type: String, Default: dev}
//!         Resources:
//!           Bucket:
//!             Type: AWS::S3::Bucket
//!             Properties:
//!               BucketName: !Sub "${Env}-assets"
//!     "#;
//!
//!     let template = parse(source)?;
//!     assert_eq!(template.resources().len(), 1);
//!     Ok(())
//! }
//! ```

mod elaborate;
pub mod error;
mod fixup;
#[cfg(test)]
mod parser_tests;
mod resolver;
pub mod section;

pub use serde_yaml::Value as Document;

use log::debug;

use strata_core::template::Template;

use elaborate::Builder;
use error::{Diagnostic, ErrorCode, ParseError};
use resolver::Resolver;

/// Parse template source text into the semantic model.
///
/// This is the main entry point. It orchestrates the complete pipeline:
///
/// 1. **Load** - Read the YAML or JSON document tree
/// 2. **Elaborate** - Validate sections and resolve intrinsic tags in context
/// 3. **Fixup** - Resolve operands deferred until their owner existed
///
/// # Errors
///
/// Returns a [`ParseError`] whose diagnostics carry an [`ErrorCode`]; the
/// code's [`kind`](ErrorCode::kind) tells document syntax errors, tag
/// resolution errors and structural errors apart.
pub fn parse(source: &str) -> Result<Template, ParseError> {
    let document: Document = serde_yaml::from_str(source).map_err(|err| {
        let location = err
            .location()
            .map(|loc| format!("line {}, column {}", loc.line(), loc.column()))
            .unwrap_or_default();
        Diagnostic::error(format!("malformed template document: {err}"))
            .with_code(ErrorCode::E001)
            .with_label(location, "here")
    })?;
    parse_document(&document)
}

/// Parse an already loaded document tree into the semantic model.
pub fn parse_document(document: &Document) -> Result<Template, ParseError> {
    let mut resolver = Resolver::new();
    let mut template = Builder::new(&mut resolver).build(document)?;

    debug!(placeholders = resolver.placeholders().len(); "Elaboration finished");
    fixup::run(&mut template, resolver)?;
    Ok(template)
}
