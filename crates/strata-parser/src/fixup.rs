//! The placeholder fixup pass.
//!
//! Runs once over a freshly elaborated template. Every [`Operand::Pending`]
//! slot is replaced by the operand its recorded node resolves to, checking
//! that the slot is the one the placeholder was recorded for. Placeholders
//! introduced while resolving are handled in the same walk. Any placeholder
//! left over afterwards is an error, so a template returned by the parser
//! never contains one.

use log::debug;

use strata_core::{intrinsic::Tag, template::Template, value::Operand};

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError, Result},
    resolver::Resolver,
};

/// Resolves every placeholder in `template`, consuming the resolver that
/// recorded them.
pub fn run(template: &mut Template, mut resolver: Resolver) -> std::result::Result<(), ParseError> {
    let total = resolver.placeholders().len();
    if total == 0 {
        return Ok(());
    }
    debug!(placeholders = total; "Running placeholder fixup");

    let mut collector = DiagnosticCollector::new();
    for (path, operand) in template.operands_mut() {
        collector.check(walk(operand, &path, &mut resolver));
    }

    for placeholder in resolver.unresolved() {
        collector.emit(
            Diagnostic::error(format!(
                "operand of `{}` was never resolved",
                placeholder.owner()
            ))
            .with_code(ErrorCode::E201)
            .with_label(placeholder.path(), "deferred here"),
        );
    }

    collector.finish()
}

fn walk(operand: &mut Operand, path: &str, resolver: &mut Resolver) -> Result<()> {
    let owner: Option<Tag> = operand.as_intrinsic().map(|intrinsic| intrinsic.tag());
    for (slot, child) in operand.children_mut() {
        let child_path = format!("{path}{slot}");
        if let Operand::Pending(id) = child {
            let id = *id;
            *child = resolver.resolve_placeholder(id, owner, &slot, &child_path)?;
        }
        walk(child, &child_path, resolver)?;
    }
    Ok(())
}
