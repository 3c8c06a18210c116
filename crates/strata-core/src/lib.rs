//! Strata Core Types and Definitions
//!
//! This crate provides the foundational types for Strata template analysis:
//!
//! - **Identifiers**: Interned logical names ([`identifier::Id`])
//! - **Values**: Literals, evaluated values and operands ([`value`] module)
//! - **Intrinsics**: The closed intrinsic function catalog ([`intrinsic`] module)
//! - **Template**: The semantic model ([`template`] module)
//! - **Evaluation**: Expression evaluation with memoized conditions ([`eval`] module)
//! - **Pseudo-parameters**: Implicit values and their stand-ins ([`pseudo`] module)

pub mod cidr;
pub mod eval;
pub mod identifier;
pub mod intrinsic;
pub mod pseudo;
pub mod sub;
pub mod template;
pub mod value;
