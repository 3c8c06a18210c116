//! Error codes for the Strata diagnostic system.
//!
//! Error codes are organized by failure category:
//! - `E0xx` - Document syntax errors
//! - `E1xx` - Tag resolution errors
//! - `E2xx` - Structural errors

use std::fmt;

/// The category a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The document is not well-formed YAML or JSON.
    DocumentSyntax,
    /// A tag is unknown or used where it is not allowed.
    TagResolution,
    /// The document is well-formed but does not describe a valid template.
    Structural,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::DocumentSyntax => write!(f, "document syntax error"),
            ErrorKind::TagResolution => write!(f, "tag resolution error"),
            ErrorKind::Structural => write!(f, "structural error"),
        }
    }
}

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Document Syntax Errors (E0xx)
    // =========================================================================
    /// Malformed document.
    ///
    /// The source could not be read as YAML or JSON.
    E001,

    /// Document root is not a mapping.
    E002,

    // =========================================================================
    // Tag Resolution Errors (E1xx)
    // =========================================================================
    /// Unknown intrinsic tag.
    ///
    /// A `!Tag` or `Fn::Name` key does not name a known intrinsic function.
    E100,

    /// Intrinsic not allowed here.
    ///
    /// The intrinsic is known but the section it appears in forbids it, e.g.
    /// `Fn::GetAtt` inside Conditions or any intrinsic inside Parameters.
    E101,

    // =========================================================================
    // Structural Errors (E2xx)
    // =========================================================================
    /// Malformed intrinsic operands.
    ///
    /// The operand shape does not match what the intrinsic function expects.
    E200,

    /// Unresolved placeholder.
    ///
    /// A deferred operand was never resolved by the fixup pass.
    E201,

    /// Missing required field.
    E202,

    /// Unknown resource attribute.
    E203,

    /// Template macros are not supported.
    E204,

    /// Invalid logical name.
    E205,

    /// Placeholder target mismatch.
    ///
    /// A deferred operand was found in a different slot than it was recorded
    /// for, or resolved more than once.
    E206,

    /// Unknown top-level section.
    E207,

    /// Malformed section or entity body.
    E208,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::E205 => "E205",
            ErrorCode::E206 => "E206",
            ErrorCode::E207 => "E207",
            ErrorCode::E208 => "E208",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "malformed document",
            ErrorCode::E002 => "document root is not a mapping",
            ErrorCode::E100 => "unknown intrinsic tag",
            ErrorCode::E101 => "intrinsic not allowed here",
            ErrorCode::E200 => "malformed intrinsic operands",
            ErrorCode::E201 => "unresolved placeholder",
            ErrorCode::E202 => "missing required field",
            ErrorCode::E203 => "unknown resource attribute",
            ErrorCode::E204 => "template macros are not supported",
            ErrorCode::E205 => "invalid logical name",
            ErrorCode::E206 => "placeholder target mismatch",
            ErrorCode::E207 => "unknown top-level section",
            ErrorCode::E208 => "malformed section",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::E001 | ErrorCode::E002 => ErrorKind::DocumentSyntax,
            ErrorCode::E100 | ErrorCode::E101 => ErrorKind::TagResolution,
            ErrorCode::E200
            | ErrorCode::E201
            | ErrorCode::E202
            | ErrorCode::E203
            | ErrorCode::E204
            | ErrorCode::E205
            | ErrorCode::E206
            | ErrorCode::E207
            | ErrorCode::E208 => ErrorKind::Structural,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
