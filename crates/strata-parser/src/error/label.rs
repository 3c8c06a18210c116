//! Labeled document locations for diagnostic messages.

/// A message attached to a location in the template document.
///
/// The location is a dotted path from the document root, for example
/// `Resources.Bucket.Properties.Tags[0]`. Operands nested inside intrinsic
/// functions extend the path with `::field` segments.
///
/// # Primary vs Secondary Labels
///
/// - **Primary labels** mark the main location of an error .
/// - **Secondary labels** provide additional context, such as "first defined here".
#[derive(Debug, Clone)]
pub struct Label {
    path: String,
    message: String,
    is_primary: bool,
}

impl Label {
    /// Create a new primary label.
    pub fn primary(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            is_primary: true,
        }
    }

    /// Create a new secondary label.
    pub fn secondary(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            is_primary: false,
        }
    }

    /// Get the document path this label applies to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the label message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this is a primary label.
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Check if this is a secondary label.
    pub fn is_secondary(&self) -> bool {
        !self.is_primary
    }
}
