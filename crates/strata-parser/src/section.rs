//! Template sections and the context intrinsic tags are resolved in.

use std::fmt;

use strata_core::intrinsic::Tag;

/// A top-level section of a template document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    FormatVersion,
    Description,
    Metadata,
    Rules,
    Transform,
    Parameters,
    Mappings,
    Conditions,
    Resources,
    Outputs,
}

impl Section {
    const ALL: [Section; 10] = [
        Section::FormatVersion,
        Section::Description,
        Section::Metadata,
        Section::Rules,
        Section::Transform,
        Section::Parameters,
        Section::Mappings,
        Section::Conditions,
        Section::Resources,
        Section::Outputs,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Section::FormatVersion => "AWSTemplateFormatVersion",
            Section::Description => "Description",
            Section::Metadata => "Metadata",
            Section::Rules => "Rules",
            Section::Transform => "Transform",
            Section::Parameters => "Parameters",
            Section::Mappings => "Mappings",
            Section::Conditions => "Conditions",
            Section::Resources => "Resources",
            Section::Outputs => "Outputs",
        }
    }

    pub fn from_key(key: &str) -> Option<Section> {
        Self::ALL.iter().copied().find(|section| section.key() == key)
    }

    /// Checks whether `tag` may appear in this section, with `owner` being the
    /// intrinsic the tag is an operand of.
    ///
    /// Returns the reason when it may not.
    pub fn permits(&self, tag: Tag, owner: Option<Tag>) -> Result<(), &'static str> {
        match self {
            Section::Conditions => match tag {
                Tag::GetAtt | Tag::ImportValue => {
                    Err("conditions are evaluated before any resource or export exists")
                }
                _ => Ok(()),
            },
            Section::Resources | Section::Outputs => match tag {
                Tag::Condition if !matches!(owner, Some(Tag::And | Tag::Or | Tag::Not)) => {
                    Err("a condition reference is only valid inside `Fn::And`, `Fn::Or` or `Fn::Not`")
                }
                _ => Ok(()),
            },
            _ => Err("intrinsic functions are only evaluated in Conditions, Resources and Outputs"),
        }
    }

    /// Returns `true` if a `{"Condition": name}` mapping is an intrinsic call
    /// at this position rather than a literal key.
    pub fn condition_key_is_intrinsic(&self, owner: Option<Tag>) -> bool {
        match self {
            Section::Conditions => true,
            Section::Resources | Section::Outputs => {
                matches!(owner, Some(Tag::And | Tag::Or | Tag::Not))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Where in the document a node is being resolved.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    section: Section,
    path: String,
    owner: Option<Tag>,
}

impl ResolveContext {
    pub fn new(section: Section, path: impl Into<String>) -> Self {
        Self {
            section,
            path: path.into(),
            owner: None,
        }
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The intrinsic whose operand is being resolved, if any.
    pub fn owner(&self) -> Option<Tag> {
        self.owner
    }

    /// Context for a child node, reached through `segment`.
    pub fn child(&self, segment: impl fmt::Display) -> Self {
        Self {
            section: self.section,
            path: format!("{}{}", self.path, segment),
            owner: self.owner,
        }
    }

    /// Context for an entry of a plain list or mapping. Plain collections
    /// reset the owning intrinsic.
    pub fn plain(&self, segment: impl fmt::Display) -> Self {
        Self {
            section: self.section,
            path: format!("{}{}", self.path, segment),
            owner: None,
        }
    }

    /// Context for the operands of `tag`.
    pub fn within(&self, tag: Tag) -> Self {
        Self {
            section: self.section,
            path: format!("{}::{}", self.path, tag.short_name()),
            owner: Some(tag),
        }
    }

    /// Restores a recorded context for a deferred node.
    pub(crate) fn restore(section: Section, path: String, owner: Tag) -> Self {
        Self {
            section,
            path,
            owner: Some(owner),
        }
    }
}
