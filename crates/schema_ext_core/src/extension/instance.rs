//! Extension occurrences as seen by the validator.
//!
//! `ExtensionCandidate` is the header-only view available before the body is
//! parsed; `ExtensionInstance` is the fully parsed occurrence.

use crate::extension::context::{ParentSummary, SourceLocation};
use serde::{Deserialize, Serialize};

/// Header of an extension occurrence (`prefix:name` resolved to its module).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionCandidate {
    /// Module defining the extension.
    pub module: String,
    /// Revision of the defining module the schema imports, if pinned.
    pub revision: Option<String>,
    /// Extension name inside the defining module.
    pub name: String,
    pub location: SourceLocation,
}

impl ExtensionCandidate {
    pub fn new(
        module: impl Into<String>,
        name: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            module: module.into(),
            revision: None,
            name: name.into(),
            location,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// `module:name`, used in diagnostics.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.module, self.name)
    }
}

/// One child statement of an extension instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substatement {
    pub keyword: String,
    pub argument: Option<String>,
    pub location: SourceLocation,
}

impl Substatement {
    pub fn new(
        keyword: impl Into<String>,
        argument: Option<&str>,
        location: SourceLocation,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            argument: argument.map(str::to_string),
            location,
        }
    }
}

/// Argument and child statements parsed from an admitted occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionBody {
    pub argument: Option<String>,
    pub substatements: Vec<Substatement>,
}

impl ExtensionBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = Some(argument.into());
        self
    }

    pub fn with_substatement(mut self, substatement: Substatement) -> Self {
        self.substatements.push(substatement);
        self
    }
}

/// Fully parsed extension occurrence.
///
/// # Invariants
/// - Header fields come from the candidate the position phase admitted;
///   the parser only supplies the body.
/// - Immutable once attached to the schema tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionInstance {
    pub module: String,
    pub name: String,
    /// Argument value, present when the extension declares one.
    pub argument: Option<String>,
    pub substatements: Vec<Substatement>,
    pub location: SourceLocation,
    /// Snapshot of the context the instance is attached under.
    pub parent: ParentSummary,
}

impl ExtensionInstance {
    /// Joins an admitted header with its parsed body.
    pub fn assemble(
        candidate: &ExtensionCandidate,
        parent: ParentSummary,
        body: ExtensionBody,
    ) -> Self {
        Self {
            module: candidate.module.clone(),
            name: candidate.name.clone(),
            argument: body.argument,
            substatements: body.substatements,
            location: candidate.location.clone(),
            parent,
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.module, self.name)
    }

    /// Number of child statements with `keyword`.
    pub fn count(&self, keyword: &str) -> usize {
        self.substatements
            .iter()
            .filter(|stmt| stmt.keyword == keyword)
            .count()
    }
}
