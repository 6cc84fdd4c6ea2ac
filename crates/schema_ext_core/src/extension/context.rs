//! Placement context handed to position checks.
//!
//! # Responsibility
//! - Describe where an extension instance would attach in the schema tree.
//! - Provide stable keyword strings for diagnostics and logs.
//!
//! # Invariants
//! - `SubstatementTag::SelfStatement` means the instance sits on the parent
//!   itself, not on one of its value substatements.
//! - Context values are borrowed from the compiler and never retained past
//!   one validation call; `ParentSummary` is the owned snapshot.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Source position of one statement in a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Document identifier, usually a file path.
    pub source: String,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl SourceLocation {
    pub fn new(source: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            source: source.into(),
            line,
            column,
        }
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)
    }
}

/// Kind of schema construct an extension instance is attached under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentKind {
    Module,
    Submodule,
    Container,
    Leaf,
    LeafList,
    List,
    Choice,
    Case,
    Anydata,
    Anyxml,
    Grouping,
    Uses,
    Augment,
    Rpc,
    Action,
    Input,
    Output,
    Notification,
    Typedef,
    Type,
    Enum,
    Bit,
    Feature,
    Identity,
    /// `must`, `pattern`, `length` or `range`.
    Restriction,
    When,
    Import,
    Include,
    Revision,
    Refine,
    Deviation,
    Deviate,
    IfFeature,
    /// An `extension` definition statement.
    Extension,
    /// Another extension instance.
    ExtensionInstance,
}

impl ParentKind {
    /// Keyword used in schema source and diagnostics.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Submodule => "submodule",
            Self::Container => "container",
            Self::Leaf => "leaf",
            Self::LeafList => "leaf-list",
            Self::List => "list",
            Self::Choice => "choice",
            Self::Case => "case",
            Self::Anydata => "anydata",
            Self::Anyxml => "anyxml",
            Self::Grouping => "grouping",
            Self::Uses => "uses",
            Self::Augment => "augment",
            Self::Rpc => "rpc",
            Self::Action => "action",
            Self::Input => "input",
            Self::Output => "output",
            Self::Notification => "notification",
            Self::Typedef => "typedef",
            Self::Type => "type",
            Self::Enum => "enum",
            Self::Bit => "bit",
            Self::Feature => "feature",
            Self::Identity => "identity",
            Self::Restriction => "restriction",
            Self::When => "when",
            Self::Import => "import",
            Self::Include => "include",
            Self::Revision => "revision",
            Self::Refine => "refine",
            Self::Deviation => "deviation",
            Self::Deviate => "deviate",
            Self::IfFeature => "if-feature",
            Self::Extension => "extension",
            Self::ExtensionInstance => "extension-instance",
        }
    }

    /// Whether the construct is a schema node that instantiates data.
    pub fn is_data_node(self) -> bool {
        matches!(
            self,
            Self::Container
                | Self::Leaf
                | Self::LeafList
                | Self::List
                | Self::Anydata
                | Self::Anyxml
        )
    }

    /// Whether the construct is a module or submodule header.
    pub fn is_module_level(self) -> bool {
        matches!(self, Self::Module | Self::Submodule)
    }
}

impl Display for ParentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Substatement of the parent an extension instance was written under.
///
/// The schema tree stores simple-valued substatements (descriptions,
/// defaults, ...) as plain fields, so extensions written inside them are kept
/// on the parent and tagged with the originating substatement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstatementTag {
    /// Instance is written directly inside the parent statement.
    SelfStatement,
    Argument,
    Base,
    BelongsTo,
    Contact,
    Default,
    Description,
    ErrorAppTag,
    ErrorMessage,
    Key,
    Namespace,
    Organization,
    Path,
    Prefix,
    Presence,
    Reference,
    RevisionDate,
    Units,
    Value,
    YangVersion,
    Modifier,
    RequireInstance,
    YinElement,
    Config,
    Mandatory,
    OrderedBy,
    Status,
    FractionDigits,
    MaxElements,
    MinElements,
    Position,
    Unique,
}

impl SubstatementTag {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::SelfStatement => "self",
            Self::Argument => "argument",
            Self::Base => "base",
            Self::BelongsTo => "belongs-to",
            Self::Contact => "contact",
            Self::Default => "default",
            Self::Description => "description",
            Self::ErrorAppTag => "error-app-tag",
            Self::ErrorMessage => "error-message",
            Self::Key => "key",
            Self::Namespace => "namespace",
            Self::Organization => "organization",
            Self::Path => "path",
            Self::Prefix => "prefix",
            Self::Presence => "presence",
            Self::Reference => "reference",
            Self::RevisionDate => "revision-date",
            Self::Units => "units",
            Self::Value => "value",
            Self::YangVersion => "yang-version",
            Self::Modifier => "modifier",
            Self::RequireInstance => "require-instance",
            Self::YinElement => "yin-element",
            Self::Config => "config",
            Self::Mandatory => "mandatory",
            Self::OrderedBy => "ordered-by",
            Self::Status => "status",
            Self::FractionDigits => "fraction-digits",
            Self::MaxElements => "max-elements",
            Self::MinElements => "min-elements",
            Self::Position => "position",
            Self::Unique => "unique",
        }
    }
}

impl Display for SubstatementTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Compiler-side view of a schema-tree node that can parent an extension.
///
/// Implemented by the schema tree; this crate only reads through it.
pub trait SchemaNode {
    /// Node identifier (`leaf mtu` -> `mtu`), when the construct has one.
    fn name(&self) -> Option<&str>;

    fn location(&self) -> &SourceLocation;

    /// Whether an instance of `module:name` is already attached here.
    fn has_extension(&self, _module: &str, _name: &str) -> bool {
        false
    }
}

/// Borrowed placement context for one position check.
#[derive(Clone, Copy)]
pub struct ParentContext<'a> {
    pub node: &'a dyn SchemaNode,
    pub kind: ParentKind,
    pub substmt: SubstatementTag,
}

impl<'a> ParentContext<'a> {
    /// Context for an instance written directly inside `node`.
    pub fn new(node: &'a dyn SchemaNode, kind: ParentKind) -> Self {
        Self {
            node,
            kind,
            substmt: SubstatementTag::SelfStatement,
        }
    }

    /// Same parent, instance written inside substatement `tag`.
    pub fn on_substatement(self, tag: SubstatementTag) -> Self {
        Self {
            substmt: tag,
            ..self
        }
    }

    pub fn is_self_statement(&self) -> bool {
        self.substmt == SubstatementTag::SelfStatement
    }

    /// Owned snapshot kept by instances and errors.
    pub fn summary(&self) -> ParentSummary {
        ParentSummary {
            kind: self.kind,
            substmt: self.substmt,
            name: self.node.name().map(str::to_string),
            location: self.node.location().clone(),
        }
    }
}

impl std::fmt::Debug for ParentContext<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParentContext")
            .field("kind", &self.kind)
            .field("substmt", &self.substmt)
            .field("name", &self.node.name())
            .field("location", self.node.location())
            .finish()
    }
}

/// Owned description of a parent context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentSummary {
    pub kind: ParentKind,
    pub substmt: SubstatementTag,
    pub name: Option<String>,
    pub location: SourceLocation,
}

impl Display for ParentSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.substmt != SubstatementTag::SelfStatement {
            write!(f, "{} of ", self.substmt)?;
        }
        match &self.name {
            Some(name) => write!(f, "{} `{}`", self.kind, name)?,
            None => write!(f, "{}", self.kind)?,
        }
        write!(f, " at {}", self.location)
    }
}
