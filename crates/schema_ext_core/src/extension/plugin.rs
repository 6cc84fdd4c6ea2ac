//! Plugin descriptors and their validation capabilities.
//!
//! A descriptor bundles the extension kind, an optional argument grammar and
//! up to two check capabilities. Capabilities are shared (`Arc`) so one plugin
//! implementation can back several registry entries.

use crate::extension::context::ParentContext;
use crate::extension::instance::ExtensionInstance;
use crate::extension::verdict::Verdict;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("valid identifier regex"));

/// Returns whether `value` is a schema-language identifier.
pub fn is_valid_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}

/// Storage shape of an extension instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionKind {
    /// Presence-only marker without argument or body.
    Flag,
    /// Argument and/or substatements whose structure the plugin checks.
    Complex,
}

impl ExtensionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Complex => "complex",
        }
    }
}

/// Argument grammar declared by an extension definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    /// Argument name from the `argument` statement.
    pub name: String,
    /// Whether YIN encodes the argument as a child element.
    pub yin_element: bool,
}

impl ArgumentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            yin_element: false,
        }
    }

    pub fn yin_element(mut self, value: bool) -> Self {
        self.yin_element = value;
        self
    }
}

/// Placement capability: may an instance attach under this parent?
///
/// Runs before the instance body is parsed. Implementations must be pure.
pub trait PositionCheck: Send + Sync {
    fn check_position(&self, parent: &ParentContext<'_>) -> Verdict;
}

/// Result capability: is the fully parsed instance well-formed?
///
/// Implementations must be pure.
pub trait ResultCheck: Send + Sync {
    fn check_result(&self, instance: &ExtensionInstance) -> Verdict;
}

impl<F> PositionCheck for F
where
    F: Fn(&ParentContext<'_>) -> Verdict + Send + Sync,
{
    fn check_position(&self, parent: &ParentContext<'_>) -> Verdict {
        self(parent)
    }
}

impl<F> ResultCheck for F
where
    F: Fn(&ExtensionInstance) -> Verdict + Send + Sync,
{
    fn check_result(&self, instance: &ExtensionInstance) -> Verdict {
        self(instance)
    }
}

/// Extension plugin declaration stored in the registry.
#[derive(Clone)]
pub struct PluginDescriptor {
    pub kind: ExtensionKind,
    pub argument: Option<ArgumentSpec>,
    position_check: Option<Arc<dyn PositionCheck>>,
    result_check: Option<Arc<dyn ResultCheck>>,
}

impl PluginDescriptor {
    pub fn new(kind: ExtensionKind) -> Self {
        Self {
            kind,
            argument: None,
            position_check: None,
            result_check: None,
        }
    }

    pub fn flag() -> Self {
        Self::new(ExtensionKind::Flag)
    }

    pub fn complex() -> Self {
        Self::new(ExtensionKind::Complex)
    }

    pub fn with_argument(mut self, argument: ArgumentSpec) -> Self {
        self.argument = Some(argument);
        self
    }

    pub fn with_position_check<F>(self, check: F) -> Self
    where
        F: Fn(&ParentContext<'_>) -> Verdict + Send + Sync + 'static,
    {
        self.with_position_checker(Arc::new(check))
    }

    pub fn with_result_check<F>(self, check: F) -> Self
    where
        F: Fn(&ExtensionInstance) -> Verdict + Send + Sync + 'static,
    {
        self.with_result_checker(Arc::new(check))
    }

    /// Attaches a shared position capability.
    pub fn with_position_checker(mut self, check: Arc<dyn PositionCheck>) -> Self {
        self.position_check = Some(check);
        self
    }

    /// Attaches a shared result capability.
    pub fn with_result_checker(mut self, check: Arc<dyn ResultCheck>) -> Self {
        self.result_check = Some(check);
        self
    }

    pub fn has_position_check(&self) -> bool {
        self.position_check.is_some()
    }

    pub fn has_result_check(&self) -> bool {
        self.result_check.is_some()
    }

    /// Runs the position capability; `Allow` when none is declared.
    pub fn check_position(&self, parent: &ParentContext<'_>) -> Verdict {
        match &self.position_check {
            Some(check) => check.check_position(parent),
            None => Verdict::Allow,
        }
    }

    /// Runs the result capability; `Allow` when none is declared.
    pub fn check_result(&self, instance: &ExtensionInstance) -> Verdict {
        match &self.result_check {
            Some(check) => check.check_result(instance),
            None => Verdict::Allow,
        }
    }

    /// Validates declaration-level descriptor invariants.
    pub fn validate(&self) -> Result<(), DescriptorValidationError> {
        let Some(argument) = &self.argument else {
            return Ok(());
        };
        if !is_valid_identifier(&argument.name) {
            return Err(DescriptorValidationError::InvalidArgumentName(
                argument.name.clone(),
            ));
        }
        if self.result_check.is_none() {
            return Err(DescriptorValidationError::MissingResultCheck {
                argument: argument.name.clone(),
            });
        }
        Ok(())
    }
}

impl Debug for PluginDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("kind", &self.kind)
            .field("argument", &self.argument)
            .field("position_check", &self.has_position_check())
            .field("result_check", &self.has_result_check())
            .finish()
    }
}

/// Descriptor declaration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorValidationError {
    /// Argument grammar declared without a result capability.
    MissingResultCheck { argument: String },
    InvalidArgumentName(String),
}

impl Display for DescriptorValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingResultCheck { argument } => write!(
                f,
                "extension declares argument `{argument}` but provides no result check"
            ),
            Self::InvalidArgumentName(value) => {
                write!(f, "extension argument name is invalid: {value}")
            }
        }
    }
}

impl Error for DescriptorValidationError {}
