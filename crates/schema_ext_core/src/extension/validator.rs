//! Two-phase extension validation.
//!
//! # Responsibility
//! - Resolve the plugin for an extension occurrence.
//! - Run the position check before the body is parsed and the result check
//!   before the instance is attached.
//! - Turn verdicts into attach/drop decisions and compile errors.
//!
//! # Invariants
//! - A result check only runs through `PendingExtension::finish`, and a
//!   `PendingExtension` only exists after the position phase admitted the
//!   occurrence.
//! - `finish` takes the parsed body only; module, name, location and parent
//!   of the checked instance are always those of the admitted candidate.
//! - A lookup miss is not an error: the occurrence is unconstrained.
//! - `Deny` at either phase is a compile error; `SkipSilently` drops the
//!   instance without error.

use crate::extension::context::{ParentContext, ParentSummary, SourceLocation};
use crate::extension::instance::{ExtensionBody, ExtensionCandidate, ExtensionInstance};
use crate::extension::plugin::PluginDescriptor;
use crate::extension::registry::{global_registry, ExtensionRegistry};
use crate::extension::verdict::Verdict;
use log::{info, trace, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Runs the position phase of `descriptor`.
pub fn check_position(descriptor: &PluginDescriptor, parent: &ParentContext<'_>) -> Verdict {
    descriptor.check_position(parent)
}

/// Runs the result phase of `descriptor`.
pub fn check_result(descriptor: &PluginDescriptor, instance: &ExtensionInstance) -> Verdict {
    descriptor.check_result(instance)
}

/// Validation phase that produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckPhase {
    Position,
    Result,
}

impl CheckPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Result => "result",
        }
    }
}

/// Final decision for one extension occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Attach the instance to the schema tree.
    Attach(ExtensionInstance),
    /// Drop the instance without error.
    Drop { phase: CheckPhase },
}

/// Result of the position phase.
#[derive(Debug)]
pub enum PositionOutcome {
    /// Parse the body, then call [`PendingExtension::finish`].
    Admitted(PendingExtension),
    /// Do not parse the body; drop the occurrence without error.
    Skipped,
}

/// Occurrence admitted by the position phase, waiting for its body.
#[derive(Debug)]
pub struct PendingExtension {
    candidate: ExtensionCandidate,
    parent: ParentSummary,
    descriptor: Option<Arc<PluginDescriptor>>,
}

impl PendingExtension {
    pub fn parent(&self) -> &ParentSummary {
        &self.parent
    }

    /// Whether a plugin constrains this occurrence.
    pub fn is_constrained(&self) -> bool {
        self.descriptor.is_some()
    }

    pub fn candidate(&self) -> &ExtensionCandidate {
        &self.candidate
    }

    /// Attaches `body` to the admitted header and runs the result phase.
    pub fn finish(self, body: ExtensionBody) -> Result<Disposition, ExtensionCompileError> {
        let instance = ExtensionInstance::assemble(&self.candidate, self.parent, body);
        let Some(descriptor) = self.descriptor else {
            return Ok(Disposition::Attach(instance));
        };
        match check_result(&descriptor, &instance) {
            Verdict::Allow => Ok(Disposition::Attach(instance)),
            Verdict::SkipSilently => {
                log_skip(&self.candidate, CheckPhase::Result);
                Ok(Disposition::Drop {
                    phase: CheckPhase::Result,
                })
            }
            Verdict::Deny => {
                log_deny(&self.candidate, CheckPhase::Result);
                Err(ExtensionCompileError::ResultRejected {
                    extension: instance.qualified_name(),
                    location: instance.location,
                    parent: instance.parent,
                })
            }
        }
    }
}

/// Orchestrates the two-phase protocol against one registry.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'r> {
    registry: &'r ExtensionRegistry,
}

impl<'r> Validator<'r> {
    pub fn new(registry: &'r ExtensionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r ExtensionRegistry {
        self.registry
    }

    /// Resolves the plugin for `candidate`.
    pub fn lookup(&self, candidate: &ExtensionCandidate) -> Option<Arc<PluginDescriptor>> {
        let descriptor = self.registry.lookup(
            &candidate.module,
            candidate.revision.as_deref(),
            &candidate.name,
        );
        if descriptor.is_none() {
            trace!(
                "event=extension_lookup_miss module=ext_validator status=ok extension={} revision={}",
                candidate.qualified_name(),
                candidate.revision.as_deref().unwrap_or("-")
            );
        }
        descriptor
    }

    /// Runs the position phase for one occurrence.
    ///
    /// Must be called before the occurrence body is parsed.
    pub fn begin(
        &self,
        candidate: &ExtensionCandidate,
        parent: &ParentContext<'_>,
    ) -> Result<PositionOutcome, ExtensionCompileError> {
        let descriptor = self.lookup(candidate);
        let verdict = descriptor
            .as_deref()
            .map_or(Verdict::Allow, |descriptor| check_position(descriptor, parent));

        match verdict {
            Verdict::Allow => Ok(PositionOutcome::Admitted(PendingExtension {
                candidate: candidate.clone(),
                parent: parent.summary(),
                descriptor,
            })),
            Verdict::SkipSilently => {
                log_skip(candidate, CheckPhase::Position);
                Ok(PositionOutcome::Skipped)
            }
            Verdict::Deny => {
                log_deny(candidate, CheckPhase::Position);
                Err(ExtensionCompileError::PositionRejected {
                    extension: candidate.qualified_name(),
                    location: candidate.location.clone(),
                    parent: parent.summary(),
                })
            }
        }
    }

    /// Runs the full protocol for one occurrence.
    ///
    /// `parse_body` fills an empty body and is invoked only if the position
    /// phase admits the occurrence.
    pub fn process<F, E>(
        &self,
        candidate: &ExtensionCandidate,
        parent: &ParentContext<'_>,
        parse_body: F,
    ) -> Result<Disposition, E>
    where
        F: FnOnce(ExtensionBody) -> Result<ExtensionBody, E>,
        E: From<ExtensionCompileError>,
    {
        let pending = match self.begin(candidate, parent)? {
            PositionOutcome::Admitted(pending) => pending,
            PositionOutcome::Skipped => {
                return Ok(Disposition::Drop {
                    phase: CheckPhase::Position,
                })
            }
        };
        let body = parse_body(ExtensionBody::new())?;
        Ok(pending.finish(body)?)
    }
}

impl Validator<'static> {
    /// Validator over the process-wide registry, if installed.
    pub fn global() -> Option<Self> {
        global_registry().map(Self::new)
    }
}

fn log_skip(candidate: &ExtensionCandidate, phase: CheckPhase) {
    info!(
        "event=extension_skipped module=ext_validator status=skip extension={} phase={} location={}",
        candidate.qualified_name(),
        phase.as_str(),
        candidate.location
    );
}

fn log_deny(candidate: &ExtensionCandidate, phase: CheckPhase) {
    warn!(
        "event=extension_denied module=ext_validator status=error extension={} phase={} location={}",
        candidate.qualified_name(),
        phase.as_str(),
        candidate.location
    );
}

/// Schema compile errors raised by extension plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionCompileError {
    /// Position check denied the placement.
    PositionRejected {
        extension: String,
        location: SourceLocation,
        parent: ParentSummary,
    },
    /// Result check denied the parsed instance.
    ResultRejected {
        extension: String,
        location: SourceLocation,
        parent: ParentSummary,
    },
}

impl ExtensionCompileError {
    /// Qualified `module:name` of the offending extension.
    pub fn extension(&self) -> &str {
        match self {
            Self::PositionRejected { extension, .. } | Self::ResultRejected { extension, .. } => {
                extension
            }
        }
    }

    pub fn location(&self) -> &SourceLocation {
        match self {
            Self::PositionRejected { location, .. } | Self::ResultRejected { location, .. } => {
                location
            }
        }
    }

    pub fn parent(&self) -> &ParentSummary {
        match self {
            Self::PositionRejected { parent, .. } | Self::ResultRejected { parent, .. } => parent,
        }
    }

    pub fn phase(&self) -> CheckPhase {
        match self {
            Self::PositionRejected { .. } => CheckPhase::Position,
            Self::ResultRejected { .. } => CheckPhase::Result,
        }
    }
}

impl Display for ExtensionCompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PositionRejected {
                extension,
                location,
                parent,
            } => write!(
                f,
                "{location}: extension `{extension}` is not allowed in {parent}"
            ),
            Self::ResultRejected {
                extension,
                location,
                parent,
            } => write!(
                f,
                "{location}: extension `{extension}` in {parent} has an invalid argument or body"
            ),
        }
    }
}

impl Error for ExtensionCompileError {}

#[cfg(test)]
mod tests {
    use super::{CheckPhase, Disposition, ExtensionCompileError, PositionOutcome, Validator};
    use crate::extension::context::{ParentContext, ParentKind, SchemaNode, SourceLocation};
    use crate::extension::instance::{ExtensionBody, ExtensionCandidate, ExtensionInstance};
    use crate::extension::plugin::{ArgumentSpec, PluginDescriptor};
    use crate::extension::registry::RegistryBuilder;
    use crate::extension::verdict::Verdict;
    use std::cell::Cell;

    struct Node(SourceLocation);

    impl SchemaNode for Node {
        fn name(&self) -> Option<&str> {
            Some("node")
        }

        fn location(&self) -> &SourceLocation {
            &self.0
        }
    }

    fn candidate(name: &str) -> ExtensionCandidate {
        ExtensionCandidate::new("acme-ext", name, SourceLocation::new("a.yang", 4, 9))
    }

    fn registry() -> crate::extension::registry::ExtensionRegistry {
        let mut builder = RegistryBuilder::new();
        builder
            .register(
                "acme-ext",
                None,
                "skip-here",
                PluginDescriptor::flag().with_position_check(|_: &ParentContext<'_>| {
                    Verdict::SkipSilently
                }),
            )
            .expect("skip plugin");
        builder
            .register(
                "acme-ext",
                None,
                "strict",
                PluginDescriptor::complex()
                    .with_argument(ArgumentSpec::new("value"))
                    .with_result_check(|instance: &ExtensionInstance| {
                        match instance.argument.as_deref() {
                            Some("ok") => Verdict::Allow,
                            Some("skip") => Verdict::SkipSilently,
                            _ => Verdict::Deny,
                        }
                    }),
            )
            .expect("strict plugin");
        builder.freeze()
    }

    #[test]
    fn position_skip_never_parses_body() {
        let registry = registry();
        let validator = Validator::new(&registry);
        let node = Node(SourceLocation::new("a.yang", 3, 1));
        let parsed = Cell::new(false);

        let result: Result<Disposition, ExtensionCompileError> = validator.process(
            &candidate("skip-here"),
            &ParentContext::new(&node, ParentKind::Container),
            |body| {
                parsed.set(true);
                Ok(body)
            },
        );
        assert_eq!(
            result.expect("skip is not an error"),
            Disposition::Drop {
                phase: CheckPhase::Position
            }
        );
        assert!(!parsed.get());
    }

    #[test]
    fn result_phase_maps_all_verdicts() {
        let registry = registry();
        let validator = Validator::new(&registry);
        let node = Node(SourceLocation::new("a.yang", 3, 1));
        let parent = ParentContext::new(&node, ParentKind::Container);

        let attach: Result<Disposition, ExtensionCompileError> =
            validator.process(&candidate("strict"), &parent, |body| {
                Ok(body.with_argument("ok"))
            });
        assert!(matches!(attach, Ok(Disposition::Attach(_))));

        let skip: Result<Disposition, ExtensionCompileError> =
            validator.process(&candidate("strict"), &parent, |body| {
                Ok(body.with_argument("skip"))
            });
        assert_eq!(
            skip.expect("skip is not an error"),
            Disposition::Drop {
                phase: CheckPhase::Result
            }
        );

        let deny: Result<Disposition, ExtensionCompileError> =
            validator.process(&candidate("strict"), &parent, |body| {
                Ok(body.with_argument("bad"))
            });
        let err = deny.expect_err("deny must be a compile error");
        assert_eq!(err.phase(), CheckPhase::Result);
        assert_eq!(err.extension(), "acme-ext:strict");
        assert_eq!(err.location(), &SourceLocation::new("a.yang", 4, 9));
    }

    #[test]
    fn lookup_miss_is_unconstrained() {
        let registry = registry();
        let validator = Validator::new(&registry);
        let node = Node(SourceLocation::new("a.yang", 3, 1));

        let outcome = validator
            .begin(
                &candidate("unknown"),
                &ParentContext::new(&node, ParentKind::Leaf),
            )
            .expect("miss is not an error");
        let PositionOutcome::Admitted(pending) = outcome else {
            panic!("unregistered extension must be admitted");
        };
        assert!(!pending.is_constrained());
        let Ok(Disposition::Attach(instance)) = pending.finish(ExtensionBody::new()) else {
            panic!("unconstrained extension must attach");
        };
        assert_eq!(instance.qualified_name(), "acme-ext:unknown");
        assert_eq!(instance.parent.kind, ParentKind::Leaf);
    }

    #[test]
    fn body_parse_errors_propagate_unchanged() {
        #[derive(Debug, PartialEq)]
        enum ParseError {
            Body,
            Extension(ExtensionCompileError),
        }

        impl From<ExtensionCompileError> for ParseError {
            fn from(value: ExtensionCompileError) -> Self {
                Self::Extension(value)
            }
        }

        let registry = registry();
        let validator = Validator::new(&registry);
        let node = Node(SourceLocation::new("a.yang", 3, 1));
        let result = validator.process(
            &candidate("strict"),
            &ParentContext::new(&node, ParentKind::Container),
            |_| Err(ParseError::Body),
        );
        assert_eq!(result, Err(ParseError::Body));
    }

    #[test]
    fn compile_error_message_names_extension_and_parent() {
        let registry = registry();
        let validator = Validator::new(&registry);
        let node = Node(SourceLocation::new("a.yang", 3, 1));
        let result: Result<Disposition, ExtensionCompileError> = validator.process(
            &candidate("strict"),
            &ParentContext::new(&node, ParentKind::List),
            Ok,
        );
        let message = result.expect_err("missing argument must fail").to_string();
        assert!(message.starts_with("a.yang:4:9"));
        assert!(message.contains("acme-ext:strict"));
        assert!(message.contains("list `node` at a.yang:3:1"));
    }
}
