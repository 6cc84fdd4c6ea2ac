//! Extension plugin validation for the schema compiler.
//! This crate owns the plugin registry and the two-phase validation contract.

pub mod extension;
pub mod logging;

pub use extension::builtin::register_builtin_plugins;
pub use extension::context::{
    ParentContext, ParentKind, ParentSummary, SchemaNode, SourceLocation, SubstatementTag,
};
pub use extension::instance::{ExtensionBody, ExtensionCandidate, ExtensionInstance, Substatement};
pub use extension::plugin::{
    ArgumentSpec, DescriptorValidationError, ExtensionKind, PluginDescriptor, PositionCheck,
    ResultCheck,
};
pub use extension::registry::{
    global_registry, install_global, ExtensionRegistry, InstallError, KeyValidationError,
    RegistrationError, RegistryBuilder, RegistryKey,
};
pub use extension::validator::{
    check_position, check_result, CheckPhase, Disposition, ExtensionCompileError,
    PendingExtension, PositionOutcome, Validator,
};
pub use extension::verdict::{Verdict, VerdictCodeError};
pub use logging::{default_log_level, init_logging, logging_status};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
