//! Bundled extension plugins for IETF-defined extensions.
//!
//! # Responsibility
//! - Provide first-party plugins for NACM flags, metadata annotations and
//!   RESTCONF yang-data templates.
//! - Register them as wildcard entries; none of these extensions changed
//!   placement rules across module revisions.

use crate::extension::context::{ParentContext, ParentKind};
use crate::extension::instance::ExtensionInstance;
use crate::extension::plugin::{
    is_valid_identifier, ArgumentSpec, PluginDescriptor, PositionCheck, ResultCheck,
};
use crate::extension::registry::{RegistrationError, RegistryBuilder};
use crate::extension::verdict::Verdict;
use std::sync::Arc;

/// Module defining the NACM extensions.
pub const NACM_MODULE: &str = "ietf-netconf-acm";
pub const NACM_DEFAULT_DENY_WRITE: &str = "default-deny-write";
pub const NACM_DEFAULT_DENY_ALL: &str = "default-deny-all";

/// Module defining the `annotation` extension.
pub const METADATA_MODULE: &str = "ietf-yang-metadata";
pub const METADATA_ANNOTATION: &str = "annotation";

/// Module defining the `yang-data` extension.
pub const RESTCONF_MODULE: &str = "ietf-restconf";
pub const RESTCONF_YANG_DATA: &str = "yang-data";

/// Registers every bundled plugin.
pub fn register_builtin_plugins(builder: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    for flag in [NacmFlag::DenyWrite, NacmFlag::DenyAll] {
        let plugin = Arc::new(flag);
        builder.register(
            NACM_MODULE,
            None,
            flag.name(),
            PluginDescriptor::flag()
                .with_position_checker(plugin.clone())
                .with_result_checker(plugin),
        )?;
    }

    let annotation = Arc::new(MetadataAnnotation);
    builder.register(
        METADATA_MODULE,
        None,
        METADATA_ANNOTATION,
        PluginDescriptor::complex()
            .with_argument(ArgumentSpec::new("name"))
            .with_position_checker(annotation.clone())
            .with_result_checker(annotation),
    )?;

    let yang_data = Arc::new(YangData);
    builder.register(
        RESTCONF_MODULE,
        None,
        RESTCONF_YANG_DATA,
        PluginDescriptor::complex()
            .with_argument(ArgumentSpec::new("name").yin_element(true))
            .with_position_checker(yang_data.clone())
            .with_result_checker(yang_data),
    )?;
    Ok(())
}

/// NACM access-control flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NacmFlag {
    DenyWrite,
    DenyAll,
}

impl NacmFlag {
    pub fn name(self) -> &'static str {
        match self {
            Self::DenyWrite => NACM_DEFAULT_DENY_WRITE,
            Self::DenyAll => NACM_DEFAULT_DENY_ALL,
        }
    }
}

impl PositionCheck for NacmFlag {
    fn check_position(&self, parent: &ParentContext<'_>) -> Verdict {
        if !parent.is_self_statement() {
            return Verdict::Deny;
        }
        let placement = match parent.kind {
            kind if kind.is_data_node() => Verdict::Allow,
            ParentKind::Choice => Verdict::Allow,
            ParentKind::Rpc | ParentKind::Action | ParentKind::Notification => match self {
                Self::DenyAll => Verdict::Allow,
                Self::DenyWrite => Verdict::Deny,
            },
            // Flag is inherited from the enclosing node.
            ParentKind::Uses
            | ParentKind::Case
            | ParentKind::Input
            | ParentKind::Output
            | ParentKind::Augment
            | ParentKind::Grouping => Verdict::SkipSilently,
            _ => Verdict::Deny,
        };
        if placement == Verdict::Allow && parent.node.has_extension(NACM_MODULE, self.name()) {
            return Verdict::Deny;
        }
        placement
    }
}

impl ResultCheck for NacmFlag {
    fn check_result(&self, instance: &ExtensionInstance) -> Verdict {
        if instance.argument.is_some() || !instance.substatements.is_empty() {
            return Verdict::Deny;
        }
        Verdict::Allow
    }
}

/// `md:annotation` from the metadata module.
#[derive(Debug, Clone, Copy)]
pub struct MetadataAnnotation;

const ANNOTATION_SINGLE_SUBSTATEMENTS: &[&str] = &["units", "status", "description", "reference"];

impl PositionCheck for MetadataAnnotation {
    fn check_position(&self, parent: &ParentContext<'_>) -> Verdict {
        module_level_only(parent)
    }
}

impl ResultCheck for MetadataAnnotation {
    fn check_result(&self, instance: &ExtensionInstance) -> Verdict {
        if !has_identifier_argument(instance) || instance.count("type") != 1 {
            return Verdict::Deny;
        }
        for keyword in ANNOTATION_SINGLE_SUBSTATEMENTS {
            if instance.count(keyword) > 1 {
                return Verdict::Deny;
            }
        }
        let unexpected = instance.substatements.iter().any(|stmt| {
            stmt.keyword != "type"
                && stmt.keyword != "if-feature"
                && !ANNOTATION_SINGLE_SUBSTATEMENTS.contains(&stmt.keyword.as_str())
        });
        if unexpected {
            return Verdict::Deny;
        }
        Verdict::Allow
    }
}

/// `rc:yang-data` template from the RESTCONF module.
#[derive(Debug, Clone, Copy)]
pub struct YangData;

impl PositionCheck for YangData {
    fn check_position(&self, parent: &ParentContext<'_>) -> Verdict {
        module_level_only(parent)
    }
}

impl ResultCheck for YangData {
    fn check_result(&self, instance: &ExtensionInstance) -> Verdict {
        if !has_identifier_argument(instance) {
            return Verdict::Deny;
        }
        let data_nodes = instance.count("container") + instance.count("uses");
        let only_known = instance.substatements.iter().all(|stmt| {
            matches!(
                stmt.keyword.as_str(),
                "container" | "uses" | "description" | "reference"
            )
        });
        if data_nodes != 1 || !only_known {
            return Verdict::Deny;
        }
        Verdict::Allow
    }
}

fn module_level_only(parent: &ParentContext<'_>) -> Verdict {
    if parent.kind.is_module_level() && parent.is_self_statement() {
        Verdict::Allow
    } else {
        Verdict::Deny
    }
}

fn has_identifier_argument(instance: &ExtensionInstance) -> bool {
    instance
        .argument
        .as_deref()
        .is_some_and(is_valid_identifier)
}
