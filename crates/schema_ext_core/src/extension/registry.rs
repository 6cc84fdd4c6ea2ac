//! Extension plugin registry and revision-aware lookup.
//!
//! # Responsibility
//! - Bind `(module, revision?, name)` keys to plugin descriptors.
//! - Resolve lookups with exact-revision first, wildcard second.
//!
//! # Invariants
//! - No two entries share a key; a wildcard entry is the key with no revision.
//! - Registration happens on `RegistryBuilder` only. `freeze()` is the
//!   init/use boundary: `ExtensionRegistry` has no mutating API and is
//!   `Send + Sync`, so any number of compiler threads may look up concurrently.
//! - A failed registration leaves the registry unchanged.
//! - A revision with neither an exact nor a wildcard entry resolves to no
//!   plugin, even if other revisions of the same extension are registered.

use crate::extension::builtin;
use crate::extension::plugin::{is_valid_identifier, DescriptorValidationError, PluginDescriptor};
use log::{info, warn};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// `YYYY-MM-DD` syntax with month and day ranges.
///
/// Calendar validity is not checked: `2023-02-31` passes.
static REVISION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])$")
        .expect("valid revision regex")
});

static GLOBAL_REGISTRY: OnceCell<ExtensionRegistry> = OnceCell::new();

/// Registration key of one extension plugin.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistryKey {
    /// Module defining the extension.
    pub module: String,
    /// Module revision; `None` registers a wildcard entry.
    pub revision: Option<String>,
    /// Extension name.
    pub name: String,
}

impl RegistryKey {
    /// Builds a key; surrounding whitespace is trimmed and an empty revision
    /// is treated as no revision.
    pub fn new(module: &str, revision: Option<&str>, name: &str) -> Self {
        Self {
            module: module.trim().to_string(),
            revision: normalize_revision(revision).map(str::to_string),
            name: name.trim().to_string(),
        }
    }

    pub fn wildcard(module: &str, name: &str) -> Self {
        Self::new(module, None, name)
    }

    pub fn is_wildcard(&self) -> bool {
        self.revision.is_none()
    }

    /// Validates key syntax.
    pub fn validate(&self) -> Result<(), KeyValidationError> {
        if self.module.is_empty() {
            return Err(KeyValidationError::EmptyModule);
        }
        if !is_valid_identifier(&self.module) {
            return Err(KeyValidationError::InvalidModule(self.module.clone()));
        }
        if self.name.is_empty() {
            return Err(KeyValidationError::EmptyName);
        }
        if !is_valid_identifier(&self.name) {
            return Err(KeyValidationError::InvalidName(self.name.clone()));
        }
        if let Some(revision) = &self.revision {
            if !REVISION_RE.is_match(revision) {
                return Err(KeyValidationError::InvalidRevision(revision.clone()));
            }
        }
        Ok(())
    }
}

impl Display for RegistryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.revision {
            Some(revision) => write!(f, "{}@{}:{}", self.module, revision, self.name),
            None => write!(f, "{}:{}", self.module, self.name),
        }
    }
}

fn normalize_revision(revision: Option<&str>) -> Option<&str> {
    revision.map(str::trim).filter(|value| !value.is_empty())
}

/// Entries for one `(module, name)` pair.
#[derive(Debug, Default, Clone)]
struct ExtensionSlot {
    wildcard: Option<Arc<PluginDescriptor>>,
    revisions: BTreeMap<String, Arc<PluginDescriptor>>,
}

impl ExtensionSlot {
    fn contains(&self, revision: Option<&str>) -> bool {
        match revision {
            Some(revision) => self.revisions.contains_key(revision),
            None => self.wildcard.is_some(),
        }
    }

    fn len(&self) -> usize {
        self.revisions.len() + usize::from(self.wildcard.is_some())
    }
}

/// Frozen extension plugin registry.
///
/// Built through [`RegistryBuilder`]; read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct ExtensionRegistry {
    slots: BTreeMap<(String, String), ExtensionSlot>,
}

impl ExtensionRegistry {
    /// Resolves the plugin for one extension occurrence.
    ///
    /// Order: exact `(module, revision, name)` when `revision` is non-empty,
    /// then the wildcard entry for `(module, name)`. `None` means no
    /// extension-specific constraints apply.
    pub fn lookup(
        &self,
        module: &str,
        revision: Option<&str>,
        name: &str,
    ) -> Option<Arc<PluginDescriptor>> {
        let slot = self
            .slots
            .get(&(module.trim().to_string(), name.trim().to_string()))?;
        if let Some(revision) = normalize_revision(revision) {
            if let Some(descriptor) = slot.revisions.get(revision) {
                return Some(Arc::clone(descriptor));
            }
        }
        slot.wildcard.as_ref().map(Arc::clone)
    }

    /// Returns whether exactly this key is registered (no fallback).
    pub fn contains(&self, key: &RegistryKey) -> bool {
        self.slots
            .get(&(key.module.clone(), key.name.clone()))
            .is_some_and(|slot| slot.contains(key.revision.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.slots.values().map(ExtensionSlot::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Registered entries ordered by module and name, wildcard first.
    pub fn entries(&self) -> Vec<(RegistryKey, Arc<PluginDescriptor>)> {
        let mut entries = Vec::with_capacity(self.len());
        for ((module, name), slot) in &self.slots {
            if let Some(descriptor) = &slot.wildcard {
                entries.push((RegistryKey::wildcard(module, name), Arc::clone(descriptor)));
            }
            for (revision, descriptor) in &slot.revisions {
                entries.push((
                    RegistryKey::new(module, Some(revision), name),
                    Arc::clone(descriptor),
                ));
            }
        }
        entries
    }

    pub fn keys(&self) -> Vec<RegistryKey> {
        self.entries().into_iter().map(|(key, _)| key).collect()
    }

    fn insert(&mut self, key: RegistryKey, descriptor: Arc<PluginDescriptor>) {
        let slot = self.slots.entry((key.module, key.name)).or_default();
        match key.revision {
            Some(revision) => {
                slot.revisions.insert(revision, descriptor);
            }
            None => slot.wildcard = Some(descriptor),
        }
    }
}

/// Mutable registration phase of an [`ExtensionRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: ExtensionRegistry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-loaded with the bundled plugins.
    pub fn with_builtin_plugins() -> Result<Self, RegistrationError> {
        let mut builder = Self::new();
        builtin::register_builtin_plugins(&mut builder)?;
        Ok(builder)
    }

    /// Registers one plugin.
    ///
    /// # Errors
    /// - `InvalidKey` when module, name or revision is malformed.
    /// - `Misconfigured` when the descriptor fails validation.
    /// - `Conflict` when the exact key is already registered.
    pub fn register(
        &mut self,
        module: &str,
        revision: Option<&str>,
        name: &str,
        descriptor: PluginDescriptor,
    ) -> Result<(), RegistrationError> {
        self.register_key(RegistryKey::new(module, revision, name), descriptor)
    }

    pub fn register_key(
        &mut self,
        key: RegistryKey,
        descriptor: PluginDescriptor,
    ) -> Result<(), RegistrationError> {
        self.register_shared(&[key], Arc::new(descriptor))
    }

    /// Registers one descriptor under several explicit revisions.
    ///
    /// All entries share the descriptor. Nothing is registered if any key
    /// is invalid or conflicts. The list must be non-empty and every
    /// revision must be a date; use `register` for a wildcard entry.
    pub fn register_revisions(
        &mut self,
        module: &str,
        revisions: &[&str],
        name: &str,
        descriptor: PluginDescriptor,
    ) -> Result<(), RegistrationError> {
        let listed = if revisions.is_empty() {
            Err(KeyValidationError::NoRevisions)
        } else if let Some(blank) = revisions.iter().find(|revision| revision.trim().is_empty()) {
            Err(KeyValidationError::InvalidRevision((*blank).to_string()))
        } else {
            Ok(())
        };
        if let Err(err) = listed {
            warn!(
                "event=plugin_rejected module=ext_registry status=error key={}:{} reason={}",
                module, name, err
            );
            return Err(RegistrationError::InvalidKey(err));
        }

        let keys = revisions
            .iter()
            .map(|revision| RegistryKey::new(module, Some(revision), name))
            .collect::<Vec<_>>();
        self.register_shared(&keys, Arc::new(descriptor))
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn contains(&self, key: &RegistryKey) -> bool {
        self.registry.contains(key)
    }

    /// Ends the registration phase.
    pub fn freeze(self) -> ExtensionRegistry {
        info!(
            "event=registry_frozen module=ext_registry status=ok entries={}",
            self.registry.len()
        );
        self.registry
    }

    fn register_shared(
        &mut self,
        keys: &[RegistryKey],
        descriptor: Arc<PluginDescriptor>,
    ) -> Result<(), RegistrationError> {
        for (index, key) in keys.iter().enumerate() {
            if let Err(err) = self.admit(key, &descriptor, &keys[..index]) {
                warn!(
                    "event=plugin_rejected module=ext_registry status=error key={} reason={}",
                    key, err
                );
                return Err(err);
            }
        }

        for key in keys {
            info!(
                "event=plugin_registered module=ext_registry status=ok key={} kind={} position_check={} result_check={}",
                key,
                descriptor.kind.as_str(),
                descriptor.has_position_check(),
                descriptor.has_result_check()
            );
            self.registry.insert(key.clone(), Arc::clone(&descriptor));
        }
        Ok(())
    }

    fn admit(
        &self,
        key: &RegistryKey,
        descriptor: &PluginDescriptor,
        pending: &[RegistryKey],
    ) -> Result<(), RegistrationError> {
        key.validate().map_err(RegistrationError::InvalidKey)?;
        descriptor
            .validate()
            .map_err(|reason| RegistrationError::Misconfigured {
                key: key.clone(),
                reason,
            })?;
        if self.registry.contains(key) || pending.contains(key) {
            return Err(RegistrationError::Conflict(key.clone()));
        }
        Ok(())
    }
}

/// Installs `registry` as the process-wide instance.
///
/// Must happen before any compilation thread starts; later installs fail.
pub fn install_global(
    registry: ExtensionRegistry,
) -> Result<&'static ExtensionRegistry, InstallError> {
    let entries = registry.len();
    GLOBAL_REGISTRY
        .set(registry)
        .map_err(|_| InstallError::AlreadyInstalled)?;
    info!(
        "event=registry_installed module=ext_registry status=ok entries={}",
        entries
    );
    GLOBAL_REGISTRY.get().ok_or(InstallError::AlreadyInstalled)
}

/// Returns the process-wide registry, if installed.
pub fn global_registry() -> Option<&'static ExtensionRegistry> {
    GLOBAL_REGISTRY.get()
}

/// Registry key syntax errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValidationError {
    EmptyModule,
    InvalidModule(String),
    EmptyName,
    InvalidName(String),
    InvalidRevision(String),
    NoRevisions,
}

impl Display for KeyValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyModule => write!(f, "extension module must not be empty"),
            Self::InvalidModule(value) => write!(f, "extension module is invalid: {value}"),
            Self::EmptyName => write!(f, "extension name must not be empty"),
            Self::InvalidName(value) => write!(f, "extension name is invalid: {value}"),
            Self::InvalidRevision(value) => {
                write!(f, "module revision is invalid: {value}; expected YYYY-MM-DD")
            }
            Self::NoRevisions => write!(f, "revision list must not be empty"),
        }
    }
}

impl Error for KeyValidationError {}

/// Plugin registration errors, raised at plugin-load time only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    InvalidKey(KeyValidationError),
    Conflict(RegistryKey),
    Misconfigured {
        key: RegistryKey,
        reason: DescriptorValidationError,
    },
}

impl Display for RegistrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(err) => write!(f, "invalid registry key: {err}"),
            Self::Conflict(key) => write!(f, "extension plugin already registered: {key}"),
            Self::Misconfigured { key, reason } => {
                write!(f, "extension plugin {key} is misconfigured: {reason}")
            }
        }
    }
}

impl Error for RegistrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidKey(err) => Some(err),
            Self::Conflict(_) => None,
            Self::Misconfigured { reason, .. } => Some(reason),
        }
    }
}

/// Process-wide registry install errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    AlreadyInstalled,
}

impl Display for InstallError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyInstalled => write!(f, "extension registry is already installed"),
        }
    }
}

impl Error for InstallError {}
