//! Extension plugin registry and two-phase validation.
//!
//! Plugins are registered on a `RegistryBuilder` at startup and frozen into
//! an `ExtensionRegistry` before any schema compiles. The compiler resolves a
//! plugin per extension occurrence and drives the `Validator`: position check
//! before the body is parsed, result check before the instance is attached.

pub mod builtin;
pub mod context;
pub mod instance;
pub mod plugin;
pub mod registry;
pub mod validator;
pub mod verdict;
