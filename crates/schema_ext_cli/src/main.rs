//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `schema_ext_core` linkage and builtin plugin registration.
//! - Keep output deterministic for quick local sanity checks.

use schema_ext_core::{core_version, RegistryBuilder};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("schema_ext_core version={}", core_version());

    let registry = match RegistryBuilder::with_builtin_plugins() {
        Ok(builder) => builder.freeze(),
        Err(err) => {
            eprintln!("builtin plugin registration failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("builtin plugins={}", registry.len());
    for (key, descriptor) in registry.entries() {
        println!(
            "  {key} kind={} argument={} position_check={} result_check={}",
            descriptor.kind.as_str(),
            descriptor
                .argument
                .as_ref()
                .map_or("-", |argument| argument.name.as_str()),
            descriptor.has_position_check(),
            descriptor.has_result_check()
        );
    }
    ExitCode::SUCCESS
}
