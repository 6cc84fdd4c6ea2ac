use schema_ext_core::{
    ArgumentSpec, DescriptorValidationError, ExtensionInstance, ExtensionKind, ParentContext,
    PluginDescriptor, RegistrationError, RegistryBuilder, RegistryKey, Verdict,
};
use std::sync::Arc;

fn tagged(kind: ExtensionKind) -> PluginDescriptor {
    PluginDescriptor::new(kind)
}

#[test]
fn duplicate_key_conflicts_and_leaves_registry_unchanged() {
    for revision in [None, Some("2024-05-01")] {
        let mut builder = RegistryBuilder::new();
        builder
            .register("acme-ext", revision, "meta", tagged(ExtensionKind::Flag))
            .expect("first registration should succeed");

        let err = builder
            .register("acme-ext", revision, "meta", tagged(ExtensionKind::Complex))
            .expect_err("duplicate registration must fail");
        assert_eq!(
            err,
            RegistrationError::Conflict(RegistryKey::new("acme-ext", revision, "meta"))
        );

        let registry = builder.freeze();
        assert_eq!(registry.len(), 1);
        let kept = registry
            .lookup("acme-ext", revision, "meta")
            .expect("original entry kept");
        assert_eq!(kept.kind, ExtensionKind::Flag);
    }
}

#[test]
fn wildcard_and_explicit_revision_coexist() {
    let mut builder = RegistryBuilder::new();
    builder
        .register("acme-ext", None, "meta", tagged(ExtensionKind::Flag))
        .expect("wildcard registration");
    builder
        .register(
            "acme-ext",
            Some("2024-05-01"),
            "meta",
            tagged(ExtensionKind::Complex),
        )
        .expect("revision registration");
    let registry = builder.freeze();

    let exact = registry
        .lookup("acme-ext", Some("2024-05-01"), "meta")
        .expect("exact revision entry");
    assert_eq!(exact.kind, ExtensionKind::Complex);

    for other in [Some("2019-01-01"), None, Some("")] {
        let fallback = registry
            .lookup("acme-ext", other, "meta")
            .expect("wildcard fallback");
        assert_eq!(fallback.kind, ExtensionKind::Flag);
    }
}

#[test]
fn unregistered_extension_misses_for_every_revision() {
    let mut builder = RegistryBuilder::new();
    builder
        .register("acme-ext", None, "meta", tagged(ExtensionKind::Flag))
        .expect("registration");
    let registry = builder.freeze();

    for revision in [None, Some(""), Some("2024-05-01"), Some("not-a-date")] {
        assert!(registry.lookup("acme-ext", revision, "other").is_none());
        assert!(registry.lookup("other-ext", revision, "meta").is_none());
    }
}

#[test]
fn other_revision_entries_do_not_match_unlisted_revision() {
    let mut builder = RegistryBuilder::new();
    builder
        .register_revisions(
            "acme-ext",
            &["2022-01-01", "2023-01-01"],
            "meta",
            tagged(ExtensionKind::Flag),
        )
        .expect("revision registrations");
    let registry = builder.freeze();

    assert!(registry
        .lookup("acme-ext", Some("2022-06-30"), "meta")
        .is_none());
    assert!(registry.lookup("acme-ext", None, "meta").is_none());
    assert!(registry
        .lookup("acme-ext", Some("2023-01-01"), "meta")
        .is_some());
}

#[test]
fn argument_without_result_check_is_rejected_at_registration() {
    let mut builder = RegistryBuilder::new();
    let err = builder
        .register(
            "acme-ext",
            None,
            "label",
            PluginDescriptor::complex()
                .with_argument(ArgumentSpec::new("text"))
                .with_position_check(|_: &ParentContext<'_>| Verdict::Allow),
        )
        .expect_err("misconfigured plugin must be rejected");
    assert_eq!(
        err,
        RegistrationError::Misconfigured {
            key: RegistryKey::wildcard("acme-ext", "label"),
            reason: DescriptorValidationError::MissingResultCheck {
                argument: "text".to_string()
            },
        }
    );
    assert!(builder.is_empty());
}

#[test]
fn malformed_keys_are_rejected() {
    let mut builder = RegistryBuilder::new();
    for (module, revision, name) in [
        ("", None, "meta"),
        ("acme-ext", None, "  "),
        ("acme-ext", Some("2024/05/01"), "meta"),
        ("acme ext", None, "meta"),
    ] {
        let err = builder
            .register(module, revision, name, tagged(ExtensionKind::Flag))
            .expect_err("malformed key must be rejected");
        assert!(matches!(err, RegistrationError::InvalidKey(_)));
    }
    assert!(builder.is_empty());
}

#[test]
fn lookup_returns_shared_descriptor() {
    let mut builder = RegistryBuilder::new();
    builder
        .register(
            "acme-ext",
            None,
            "meta",
            PluginDescriptor::complex()
                .with_argument(ArgumentSpec::new("value"))
                .with_result_check(|_: &ExtensionInstance| Verdict::Allow),
        )
        .expect("registration");
    let registry = builder.freeze();

    let first = registry.lookup("acme-ext", None, "meta").expect("entry");
    let second = registry
        .lookup(" acme-ext ", Some("2020-02-02"), " meta ")
        .expect("entry with trimmed input");
    assert!(Arc::ptr_eq(&first, &second));
    assert!(registry.contains(&RegistryKey::wildcard("acme-ext", "meta")));
    assert!(!registry.contains(&RegistryKey::new("acme-ext", Some("2020-02-02"), "meta")));
}

#[test]
fn builder_with_builtin_plugins_accepts_additional_registrations() {
    let mut builder = RegistryBuilder::with_builtin_plugins().expect("builtin plugins");
    let builtin_count = builder.len();
    builder
        .register("acme-ext", None, "meta", tagged(ExtensionKind::Flag))
        .expect("third-party registration");
    assert_eq!(builder.freeze().len(), builtin_count + 1);
}
