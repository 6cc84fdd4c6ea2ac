use schema_ext_core::{
    global_registry, install_global, ExtensionInstance, ExtensionKind, ExtensionRegistry,
    InstallError, ParentContext, PluginDescriptor, RegistryBuilder, Validator, Verdict,
};
use std::thread;

fn populated_registry() -> ExtensionRegistry {
    let mut builder = RegistryBuilder::with_builtin_plugins().expect("builtin plugins");
    for index in 0..32 {
        let module = format!("vendor-{index}");
        builder
            .register(&module, None, "flag", PluginDescriptor::flag())
            .expect("vendor flag");
        builder
            .register(
                &module,
                Some("2024-01-01"),
                "flag",
                PluginDescriptor::complex()
                    .with_position_check(|_: &ParentContext<'_>| Verdict::Allow)
                    .with_result_check(|_: &ExtensionInstance| Verdict::Allow),
            )
            .expect("vendor revision flag");
    }
    builder.freeze()
}

#[test]
fn two_threads_resolve_independent_keys() {
    let registry = populated_registry();

    thread::scope(|scope| {
        let wildcard = scope.spawn(|| {
            (0..1_000)
                .map(|_| {
                    registry
                        .lookup("vendor-3", Some("2019-09-09"), "flag")
                        .map(|descriptor| descriptor.kind)
                })
                .collect::<Vec<_>>()
        });
        let exact = scope.spawn(|| {
            (0..1_000)
                .map(|_| {
                    registry
                        .lookup("vendor-7", Some("2024-01-01"), "flag")
                        .map(|descriptor| descriptor.kind)
                })
                .collect::<Vec<_>>()
        });

        let wildcard = wildcard.join().expect("wildcard thread");
        let exact = exact.join().expect("exact thread");
        assert!(wildcard
            .iter()
            .all(|kind| *kind == Some(ExtensionKind::Flag)));
        assert!(exact
            .iter()
            .all(|kind| *kind == Some(ExtensionKind::Complex)));
    });
}

#[test]
fn many_threads_see_consistent_results() {
    let registry = populated_registry();
    let expected = registry.len();

    thread::scope(|scope| {
        let handles = (0..8)
            .map(|worker| {
                let registry = &registry;
                scope.spawn(move || {
                    for index in 0..32 {
                        let module = format!("vendor-{index}");
                        let revision = if (index + worker) % 2 == 0 {
                            Some("2024-01-01")
                        } else {
                            None
                        };
                        let descriptor = registry
                            .lookup(&module, revision, "flag")
                            .expect("registered vendor flag");
                        let expected_kind = if revision.is_some() {
                            ExtensionKind::Complex
                        } else {
                            ExtensionKind::Flag
                        };
                        assert_eq!(descriptor.kind, expected_kind);
                        assert!(registry.lookup(&module, revision, "missing").is_none());
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().expect("worker thread");
        }
    });

    assert_eq!(registry.len(), expected);
}

#[test]
fn process_wide_registry_is_installed_once_and_shared() {
    let installed = install_global(populated_registry()).expect("first install");
    let entries = installed.len();

    let err = install_global(RegistryBuilder::new().freeze()).expect_err("second install");
    assert_eq!(err, InstallError::AlreadyInstalled);

    thread::scope(|scope| {
        for index in [1, 2, 3] {
            scope.spawn(move || {
                let registry = global_registry().expect("installed registry");
                assert_eq!(registry.len(), entries);
                let module = format!("vendor-{index}");
                assert!(registry.lookup(&module, None, "flag").is_some());
                assert!(Validator::global().is_some());
            });
        }
    });
}
