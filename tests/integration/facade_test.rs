//! Global register/install/uninstall through the facade.

use serial_test::serial;

use crate::helpers::{count_loads, define_module, loads};

#[test]
#[serial]
fn test_hooks_fire_only_while_installed() {
    define_module("facade.before");
    define_module("facade.during");
    define_module("facade.after");
    let before = count_loads("facade.before");
    let during = count_loads("facade.during");
    let after = count_loads("facade.after");

    autopatch::runtime().import("facade.before").unwrap();

    autopatch::install();
    autopatch::runtime().import("facade.during").unwrap();
    autopatch::runtime().import("facade.during").unwrap();
    autopatch::uninstall();

    autopatch::runtime().import("facade.after").unwrap();

    assert_eq!(loads(&before), 0);
    assert_eq!(loads(&during), 1);
    assert_eq!(loads(&after), 0);
}

#[test]
#[serial]
fn test_install_and_uninstall_are_idempotent() {
    define_module("facade.idempotent");
    let calls = count_loads("facade.idempotent");

    autopatch::uninstall();
    assert!(!autopatch::is_patched());

    autopatch::install();
    autopatch::install();
    assert!(autopatch::is_patched());

    let module = autopatch::runtime().import("facade.idempotent").unwrap();
    autopatch::runtime().reload(&module).unwrap();
    assert_eq!(loads(&calls), 2);

    autopatch::uninstall();
    autopatch::uninstall();
    assert!(!autopatch::is_patched());
}

#[test]
#[serial]
fn test_failing_hook_is_invisible_to_the_importer() {
    define_module("facade.fragile");
    autopatch::register_fn("facade.fragile", "broken", || {
        Err(anyhow::anyhow!("instrumentation failed"))
    });
    let sibling = count_loads("facade.fragile");

    autopatch::install();
    let module = autopatch::runtime().import("facade.fragile");
    autopatch::uninstall();

    assert!(module.is_ok());
    assert_eq!(loads(&sibling), 1);
}

#[test]
#[serial]
fn test_registration_is_visible_through_hooks() {
    let _calls = count_loads("facade.inspect");
    let registry = autopatch::hooks().registry();
    assert!(registry.has_hooks("facade.inspect"));
    assert!(
        registry
            .owners_for("facade.inspect")
            .contains(&"integration".to_string())
    );
}
