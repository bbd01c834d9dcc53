//! Agent start-up from configuration.

use serial_test::serial;

use autopatch::autopatch_core::config::AgentConfig;
use autopatch::autopatch_core::config::hooks::InterceptionMode;
use autopatch::autopatch_hooks::InterceptionStrategy;

use crate::helpers::{count_loads, define_module, loads};

#[test]
#[serial]
fn test_bootstrap_installs_when_enabled() {
    define_module("bootstrap.enabled");
    let calls = count_loads("bootstrap.enabled");

    autopatch::bootstrap(&AgentConfig::default());
    assert!(autopatch::is_patched());
    assert_eq!(
        autopatch::hooks().controller().strategy(),
        Some(InterceptionStrategy::Modern)
    );

    autopatch::runtime().import("bootstrap.enabled").unwrap();
    autopatch::uninstall();
    assert_eq!(loads(&calls), 1);
}

#[test]
#[serial]
fn test_bootstrap_skips_install_when_disabled() {
    let mut config = AgentConfig::default();
    config.hooks.enabled = false;

    autopatch::bootstrap(&config);
    assert!(!autopatch::is_patched());
}

#[test]
#[serial]
fn test_bootstrap_honors_mode_override() {
    define_module("bootstrap.legacy");
    let calls = count_loads("bootstrap.legacy");

    let mut config = AgentConfig::default();
    config.hooks.mode = InterceptionMode::Legacy;
    autopatch::bootstrap(&config);

    assert_eq!(
        autopatch::hooks().controller().strategy(),
        Some(InterceptionStrategy::Legacy)
    );
    autopatch::runtime().import("bootstrap.legacy").unwrap();
    autopatch::runtime().import("bootstrap.legacy").unwrap();
    autopatch::uninstall();

    autopatch::hooks()
        .controller()
        .set_mode(InterceptionMode::Auto);
    assert_eq!(loads(&calls), 1);
}

#[test]
#[serial]
fn test_bootstrap_from_env_reads_overrides() {
    unsafe {
        std::env::set_var("AUTOPATCH_CONFIG", "tests/fixtures/does-not-exist");
        std::env::set_var("AUTOPATCH__HOOKS__ENABLED", "false");
    }

    let config = autopatch::bootstrap_from_env().unwrap();
    assert!(!config.hooks.enabled);
    assert!(!autopatch::is_patched());

    unsafe {
        std::env::remove_var("AUTOPATCH_CONFIG");
        std::env::remove_var("AUTOPATCH__HOOKS__ENABLED");
    }
}
