//! Hook Registry Tests
//!
//! Install/uninstall of the native-aware archive hook:
//! - In-place replacement and exact restoration
//! - Failure without the baseline hook
//! - Finder cache invalidation
//! - The process-wide registry

mod common;

use std::sync::Arc;

use common::{write_zip, Harness};
use zipext::{hooks, Error, HookRef, HookRegistration, PathHooks};

#[test]
fn test_install_then_uninstall_restores_list() {
    let harness = Harness::new();
    let extra: HookRef = harness.registration.replacement().clone();
    let hooks = PathHooks::with_hooks(vec![
        harness.registration.baseline().clone(),
        hooks::baseline_hook(),
    ]);
    let before = hooks.snapshot();

    harness.registration.install(&hooks).unwrap();
    assert_eq!(hooks.position(&extra), Some(0));
    harness.registration.uninstall(&hooks).unwrap();

    let after = hooks.snapshot();
    assert_eq!(before.len(), after.len());
    assert!(before.iter().zip(&after).all(|(b, a)| Arc::ptr_eq(b, a)));
}

#[test]
fn test_install_fails_without_baseline() {
    let harness = Harness::new();
    let unrelated = hooks::baseline_hook();
    let hooks = PathHooks::with_hooks(vec![unrelated.clone()]);

    let err = harness.registration.install(&hooks).unwrap_err();
    assert!(matches!(err, Error::Registration(_)));
    assert_eq!(hooks.len(), 1);
    assert!(Arc::ptr_eq(&hooks.snapshot()[0], &unrelated));

    let empty = PathHooks::new();
    assert!(harness.registration.install(&empty).is_err());
    assert!(empty.is_empty());
}

#[test]
fn test_install_drops_cached_finders() {
    let dir = tempfile::tempdir().unwrap();
    let zip_path = write_zip(dir.path(), "a.zip", &[("two.so", b"\x7fELF")]);
    let harness = Harness::new();

    let before = harness.hooks.finder_for(&zip_path).unwrap();
    assert!(before.find_module("two").unwrap().is_none());
    assert_eq!(harness.hooks.cached_entries(), 1);

    harness.registration.install(&harness.hooks).unwrap();
    assert_eq!(harness.hooks.cached_entries(), 0);

    let after = harness.hooks.finder_for(&zip_path).unwrap();
    assert!(after.find_module("two").unwrap().is_some());

    harness.registration.uninstall(&harness.hooks).unwrap();
    let restored = harness.hooks.finder_for(&zip_path).unwrap();
    assert!(restored.find_module("two").unwrap().is_none());
}

#[test]
fn test_registration_between_lists_is_independent() {
    let harness = Harness::new();
    let other = PathHooks::with_hooks(vec![harness.registration.baseline().clone()]);

    harness.registration.install(&harness.hooks).unwrap();
    assert!(harness.registration.is_installed(&harness.hooks));
    assert!(!harness.registration.is_installed(&other));

    let registration = HookRegistration::new(
        harness.registration.baseline().clone(),
        harness.registration.replacement().clone(),
    );
    registration.install(&other).unwrap();
    assert!(registration.is_installed(&other));
}

#[test]
fn test_process_wide_install_uninstall() {
    let global = hooks::global();
    let before = global.snapshot();

    let prior = zipext::install().unwrap();
    assert!(Arc::ptr_eq(&prior, &hooks::baseline_hook()));
    assert!(matches!(zipext::install(), Err(Error::Registration(_))));

    let removed = zipext::uninstall().unwrap();
    assert!(Arc::ptr_eq(&removed, &hooks::extension_hook()));
    assert!(matches!(zipext::uninstall(), Err(Error::Registration(_))));

    let after = global.snapshot();
    assert_eq!(before.len(), after.len());
    assert!(before.iter().zip(&after).all(|(b, a)| Arc::ptr_eq(b, a)));
}
