use flag_registry::{AbGroup, Evaluation, FixedClock, FlagRegistry, MemoryStore, RegistryConfig, Session};
use flag_test_utils::{
    dependent_flag, expired_flag, plain_flag, registry_with, rollout_flag, test_now,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn test_dependency_scenario() {
    // b is enabled but its dependency a is not
    let registry = registry_with(
        vec![plain_flag("a", false), dependent_flag("b", true, &["a"])],
        "session",
    );
    assert!(!registry.is_enabled("b"));
    assert_eq!(
        registry.evaluate("b"),
        Evaluation::DependencyDisabled {
            dependency: "a".into()
        }
    );
}

#[test]
fn test_transitive_dependency() {
    let registry = registry_with(
        vec![
            expired_flag("root", true),
            dependent_flag("mid", true, &["root"]),
            dependent_flag("leaf", true, &["mid"]),
        ],
        "session",
    );
    assert!(!registry.is_enabled("leaf"));
}

#[test]
fn test_rollout_scenario_thousand_sessions() {
    let admitted = (0..1000)
        .filter(|i| {
            let registry = registry_with(vec![rollout_flag("x", true, 50)], &format!("user-{i}"));
            registry.is_enabled("x")
        })
        .count();
    assert!((450..=550).contains(&admitted), "admitted {admitted} of 1000");
}

#[test]
fn test_rollout_disabled_flag_never_enabled() {
    // Rollout admits the session but the base state still applies
    let admitted = (0..200)
        .filter(|i| registry_with(vec![rollout_flag("x", false, 100)], &format!("u{i}")).is_enabled("x"))
        .count();
    assert_eq!(admitted, 0);
}

#[test]
fn test_rollout_then_group_order() {
    // Both gates set: a session outside the rollout reports the rollout gate
    let flag = rollout_flag("combo", true, 0).with_ab_group(AbGroup::A);
    let registry = FlagRegistry::builder()
        .catalog(vec![flag])
        .session(Session::with_group("s", AbGroup::B))
        .build();
    assert!(matches!(
        registry.evaluate("combo"),
        Evaluation::OutsideRollout { .. }
    ));
}

#[test]
fn test_expiry_uses_clock() {
    let registry = FlagRegistry::builder()
        .catalog(vec![expired_flag("e", true)])
        .clock(FixedClock(test_now()))
        .build();
    assert_eq!(registry.evaluate("e"), Evaluation::Expired);
    assert!(registry.is_enabled_at("e", test_now() - chrono::Duration::days(1)));
}

#[test]
fn test_session_group_stable_after_store_change() {
    let store = std::sync::Arc::new(MemoryStore::new());
    let registry = FlagRegistry::builder()
        .session_store(store.clone())
        .build();

    let first = registry.user_group();
    let flipped = if first == AbGroup::A { "B" } else { "A" };
    flag_registry::KeyValueStore::set(&*store, &RegistryConfig::default().group_key, flipped).unwrap();

    assert_eq!(registry.user_group(), first);
    assert_eq!(registry.session().group, first);
}

proptest! {
    #[test]
    fn prop_ungated_matches_base_state(enabled in any::<bool>(), session in "[a-z0-9]{1,16}") {
        let registry = registry_with(vec![plain_flag("f", enabled)], &session);
        prop_assert_eq!(registry.is_enabled("f"), enabled);
    }

    #[test]
    fn prop_expired_always_disabled(enabled in any::<bool>(), session in "[a-z0-9]{1,16}") {
        let registry = registry_with(vec![expired_flag("f", enabled)], &session);
        prop_assert!(!registry.is_enabled("f"));
    }

    #[test]
    fn prop_zero_rollout_always_disabled(session in ".{0,32}") {
        let registry = registry_with(vec![rollout_flag("f", true, 0)], &session);
        prop_assert!(!registry.is_enabled("f"));
    }

    #[test]
    fn prop_full_rollout_matches_base_state(enabled in any::<bool>(), session in ".{0,32}") {
        let registry = registry_with(vec![rollout_flag("f", enabled, 100)], &session);
        prop_assert_eq!(registry.is_enabled("f"), enabled);
    }

    #[test]
    fn prop_disabled_dependency_disables(dependent in any::<bool>(), session in "[a-z]{1,8}") {
        let registry = registry_with(
            vec![plain_flag("dep", false), dependent_flag("f", dependent, &["dep"])],
            &session,
        );
        prop_assert!(!registry.is_enabled("f"));
    }

    #[test]
    fn prop_evaluation_is_pure(session in "[a-z0-9]{1,16}", pct in 0u8..=100) {
        let registry = registry_with(vec![rollout_flag("f", true, pct)], &session);
        let first = registry.evaluate("f");
        prop_assert_eq!(registry.evaluate("f"), first);
    }

    #[test]
    fn prop_unknown_ids_disabled(id in "[a-z]{1,12}") {
        let registry = registry_with(vec![plain_flag("known-flag", true)], "s");
        prop_assume!(id != "known-flag");
        prop_assert!(!registry.is_enabled(&id));
    }
}
