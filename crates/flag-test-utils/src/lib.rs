//! Testing utilities for flagkit workspace
//!
//! Shared test helpers, fixtures, and assertions.

#![allow(missing_docs)]

use chrono::{DateTime, Duration, Utc};
use flag_registry::{
    Category, FixedClock, Flag, FlagRegistry, Impact, KeyValueStore, MemoryStore, RegistryConfig,
    Session,
};
use std::sync::Arc;

/// Fixed instant used by deterministic fixtures
pub fn test_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_750_000_000, 0).unwrap_or_default()
}

pub fn plain_flag(id: &str, enabled: bool) -> Flag {
    Flag::new(id, id, Category::Experimental, Impact::Low, enabled)
}

pub fn rollout_flag(id: &str, enabled: bool, percentage: u8) -> Flag {
    plain_flag(id, enabled).with_rollout(percentage)
}

pub fn expired_flag(id: &str, enabled: bool) -> Flag {
    plain_flag(id, enabled).with_expiry(test_now() - Duration::hours(1))
}

pub fn dependent_flag(id: &str, enabled: bool, deps: &[&str]) -> Flag {
    plain_flag(id, enabled).with_dependencies(deps.iter().copied())
}

/// Registry over `flags` with a pinned session, fixed clock and in-memory stores
pub fn registry_with(flags: Vec<Flag>, session_id: &str) -> FlagRegistry {
    FlagRegistry::builder()
        .catalog(flags)
        .session(Session::from_id(session_id))
        .clock(FixedClock(test_now()))
        .build()
}

/// Registry sharing `store` as its local store, so tests can inspect writes
pub fn registry_on_store(
    flags: Vec<Flag>,
    store: Arc<MemoryStore>,
    config: RegistryConfig,
) -> FlagRegistry {
    FlagRegistry::builder()
        .catalog(flags)
        .config(config)
        .local_store(store)
        .session(Session::from_id("fixture-session"))
        .clock(FixedClock(test_now()))
        .build()
}

/// Snapshot string stored under the default key, if any
pub fn stored_snapshot(store: &dyn KeyValueStore) -> Option<String> {
    store
        .get(&RegistryConfig::default().snapshot_key)
        .ok()
        .flatten()
}

/// Catalog rendered as `(id, enabled)` pairs for equality checks
pub fn enabled_states(registry: &FlagRegistry) -> Vec<(String, bool)> {
    registry
        .flags()
        .map(|f| (f.id.to_string(), f.enabled))
        .collect()
}
