//! Session identity and A/B group assignment
//!
//! A session id is an opaque string used only as hash input. It is loaded
//! from (or generated into) the session-scoped store, and the group label is
//! derived from it once. Storage failures degrade to an in-memory session.

use crate::config::RegistryConfig;
use crate::flag::AbGroup;
use crate::hash::group_bucket;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};

/// Resolved session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session identifier
    pub id: String,
    /// Assigned experiment group
    pub group: AbGroup,
}

impl Session {
    /// Session with group derived from its id
    #[must_use]
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let group = group_bucket(&id);
        Self { id, group }
    }

    /// Session with an explicit group
    #[must_use]
    pub fn with_group(id: impl Into<String>, group: AbGroup) -> Self {
        Self {
            id: id.into(),
            group,
        }
    }
}

/// Loads or creates the session from a session-scoped store
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionResolver;

impl SessionResolver {
    /// Resolve the current session
    ///
    /// Never fails: unreadable or unwritable storage yields a fresh
    /// in-memory session.
    #[must_use]
    pub fn resolve(store: &dyn KeyValueStore, config: &RegistryConfig) -> Session {
        let id = Self::load_or_create_id(store, &config.session_id_key);
        let group = Self::load_or_assign_group(store, &config.group_key, &id);
        tracing::debug!(session = %id, group = %group, "session resolved");
        Session { id, group }
    }

    fn load_or_create_id(store: &dyn KeyValueStore, key: &str) -> String {
        match store.get(key) {
            Ok(Some(id)) if !id.trim().is_empty() => return id.trim().to_string(),
            Ok(_) => {}
            Err(e) => tracing::warn!("failed to read session id: {}", e),
        }

        let id = uuid::Uuid::new_v4().to_string();
        if let Err(e) = store.set(key, &id) {
            tracing::warn!("failed to persist session id: {}", e);
        }
        id
    }

    fn load_or_assign_group(store: &dyn KeyValueStore, key: &str, id: &str) -> AbGroup {
        match store.get(key) {
            Ok(Some(label)) => match label.parse::<AbGroup>() {
                Ok(group) => return group,
                Err(e) => tracing::warn!("ignoring stored group: {}", e),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("failed to read session group: {}", e),
        }

        let group = group_bucket(id);
        if let Err(e) = store.set(key, group.as_str()) {
            tracing::warn!("failed to persist session group: {}", e);
        }
        group
    }
}
