//! Registry configuration

use serde::{Deserialize, Serialize};

/// Default key of the persisted `{id, enabled}` snapshot
pub const DEFAULT_SNAPSHOT_KEY: &str = "feature-flags";

/// Default session-scoped key of the assigned A/B group
pub const DEFAULT_GROUP_KEY: &str = "ab-test-group";

/// Default session-scoped key of the session identifier
pub const DEFAULT_SESSION_ID_KEY: &str = "session-id";

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Local-store key of the enabled-state snapshot
    ///
    /// `FileStore` only accepts keys made of `[A-Za-z0-9_-]`.
    pub snapshot_key: String,
    /// Session-store key of the A/B group label
    pub group_key: String,
    /// Session-store key of the session identifier
    pub session_id_key: String,
    /// Write the snapshot after every mutation
    pub persist_on_mutation: bool,
    /// Validate the catalog when the registry is built
    pub validate_on_startup: bool,
    /// Apply the persisted snapshot when the registry is built
    pub load_on_startup: bool,
}

impl RegistryConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With snapshot key
    #[inline]
    #[must_use]
    pub fn with_snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }

    /// With session-scoped keys
    #[inline]
    #[must_use]
    pub fn with_session_keys(
        mut self,
        session_id_key: impl Into<String>,
        group_key: impl Into<String>,
    ) -> Self {
        self.session_id_key = session_id_key.into();
        self.group_key = group_key.into();
        self
    }

    /// With persistence on mutation
    #[inline]
    #[must_use]
    pub fn with_persistence(mut self, persist: bool) -> Self {
        self.persist_on_mutation = persist;
        self
    }

    /// With startup validation
    #[inline]
    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_on_startup = validate;
        self
    }

    /// With snapshot load at startup
    #[inline]
    #[must_use]
    pub fn with_load_on_startup(mut self, load: bool) -> Self {
        self.load_on_startup = load;
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
            group_key: DEFAULT_GROUP_KEY.to_string(),
            session_id_key: DEFAULT_SESSION_ID_KEY.to_string(),
            persist_on_mutation: true,
            validate_on_startup: true,
            load_on_startup: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RegistryConfig::new();
        assert_eq!(config.snapshot_key, "feature-flags");
        assert_eq!(config.group_key, "ab-test-group");
        assert_eq!(config.session_id_key, "session-id");
        assert!(config.persist_on_mutation);
        assert!(config.validate_on_startup);
        assert!(config.load_on_startup);
    }

    #[test]
    fn builder_methods() {
        let config = RegistryConfig::new()
            .with_snapshot_key("flags-v2")
            .with_session_keys("sid", "grp")
            .with_persistence(false)
            .with_validation(false)
            .with_load_on_startup(false);
        assert_eq!(config.snapshot_key, "flags-v2");
        assert_eq!(config.session_id_key, "sid");
        assert_eq!(config.group_key, "grp");
        assert!(!config.persist_on_mutation);
        assert!(!config.validate_on_startup);
        assert!(!config.load_on_startup);
    }

    #[test]
    fn partial_deserialize_fills_defaults() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{"snapshot_key":"custom"}"#).unwrap();
        assert_eq!(config.snapshot_key, "custom");
        assert_eq!(config.group_key, DEFAULT_GROUP_KEY);
    }
}
