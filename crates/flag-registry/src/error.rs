//! Error types for the flag registry
//!
//! Provides error handling for:
//! - Storage backends (unavailable, IO)
//! - Persisted and exported payloads that fail schema validation
//! - Catalog configuration problems found at startup
//!
//! None of these are surfaced by the fail-soft registry operations; they
//! are logged and the registry keeps its last-known-good state.

use crate::flag::FlagId;

/// Main registry error type
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Storage backend failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Persisted or imported payload was malformed
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Key/value storage failures
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backend is not available at all
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Key cannot be mapped to a backend location as-is
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    /// Filesystem failure in a file-backed store
    #[error("io error on key '{key}': {source}")]
    Io {
        /// Key being accessed
        key: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Payload schema failures
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Not JSON, or JSON of the wrong shape
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// JSON of the right shape with out-of-range values
    #[error("invalid payload: {0}")]
    Invalid(String),

    /// Serialization of current state failed
    #[error("serialization failed: {0}")]
    Serialize(String),
}

/// Catalog problems detected by startup validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogIssue {
    /// Two catalog entries share an id
    #[error("duplicate flag id '{0}'")]
    DuplicateId(FlagId),

    /// Flag depends on an id absent from the catalog
    #[error("flag '{flag}' depends on unknown flag '{dependency}'")]
    UnknownDependency {
        /// Dependent flag
        flag: FlagId,
        /// Missing dependency
        dependency: FlagId,
    },

    /// Rollout percentage above 100
    #[error("flag '{flag}' has rollout percentage {value} (must be 0-100)")]
    RolloutOutOfRange {
        /// Offending flag
        flag: FlagId,
        /// Configured value
        value: u8,
    },

    /// Dependency graph contains a cycle
    #[error("dependency cycle between flags: {members:?}")]
    DependencyCycle {
        /// Flags participating in the cycle
        members: Vec<FlagId>,
    },
}

impl CatalogIssue {
    /// Flag ids this issue refers to
    #[must_use]
    pub fn flags(&self) -> Vec<&FlagId> {
        match self {
            Self::DuplicateId(id) => vec![id],
            Self::UnknownDependency { flag, .. } | Self::RolloutOutOfRange { flag, .. } => {
                vec![flag]
            }
            Self::DependencyCycle { members } => members.iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_error_from_storage() {
        let err: RegistryError = StorageError::Unavailable("quota".into()).into();
        assert!(matches!(err, RegistryError::Storage(_)));
        assert_eq!(err.to_string(), "storage error: storage unavailable: quota");
    }

    #[test]
    fn snapshot_error_from_json() {
        let json_err = serde_json::from_str::<bool>("nope").unwrap_err();
        let err: SnapshotError = json_err.into();
        assert!(err.to_string().starts_with("malformed payload"));
    }

    #[test]
    fn catalog_issue_flags() {
        let issue = CatalogIssue::DependencyCycle {
            members: vec![FlagId::from("a"), FlagId::from("b")],
        };
        assert_eq!(issue.flags().len(), 2);

        let issue = CatalogIssue::UnknownDependency {
            flag: FlagId::from("a"),
            dependency: FlagId::from("ghost"),
        };
        assert_eq!(issue.flags(), vec![&FlagId::from("a")]);
        assert!(issue.to_string().contains("ghost"));
    }
}
