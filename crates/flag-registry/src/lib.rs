//! Flag Registry
//!
//! Closed-catalog feature flags with deterministic experiment assignment.
//!
//! # Overview
//!
//! - **Flag**: named boolean capability with optional gates (expiry,
//!   dependencies, rollout percentage, A/B group)
//! - **FlagRegistry**: owns the catalog and evaluates `is_enabled`
//! - **Session**: opaque per-session id and its stable A/B group
//! - **KeyValueStore**: synchronous persistence for the enabled-state snapshot
//!
//! # Example
//!
//! ```rust
//! use flag_registry::{FlagRegistry, RegistryConfig};
//!
//! let mut registry = FlagRegistry::new(RegistryConfig::default());
//! registry.disable("lazy-loading");
//! assert!(!registry.is_enabled("lazy-loading"));
//! assert!(!registry.is_enabled("no-such-flag"));
//! ```

#![warn(missing_docs)]

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod flag;
pub mod hash;
pub mod registry;
pub mod session;
pub mod simulate;
pub mod snapshot;
pub mod storage;

// Re-exports
pub use catalog::{default_catalog, validate_catalog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::RegistryConfig;
pub use error::{CatalogIssue, RegistryError, SnapshotError, StorageError};
pub use flag::{AbGroup, Category, Flag, FlagId, Impact, UnknownLabel};
pub use registry::{CategorySummary, Evaluation, FlagRegistry, RegistryBuilder, RegistrySummary};
pub use session::{Session, SessionResolver};
pub use simulate::{simulate_rollout, RolloutReport};
pub use snapshot::{ExportDocument, SnapshotEntry};
pub use storage::{FileStore, KeyValueStore, MemoryStore, UnavailableStore};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for flag evaluation
    pub use crate::{
        AbGroup, Category, Evaluation, Flag, FlagId, FlagRegistry, Impact, KeyValueStore,
        RegistryConfig, Session,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
