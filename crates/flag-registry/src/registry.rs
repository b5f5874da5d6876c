//! Flag registry
//!
//! [`FlagRegistry`] owns the closed catalog and answers "is this capability
//! active for the current session right now?". It is constructed explicitly
//! and passed to whatever needs [`FlagRegistry::is_enabled`].
//!
//! # Evaluation order
//!
//! Short-circuits to disabled on the first failing gate:
//! 1. expiry
//! 2. dependencies (recursive, cycle-guarded)
//! 3. rollout percentage
//! 4. A/B group
//! 5. base `enabled` state
//!
//! # Failure semantics
//!
//! Unknown ids evaluate disabled and make mutations no-ops. Storage and
//! payload failures are logged and leave the registry unchanged.

use crate::catalog::{default_catalog, validate_catalog};
use crate::clock::{Clock, SystemClock};
use crate::config::RegistryConfig;
use crate::error::{CatalogIssue, RegistryError, SnapshotError};
use crate::flag::{AbGroup, Category, Flag, FlagId};
use crate::hash::rollout_percentile;
use crate::session::{Session, SessionResolver};
use crate::snapshot::{encode_snapshot, parse_export, parse_snapshot, ExportDocument};
use crate::storage::{KeyValueStore, MemoryStore};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use once_cell::unsync::OnceCell;
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

/// Outcome of evaluating a flag, with the deciding gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// All gates passed and the flag is enabled
    Enabled,
    /// All gates passed but the flag is disabled
    Disabled,
    /// No flag with this id
    Unknown,
    /// Expiry has passed
    Expired,
    /// A dependency evaluated disabled
    DependencyDisabled {
        /// First failing dependency
        dependency: FlagId,
    },
    /// Dependency chain loops back on itself
    DependencyCycle {
        /// Dependency that closed the cycle
        dependency: FlagId,
    },
    /// Session hashed outside the rollout percentage
    OutsideRollout {
        /// Session percentile for this flag (1-100)
        percentile: u8,
        /// Configured rollout percentage
        percentage: u8,
    },
    /// Session is in a different experiment group
    GroupMismatch {
        /// Group the flag requires
        required: AbGroup,
        /// Group the session is assigned to
        assigned: AbGroup,
    },
}

impl Evaluation {
    /// Whether the flag is active
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }
}

impl Display for Evaluation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => write!(f, "enabled"),
            Self::Disabled => write!(f, "disabled"),
            Self::Unknown => write!(f, "unknown flag"),
            Self::Expired => write!(f, "expired"),
            Self::DependencyDisabled { dependency } => {
                write!(f, "dependency '{dependency}' is not enabled")
            }
            Self::DependencyCycle { dependency } => {
                write!(f, "dependency cycle through '{dependency}'")
            }
            Self::OutsideRollout {
                percentile,
                percentage,
            } => write!(f, "outside rollout (percentile {percentile} > {percentage}%)"),
            Self::GroupMismatch { required, assigned } => {
                write!(f, "requires group {required}, session is in group {assigned}")
            }
        }
    }
}

/// Per-category counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorySummary {
    /// Category
    pub category: Category,
    /// Flags in the category
    pub total: usize,
    /// Flags evaluating enabled
    pub active: usize,
}

/// Registry-wide counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySummary {
    /// Number of flags
    pub total: usize,
    /// Flags whose base state is enabled
    pub enabled: usize,
    /// Flags evaluating enabled for this session now
    pub active: usize,
    /// Breakdown per category, in [`Category::ALL`] order
    pub by_category: Vec<CategorySummary>,
}

/// Builder for [`FlagRegistry`]
///
/// Usage:
/// ```rust
/// use flag_registry::{FlagRegistry, MemoryStore, Session};
///
/// let registry = FlagRegistry::builder()
///     .local_store(MemoryStore::new())
///     .session(Session::from_id("session-1"))
///     .build();
/// assert!(registry.is_enabled("lazy-loading"));
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    catalog: Option<Vec<Flag>>,
    config: RegistryConfig,
    local: Option<Box<dyn KeyValueStore>>,
    session_store: Option<Box<dyn KeyValueStore>>,
    clock: Option<Box<dyn Clock>>,
    session: Option<Session>,
}

impl RegistryBuilder {
    /// Seed catalog (defaults to [`default_catalog`])
    #[must_use]
    pub fn catalog(mut self, flags: Vec<Flag>) -> Self {
        self.catalog = Some(flags);
        self
    }

    /// Configuration
    #[must_use]
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Persistent store for the enabled-state snapshot
    #[must_use]
    pub fn local_store(mut self, store: impl KeyValueStore + 'static) -> Self {
        self.local = Some(Box::new(store));
        self
    }

    /// Session-scoped store for session id and group
    #[must_use]
    pub fn session_store(mut self, store: impl KeyValueStore + 'static) -> Self {
        self.session_store = Some(Box::new(store));
        self
    }

    /// Time source
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Pin the session instead of resolving it from the session store
    #[must_use]
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Build the registry
    ///
    /// Catalog issues are logged once here; they never fail construction.
    #[must_use]
    pub fn build(self) -> FlagRegistry {
        let seed = self.catalog.unwrap_or_else(default_catalog);

        let issues = if self.config.validate_on_startup {
            validate_catalog(&seed).err().unwrap_or_default()
        } else {
            Vec::new()
        };
        for issue in &issues {
            tracing::warn!("catalog issue: {}", issue);
        }

        let session = OnceCell::new();
        if let Some(pinned) = self.session {
            let _ = session.set(pinned);
        }

        let mut registry = FlagRegistry {
            flags: index_catalog(&seed),
            seed,
            config: self.config,
            local: self.local.unwrap_or_else(|| Box::new(MemoryStore::new())),
            session_store: self
                .session_store
                .unwrap_or_else(|| Box::new(MemoryStore::new())),
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            session,
            issues,
        };

        if registry.config.load_on_startup {
            registry.load_flags();
        }

        registry
    }
}

/// First definition of an id wins
fn index_catalog(flags: &[Flag]) -> IndexMap<FlagId, Flag> {
    let mut map = IndexMap::with_capacity(flags.len());
    for flag in flags {
        map.entry(flag.id.clone()).or_insert_with(|| flag.clone());
    }
    map
}

/// Closed-catalog feature-flag registry
#[derive(Debug)]
pub struct FlagRegistry {
    flags: IndexMap<FlagId, Flag>,
    seed: Vec<Flag>,
    config: RegistryConfig,
    local: Box<dyn KeyValueStore>,
    session_store: Box<dyn KeyValueStore>,
    clock: Box<dyn Clock>,
    session: OnceCell<Session>,
    issues: Vec<CatalogIssue>,
}

impl FlagRegistry {
    /// Start building a registry
    #[inline]
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry over the default catalog and in-memory stores
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self::builder().config(config).build()
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Whether the flag is active for this session now
    #[inline]
    #[must_use]
    pub fn is_enabled(&self, id: &str) -> bool {
        self.evaluate(id).is_enabled()
    }

    /// Whether the flag is active for this session at `now`
    #[inline]
    #[must_use]
    pub fn is_enabled_at(&self, id: &str, now: DateTime<Utc>) -> bool {
        self.evaluate_at(id, now).is_enabled()
    }

    /// Evaluate the flag now, reporting the deciding gate
    #[must_use]
    pub fn evaluate(&self, id: &str) -> Evaluation {
        self.evaluate_at(id, self.clock.now())
    }

    /// Evaluate the flag at `now`, reporting the deciding gate
    #[must_use]
    pub fn evaluate_at(&self, id: &str, now: DateTime<Utc>) -> Evaluation {
        let mut path = HashSet::new();
        self.evaluate_inner(id, now, &mut path)
    }

    /// `path` holds the ids currently being evaluated up the dependency chain
    fn evaluate_inner<'a>(
        &'a self,
        id: &str,
        now: DateTime<Utc>,
        path: &mut HashSet<&'a str>,
    ) -> Evaluation {
        let Some(flag) = self.flags.get(id) else {
            return Evaluation::Unknown;
        };

        if flag.is_expired_at(now) {
            return Evaluation::Expired;
        }

        if !flag.dependencies.is_empty() {
            path.insert(flag.id.as_str());
            for dep in &flag.dependencies {
                if path.contains(dep.as_str()) {
                    tracing::debug!(flag = %flag.id, dependency = %dep, "dependency cycle");
                    path.remove(flag.id.as_str());
                    return Evaluation::DependencyCycle {
                        dependency: dep.clone(),
                    };
                }
                match self.evaluate_inner(dep.as_str(), now, path) {
                    Evaluation::Enabled => {}
                    cycle @ Evaluation::DependencyCycle { .. } => {
                        path.remove(flag.id.as_str());
                        return cycle;
                    }
                    _ => {
                        path.remove(flag.id.as_str());
                        return Evaluation::DependencyDisabled {
                            dependency: dep.clone(),
                        };
                    }
                }
            }
            path.remove(flag.id.as_str());
        }

        // Rollout and group gates combine with plain AND in this order
        if let Some(percentage) = flag.rollout_percentage {
            let percentile = rollout_percentile(&self.session().id, flag.id.as_str());
            if percentile > percentage {
                return Evaluation::OutsideRollout {
                    percentile,
                    percentage,
                };
            }
        }

        if let Some(required) = flag.ab_test_group {
            let assigned = self.session().group;
            if assigned != required {
                return Evaluation::GroupMismatch { required, assigned };
            }
        }

        if flag.enabled {
            Evaluation::Enabled
        } else {
            Evaluation::Disabled
        }
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Set base state to enabled; `false` if the id is unknown
    pub fn enable(&mut self, id: &str) -> bool {
        self.set_enabled(id, true)
    }

    /// Set base state to disabled; `false` if the id is unknown
    pub fn disable(&mut self, id: &str) -> bool {
        self.set_enabled(id, false)
    }

    /// Flip base state and return the new value; `false` if unknown
    pub fn toggle(&mut self, id: &str) -> bool {
        let Some(flag) = self.flags.get_mut(id) else {
            return false;
        };
        flag.enabled = !flag.enabled;
        let state = flag.enabled;
        tracing::debug!(flag = id, enabled = state, "flag toggled");
        self.persist();
        state
    }

    fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        let Some(flag) = self.flags.get_mut(id) else {
            return false;
        };
        flag.enabled = enabled;
        tracing::debug!(flag = id, enabled, "flag updated");
        self.persist();
        true
    }

    /// Discard all changes and re-seed from the seed catalog
    pub fn reset_to_defaults(&mut self) {
        self.flags = index_catalog(&self.seed);
        tracing::info!("flags reset to defaults ({} flags)", self.flags.len());
        self.persist();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Flag by id
    #[inline]
    #[must_use]
    pub fn get_flag(&self, id: &str) -> Option<&Flag> {
        self.flags.get(id)
    }

    /// Whether the catalog contains `id`
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.flags.contains_key(id)
    }

    /// All flags in catalog order
    pub fn flags(&self) -> impl Iterator<Item = &Flag> {
        self.flags.values()
    }

    /// All flags in catalog order, collected
    #[must_use]
    pub fn get_all_flags(&self) -> Vec<&Flag> {
        self.flags.values().collect()
    }

    /// Flags in one category, in catalog order
    #[must_use]
    pub fn flags_by_category(&self, category: Category) -> Vec<&Flag> {
        self.flags
            .values()
            .filter(|f| f.category == category)
            .collect()
    }

    /// Number of flags
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether the catalog is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Current session, resolved on first use and then fixed
    pub fn session(&self) -> &Session {
        self.session
            .get_or_init(|| SessionResolver::resolve(self.session_store.as_ref(), &self.config))
    }

    /// Experiment group of the current session
    #[inline]
    pub fn user_group(&self) -> AbGroup {
        self.session().group
    }

    /// Issues found by startup validation
    #[inline]
    #[must_use]
    pub fn catalog_issues(&self) -> &[CatalogIssue] {
        &self.issues
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Persistent store backing the snapshot
    #[inline]
    #[must_use]
    pub fn local_store(&self) -> &dyn KeyValueStore {
        self.local.as_ref()
    }

    /// Counts of enabled and active flags
    #[must_use]
    pub fn summary(&self) -> RegistrySummary {
        let now = self.clock.now();
        let active_ids: HashSet<&str> = self
            .flags
            .keys()
            .map(FlagId::as_str)
            .filter(|id| self.is_enabled_at(id, now))
            .collect();

        let by_category = Category::ALL
            .into_iter()
            .map(|category| {
                let in_category = self.flags.values().filter(|f| f.category == category);
                let (total, active) = in_category.fold((0, 0), |(t, a), f| {
                    (t + 1, a + usize::from(active_ids.contains(f.id.as_str())))
                });
                CategorySummary {
                    category,
                    total,
                    active,
                }
            })
            .collect();

        RegistrySummary {
            total: self.flags.len(),
            enabled: self.flags.values().filter(|f| f.enabled).count(),
            active: active_ids.len(),
            by_category,
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Apply the persisted snapshot to matching flags
    ///
    /// Returns the number of flags updated. A missing, unreadable or
    /// malformed snapshot is logged and changes nothing.
    pub fn load_flags(&mut self) -> usize {
        let key = &self.config.snapshot_key;
        let raw = match self.local.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return 0,
            Err(e) => {
                tracing::warn!("failed to read flag snapshot: {}", e);
                return 0;
            }
        };

        let entries = match parse_snapshot(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("ignoring malformed flag snapshot: {}", e);
                return 0;
            }
        };

        let mut applied = 0;
        for entry in entries {
            if let Some(flag) = self.flags.get_mut(entry.id.as_str()) {
                flag.enabled = entry.enabled;
                applied += 1;
            } else {
                tracing::debug!(flag = %entry.id, "snapshot entry not in catalog");
            }
        }

        tracing::info!("loaded {} flag states from snapshot", applied);
        applied
    }

    /// Write the enabled-state snapshot now
    ///
    /// Returns whether the write succeeded; failures are logged.
    pub fn save_flags(&self) -> bool {
        let result = encode_snapshot(self.flags.values())
            .map_err(RegistryError::from)
            .and_then(|json| {
                self.local
                    .set(&self.config.snapshot_key, &json)
                    .map_err(RegistryError::from)
            });

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("failed to persist flag snapshot: {}", e);
                false
            }
        }
    }

    fn persist(&self) {
        if self.config.persist_on_mutation {
            self.save_flags();
        }
    }

    /// Full catalog with metadata, timestamp and session group as JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn export_flags(&self) -> Result<String, RegistryError> {
        let doc = ExportDocument {
            timestamp: self.clock.now(),
            flags: self.flags.values().cloned().collect(),
            user_group: Some(self.user_group()),
        };
        Ok(doc.to_json()?)
    }

    /// Replace matching flags from an export document
    ///
    /// Returns `false` and leaves state unchanged if the input is malformed
    /// or would introduce new catalog issues.
    pub fn import_flags(&mut self, input: &str) -> bool {
        match self.try_import_flags(input) {
            Ok(count) => {
                tracing::info!("imported {} flags", count);
                true
            }
            Err(e) => {
                tracing::warn!("flag import rejected: {}", e);
                false
            }
        }
    }

    /// Replace matching flags from an export document
    ///
    /// Ids not in the catalog are ignored. The import is all-or-nothing.
    ///
    /// # Errors
    /// Returns error for malformed input or if the result would contain
    /// catalog issues that were not already present.
    pub fn try_import_flags(&mut self, input: &str) -> Result<usize, RegistryError> {
        let doc = parse_export(input)?;
        let current: Vec<Flag> = self.flags.values().cloned().collect();
        let baseline = validate_catalog(&current).err().unwrap_or_default();

        let mut candidate = self.flags.clone();
        let mut replaced = 0;
        for flag in doc.flags {
            if let Some(slot) = candidate.get_mut(flag.id.as_str()) {
                *slot = flag;
                replaced += 1;
            }
        }

        let flags: Vec<Flag> = candidate.values().cloned().collect();
        if let Err(issues) = validate_catalog(&flags) {
            if let Some(issue) = issues.iter().find(|i| !baseline.contains(i)) {
                return Err(SnapshotError::Invalid(issue.to_string()).into());
            }
        }

        self.flags = candidate;
        self.persist();
        Ok(replaced)
    }
}

impl Default for FlagRegistry {
    fn default() -> Self {
        Self::builder().build()
    }
}
