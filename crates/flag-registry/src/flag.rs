//! Flag data model
//!
//! A [`Flag`] is a named boolean capability with optional gating rules.
//! Display metadata ([`Category`], [`Impact`], name, description) has no
//! behavioural effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Stable flag identifier, unique within a registry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagId(String);

impl FlagId {
    /// Create identifier from any string
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FlagId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl Borrow<str> for FlagId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FlagId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FlagId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Flag category (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Loading and rendering speed
    Performance,
    /// Interface and layout
    Ui,
    /// Unstable or in-progress capabilities
    Experimental,
    /// Tracking and measurement
    Analytics,
    /// Assistive features
    Accessibility,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 5] = [
        Category::Performance,
        Category::Ui,
        Category::Experimental,
        Category::Analytics,
        Category::Accessibility,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Ui => "ui",
            Self::Experimental => "experimental",
            Self::Analytics => "analytics",
            Self::Accessibility => "accessibility",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// Impact level (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    /// Barely noticeable
    Low,
    /// Visible change
    Medium,
    /// Significant behaviour change
    High,
}

impl Display for Impact {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// A/B experiment group label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbGroup {
    /// Group "A"
    A,
    /// Group "B"
    B,
}

impl AbGroup {
    /// Map a hash bucket to a group (even → A, odd → B)
    #[inline]
    #[must_use]
    pub const fn from_bucket(bucket: u32) -> Self {
        if bucket % 2 == 0 {
            Self::A
        } else {
            Self::B
        }
    }

    /// Wire label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl Display for AbGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AbGroup {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

/// Label did not match any variant of a closed set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown label '{0}'")]
pub struct UnknownLabel(pub String);

/// Named boolean capability with optional gates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    /// Stable identifier
    pub id: FlagId,
    /// Human-readable name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Display category
    pub category: Category,
    /// Display impact
    pub impact: Impact,
    /// Base state
    pub enabled: bool,
    /// Percentage of sessions (0-100) admitted by stable hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout_percentage: Option<u8>,
    /// Only sessions in this group are admitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ab_test_group: Option<AbGroup>,
    /// Flags that must all evaluate enabled
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<FlagId>,
    /// After this instant the flag always evaluates disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Flag {
    /// Create ungated flag
    #[must_use]
    pub fn new(
        id: impl Into<FlagId>,
        name: impl Into<String>,
        category: Category,
        impact: Impact,
        enabled: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category,
            impact,
            enabled,
            rollout_percentage: None,
            ab_test_group: None,
            dependencies: Vec::new(),
            expires_at: None,
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With rollout percentage
    #[inline]
    #[must_use]
    pub fn with_rollout(mut self, percentage: u8) -> Self {
        self.rollout_percentage = Some(percentage);
        self
    }

    /// With A/B group
    #[inline]
    #[must_use]
    pub fn with_ab_group(mut self, group: AbGroup) -> Self {
        self.ab_test_group = Some(group);
        self
    }

    /// With dependencies
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FlagId>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// With expiry
    #[inline]
    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the flag has expired at `now`
    #[inline]
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    /// Whether the flag has no gates at all
    #[must_use]
    pub fn is_ungated(&self) -> bool {
        self.rollout_percentage.is_none()
            && self.ab_test_group.is_none()
            && self.dependencies.is_empty()
            && self.expires_at.is_none()
    }
}
