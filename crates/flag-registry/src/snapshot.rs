//! Persisted snapshot and export document schemas
//!
//! Two formats:
//! - **Snapshot**: JSON array of `{id, enabled}` written on every mutation
//!   and consumed by `load_flags`.
//! - **Export**: full catalog with metadata, timestamp and session group,
//!   for backup and debugging. Consumed only by `import_flags`.
//!
//! Both are validated against an explicit schema before any state is touched.

use crate::error::SnapshotError;
use crate::flag::{AbGroup, Flag, FlagId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted `{id, enabled}` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Flag id (may no longer exist in the catalog)
    pub id: FlagId,
    /// Persisted base state
    pub enabled: bool,
}

impl From<&Flag> for SnapshotEntry {
    fn from(flag: &Flag) -> Self {
        Self {
            id: flag.id.clone(),
            enabled: flag.enabled,
        }
    }
}

/// Serialize the enabled-state snapshot of `flags`
///
/// # Errors
/// Returns error if serialization fails
pub fn encode_snapshot<'a>(
    flags: impl IntoIterator<Item = &'a Flag>,
) -> Result<String, SnapshotError> {
    let entries: Vec<SnapshotEntry> = flags.into_iter().map(SnapshotEntry::from).collect();
    serde_json::to_string(&entries).map_err(|e| SnapshotError::Serialize(e.to_string()))
}

/// Parse a persisted snapshot
///
/// # Errors
/// Returns [`SnapshotError::Malformed`] unless the input is a JSON array of
/// objects each carrying a string `id` and a boolean `enabled`.
pub fn parse_snapshot(input: &str) -> Result<Vec<SnapshotEntry>, SnapshotError> {
    Ok(serde_json::from_str(input)?)
}

/// Full-catalog export document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// When the export was taken
    pub timestamp: DateTime<Utc>,
    /// All flags with metadata
    pub flags: Vec<Flag>,
    /// Session group at export time
    #[serde(default)]
    pub user_group: Option<AbGroup>,
}

impl ExportDocument {
    /// Pretty-printed JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::Serialize(e.to_string()))
    }
}

/// Parse and validate an export document
///
/// # Errors
/// Returns error for malformed JSON or rollout percentages above 100
pub fn parse_export(input: &str) -> Result<ExportDocument, SnapshotError> {
    let doc: ExportDocument = serde_json::from_str(input)?;

    if let Some(flag) = doc
        .flags
        .iter()
        .find(|f| f.rollout_percentage.is_some_and(|p| p > 100))
    {
        return Err(SnapshotError::Invalid(format!(
            "flag '{}' has rollout percentage above 100",
            flag.id
        )));
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::{Category, Impact};

    fn flag(id: &str, enabled: bool) -> Flag {
        Flag::new(id, id, Category::Performance, Impact::Low, enabled)
    }

    #[test]
    fn snapshot_encode_shape() {
        let flags = [flag("a", true), flag("b", false)];
        let json = encode_snapshot(&flags).unwrap();
        assert_eq!(json, r#"[{"id":"a","enabled":true},{"id":"b","enabled":false}]"#);
    }

    #[test]
    fn snapshot_tolerates_extra_fields() {
        let entries = parse_snapshot(r#"[{"id":"a","enabled":true,"note":"x"}]"#).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].enabled);
    }

    #[test]
    fn snapshot_rejects_wrong_shapes() {
        assert!(parse_snapshot("not json").is_err());
        assert!(parse_snapshot(r#"{"a":true}"#).is_err());
        assert!(parse_snapshot(r#"[{"id":"a"}]"#).is_err());
        assert!(parse_snapshot(r#"[{"id":"a","enabled":"yes"}]"#).is_err());
        assert!(parse_snapshot(r#"[{"id":1,"enabled":true}]"#).is_err());
    }

    #[test]
    fn export_uses_camel_case() {
        let doc = ExportDocument {
            timestamp: Utc::now(),
            flags: vec![flag("a", true)],
            user_group: Some(AbGroup::A),
        };
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(value["userGroup"], "A");
        assert_eq!(value["flags"][0]["id"], "a");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn export_rejects_rollout_above_100() {
        let doc = ExportDocument {
            timestamp: Utc::now(),
            flags: vec![flag("a", true).with_rollout(150)],
            user_group: None,
        };
        let err = parse_export(&doc.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, SnapshotError::Invalid(_)));
    }
}
