//! Deterministic bucketing hashes
//!
//! Only within-session stability matters; no wire format depends on the
//! exact values. BLAKE3 is used so results are identical on every platform.

use crate::flag::AbGroup;

/// Deterministic 32-bit hash of a string
///
/// First four bytes of the BLAKE3 digest, little-endian.
#[inline]
#[must_use]
pub fn stable_hash(input: &str) -> u32 {
    let digest = blake3::hash(input.as_bytes());
    let bytes = digest.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Rollout percentile of a session for a flag, in `1..=100`
#[must_use]
pub fn rollout_percentile(session_id: &str, flag_id: &str) -> u8 {
    let mut key = String::with_capacity(session_id.len() + flag_id.len());
    key.push_str(session_id);
    key.push_str(flag_id);
    // % 100 < 100, so the cast cannot truncate
    #[allow(clippy::cast_possible_truncation)]
    let bucket = (stable_hash(&key) % 100) as u8;
    bucket + 1
}

/// A/B group of a session
#[inline]
#[must_use]
pub fn group_bucket(session_id: &str) -> AbGroup {
    AbGroup::from_bucket(stable_hash(session_id) % 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(stable_hash("session-1"), stable_hash("session-1"));
        assert_ne!(stable_hash("session-1"), stable_hash("session-2"));
    }

    #[test]
    fn percentile_in_range() {
        for i in 0..500 {
            let p = rollout_percentile(&format!("s{i}"), "flag");
            assert!((1..=100).contains(&p));
        }
    }

    #[test]
    fn percentile_depends_on_flag() {
        let differs = (0..50).any(|i| {
            let session = format!("s{i}");
            rollout_percentile(&session, "a") != rollout_percentile(&session, "b")
        });
        assert!(differs);
    }

    #[test]
    fn groups_are_roughly_balanced() {
        let a = (0..1000)
            .filter(|i| group_bucket(&format!("session-{i}")) == AbGroup::A)
            .count();
        assert!((400..=600).contains(&a), "group A count {a}");
    }
}
