//! Rollout distribution simulation
//!
//! Estimates what fraction of sessions a rollout percentage admits, using
//! the same percentile function as live evaluation.

use crate::flag::Flag;
use crate::hash::rollout_percentile;

/// Result of a rollout simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RolloutReport {
    /// Sessions simulated
    pub sessions: usize,
    /// Sessions passing the rollout gate
    pub admitted: usize,
    /// `admitted / sessions` (0.0 when no sessions)
    pub fraction: f64,
}

impl RolloutReport {
    /// Whether the observed fraction is within `tolerance` of `expected`
    #[must_use]
    pub fn within(&self, expected: f64, tolerance: f64) -> bool {
        (self.fraction - expected).abs() <= tolerance
    }
}

/// Count sessions admitted by the flag's rollout gate
///
/// Only the rollout gate is simulated; a flag without a rollout percentage
/// admits every session.
#[must_use]
pub fn simulate_rollout<I, S>(flag: &Flag, session_ids: I) -> RolloutReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sessions = 0;
    let mut admitted = 0;

    for id in session_ids {
        sessions += 1;
        let passes = flag
            .rollout_percentage
            .map_or(true, |pct| rollout_percentile(id.as_ref(), flag.id.as_str()) <= pct);
        if passes {
            admitted += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let fraction = if sessions == 0 {
        0.0
    } else {
        admitted as f64 / sessions as f64
    };

    RolloutReport {
        sessions,
        admitted,
        fraction,
    }
}
