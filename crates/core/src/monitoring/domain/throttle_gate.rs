use serde::{Deserialize, Serialize};

use crate::monitoring::domain::tracker_state::TrackerState;
use crate::monitoring::domain::violation::ViolationCategory;
use crate::shared::constants::VIOLATION_COOLDOWN_MS;

/// Which acceptances a cooldown is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleScope {
    /// One cooldown shared by every category.
    #[default]
    Global,
    /// An independent cooldown per category.
    PerCategory,
}

/// Suppresses violation candidates that arrive within the cooldown of the
/// previous accepted one. Rejected candidates are dropped, not queued.
#[derive(Debug, Clone)]
pub struct ThrottleGate {
    cooldown_ms: u64,
    scope: ThrottleScope,
}

impl ThrottleGate {
    pub fn new(cooldown_ms: u64, scope: ThrottleScope) -> Self {
        Self { cooldown_ms, scope }
    }

    /// Accepts the candidate when at least `cooldown_ms` has elapsed since
    /// the relevant previous acceptance, recording the new acceptance time.
    /// A timestamp earlier than the previous acceptance is rejected.
    pub fn accept(
        &self,
        category: ViolationCategory,
        timestamp_ms: u64,
        state: &mut TrackerState,
    ) -> bool {
        let previous = match self.scope {
            ThrottleScope::Global => state.last_accepted_violation_at,
            ThrottleScope::PerCategory => state.last_accepted_by_category.get(&category).copied(),
        };

        let open = match previous {
            None => true,
            Some(last) => timestamp_ms >= last && timestamp_ms - last >= self.cooldown_ms,
        };
        if !open {
            return false;
        }

        state.last_accepted_violation_at = Some(timestamp_ms);
        state.last_accepted_by_category.insert(category, timestamp_ms);
        true
    }
}

impl Default for ThrottleGate {
    fn default() -> Self {
        Self::new(VIOLATION_COOLDOWN_MS, ThrottleScope::Global)
    }
}
