use serde::{Deserialize, Serialize};

/// Running totals for one episode, cleared on reset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStats {
    /// Steps taken since the last reset
    pub steps: u64,
    /// Day boundaries crossed
    pub days_completed: u64,
    /// Sum of all end-of-day rewards, penalties included
    pub cumulative_reward: f64,
    /// Steps that ended with the battery at its lower limit
    pub battery_empty_steps: u64,
    /// Steps that ended with the battery at its upper limit
    pub battery_full_steps: u64,
    /// Training resets of a battery pinned at a limit
    pub limit_resets: u64,
}

impl EpisodeStats {
    pub(crate) fn record_step(&mut self, at_lower_limit: bool, at_upper_limit: bool) {
        self.steps += 1;
        if at_lower_limit {
            self.battery_empty_steps += 1;
        }
        if at_upper_limit {
            self.battery_full_steps += 1;
        }
    }

    pub(crate) fn record_day(&mut self, reward: f64) {
        self.days_completed += 1;
        self.cumulative_reward += reward;
    }

    /// Steps on which the battery sat at either limit
    pub fn limit_hits(&self) -> u64 {
        self.battery_empty_steps + self.battery_full_steps
    }

    pub fn mean_daily_reward(&self) -> Option<f64> {
        (self.days_completed > 0).then(|| self.cumulative_reward / self.days_completed as f64)
    }
}
