use serde::{Deserialize, Serialize};

use super::scoring::ScoringWeights;

/// Disengagement alerting switch and cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPolicy {
    pub enabled: bool,
    /// Scores strictly below this value count as disengaged.
    pub threshold: u8,
}

impl AlertPolicy {
    pub const fn flags(&self, score: u8) -> bool {
        self.enabled && score < self.threshold
    }
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 30,
        }
    }
}

/// Engagement settings handed to the engine at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementSettings {
    pub weights: ScoringWeights,
    pub alerts: AlertPolicy,
    /// Seconds between dashboard polls.
    pub refresh_interval_secs: u32,
}

impl Default for EngagementSettings {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            alerts: AlertPolicy::default(),
            refresh_interval_secs: 30,
        }
    }
}
