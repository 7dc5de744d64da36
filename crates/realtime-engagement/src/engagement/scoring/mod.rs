mod rules;
mod weights;

pub use weights::{Category, ScoringWeights};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::alerts::{AlertDispatcher, DispatchSummary};
use super::domain::{CourseId, Timestamp, UserId, Window};
use super::repository::{Directory, EngagementRepository, Messenger, RepositoryError, ScoreUpdate};
use super::settings::{AlertPolicy, EngagementSettings};

/// One category's contribution, kept so callers can explain a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: Category,
    pub count: u64,
    pub subscore: u8,
    pub weight: u32,
}

/// Result of a single score computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedScore {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub score: u8,
    pub last_activity: Timestamp,
    pub window: Window,
    pub breakdown: Vec<CategoryBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<DispatchSummary>,
}

/// Counts categorized events, scores them, persists the result, and raises alerts.
pub struct ScoreCalculator<R, D, M> {
    repository: Arc<R>,
    alerts: AlertDispatcher<D, M>,
    weights: ScoringWeights,
    policy: AlertPolicy,
}

impl<R, D, M> ScoreCalculator<R, D, M>
where
    R: EngagementRepository + 'static,
    D: Directory + 'static,
    M: Messenger + 'static,
{
    pub fn new(
        repository: Arc<R>,
        alerts: AlertDispatcher<D, M>,
        settings: &EngagementSettings,
    ) -> Self {
        Self {
            repository,
            alerts,
            weights: settings.weights,
            policy: settings.alerts,
        }
    }

    pub fn policy(&self) -> AlertPolicy {
        self.policy
    }

    /// Scores `user_id` in `course_id` over `window`, upserts the record stamped `now`,
    /// and notifies course managers when the score falls under the threshold.
    pub fn compute(
        &self,
        user_id: UserId,
        course_id: CourseId,
        window: Window,
        now: Timestamp,
    ) -> Result<ComputedScore, RepositoryError> {
        let mut counts = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let (component, action) = category.signature();
            let count = self
                .repository
                .count_events(user_id, course_id, component, action, window)?;
            counts.push((category, count));
        }

        let (score, breakdown) = rules::weighted_score(&counts, &self.weights);
        let last_activity = self
            .repository
            .max_event_timestamp(user_id, course_id, window)?;

        self.repository.upsert_score(ScoreUpdate {
            user_id,
            course_id,
            score,
            last_activity,
            updated_at: now,
        })?;

        debug!(
            user_id = user_id.0,
            course_id = course_id.0,
            score,
            last_activity,
            "engagement score updated"
        );

        let alert = if self.policy.flags(score) {
            Some(
                self.alerts
                    .dispatch(user_id, course_id, score, last_activity),
            )
        } else {
            None
        };

        Ok(ComputedScore {
            user_id,
            course_id,
            score,
            last_activity,
            window,
            breakdown,
            alert,
        })
    }
}
