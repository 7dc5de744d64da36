pub mod views;

pub use views::{DashboardView, ScoreClass, StudentRow, TimeFilterOption};

use std::sync::Arc;

use tracing::warn;

use super::domain::{Capability, CourseId, TimePeriod, Timestamp, UserProfile};
use super::format::{disengaged_dashboard_alert, last_activity_display, NO_ENGAGEMENT_DATA};
use super::repository::{Directory, DirectoryError, EngagementRepository, Messenger};
use super::scoring::ScoreCalculator;

/// Scores every student of a course and assembles the dashboard view.
pub struct DashboardAggregator<R, D, M> {
    calculator: Arc<ScoreCalculator<R, D, M>>,
    directory: Arc<D>,
    refresh_interval_secs: u32,
}

impl<R, D, M> DashboardAggregator<R, D, M>
where
    R: EngagementRepository + 'static,
    D: Directory + 'static,
    M: Messenger + 'static,
{
    pub fn new(
        calculator: Arc<ScoreCalculator<R, D, M>>,
        directory: Arc<D>,
        refresh_interval_secs: u32,
    ) -> Self {
        Self {
            calculator,
            directory,
            refresh_interval_secs,
        }
    }

    /// Builds the view for `period` ending at `now`. A student whose score cannot be
    /// computed is left out and counted in `skipped`.
    pub fn build_view(
        &self,
        course_id: CourseId,
        period: TimePeriod,
        now: Timestamp,
    ) -> Result<DashboardView, DirectoryError> {
        let window = period.window_ending_at(now);
        let policy = self.calculator.policy();
        let enrolled = self.directory.enrolled_users(course_id)?;

        let mut rows = Vec::new();
        let mut skipped = 0;

        for user in enrolled {
            match self.is_scored_student(&user, course_id) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    warn!(user_id = user.id.0, course_id = course_id.0, error = %err, "skipping dashboard row");
                    skipped += 1;
                    continue;
                }
            }

            match self.calculator.compute(user.id, course_id, window, now) {
                Ok(computed) => rows.push(StudentRow {
                    user_id: user.id,
                    full_name: user.full_name(),
                    profile_image_url: user.profile_image_url.clone(),
                    score: computed.score,
                    last_activity: computed.last_activity,
                    last_activity_display: last_activity_display(computed.last_activity),
                    score_class: ScoreClass::classify(computed.score),
                }),
                Err(err) => {
                    warn!(user_id = user.id.0, course_id = course_id.0, error = %err, "skipping dashboard row");
                    skipped += 1;
                }
            }
        }

        rows.sort_by(|a, b| {
            a.score
                .cmp(&b.score)
                .then_with(|| a.full_name.cmp(&b.full_name))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        // Display-only; notifications already went out from the calculator.
        let alerts = rows
            .iter()
            .filter(|row| policy.flags(row.score))
            .map(|row| disengaged_dashboard_alert(&row.full_name, row.score, row.last_activity))
            .collect();

        let empty_message = rows.is_empty().then_some(NO_ENGAGEMENT_DATA);

        Ok(DashboardView {
            course_id,
            time_period: period,
            window,
            refresh_interval_secs: self.refresh_interval_secs,
            rows,
            alerts,
            skipped,
            filter_options: TimeFilterOption::all(period),
            empty_message,
        })
    }

    fn is_scored_student(
        &self,
        user: &UserProfile,
        course_id: CourseId,
    ) -> Result<bool, DirectoryError> {
        if user.is_guest {
            return Ok(false);
        }
        let staff = self
            .directory
            .has_capability(user.id, course_id, Capability::ViewDashboard)?;
        Ok(!staff)
    }
}
