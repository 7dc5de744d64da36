use std::io::Read;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::alerts::AlertDispatcher;
use super::dashboard::{DashboardAggregator, DashboardView};
use super::domain::{
    Capability, CourseId, EngagementEvent, EngagementScore, EventId, EventKind, EventPayload,
    TimePeriod, Timestamp, UserId, Window,
};
use super::ingest::EventRecorder;
use super::replay::{replay_from_reader, ReplayError, ReplaySummary};
use super::repository::{
    Directory, DirectoryError, EngagementRepository, ErasureSummary, Messenger, RepositoryError,
};
use super::scoring::{ComputedScore, ScoreCalculator};
use super::settings::EngagementSettings;

/// Everything stored about one user, for data-subject export requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDataExport {
    pub user_id: UserId,
    pub events: Vec<EngagementEvent>,
    pub scores: Vec<EngagementScore>,
}

/// Facade composing ingestion, scoring, alerting, and the dashboard over shared collaborators.
pub struct EngagementService<R, D, M> {
    repository: Arc<R>,
    directory: Arc<D>,
    recorder: EventRecorder<R>,
    calculator: Arc<ScoreCalculator<R, D, M>>,
    dashboard: DashboardAggregator<R, D, M>,
    settings: EngagementSettings,
}

impl<R, D, M> EngagementService<R, D, M>
where
    R: EngagementRepository + 'static,
    D: Directory + 'static,
    M: Messenger + 'static,
{
    pub fn new(
        repository: Arc<R>,
        directory: Arc<D>,
        messenger: Arc<M>,
        settings: EngagementSettings,
    ) -> Self {
        let alerts = AlertDispatcher::new(directory.clone(), messenger);
        let calculator = Arc::new(ScoreCalculator::new(repository.clone(), alerts, &settings));
        let dashboard = DashboardAggregator::new(
            calculator.clone(),
            directory.clone(),
            settings.refresh_interval_secs,
        );

        Self {
            recorder: EventRecorder::new(repository.clone()),
            repository,
            directory,
            calculator,
            dashboard,
            settings,
        }
    }

    pub fn settings(&self) -> &EngagementSettings {
        &self.settings
    }

    /// Best-effort ingestion stamped with `recorded_at`.
    pub fn record_event_at(
        &self,
        kind: &EventKind,
        payload: EventPayload,
        recorded_at: Timestamp,
    ) -> Option<EventId> {
        self.recorder.record(kind, payload, recorded_at)
    }

    /// Best-effort ingestion stamped with the current time.
    pub fn record_event(&self, kind: &EventKind, payload: EventPayload) -> Option<EventId> {
        self.record_event_at(kind, payload, Utc::now().timestamp())
    }

    pub fn compute_score(
        &self,
        user_id: UserId,
        course_id: CourseId,
        window: Window,
        now: Timestamp,
    ) -> Result<ComputedScore, EngagementServiceError> {
        Ok(self.calculator.compute(user_id, course_id, window, now)?)
    }

    pub fn score(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<EngagementScore, EngagementServiceError> {
        self.repository
            .fetch_score(user_id, course_id)?
            .ok_or(EngagementServiceError::Repository(RepositoryError::NotFound))
    }

    /// Fails with `AccessDenied` unless `viewer` may see the course dashboard.
    pub fn authorize_viewer(
        &self,
        viewer: UserId,
        course_id: CourseId,
    ) -> Result<(), EngagementServiceError> {
        let capability = Capability::ViewDashboard;
        if self
            .directory
            .has_capability(viewer, course_id, capability)?
        {
            Ok(())
        } else {
            Err(EngagementServiceError::AccessDenied {
                user_id: viewer,
                course_id,
                capability,
            })
        }
    }

    /// Dashboard for `course_id` as seen by `viewer`, after the capability check.
    pub fn dashboard(
        &self,
        viewer: UserId,
        course_id: CourseId,
        period: TimePeriod,
        now: Timestamp,
    ) -> Result<DashboardView, EngagementServiceError> {
        self.authorize_viewer(viewer, course_id)?;
        Ok(self.dashboard.build_view(course_id, period, now)?)
    }

    /// Dashboard without the viewer check, for scheduled jobs and the CLI.
    pub fn course_dashboard(
        &self,
        course_id: CourseId,
        period: TimePeriod,
        now: Timestamp,
    ) -> Result<DashboardView, EngagementServiceError> {
        Ok(self.dashboard.build_view(course_id, period, now)?)
    }

    pub fn export_user(&self, user_id: UserId) -> Result<UserDataExport, EngagementServiceError> {
        Ok(UserDataExport {
            user_id,
            events: self.repository.events_for_user(user_id)?,
            scores: self.repository.scores_for_user(user_id)?,
        })
    }

    pub fn erase_user(&self, user_id: UserId) -> Result<ErasureSummary, EngagementServiceError> {
        let summary = self.repository.erase_user(user_id)?;
        info!(
            user_id = user_id.0,
            events_removed = summary.events_removed,
            scores_removed = summary.scores_removed,
            "engagement data erased"
        );
        Ok(summary)
    }

    pub fn replay_events<Rd: Read>(&self, reader: Rd) -> Result<ReplaySummary, ReplayError> {
        replay_from_reader(self.repository.as_ref(), reader)
    }
}

/// Error raised by the engagement service.
#[derive(Debug, thiserror::Error)]
pub enum EngagementServiceError {
    #[error("user {user_id:?} lacks {} in course {course_id:?}", .capability.label())]
    AccessDenied {
        user_id: UserId,
        course_id: CourseId,
        capability: Capability,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
