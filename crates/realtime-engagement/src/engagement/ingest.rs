use std::sync::Arc;

use tracing::{debug, warn};

use super::domain::{
    CourseId, EventId, EventKind, EventPayload, NewEvent, Timestamp, UserId, DEFAULT_COMPONENT,
};
use super::repository::EngagementRepository;

/// Reason an ingestion payload was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IngestRejection {
    #[error("event is missing a user id")]
    MissingUser,
    #[error("event is missing a course id")]
    MissingCourse,
    #[error("event has neither an action nor an event name")]
    MissingAction,
}

/// Applies the ingestion defaults: zero or absent ids reject the payload, a blank component
/// becomes `core`, a blank action becomes the event kind's name. With no name either, the
/// payload is rejected.
pub fn normalize_event(
    kind: &EventKind,
    payload: EventPayload,
    recorded_at: Timestamp,
) -> Result<NewEvent, IngestRejection> {
    let user_id = payload
        .user_id
        .filter(|id| *id != 0)
        .ok_or(IngestRejection::MissingUser)?;
    let course_id = payload
        .course_id
        .filter(|id| *id != 0)
        .ok_or(IngestRejection::MissingCourse)?;

    let component = non_blank(payload.component).unwrap_or_else(|| DEFAULT_COMPONENT.to_string());
    let action = non_blank(payload.action)
        .or_else(|| non_blank(Some(kind.name().to_string())))
        .ok_or(IngestRejection::MissingAction)?;

    Ok(NewEvent {
        user_id: UserId(user_id),
        course_id: CourseId(course_id),
        component,
        action,
        timestamp: recorded_at,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Best-effort writer in front of the event log. Nothing it does can fail the caller.
pub struct EventRecorder<R> {
    repository: Arc<R>,
}

impl<R> EventRecorder<R>
where
    R: EngagementRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Appends the event stamped with `recorded_at`, returning its id when it was stored.
    pub fn record(
        &self,
        kind: &EventKind,
        payload: EventPayload,
        recorded_at: Timestamp,
    ) -> Option<EventId> {
        let event = match normalize_event(kind, payload, recorded_at) {
            Ok(event) => event,
            Err(reason) => {
                debug!(event = kind.name(), %reason, "dropping engagement event");
                return None;
            }
        };

        let user_id = event.user_id;
        let course_id = event.course_id;
        match self.repository.append_event(event) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(
                    event = kind.name(),
                    user_id = user_id.0,
                    course_id = course_id.0,
                    error = %err,
                    "failed to track engagement event"
                );
                None
            }
        }
    }
}
