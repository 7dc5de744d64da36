use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{Capability, CourseId, Timestamp, UserId};
use super::format::{disengaged_notification, escape_html, DISENGAGED_SUBJECT};
use super::repository::{Directory, DirectoryError, Messenger, Notification};

/// Sender identity stamped on alert notifications.
pub const NOREPLY_SENDER: &str = "noreply";

/// Outcome of one dispatch round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub recipients: usize,
    pub delivered: usize,
}

/// Notifies course managers that a student looks disengaged.
pub struct AlertDispatcher<D, M> {
    directory: Arc<D>,
    messenger: Arc<M>,
}

impl<D, M> AlertDispatcher<D, M>
where
    D: Directory + 'static,
    M: Messenger + 'static,
{
    pub fn new(directory: Arc<D>, messenger: Arc<M>) -> Self {
        Self {
            directory,
            messenger,
        }
    }

    /// Sends one notification per course manager. Failures are logged, never returned.
    pub fn dispatch(
        &self,
        user_id: UserId,
        course_id: CourseId,
        score: u8,
        last_activity: Timestamp,
    ) -> DispatchSummary {
        match self.try_dispatch(user_id, course_id, score, last_activity) {
            Ok(summary) => summary,
            Err(err) => {
                warn!(
                    user_id = user_id.0,
                    course_id = course_id.0,
                    error = %err,
                    "unable to resolve disengagement alert"
                );
                DispatchSummary::default()
            }
        }
    }

    fn try_dispatch(
        &self,
        user_id: UserId,
        course_id: CourseId,
        score: u8,
        last_activity: Timestamp,
    ) -> Result<DispatchSummary, DirectoryError> {
        let recipients = self
            .directory
            .users_with_capability(course_id, Capability::ManageCourse)?;
        if recipients.is_empty() {
            return Ok(DispatchSummary::default());
        }

        let student = self
            .directory
            .user(user_id)?
            .ok_or(DirectoryError::UnknownUser(user_id))?;
        let course = self
            .directory
            .course(course_id)?
            .ok_or(DirectoryError::UnknownCourse(course_id))?;

        let body = disengaged_notification(&student.full_name(), &course.full_name, score, last_activity);
        let body_html = format!(
            "<p>{}</p>",
            disengaged_notification(
                &escape_html(&student.full_name()),
                &escape_html(&course.full_name),
                score,
                last_activity,
            )
        );

        let mut summary = DispatchSummary {
            recipients: recipients.len(),
            delivered: 0,
        };

        for recipient in recipients {
            let notification = Notification {
                recipient: recipient.id,
                sender: NOREPLY_SENDER.to_string(),
                subject: DISENGAGED_SUBJECT.to_string(),
                body: body.clone(),
                body_html: body_html.clone(),
            };

            match self.messenger.send(notification) {
                Ok(()) => summary.delivered += 1,
                Err(err) => warn!(
                    recipient = recipient.id.0,
                    user_id = user_id.0,
                    course_id = course_id.0,
                    error = %err,
                    "failed to deliver disengagement alert"
                ),
            }
        }

        info!(
            user_id = user_id.0,
            course_id = course_id.0,
            score,
            recipients = summary.recipients,
            delivered = summary.delivered,
            "disengagement alert dispatched"
        );

        Ok(summary)
    }
}
