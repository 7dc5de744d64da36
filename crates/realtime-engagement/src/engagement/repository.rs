use serde::{Deserialize, Serialize};

use super::domain::{
    Capability, CourseId, CourseProfile, EngagementEvent, EngagementScore, EventId, NewEvent,
    Timestamp, UserId, UserProfile, Window,
};

/// Values written by one score computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreUpdate {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub score: u8,
    pub last_activity: Timestamp,
    pub updated_at: Timestamp,
}

/// Row counts removed by a user-data erasure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErasureSummary {
    pub events_removed: usize,
    pub scores_removed: usize,
}

/// Storage abstraction over the event log and score table so the engine can be exercised in isolation.
pub trait EngagementRepository: Send + Sync {
    fn append_event(&self, event: NewEvent) -> Result<EventId, RepositoryError>;

    /// Events matching every filter with a timestamp inside the inclusive window.
    fn count_events(
        &self,
        user_id: UserId,
        course_id: CourseId,
        component: &str,
        action: &str,
        window: Window,
    ) -> Result<u64, RepositoryError>;

    /// Latest timestamp of any event for the pair inside the window, 0 when there is none.
    fn max_event_timestamp(
        &self,
        user_id: UserId,
        course_id: CourseId,
        window: Window,
    ) -> Result<Timestamp, RepositoryError>;

    /// Overwrites the record stored for `(user_id, course_id)` or inserts the first one.
    fn upsert_score(&self, update: ScoreUpdate) -> Result<EngagementScore, RepositoryError>;

    fn fetch_score(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<EngagementScore>, RepositoryError>;

    fn events_for_user(&self, user_id: UserId) -> Result<Vec<EngagementEvent>, RepositoryError>;

    fn scores_for_user(&self, user_id: UserId) -> Result<Vec<EngagementScore>, RepositoryError>;

    fn erase_user(&self, user_id: UserId) -> Result<ErasureSummary, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Identity and enrollment lookups owned by the host platform.
pub trait Directory: Send + Sync {
    fn user(&self, user_id: UserId) -> Result<Option<UserProfile>, DirectoryError>;

    fn course(&self, course_id: CourseId) -> Result<Option<CourseProfile>, DirectoryError>;

    /// Enrolled users in a stable order.
    fn enrolled_users(&self, course_id: CourseId) -> Result<Vec<UserProfile>, DirectoryError>;

    fn has_capability(
        &self,
        user_id: UserId,
        course_id: CourseId,
        capability: Capability,
    ) -> Result<bool, DirectoryError>;

    fn users_with_capability(
        &self,
        course_id: CourseId,
        capability: Capability,
    ) -> Result<Vec<UserProfile>, DirectoryError>;
}

/// Directory lookup error.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("unknown user {0:?}")]
    UnknownUser(UserId),
    #[error("unknown course {0:?}")]
    UnknownCourse(CourseId),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification channel (e-mail, popup, and so on).
pub trait Messenger: Send + Sync {
    fn send(&self, notification: Notification) -> Result<(), MessagingError>;
}

/// Structured notification handed to the messenger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub body_html: String,
}

/// Delivery error.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("message transport unavailable: {0}")]
    Transport(String),
}
