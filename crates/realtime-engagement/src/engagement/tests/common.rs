use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::engagement::domain::{
    Capability, CourseId, CourseProfile, EngagementEvent, EngagementScore, EventId, EventKind,
    EventPayload, NewEvent, Timestamp, UserId, UserProfile, Window,
};
use crate::engagement::memory::{MemoryDirectory, MemoryMessenger, MemoryRepository};
use crate::engagement::repository::{
    Directory, EngagementRepository, ErasureSummary, Messenger, MessagingError, Notification,
    RepositoryError, ScoreUpdate,
};
use crate::engagement::scoring::Category;
use crate::engagement::service::EngagementService;
use crate::engagement::settings::{AlertPolicy, EngagementSettings};

pub(super) const COURSE: CourseId = CourseId(7);
pub(super) const QUIET_COURSE: CourseId = CourseId(8);
/// 15 November 2024, 09:05 UTC.
pub(super) const NOW: Timestamp = 1_731_661_500;

pub(super) const ADA: UserId = UserId(11);
pub(super) const BEN: UserId = UserId(12);
pub(super) const CY: UserId = UserId(13);
pub(super) const GUEST: UserId = UserId(14);
pub(super) const INSTRUCTOR: UserId = UserId(21);
pub(super) const MANAGER: UserId = UserId(22);

pub(super) type MemoryService = EngagementService<MemoryRepository, MemoryDirectory, MemoryMessenger>;

pub(super) fn profile(id: UserId, first: &str, last: &str) -> UserProfile {
    UserProfile {
        id,
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: Some(format!("{}@example.edu", first.to_lowercase())),
        profile_image_url: None,
        is_guest: false,
    }
}

/// Course 7 with three students, a guest, a teacher, and a manager; course 8 with one
/// student and no staff.
pub(super) fn directory() -> MemoryDirectory {
    let directory = MemoryDirectory::default();
    directory
        .add_course(CourseProfile {
            id: COURSE,
            full_name: "Biology 101".to_string(),
        })
        .expect("course added");
    directory
        .add_course(CourseProfile {
            id: QUIET_COURSE,
            full_name: "Independent Study".to_string(),
        })
        .expect("course added");

    let mut guest = profile(GUEST, "Guest", "");
    guest.is_guest = true;

    for user in [
        profile(ADA, "Ada", "Obi"),
        profile(BEN, "Ben", "Kim"),
        profile(CY, "Cy", "Diaz"),
        guest,
        profile(INSTRUCTOR, "Tess", "Mwangi"),
        profile(MANAGER, "Max", "Otieno"),
    ] {
        let id = user.id;
        directory.add_user(user).expect("user added");
        directory.enroll(id, COURSE).expect("enrolled");
    }
    directory.enroll(ADA, QUIET_COURSE).expect("enrolled");

    for staff in [INSTRUCTOR, MANAGER] {
        directory
            .grant(staff, COURSE, Capability::ViewDashboard)
            .expect("granted");
        directory
            .grant(staff, COURSE, Capability::ManageCourse)
            .expect("granted");
    }

    directory
}

pub(super) fn settings_with_threshold(threshold: u8) -> EngagementSettings {
    EngagementSettings {
        alerts: AlertPolicy {
            enabled: true,
            threshold,
        },
        ..EngagementSettings::default()
    }
}

pub(super) fn build_service_with(
    settings: EngagementSettings,
) -> (
    MemoryService,
    Arc<MemoryRepository>,
    Arc<MemoryMessenger>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let messenger = Arc::new(MemoryMessenger::default());
    let service = EngagementService::new(
        repository.clone(),
        Arc::new(directory()),
        messenger.clone(),
        settings,
    );
    (service, repository, messenger)
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<MemoryRepository>,
    Arc<MemoryMessenger>,
) {
    build_service_with(EngagementSettings::default())
}

pub(super) fn kind_for(category: Category) -> EventKind {
    match category {
        Category::Quiz => EventKind::QuizAttempted,
        Category::Forum => EventKind::ForumPosted,
        Category::Lesson => EventKind::LessonViewed,
        Category::Video => EventKind::VideoWatched,
    }
}

/// Records `count` categorized events for `user` in course 7 at `at`.
pub(super) fn record_category<R, D, M>(
    service: &EngagementService<R, D, M>,
    user: UserId,
    category: Category,
    count: u64,
    at: Timestamp,
) where
    R: EngagementRepository + 'static,
    D: Directory + 'static,
    M: Messenger + 'static,
{
    let (component, action) = category.signature();
    for _ in 0..count {
        service
            .record_event_at(
                &kind_for(category),
                EventPayload::new(user, COURSE).with_signature(component, action),
                at,
            )
            .expect("event recorded");
    }
}

/// Quiz 2, forum 1, lesson 3, video 0: scores 6 under the default weights.
pub(super) fn record_reference_activity<R, D, M>(
    service: &EngagementService<R, D, M>,
    user: UserId,
    at: Timestamp,
) where
    R: EngagementRepository + 'static,
    D: Directory + 'static,
    M: Messenger + 'static,
{
    record_category(service, user, Category::Quiz, 2, at);
    record_category(service, user, Category::Forum, 1, at);
    record_category(service, user, Category::Lesson, 3, at);
}

/// Enough activity in every category to saturate to 100.
pub(super) fn record_full_activity<R, D, M>(
    service: &EngagementService<R, D, M>,
    user: UserId,
    at: Timestamp,
) where
    R: EngagementRepository + 'static,
    D: Directory + 'static,
    M: Messenger + 'static,
{
    record_category(service, user, Category::Quiz, 10, at);
    record_category(service, user, Category::Forum, 20, at);
    record_category(service, user, Category::Lesson, 50, at);
    record_category(service, user, Category::Video, 13, at);
}

pub(super) fn day_window() -> Window {
    Window::new(NOW - 86_400, NOW)
}

#[derive(Default)]
pub(super) struct FailingMessenger;

impl Messenger for FailingMessenger {
    fn send(&self, _notification: Notification) -> Result<(), MessagingError> {
        Err(MessagingError::Transport("smtp offline".to_string()))
    }
}

/// Delivers to everyone except one recipient.
pub(super) struct SelectiveMessenger {
    pub(super) blocked: UserId,
    pub(super) inner: MemoryMessenger,
}

impl Messenger for SelectiveMessenger {
    fn send(&self, notification: Notification) -> Result<(), MessagingError> {
        if notification.recipient == self.blocked {
            return Err(MessagingError::Transport("mailbox full".to_string()));
        }
        self.inner.send(notification)
    }
}

pub(super) struct UnavailableRepository;

impl EngagementRepository for UnavailableRepository {
    fn append_event(&self, _event: NewEvent) -> Result<EventId, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn count_events(
        &self,
        _user_id: UserId,
        _course_id: CourseId,
        _component: &str,
        _action: &str,
        _window: Window,
    ) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn max_event_timestamp(
        &self,
        _user_id: UserId,
        _course_id: CourseId,
        _window: Window,
    ) -> Result<Timestamp, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn upsert_score(&self, _update: ScoreUpdate) -> Result<EngagementScore, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_score(
        &self,
        _user_id: UserId,
        _course_id: CourseId,
    ) -> Result<Option<EngagementScore>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn events_for_user(&self, _user_id: UserId) -> Result<Vec<EngagementEvent>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn scores_for_user(&self, _user_id: UserId) -> Result<Vec<EngagementScore>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn erase_user(&self, _user_id: UserId) -> Result<ErasureSummary, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Memory repository whose counting queries fail for one user.
#[derive(Default)]
pub(super) struct FlakyRepository {
    pub(super) inner: MemoryRepository,
    pub(super) broken_user: Option<UserId>,
}

impl EngagementRepository for FlakyRepository {
    fn append_event(&self, event: NewEvent) -> Result<EventId, RepositoryError> {
        self.inner.append_event(event)
    }

    fn count_events(
        &self,
        user_id: UserId,
        course_id: CourseId,
        component: &str,
        action: &str,
        window: Window,
    ) -> Result<u64, RepositoryError> {
        if self.broken_user == Some(user_id) {
            return Err(RepositoryError::Unavailable("replica lagging".to_string()));
        }
        self.inner
            .count_events(user_id, course_id, component, action, window)
    }

    fn max_event_timestamp(
        &self,
        user_id: UserId,
        course_id: CourseId,
        window: Window,
    ) -> Result<Timestamp, RepositoryError> {
        self.inner.max_event_timestamp(user_id, course_id, window)
    }

    fn upsert_score(&self, update: ScoreUpdate) -> Result<EngagementScore, RepositoryError> {
        self.inner.upsert_score(update)
    }

    fn fetch_score(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<EngagementScore>, RepositoryError> {
        self.inner.fetch_score(user_id, course_id)
    }

    fn events_for_user(&self, user_id: UserId) -> Result<Vec<EngagementEvent>, RepositoryError> {
        self.inner.events_for_user(user_id)
    }

    fn scores_for_user(&self, user_id: UserId) -> Result<Vec<EngagementScore>, RepositoryError> {
        self.inner.scores_for_user(user_id)
    }

    fn erase_user(&self, user_id: UserId) -> Result<ErasureSummary, RepositoryError> {
        self.inner.erase_user(user_id)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
