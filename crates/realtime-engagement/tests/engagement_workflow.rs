//! End-to-end scenarios for the engagement engine, driven only through the public service
//! facade, the HTTP router, and externally implemented collaborators.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use realtime_engagement::engagement::{
        Capability, CourseId, CourseProfile, Directory, DirectoryError, EngagementService,
        EngagementSettings, MemoryRepository, Messenger, MessagingError, Notification, UserId,
        UserProfile,
    };

    pub(super) const COURSE: CourseId = CourseId(42);
    pub(super) const NOW: i64 = 1_731_661_500;
    pub(super) const STUDENTS: [i64; 3] = [101, 102, 103];
    pub(super) const INSTRUCTOR: i64 = 900;

    /// Directory backed by a fixed roster; the instructor holds every capability.
    pub(super) struct RosterDirectory {
        users: HashMap<UserId, UserProfile>,
        course: CourseProfile,
    }

    impl RosterDirectory {
        pub(super) fn new() -> Self {
            let names = [
                (101, "Amara", "Bello"),
                (102, "Bruno", "Costa"),
                (103, "Chen", "Wei"),
                (INSTRUCTOR, "Imani", "Okafor"),
            ];
            let users = names
                .into_iter()
                .map(|(id, first, last)| {
                    (
                        UserId(id),
                        UserProfile {
                            id: UserId(id),
                            first_name: first.to_string(),
                            last_name: last.to_string(),
                            email: None,
                            profile_image_url: Some(format!("/avatars/{id}.png")),
                            is_guest: false,
                        },
                    )
                })
                .collect();

            Self {
                users,
                course: CourseProfile {
                    id: COURSE,
                    full_name: "Distributed Systems".to_string(),
                },
            }
        }
    }

    impl Directory for RosterDirectory {
        fn user(&self, user_id: UserId) -> Result<Option<UserProfile>, DirectoryError> {
            Ok(self.users.get(&user_id).cloned())
        }

        fn course(&self, course_id: CourseId) -> Result<Option<CourseProfile>, DirectoryError> {
            Ok((course_id == COURSE).then(|| self.course.clone()))
        }

        fn enrolled_users(&self, course_id: CourseId) -> Result<Vec<UserProfile>, DirectoryError> {
            if course_id != COURSE {
                return Err(DirectoryError::UnknownCourse(course_id));
            }
            let mut users: Vec<UserProfile> = self.users.values().cloned().collect();
            users.sort_by_key(|user| user.id);
            Ok(users)
        }

        fn has_capability(
            &self,
            user_id: UserId,
            course_id: CourseId,
            _capability: Capability,
        ) -> Result<bool, DirectoryError> {
            Ok(course_id == COURSE && user_id == UserId(INSTRUCTOR))
        }

        fn users_with_capability(
            &self,
            course_id: CourseId,
            capability: Capability,
        ) -> Result<Vec<UserProfile>, DirectoryError> {
            let mut holders = Vec::new();
            for user in self.users.values() {
                if self.has_capability(user.id, course_id, capability)? {
                    holders.push(user.clone());
                }
            }
            Ok(holders)
        }
    }

    #[derive(Default)]
    pub(super) struct RecordingMessenger {
        pub(super) sent: Mutex<Vec<Notification>>,
    }

    impl Messenger for RecordingMessenger {
        fn send(&self, notification: Notification) -> Result<(), MessagingError> {
            self.sent
                .lock()
                .map_err(|_| MessagingError::Transport("poisoned".to_string()))?
                .push(notification);
            Ok(())
        }
    }

    pub(super) type Service = EngagementService<MemoryRepository, RosterDirectory, RecordingMessenger>;

    pub(super) fn service() -> (Arc<Service>, Arc<RecordingMessenger>) {
        let messenger = Arc::new(RecordingMessenger::default());
        let service = Arc::new(EngagementService::new(
            Arc::new(MemoryRepository::default()),
            Arc::new(RosterDirectory::new()),
            messenger.clone(),
            EngagementSettings::default(),
        ));
        (service, messenger)
    }
}

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use realtime_engagement::engagement::replay::write_event_log;
use realtime_engagement::engagement::{
    engagement_router, EngagementService, EngagementSettings, MemoryRepository, ScoreClass,
    TimePeriod, UserId,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;

fn event_log() -> String {
    let mut log = String::from("user_id,course_id,component,action,timestamp\n");
    let mut push = |user: i64, component: &str, action: &str, count: usize, at: i64| {
        for _ in 0..count {
            log.push_str(&format!("{user},42,{component},{action},{at}\n"));
        }
    };
    // Amara: fully engaged.
    push(101, "mod_quiz", "attempted", 10, NOW - 3_600);
    push(101, "mod_forum", "posted", 20, NOW - 3_600);
    push(101, "mod_lesson", "viewed", 50, NOW - 3_600);
    push(101, "mod_resource", "video_watched", 13, NOW - 1_800);
    // Bruno: quizzes and forum only.
    push(102, "mod_quiz", "attempted", 10, NOW - 7_200);
    push(102, "mod_forum", "posted", 20, NOW - 7_200);
    // Chen: a little activity, plus an older burst outside the last day.
    push(103, "mod_quiz", "attempted", 2, NOW - 600);
    push(103, "mod_forum", "posted", 1, NOW - 600);
    push(103, "mod_lesson", "viewed", 3, NOW - 600);
    push(103, "mod_resource", "video_watched", 20, NOW - 3 * 86_400);
    push(103, "core", "course_viewed", 1, NOW - 60);
    log
}

#[test]
fn replayed_course_produces_ranked_dashboard_and_alerts() {
    let (service, messenger) = service();
    let summary = service
        .replay_events(Cursor::new(event_log()))
        .expect("log replays");
    assert_eq!(summary.skipped, 0);

    let view = service
        .dashboard(UserId(INSTRUCTOR), COURSE, TimePeriod::Last24Hours, NOW)
        .expect("instructor sees the dashboard");

    let ranking: Vec<(i64, u8, ScoreClass)> = view
        .rows
        .iter()
        .map(|row| (row.user_id.0, row.score, row.score_class))
        .collect();
    assert_eq!(
        ranking,
        vec![
            (103, 6, ScoreClass::Low),
            (102, 45, ScoreClass::Medium),
            (101, 100, ScoreClass::High),
        ]
    );
    assert_eq!(view.rows[0].last_activity, NOW - 60);
    assert_eq!(view.rows[2].profile_image_url.as_deref(), Some("/avatars/101.png"));
    assert_eq!(view.alerts.len(), 1);
    assert!(view.alerts[0].starts_with("Student Chen Wei seems disengaged"));

    let sent = messenger.sent.lock().expect("messages").clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, UserId(INSTRUCTOR));
    assert!(sent[0].body.contains("in course Distributed Systems"));
}

#[test]
fn longer_window_picks_up_older_activity() {
    let (service, _) = service();
    service
        .replay_events(Cursor::new(event_log()))
        .expect("log replays");

    let week = service
        .dashboard(UserId(INSTRUCTOR), COURSE, TimePeriod::Last7Days, NOW)
        .expect("dashboard built");

    let chen = week
        .rows
        .iter()
        .find(|row| row.user_id == UserId(103))
        .expect("chen listed");
    // quiz 20, forum 5, lesson 6, video 100 under weights 20/25/15/40.
    assert_eq!(chen.score, 46);
    assert_eq!(chen.score_class, ScoreClass::Medium);
}

#[test]
fn exported_events_rebuild_identical_scores() {
    let (service, _) = service();
    service
        .replay_events(Cursor::new(event_log()))
        .expect("log replays");
    let original = service
        .dashboard(UserId(INSTRUCTOR), COURSE, TimePeriod::AllTime, NOW)
        .expect("dashboard built");

    let mut log = Vec::new();
    for student in STUDENTS {
        let export = service.export_user(UserId(student)).expect("export");
        let mut chunk = Vec::new();
        write_event_log(&export.events, &mut chunk).expect("log written");
        if log.is_empty() {
            log = chunk;
        } else {
            // Drop the repeated header line.
            let body_start = chunk
                .iter()
                .position(|byte| *byte == b'\n')
                .map_or(chunk.len(), |index| index + 1);
            log.extend_from_slice(&chunk[body_start..]);
        }
    }

    let rebuilt = EngagementService::new(
        Arc::new(MemoryRepository::default()),
        Arc::new(RosterDirectory::new()),
        Arc::new(RecordingMessenger::default()),
        EngagementSettings::default(),
    );
    rebuilt.replay_events(log.as_slice()).expect("log replays");
    let copy = rebuilt
        .dashboard(UserId(INSTRUCTOR), COURSE, TimePeriod::AllTime, NOW)
        .expect("dashboard built");

    assert_eq!(original.rows, copy.rows);
}

#[test]
fn erased_student_drops_to_zero() {
    let (service, _) = service();
    service
        .replay_events(Cursor::new(event_log()))
        .expect("log replays");
    service
        .dashboard(UserId(INSTRUCTOR), COURSE, TimePeriod::Last24Hours, NOW)
        .expect("dashboard built");

    let summary = service.erase_user(UserId(101)).expect("erased");
    assert_eq!(summary.events_removed, 93);
    assert_eq!(summary.scores_removed, 1);

    let view = service
        .dashboard(UserId(INSTRUCTOR), COURSE, TimePeriod::Last24Hours, NOW)
        .expect("dashboard built");
    let amara = view
        .rows
        .iter()
        .find(|row| row.user_id == UserId(101))
        .expect("still enrolled");
    assert_eq!(amara.score, 0);
    assert_eq!(amara.last_activity_display, "No activity");
}

#[tokio::test]
async fn http_ingestion_feeds_the_dashboard_api() {
    let (service, _) = service();
    let router = engagement_router(service);

    for _ in 0..3 {
        let body = json!({
            "event": "forum_posted",
            "user_id": 102,
            "course_id": COURSE.0,
            "component": "mod_forum",
            "action": "posted",
        });
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/engagement/events")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/engagement/courses/42/dashboard?time_period=12h")
                .header("x-user-id", INSTRUCTOR.to_string())
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body");
    let rows: Value = serde_json::from_slice(&body).expect("json rows");
    let bruno = rows
        .as_array()
        .expect("array")
        .iter()
        .find(|row| row["user_id"] == json!(102))
        .expect("bruno listed")
        .clone();
    // Forum subscore 15 at weight 25 of 100.
    assert_eq!(bruno["score"], json!(4));
    assert_eq!(bruno["score_class"], json!("low"));
}
