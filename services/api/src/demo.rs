use crate::infra::load_roster_from_path;
use chrono::{DateTime, Utc};
use clap::Args;
use realtime_engagement::engagement::{
    Capability, Category, CourseId, CourseProfile, DashboardView, DirectoryError,
    EngagementService, EngagementServiceError, EngagementSettings, EventKind, EventPayload,
    MemoryDirectory, MemoryMessenger, MemoryRepository, TimePeriod, Timestamp, UserId,
    UserProfile,
};
use realtime_engagement::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_COURSE: CourseId = CourseId(101);
const DEMO_TEACHER: UserId = UserId(900);

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Dashboard period: 12h, 24h, 7d, or all. Anything else means 24h.
    #[arg(long, default_value = "24h")]
    pub(crate) period: String,
    /// Evaluation time as an RFC 3339 timestamp (defaults to now).
    #[arg(long, value_parser = crate::infra::parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Print the stored data of this student after the dashboard.
    #[arg(long)]
    pub(crate) export_user: Option<i64>,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Event log CSV (user_id,course_id,component,action,timestamp)
    #[arg(long)]
    pub(crate) events: PathBuf,
    /// Roster CSV (course_id,course_name,user_id,first_name,last_name,email,profile_image_url,role)
    #[arg(long)]
    pub(crate) roster: PathBuf,
    /// Course to report on
    #[arg(long)]
    pub(crate) course: i64,
    /// Dashboard period: 12h, 24h, 7d, or all. Anything else means 24h.
    #[arg(long, default_value = "24h")]
    pub(crate) period: String,
    /// Evaluation time as an RFC 3339 timestamp (defaults to now)
    #[arg(long, value_parser = crate::infra::parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Emit the full view as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        events,
        roster,
        course,
        period,
        now,
        json,
    } = args;

    let directory = load_roster_from_path(&roster)
        .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))?;
    let settings = realtime_engagement::config::load_engagement_settings()?;
    let messenger = Arc::new(MemoryMessenger::default());
    let service = EngagementService::new(
        Arc::new(MemoryRepository::default()),
        Arc::new(directory),
        messenger.clone(),
        settings,
    );

    let file = std::fs::File::open(&events)?;
    let replay = service.replay_events(file)?;

    let now = now.unwrap_or_else(Utc::now).timestamp();
    let course_id = CourseId(course);
    let view = service.course_dashboard(course_id, TimePeriod::parse_or_default(&period), now)?;

    if json {
        let rendered = serde_json::to_string_pretty(&view)
            .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "Replayed {} events from {} ({} rows skipped)",
        replay.appended,
        events.display(),
        replay.skipped
    );
    render_dashboard(&view);
    println!(
        "\n{} disengagement notifications would be sent",
        messenger.sent().len()
    );
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        period,
        now,
        export_user,
    } = args;

    let now = now.unwrap_or_else(Utc::now).timestamp();
    let messenger = Arc::new(MemoryMessenger::default());
    let service = EngagementService::new(
        Arc::new(MemoryRepository::default()),
        Arc::new(demo_directory().map_err(EngagementServiceError::from)?),
        messenger.clone(),
        EngagementSettings::default(),
    );

    seed_demo_activity(&service, now);

    println!("Real-time engagement demo");
    let view = service.dashboard(
        DEMO_TEACHER,
        DEMO_COURSE,
        TimePeriod::parse_or_default(&period),
        now,
    )?;
    render_dashboard(&view);

    let sent = messenger.sent();
    println!("\nNotifications sent: {}", sent.len());
    for notification in &sent {
        println!(
            "- to user {} | {} | {}",
            notification.recipient.0, notification.subject, notification.body
        );
    }

    if let Some(user) = export_user {
        let export = service.export_user(UserId(user))?;
        let rendered = serde_json::to_string_pretty(&export)
            .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
        println!("\nStored data for user {user}:\n{rendered}");
    }

    Ok(())
}

fn render_dashboard(view: &DashboardView) {
    println!(
        "\nCourse {} | {} | refresh every {}s",
        view.course_id.0,
        view.time_period.label(),
        view.refresh_interval_secs
    );

    if view.is_empty() {
        println!("{}", view.empty_message.unwrap_or_default());
        return;
    }

    println!("{:<24} {:>5}  {:<8} Last activity", "Student", "Score", "Level");
    for row in &view.rows {
        println!(
            "{:<24} {:>5}  {:<8} {}",
            row.full_name,
            row.score,
            row.score_class.css_class().trim_start_matches("engagement-"),
            row.last_activity_display
        );
    }

    if view.skipped > 0 {
        println!("({} students could not be scored)", view.skipped);
    }

    if !view.alerts.is_empty() {
        println!("\nAlerts:");
        for alert in &view.alerts {
            println!("- {alert}");
        }
    }
}

fn demo_directory() -> Result<MemoryDirectory, DirectoryError> {
    let directory = MemoryDirectory::default();
    directory.add_course(CourseProfile {
        id: DEMO_COURSE,
        full_name: "Introduction to Data Science".to_string(),
    })?;

    let people = [
        (1, "Priya", "Natarajan"),
        (2, "Tomás", "Álvarez"),
        (3, "Lena", "Fischer"),
        (4, "Kwame", "Mensah"),
        (DEMO_TEACHER.0, "Dana", "Whitfield"),
    ];
    for (id, first, last) in people {
        directory.add_user(UserProfile {
            id: UserId(id),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: Some(format!("{}@campus.example", first.to_lowercase())),
            profile_image_url: None,
            is_guest: false,
        })?;
        directory.enroll(UserId(id), DEMO_COURSE)?;
    }

    directory.grant(DEMO_TEACHER, DEMO_COURSE, Capability::ViewDashboard)?;
    directory.grant(DEMO_TEACHER, DEMO_COURSE, Capability::ManageCourse)?;
    Ok(directory)
}

/// Priya is highly engaged, Tomás moderately, Lena barely, and Kwame not at all.
fn seed_demo_activity(
    service: &EngagementService<MemoryRepository, MemoryDirectory, MemoryMessenger>,
    now: Timestamp,
) {
    let plan: [(i64, Category, usize, Timestamp); 9] = [
        (1, Category::Quiz, 9, now - 2 * 3_600),
        (1, Category::Forum, 14, now - 3_600),
        (1, Category::Lesson, 30, now - 5 * 3_600),
        (1, Category::Video, 12, now - 900),
        (2, Category::Quiz, 6, now - 8 * 3_600),
        (2, Category::Forum, 8, now - 6 * 3_600),
        (2, Category::Video, 5, now - 4 * 3_600),
        (3, Category::Lesson, 4, now - 20 * 3_600),
        (3, Category::Forum, 1, now - 30 * 3_600),
    ];

    for (user, category, count, at) in plan {
        let (component, action) = category.signature();
        for _ in 0..count {
            service.record_event_at(
                &demo_kind(category),
                EventPayload::new(UserId(user), DEMO_COURSE).with_signature(component, action),
                at,
            );
        }
    }

    service.record_event_at(
        &EventKind::CourseViewed,
        EventPayload::new(UserId(3), DEMO_COURSE),
        now - 600,
    );
}

fn demo_kind(category: Category) -> EventKind {
    match category {
        Category::Quiz => EventKind::QuizAttempted,
        Category::Forum => EventKind::ForumPosted,
        Category::Lesson => EventKind::LessonViewed,
        Category::Video => EventKind::VideoWatched,
    }
}
