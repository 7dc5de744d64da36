use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use realtime_engagement::engagement::{
    Capability, CourseId, CourseProfile, DirectoryError, MemoryDirectory, Messenger,
    MessagingError, Notification, UserId, UserProfile,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Messenger for deployments without a mail relay: every alert becomes a log line.
#[derive(Default, Clone)]
pub(crate) struct TracingMessenger;

impl Messenger for TracingMessenger {
    fn send(&self, notification: Notification) -> Result<(), MessagingError> {
        info!(
            recipient = notification.recipient.0,
            sender = %notification.sender,
            subject = %notification.subject,
            body = %notification.body,
            "engagement notification"
        );
        Ok(())
    }
}

/// Role column of a roster export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum RosterRole {
    Student,
    Guest,
    /// Sees the dashboard and receives alerts.
    Teacher,
    /// Sees the dashboard only.
    Observer,
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    course_id: i64,
    course_name: String,
    user_id: i64,
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    profile_image_url: Option<String>,
    role: RosterRole,
}

#[derive(Debug)]
pub(crate) enum RosterError {
    Csv(csv::Error),
    Io(std::io::Error),
    Directory(DirectoryError),
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterError::Csv(err) => write!(f, "failed to parse roster: {err}"),
            RosterError::Io(err) => write!(f, "failed to open roster: {err}"),
            RosterError::Directory(err) => write!(f, "failed to load roster: {err}"),
        }
    }
}

impl std::error::Error for RosterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterError::Csv(err) => Some(err),
            RosterError::Io(err) => Some(err),
            RosterError::Directory(err) => Some(err),
        }
    }
}

impl From<csv::Error> for RosterError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<std::io::Error> for RosterError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DirectoryError> for RosterError {
    fn from(value: DirectoryError) -> Self {
        Self::Directory(value)
    }
}

/// Accepts RFC 3339 (`2024-11-15T09:05:00Z`) or raw epoch seconds.
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(seconds) = raw.parse::<i64>() {
        return DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| format!("'{raw}' is outside the supported time range"));
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|moment| moment.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}

pub(crate) fn load_roster_from_path(path: &Path) -> Result<MemoryDirectory, RosterError> {
    let file = std::fs::File::open(path)?;
    load_roster(file)
}

/// Builds a directory from `course_id,course_name,user_id,first_name,last_name,email,
/// profile_image_url,role` rows. A user listed in several courses keeps the first profile.
pub(crate) fn load_roster<R: Read>(reader: R) -> Result<MemoryDirectory, RosterError> {
    let directory = MemoryDirectory::default();
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut courses = BTreeSet::new();
    let mut users = BTreeSet::new();

    for row in csv_reader.deserialize::<RosterRow>() {
        let row = row?;
        let course_id = CourseId(row.course_id);
        let user_id = UserId(row.user_id);

        if courses.insert(course_id) {
            directory.add_course(CourseProfile {
                id: course_id,
                full_name: row.course_name.clone(),
            })?;
        }
        if users.insert(user_id) {
            directory.add_user(UserProfile {
                id: user_id,
                first_name: row.first_name.clone(),
                last_name: row.last_name.clone(),
                email: row.email.clone().filter(|email| !email.is_empty()),
                profile_image_url: row.profile_image_url.clone().filter(|url| !url.is_empty()),
                is_guest: row.role == RosterRole::Guest,
            })?;
        }

        directory.enroll(user_id, course_id)?;
        match row.role {
            RosterRole::Teacher => {
                directory.grant(user_id, course_id, Capability::ViewDashboard)?;
                directory.grant(user_id, course_id, Capability::ManageCourse)?;
            }
            RosterRole::Observer => {
                directory.grant(user_id, course_id, Capability::ViewDashboard)?;
            }
            RosterRole::Student | RosterRole::Guest => {}
        }
    }

    Ok(directory)
}
