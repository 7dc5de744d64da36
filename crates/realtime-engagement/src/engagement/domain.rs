use serde::{Deserialize, Serialize};

/// Epoch seconds. Zero stands for "never" wherever a last-activity time is reported.
pub type Timestamp = i64;

/// Identifier of a platform user (student or staff).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Identifier of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CourseId(pub i64);

/// Store-assigned identifier of an event log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

/// Store-assigned identifier of a score record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScoreId(pub u64);

/// Component recorded when the source does not name one.
pub const DEFAULT_COMPONENT: &str = "core";

/// Kind of activity that triggered an ingestion call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    CourseViewed,
    QuizAttempted,
    ForumPosted,
    LessonViewed,
    VideoWatched,
    Other(String),
}

impl EventKind {
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "course_viewed" => Self::CourseViewed,
            "quiz_attempted" => Self::QuizAttempted,
            "forum_posted" => Self::ForumPosted,
            "lesson_viewed" => Self::LessonViewed,
            "video_watched" => Self::VideoWatched,
            other => Self::Other(other.to_string()),
        }
    }

    /// Name used as the event action when the payload leaves it blank.
    pub fn name(&self) -> &str {
        match self {
            Self::CourseViewed => "course_viewed",
            Self::QuizAttempted => "quiz_attempted",
            Self::ForumPosted => "forum_posted",
            Self::LessonViewed => "lesson_viewed",
            Self::VideoWatched => "video_watched",
            Self::Other(name) => name,
        }
    }
}

/// Loosely-typed ingestion input as received from an event source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde(default, deserialize_with = "loose_id")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "loose_id")]
    pub course_id: Option<i64>,
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

impl EventPayload {
    pub fn new(user_id: UserId, course_id: CourseId) -> Self {
        Self {
            user_id: Some(user_id.0),
            course_id: Some(course_id.0),
            component: None,
            action: None,
        }
    }

    pub fn with_signature(mut self, component: &str, action: &str) -> Self {
        self.component = Some(component.to_string());
        self.action = Some(action.to_string());
        self
    }
}

/// Id as event sources send it. Only numbers and numeric strings count; anything else is absent.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseId {
    Integer(i64),
    Float(f64),
    Text(String),
    Unusable(serde::de::IgnoredAny),
}

fn loose_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let id = match LooseId::deserialize(deserializer)? {
        LooseId::Integer(id) => Some(id),
        LooseId::Float(id) if id.is_finite() => Some(id.trunc() as i64),
        LooseId::Text(text) => text.trim().parse().ok(),
        LooseId::Float(_) | LooseId::Unusable(_) => None,
    };
    Ok(id)
}

/// Event ready to be appended, with defaults applied and the ingestion time stamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub component: String,
    pub action: String,
    pub timestamp: Timestamp,
}

/// Immutable entry of the engagement event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub id: EventId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub component: String,
    pub action: String,
    pub timestamp: Timestamp,
}

/// Latest persisted score for one (user, course) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementScore {
    pub id: ScoreId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub score: u8,
    pub last_activity: Timestamp,
    pub last_updated: Timestamp,
}

/// Inclusive `[start, end]` range of event timestamps considered by one computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Window {
    pub const fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    pub const fn contains(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Dashboard filter presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimePeriod {
    #[serde(rename = "12h")]
    Last12Hours,
    #[default]
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "all")]
    AllTime,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 4] = [
        TimePeriod::Last12Hours,
        TimePeriod::Last24Hours,
        TimePeriod::Last7Days,
        TimePeriod::AllTime,
    ];

    /// Parses a filter value; anything unrecognized falls back to the last 24 hours.
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim() {
            "12h" => Self::Last12Hours,
            "24h" => Self::Last24Hours,
            "7d" => Self::Last7Days,
            "all" => Self::AllTime,
            _ => Self::Last24Hours,
        }
    }

    pub const fn value(self) -> &'static str {
        match self {
            Self::Last12Hours => "12h",
            Self::Last24Hours => "24h",
            Self::Last7Days => "7d",
            Self::AllTime => "all",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Last12Hours => "Last 12 Hours",
            Self::Last24Hours => "Last 24 Hours",
            Self::Last7Days => "Last 7 Days",
            Self::AllTime => "All Time",
        }
    }

    /// Length of the period in seconds, `None` for all time.
    pub const fn duration_secs(self) -> Option<i64> {
        match self {
            Self::Last12Hours => Some(12 * 60 * 60),
            Self::Last24Hours => Some(24 * 60 * 60),
            Self::Last7Days => Some(7 * 24 * 60 * 60),
            Self::AllTime => None,
        }
    }

    pub fn window_ending_at(self, now: Timestamp) -> Window {
        let start = match self.duration_secs() {
            Some(secs) => now - secs,
            None => 0,
        };
        Window::new(start, now)
    }
}

/// Capabilities the core asks the directory about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// May open the engagement dashboard of a course; holders are staff, not scored.
    ViewDashboard,
    /// May update the course; holders receive disengagement alerts.
    ManageCourse,
}

impl Capability {
    pub const fn label(self) -> &'static str {
        match self {
            Capability::ViewDashboard => "view_dashboard",
            Capability::ManageCourse => "manage_course",
        }
    }
}

/// Directory view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub is_guest: bool,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        match (self.first_name.trim(), self.last_name.trim()) {
            ("", "") => format!("User {}", self.id.0),
            (first, "") => first.to_string(),
            ("", last) => last.to_string(),
            (first, last) => format!("{first} {last}"),
        }
    }
}

/// Directory view of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseProfile {
    pub id: CourseId,
    pub full_name: String,
}
