use chrono::DateTime;

use super::domain::Timestamp;

pub const NO_ACTIVITY: &str = "No activity";
pub const NO_ENGAGEMENT_DATA: &str = "No engagement data available for this course yet.";
pub const DISENGAGED_SUBJECT: &str = "Disengaged student";

/// Human-readable UTC date-time, or "No activity" for 0.
pub fn last_activity_display(timestamp: Timestamp) -> String {
    if timestamp <= 0 {
        return NO_ACTIVITY.to_string();
    }

    match DateTime::from_timestamp(timestamp, 0) {
        Some(moment) => moment.format("%-d %B %Y, %-I:%M %p").to_string(),
        None => NO_ACTIVITY.to_string(),
    }
}

/// Notification body sent to course managers.
pub fn disengaged_notification(
    student: &str,
    course: &str,
    score: u8,
    last_activity: Timestamp,
) -> String {
    format!(
        "Student {student} in course {course} seems disengaged: Engagement Score {score}. Last active: {}.",
        last_activity_display(last_activity)
    )
}

/// Alert line shown on the dashboard itself, where the course is implied.
pub fn disengaged_dashboard_alert(student: &str, score: u8, last_activity: Timestamp) -> String {
    format!(
        "Student {student} seems disengaged: Engagement Score {score}. Last active: {}.",
        last_activity_display(last_activity)
    )
}

/// Minimal HTML escaping for names interpolated into message markup.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
