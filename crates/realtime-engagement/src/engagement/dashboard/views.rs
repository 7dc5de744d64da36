use serde::{Deserialize, Serialize};

use super::super::domain::{CourseId, TimePeriod, Timestamp, UserId, Window};

/// Display bucket of a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreClass {
    High,
    Medium,
    Low,
}

impl ScoreClass {
    pub const fn classify(score: u8) -> Self {
        if score >= 70 {
            ScoreClass::High
        } else if score >= 40 {
            ScoreClass::Medium
        } else {
            ScoreClass::Low
        }
    }

    pub const fn css_class(self) -> &'static str {
        match self {
            ScoreClass::High => "engagement-high",
            ScoreClass::Medium => "engagement-medium",
            ScoreClass::Low => "engagement-low",
        }
    }
}

/// One student's line on the dashboard, also the read API's row shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRow {
    pub user_id: UserId,
    pub full_name: String,
    pub profile_image_url: Option<String>,
    pub score: u8,
    pub last_activity: Timestamp,
    pub last_activity_display: String,
    pub score_class: ScoreClass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeFilterOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

impl TimeFilterOption {
    pub fn all(selected: TimePeriod) -> Vec<TimeFilterOption> {
        TimePeriod::ALL
            .iter()
            .map(|period| TimeFilterOption {
                value: period.value(),
                label: period.label(),
                selected: *period == selected,
            })
            .collect()
    }
}

/// Everything the presentation layer needs to render a course dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub course_id: CourseId,
    pub time_period: TimePeriod,
    pub window: Window,
    pub refresh_interval_secs: u32,
    pub rows: Vec<StudentRow>,
    pub alerts: Vec<String>,
    /// Students whose row could not be computed.
    pub skipped: usize,
    pub filter_options: Vec<TimeFilterOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<&'static str>,
}

impl DashboardView {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
