//! CSV event logs: writing an exported log and loading one back into a repository.

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{CourseId, EngagementEvent, NewEvent, Timestamp, UserId, DEFAULT_COMPONENT};
use super::repository::{EngagementRepository, RepositoryError};

#[derive(Debug, Serialize, Deserialize)]
struct LogRow {
    user_id: Option<i64>,
    course_id: Option<i64>,
    #[serde(default)]
    component: Option<String>,
    #[serde(default)]
    action: Option<String>,
    timestamp: Timestamp,
}

/// Counts reported after a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub appended: usize,
    pub skipped: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("failed to read event log: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write event log: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub fn replay_from_path<R, P>(repository: &R, path: P) -> Result<ReplaySummary, ReplayError>
where
    R: EngagementRepository + ?Sized,
    P: AsRef<Path>,
{
    let file = std::fs::File::open(path)?;
    replay_from_reader(repository, file)
}

/// Appends every row of a `user_id,course_id,component,action,timestamp` log, keeping the
/// recorded timestamps. Rows without a user, course, or action are skipped.
pub fn replay_from_reader<R, Rd>(repository: &R, reader: Rd) -> Result<ReplaySummary, ReplayError>
where
    R: EngagementRepository + ?Sized,
    Rd: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut summary = ReplaySummary::default();

    for (line, result) in csv_reader.deserialize::<LogRow>().enumerate() {
        let row = result?;
        match into_event(row) {
            Some(event) => {
                repository.append_event(event)?;
                summary.appended += 1;
            }
            None => {
                debug!(row = line + 1, "skipping incomplete event log row");
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

fn into_event(row: LogRow) -> Option<NewEvent> {
    let user_id = row.user_id.filter(|id| *id != 0)?;
    let course_id = row.course_id.filter(|id| *id != 0)?;
    let action = row.action.filter(|action| !action.is_empty())?;
    let component = row
        .component
        .filter(|component| !component.is_empty())
        .unwrap_or_else(|| DEFAULT_COMPONENT.to_string());

    Some(NewEvent {
        user_id: UserId(user_id),
        course_id: CourseId(course_id),
        component,
        action,
        timestamp: row.timestamp,
    })
}

/// Writes events in the replayable log format.
pub fn write_event_log<W: Write>(events: &[EngagementEvent], writer: W) -> Result<(), ReplayError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for event in events {
        csv_writer.serialize(LogRow {
            user_id: Some(event.user_id.0),
            course_id: Some(event.course_id.0),
            component: Some(event.component.clone()),
            action: Some(event.action.clone()),
            timestamp: event.timestamp,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}
