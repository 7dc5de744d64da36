//! In-process collaborators used by the API service and the test suites.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    Capability, CourseId, CourseProfile, EngagementEvent, EngagementScore, EventId, NewEvent,
    ScoreId, Timestamp, UserId, UserProfile, Window,
};
use super::repository::{
    Directory, DirectoryError, EngagementRepository, ErasureSummary, Messenger, MessagingError,
    Notification, RepositoryError, ScoreUpdate,
};

#[derive(Debug, Default)]
struct RepositoryState {
    events: Vec<EngagementEvent>,
    scores: HashMap<(UserId, CourseId), EngagementScore>,
    next_event_id: u64,
    next_score_id: u64,
}

/// Event log and score table held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryRepository {
    state: Arc<Mutex<RepositoryState>>,
}

impl MemoryRepository {
    fn lock(&self) -> Result<MutexGuard<'_, RepositoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }

    pub fn event_count(&self) -> usize {
        self.lock().map(|state| state.events.len()).unwrap_or(0)
    }

    pub fn score_count(&self) -> usize {
        self.lock().map(|state| state.scores.len()).unwrap_or(0)
    }
}

impl EngagementRepository for MemoryRepository {
    fn append_event(&self, event: NewEvent) -> Result<EventId, RepositoryError> {
        let mut state = self.lock()?;
        state.next_event_id += 1;
        let id = EventId(state.next_event_id);
        state.events.push(EngagementEvent {
            id,
            user_id: event.user_id,
            course_id: event.course_id,
            component: event.component,
            action: event.action,
            timestamp: event.timestamp,
        });
        Ok(id)
    }

    fn count_events(
        &self,
        user_id: UserId,
        course_id: CourseId,
        component: &str,
        action: &str,
        window: Window,
    ) -> Result<u64, RepositoryError> {
        let state = self.lock()?;
        let count = state
            .events
            .iter()
            .filter(|event| {
                event.user_id == user_id
                    && event.course_id == course_id
                    && event.component == component
                    && event.action == action
                    && window.contains(event.timestamp)
            })
            .count();
        Ok(count as u64)
    }

    fn max_event_timestamp(
        &self,
        user_id: UserId,
        course_id: CourseId,
        window: Window,
    ) -> Result<Timestamp, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .events
            .iter()
            .filter(|event| {
                event.user_id == user_id
                    && event.course_id == course_id
                    && window.contains(event.timestamp)
            })
            .map(|event| event.timestamp)
            .max()
            .unwrap_or(0))
    }

    fn upsert_score(&self, update: ScoreUpdate) -> Result<EngagementScore, RepositoryError> {
        let mut state = self.lock()?;
        let key = (update.user_id, update.course_id);
        let id = match state.scores.get(&key) {
            Some(existing) => existing.id,
            None => {
                state.next_score_id += 1;
                ScoreId(state.next_score_id)
            }
        };

        let record = EngagementScore {
            id,
            user_id: update.user_id,
            course_id: update.course_id,
            score: update.score,
            last_activity: update.last_activity,
            last_updated: update.updated_at,
        };
        state.scores.insert(key, record.clone());
        Ok(record)
    }

    fn fetch_score(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<EngagementScore>, RepositoryError> {
        let state = self.lock()?;
        Ok(state.scores.get(&(user_id, course_id)).cloned())
    }

    fn events_for_user(&self, user_id: UserId) -> Result<Vec<EngagementEvent>, RepositoryError> {
        let state = self.lock()?;
        let mut events: Vec<EngagementEvent> = state
            .events
            .iter()
            .filter(|event| event.user_id == user_id)
            .cloned()
            .collect();
        events.sort_by_key(|event| (event.timestamp, event.id));
        Ok(events)
    }

    fn scores_for_user(&self, user_id: UserId) -> Result<Vec<EngagementScore>, RepositoryError> {
        let state = self.lock()?;
        let mut scores: Vec<EngagementScore> = state
            .scores
            .values()
            .filter(|score| score.user_id == user_id)
            .cloned()
            .collect();
        scores.sort_by_key(|score| score.course_id);
        Ok(scores)
    }

    fn erase_user(&self, user_id: UserId) -> Result<ErasureSummary, RepositoryError> {
        let mut state = self.lock()?;
        let events_before = state.events.len();
        state.events.retain(|event| event.user_id != user_id);
        let scores_before = state.scores.len();
        state.scores.retain(|(owner, _), _| *owner != user_id);

        Ok(ErasureSummary {
            events_removed: events_before - state.events.len(),
            scores_removed: scores_before - state.scores.len(),
        })
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    users: BTreeMap<UserId, UserProfile>,
    courses: BTreeMap<CourseId, CourseProfile>,
    enrollments: BTreeMap<CourseId, Vec<UserId>>,
    grants: HashSet<(UserId, CourseId, Capability)>,
}

/// Roster, course catalogue, and capability grants held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl MemoryDirectory {
    fn lock(&self) -> Result<MutexGuard<'_, DirectoryState>, DirectoryError> {
        self.state
            .lock()
            .map_err(|_| DirectoryError::Unavailable("directory mutex poisoned".to_string()))
    }

    pub fn add_user(&self, profile: UserProfile) -> Result<(), DirectoryError> {
        self.lock()?.users.insert(profile.id, profile);
        Ok(())
    }

    pub fn add_course(&self, course: CourseProfile) -> Result<(), DirectoryError> {
        self.lock()?.courses.insert(course.id, course);
        Ok(())
    }

    /// Enrolls a known user; enrolling twice keeps the original position.
    pub fn enroll(&self, user_id: UserId, course_id: CourseId) -> Result<(), DirectoryError> {
        let mut state = self.lock()?;
        if !state.users.contains_key(&user_id) {
            return Err(DirectoryError::UnknownUser(user_id));
        }
        if !state.courses.contains_key(&course_id) {
            return Err(DirectoryError::UnknownCourse(course_id));
        }
        let roster = state.enrollments.entry(course_id).or_default();
        if !roster.contains(&user_id) {
            roster.push(user_id);
        }
        Ok(())
    }

    pub fn grant(
        &self,
        user_id: UserId,
        course_id: CourseId,
        capability: Capability,
    ) -> Result<(), DirectoryError> {
        self.lock()?.grants.insert((user_id, course_id, capability));
        Ok(())
    }
}

impl Directory for MemoryDirectory {
    fn user(&self, user_id: UserId) -> Result<Option<UserProfile>, DirectoryError> {
        Ok(self.lock()?.users.get(&user_id).cloned())
    }

    fn course(&self, course_id: CourseId) -> Result<Option<CourseProfile>, DirectoryError> {
        Ok(self.lock()?.courses.get(&course_id).cloned())
    }

    fn enrolled_users(&self, course_id: CourseId) -> Result<Vec<UserProfile>, DirectoryError> {
        let state = self.lock()?;
        if !state.courses.contains_key(&course_id) {
            return Err(DirectoryError::UnknownCourse(course_id));
        }
        Ok(state
            .enrollments
            .get(&course_id)
            .map(|roster| {
                roster
                    .iter()
                    .filter_map(|id| state.users.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn has_capability(
        &self,
        user_id: UserId,
        course_id: CourseId,
        capability: Capability,
    ) -> Result<bool, DirectoryError> {
        Ok(self
            .lock()?
            .grants
            .contains(&(user_id, course_id, capability)))
    }

    fn users_with_capability(
        &self,
        course_id: CourseId,
        capability: Capability,
    ) -> Result<Vec<UserProfile>, DirectoryError> {
        let state = self.lock()?;
        Ok(state
            .users
            .values()
            .filter(|user| state.grants.contains(&(user.id, course_id, capability)))
            .cloned()
            .collect())
    }
}

/// Messenger that keeps every delivered notification.
#[derive(Debug, Default, Clone)]
pub struct MemoryMessenger {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryMessenger {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Messenger for MemoryMessenger {
    fn send(&self, notification: Notification) -> Result<(), MessagingError> {
        self.sent
            .lock()
            .map_err(|_| MessagingError::Transport("messenger mutex poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}
