//! Engagement scoring engine: event ingestion, windowed weighted scoring, score upserts,
//! disengagement alerts, and the course dashboard built on top of them.

pub mod alerts;
pub mod dashboard;
pub mod domain;
pub mod format;
pub mod ingest;
pub mod memory;
pub mod replay;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod settings;

#[cfg(test)]
mod tests;

pub use alerts::{AlertDispatcher, DispatchSummary};
pub use dashboard::{DashboardAggregator, DashboardView, ScoreClass, StudentRow};
pub use domain::{
    Capability, CourseId, CourseProfile, EngagementEvent, EngagementScore, EventId, EventKind,
    EventPayload, TimePeriod, Timestamp, UserId, UserProfile, Window,
};
pub use ingest::EventRecorder;
pub use memory::{MemoryDirectory, MemoryMessenger, MemoryRepository};
pub use replay::{ReplayError, ReplaySummary};
pub use repository::{
    Directory, DirectoryError, EngagementRepository, ErasureSummary, Messenger, MessagingError,
    Notification, RepositoryError,
};
pub use router::engagement_router;
pub use scoring::{Category, ComputedScore, ScoreCalculator, ScoringWeights};
pub use service::{EngagementService, EngagementServiceError, UserDataExport};
pub use settings::{AlertPolicy, EngagementSettings};
