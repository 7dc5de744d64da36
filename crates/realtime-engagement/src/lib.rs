//! Real-time student engagement scoring: event ingestion, weighted windowed scores,
//! disengagement alerts, and the course dashboard, plus the configuration, telemetry,
//! and error plumbing shared with the API service.

pub mod config;
pub mod engagement;
pub mod error;
pub mod telemetry;
