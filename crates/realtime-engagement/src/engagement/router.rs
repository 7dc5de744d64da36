use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::domain::{CourseId, EventKind, EventPayload, TimePeriod, UserId};
use super::repository::{Directory, DirectoryError, EngagementRepository, Messenger, RepositoryError};
use super::service::{EngagementService, EngagementServiceError};

/// Header carrying the authenticated platform user making the request.
pub const VIEWER_HEADER: &str = "x-user-id";

/// Ingestion body: the event name plus the loosely-typed payload fields.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub event: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    #[serde(default)]
    pub time_period: Option<String>,
}

impl PeriodQuery {
    fn period(&self) -> TimePeriod {
        self.time_period
            .as_deref()
            .map(TimePeriod::parse_or_default)
            .unwrap_or_default()
    }
}

/// Router builder exposing ingestion, the dashboard read API, and score lookups.
pub fn engagement_router<R, D, M>(service: Arc<EngagementService<R, D, M>>) -> Router
where
    R: EngagementRepository + 'static,
    D: Directory + 'static,
    M: Messenger + 'static,
{
    Router::new()
        .route("/api/v1/engagement/events", post(ingest_handler::<R, D, M>))
        .route(
            "/api/v1/engagement/courses/:course_id/dashboard",
            get(dashboard_rows_handler::<R, D, M>),
        )
        .route(
            "/api/v1/engagement/courses/:course_id/view",
            get(dashboard_view_handler::<R, D, M>),
        )
        .route(
            "/api/v1/engagement/courses/:course_id/users/:user_id/score",
            get(score_handler::<R, D, M>).post(compute_handler::<R, D, M>),
        )
        .with_state(service)
}

pub(crate) async fn ingest_handler<R, D, M>(
    State(service): State<Arc<EngagementService<R, D, M>>>,
    body: Bytes,
) -> Response
where
    R: EngagementRepository + 'static,
    D: Directory + 'static,
    M: Messenger + 'static,
{
    // Unreadable bodies are acknowledged and dropped like any other unusable event.
    let event_id = match serde_json::from_slice::<IngestRequest>(&body) {
        Ok(request) => {
            let kind = EventKind::from_name(&request.event);
            service.record_event(&kind, request.payload)
        }
        Err(err) => {
            debug!(error = %err, "dropping unreadable ingestion body");
            None
        }
    };
    let payload = json!({
        "recorded": event_id.is_some(),
        "event_id": event_id.map(|id| id.0),
    });
    (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
}

pub(crate) async fn dashboard_rows_handler<R, D, M>(
    State(service): State<Arc<EngagementService<R, D, M>>>,
    Path(course_id): Path<i64>,
    Query(query): Query<PeriodQuery>,
    headers: HeaderMap,
) -> Response
where
    R: EngagementRepository + 'static,
    D: Directory + 'static,
    M: Messenger + 'static,
{
    let viewer = match viewer_from(&headers) {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let now = Utc::now().timestamp();
    match service.dashboard(viewer, CourseId(course_id), query.period(), now) {
        Ok(view) => (StatusCode::OK, axum::Json(view.rows)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn dashboard_view_handler<R, D, M>(
    State(service): State<Arc<EngagementService<R, D, M>>>,
    Path(course_id): Path<i64>,
    Query(query): Query<PeriodQuery>,
    headers: HeaderMap,
) -> Response
where
    R: EngagementRepository + 'static,
    D: Directory + 'static,
    M: Messenger + 'static,
{
    let viewer = match viewer_from(&headers) {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let now = Utc::now().timestamp();
    match service.dashboard(viewer, CourseId(course_id), query.period(), now) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn score_handler<R, D, M>(
    State(service): State<Arc<EngagementService<R, D, M>>>,
    Path((course_id, user_id)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> Response
where
    R: EngagementRepository + 'static,
    D: Directory + 'static,
    M: Messenger + 'static,
{
    let course_id = CourseId(course_id);
    let viewer = match viewer_from(&headers) {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };
    if let Err(err) = service.authorize_viewer(viewer, course_id) {
        return error_response(err);
    }

    match service.score(UserId(user_id), course_id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn compute_handler<R, D, M>(
    State(service): State<Arc<EngagementService<R, D, M>>>,
    Path((course_id, user_id)): Path<(i64, i64)>,
    Query(query): Query<PeriodQuery>,
    headers: HeaderMap,
) -> Response
where
    R: EngagementRepository + 'static,
    D: Directory + 'static,
    M: Messenger + 'static,
{
    let course_id = CourseId(course_id);
    let viewer = match viewer_from(&headers) {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };
    if let Err(err) = service.authorize_viewer(viewer, course_id) {
        return error_response(err);
    }

    let now = Utc::now().timestamp();
    let window = query.period().window_ending_at(now);
    match service.compute_score(UserId(user_id), course_id, window, now) {
        Ok(computed) => (StatusCode::OK, axum::Json(computed)).into_response(),
        Err(err) => error_response(err),
    }
}

fn viewer_from(headers: &HeaderMap) -> Result<UserId, Response> {
    headers
        .get(VIEWER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .map(UserId)
        .ok_or_else(|| {
            let payload = json!({
                "error": format!("missing or invalid {VIEWER_HEADER} header"),
            });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        })
}

fn error_response(err: EngagementServiceError) -> Response {
    let status = match &err {
        EngagementServiceError::AccessDenied { .. } => StatusCode::FORBIDDEN,
        EngagementServiceError::Repository(RepositoryError::NotFound)
        | EngagementServiceError::Directory(DirectoryError::UnknownCourse(_))
        | EngagementServiceError::Directory(DirectoryError::UnknownUser(_)) => {
            StatusCode::NOT_FOUND
        }
        EngagementServiceError::Repository(_) | EngagementServiceError::Directory(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
