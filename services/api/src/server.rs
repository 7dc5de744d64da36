use crate::cli::ServeArgs;
use crate::infra::{load_roster_from_path, AppState, TracingMessenger};
use crate::routes::with_engagement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use realtime_engagement::config::AppConfig;
use realtime_engagement::engagement::replay::replay_from_path;
use realtime_engagement::engagement::{EngagementService, MemoryDirectory, MemoryRepository};
use realtime_engagement::error::AppError;
use realtime_engagement::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = match args.roster.take() {
        Some(path) => load_roster_from_path(&path).map_err(|err| {
            AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })?,
        None => {
            warn!("no roster supplied; dashboards deny every viewer until a roster is loaded");
            MemoryDirectory::default()
        }
    };

    let repository = Arc::new(MemoryRepository::default());
    let engagement_service = Arc::new(EngagementService::new(
        repository.clone(),
        Arc::new(directory),
        Arc::new(TracingMessenger),
        config.engagement,
    ));

    if let Some(path) = args.events.take() {
        let summary = replay_from_path(repository.as_ref(), &path)?;
        info!(
            appended = summary.appended,
            skipped = summary.skipped,
            path = %path.display(),
            "event log replayed"
        );
    }

    let app = with_engagement_routes(engagement_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        threshold = config.engagement.alerts.threshold,
        alerts_enabled = config.engagement.alerts.enabled,
        "engagement service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
