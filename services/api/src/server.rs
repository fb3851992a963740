use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryAccountRepository, InMemoryJobRepository, LoggingResetDelivery,
};
use crate::routes::with_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use job_tracker::accounts::{AccountService, SessionKeys};
use job_tracker::config::AppConfig;
use job_tracker::error::AppError;
use job_tracker::jobs::JobApplicationService;
use job_tracker::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let job_service = Arc::new(JobApplicationService::new(Arc::new(
        InMemoryJobRepository::default(),
    )));
    let account_service = Arc::new(AccountService::new(
        Arc::new(InMemoryAccountRepository::default()),
        Arc::new(LoggingResetDelivery),
        SessionKeys::from_config(&config.auth),
    ));

    let app = with_routes(job_service, account_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "student job tracker ready");

    axum::serve(listener, app).await?;
    Ok(())
}
