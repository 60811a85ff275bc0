use crate::cli::ServeArgs;
use crate::infra::{build_engines, AppState};
use crate::routes::app_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tramite::config::AppConfig;
use tramite::error::AppError;
use tramite::telemetry;
use tramite::workflows::archival::{ExpirationSweeper, TracingAlertPublisher};
use tramite::workflows::SystemClock;
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

    let engines = build_engines(Arc::new(SystemClock), &config.archive.site_prefix);
    let sweep = ExpirationSweeper::new(
        engines.archival.clone(),
        Arc::new(TracingAlertPublisher),
        config.archive.sweep_settings(),
    )
    .start();

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        retention: sweep.snapshots(),
    };

    let app = app_routes(&engines)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        site_prefix = %config.archive.site_prefix,
        alert_days = config.archive.alert_days,
        "tramite service ready"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    readiness_flag.store(false, Ordering::Release);
    sweep.stop().await;
    info!("tramite service stopped");

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
