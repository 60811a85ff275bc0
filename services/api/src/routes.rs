use crate::infra::{AppState, Engines};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use tramite::workflows::archival::archive_router;
use tramite::workflows::offices::office_router;
use tramite::workflows::routing::case_file_router;

pub(crate) fn app_routes(engines: &Engines) -> Router {
    office_router(engines.offices.clone())
        .merge(case_file_router(engines.routing.clone()))
        .merge(archive_router(engines.archival.clone()))
        .route("/api/v1/retention/snapshot", get(retention_snapshot))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Last completed retention sweep; `204` until the first sweep finishes.
pub(crate) async fn retention_snapshot(
    Extension(state): Extension<AppState>,
) -> axum::response::Response {
    match state.retention.latest() {
        Some(snapshot) => Json(snapshot).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
