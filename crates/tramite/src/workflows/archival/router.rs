use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::domain::{ArchiveId, ArchiveRecord, ArchiveRequest};
use super::engine::ArchivalEngine;
use crate::workflows::actor::UserId;
use crate::workflows::error::LifecycleError;
use crate::workflows::routing::CaseReopener;
use crate::workflows::store::ArchiveRepository;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestorePayload {
    pub reason: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpiringQuery {
    #[serde(default = "default_alert_days")]
    pub days: u32,
}

fn default_alert_days() -> u32 {
    30
}

/// Router builder exposing archival, restoration, and retention queries.
pub fn archive_router<A, C>(engine: Arc<ArchivalEngine<A, C>>) -> Router
where
    A: ArchiveRepository + 'static,
    C: CaseReopener + 'static,
{
    Router::new()
        .route("/api/v1/archive", post(archive_handler::<A, C>))
        .route("/api/v1/archive/expiring", get(expiring_handler::<A, C>))
        .route("/api/v1/archive/expired", get(expired_handler::<A, C>))
        .route("/api/v1/archive/:archive_id", get(fetch_handler::<A, C>))
        .route(
            "/api/v1/archive/:archive_id/restore",
            post(restore_handler::<A, C>),
        )
        .with_state(engine)
}

pub(crate) async fn archive_handler<A, C>(
    State(engine): State<Arc<ArchivalEngine<A, C>>>,
    Json(request): Json<ArchiveRequest>,
) -> Result<(StatusCode, Json<ArchiveRecord>), LifecycleError>
where
    A: ArchiveRepository + 'static,
    C: CaseReopener + 'static,
{
    let record = engine.archive_document(request)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub(crate) async fn fetch_handler<A, C>(
    State(engine): State<Arc<ArchivalEngine<A, C>>>,
    Path(archive_id): Path<String>,
) -> Result<Json<ArchiveRecord>, LifecycleError>
where
    A: ArchiveRepository + 'static,
    C: CaseReopener + 'static,
{
    let record = engine.archive_record(&ArchiveId(archive_id))?;
    Ok(Json(record))
}

pub(crate) async fn restore_handler<A, C>(
    State(engine): State<Arc<ArchivalEngine<A, C>>>,
    Path(archive_id): Path<String>,
    Json(payload): Json<RestorePayload>,
) -> Result<Json<ArchiveRecord>, LifecycleError>
where
    A: ArchiveRepository + 'static,
    C: CaseReopener + 'static,
{
    let record =
        engine.restore_document(&ArchiveId(archive_id), &payload.reason, payload.user_id)?;
    Ok(Json(record))
}

pub(crate) async fn expiring_handler<A, C>(
    State(engine): State<Arc<ArchivalEngine<A, C>>>,
    Query(query): Query<ExpiringQuery>,
) -> Result<Json<Vec<ArchiveRecord>>, LifecycleError>
where
    A: ArchiveRepository + 'static,
    C: CaseReopener + 'static,
{
    Ok(Json(engine.expiring_within(query.days)?))
}

pub(crate) async fn expired_handler<A, C>(
    State(engine): State<Arc<ArchivalEngine<A, C>>>,
) -> Result<Json<Vec<ArchiveRecord>>, LifecycleError>
where
    A: ArchiveRepository + 'static,
    C: CaseReopener + 'static,
{
    Ok(Json(engine.expired()?))
}
