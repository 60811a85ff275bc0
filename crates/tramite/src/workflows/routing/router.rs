use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::domain::{
    CaseFile, CaseFileFlow, CaseFileId, CaseFileStatus, Movement, MovementReason, MoveRequest,
    NewCaseFile,
};
use super::engine::RoutingEngine;
use crate::workflows::actor::UserId;
use crate::workflows::error::LifecycleError;
use crate::workflows::offices::OfficeId;
use crate::workflows::store::{CaseFileRepository, MovementRepository, OfficeRepository};

/// Body of a move request; the case file comes from the path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovePayload {
    pub to_office_id: OfficeId,
    pub reason: MovementReason,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub required_documents: BTreeSet<String>,
    #[serde(default)]
    pub delivered_documents: BTreeSet<String>,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPayload {
    pub status: CaseFileStatus,
}

/// Router builder exposing case-file registration, routing, and history endpoints.
pub fn case_file_router<S>(engine: Arc<RoutingEngine<S>>) -> Router
where
    S: OfficeRepository + CaseFileRepository + MovementRepository + 'static,
{
    Router::new()
        .route("/api/v1/case-files", post(register_handler::<S>))
        .route("/api/v1/case-files/:case_file_id", get(fetch_handler::<S>))
        .route(
            "/api/v1/case-files/:case_file_id/moves",
            post(move_handler::<S>),
        )
        .route(
            "/api/v1/case-files/:case_file_id/flow",
            get(flow_handler::<S>),
        )
        .route(
            "/api/v1/case-files/:case_file_id/status",
            post(status_handler::<S>),
        )
        .with_state(engine)
}

pub(crate) async fn register_handler<S>(
    State(engine): State<Arc<RoutingEngine<S>>>,
    Json(payload): Json<NewCaseFile>,
) -> Result<(StatusCode, Json<CaseFile>), LifecycleError>
where
    S: OfficeRepository + CaseFileRepository + MovementRepository + 'static,
{
    let case_file = engine.register_case_file(payload)?;
    Ok((StatusCode::CREATED, Json(case_file)))
}

pub(crate) async fn fetch_handler<S>(
    State(engine): State<Arc<RoutingEngine<S>>>,
    Path(case_file_id): Path<String>,
) -> Result<Json<CaseFile>, LifecycleError>
where
    S: OfficeRepository + CaseFileRepository + MovementRepository + 'static,
{
    let case_file = engine.case_file(&CaseFileId(case_file_id))?;
    Ok(Json(case_file))
}

pub(crate) async fn move_handler<S>(
    State(engine): State<Arc<RoutingEngine<S>>>,
    Path(case_file_id): Path<String>,
    Json(payload): Json<MovePayload>,
) -> Result<(StatusCode, Json<Movement>), LifecycleError>
where
    S: OfficeRepository + CaseFileRepository + MovementRepository + 'static,
{
    let request = MoveRequest {
        case_file_id: CaseFileId(case_file_id),
        to_office_id: payload.to_office_id,
        reason: payload.reason,
        notes: payload.notes,
        required_documents: payload.required_documents,
        delivered_documents: payload.delivered_documents,
        user_id: payload.user_id,
    };
    let movement = engine.move_case_file(request)?;
    Ok((StatusCode::CREATED, Json(movement)))
}

pub(crate) async fn flow_handler<S>(
    State(engine): State<Arc<RoutingEngine<S>>>,
    Path(case_file_id): Path<String>,
) -> Result<Json<CaseFileFlow>, LifecycleError>
where
    S: OfficeRepository + CaseFileRepository + MovementRepository + 'static,
{
    let flow = engine.flow(&CaseFileId(case_file_id))?;
    Ok(Json(flow))
}

pub(crate) async fn status_handler<S>(
    State(engine): State<Arc<RoutingEngine<S>>>,
    Path(case_file_id): Path<String>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<CaseFile>, LifecycleError>
where
    S: OfficeRepository + CaseFileRepository + MovementRepository + 'static,
{
    let case_file = engine.transition_status(&CaseFileId(case_file_id), payload.status)?;
    Ok(Json(case_file))
}
