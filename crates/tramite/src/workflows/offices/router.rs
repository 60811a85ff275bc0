use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::domain::{NewOffice, OfficeId, OfficeUpdate, OfficeView};
use super::registry::OfficeRegistry;
use crate::workflows::error::LifecycleError;
use crate::workflows::store::OfficeRepository;

/// Router builder exposing office CRUD and availability endpoints.
pub fn office_router<R>(registry: Arc<OfficeRegistry<R>>) -> Router
where
    R: OfficeRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/offices",
            get(list_handler::<R>).post(create_handler::<R>),
        )
        .route("/api/v1/offices/available", get(available_handler::<R>))
        .route(
            "/api/v1/offices/:office_id",
            get(fetch_handler::<R>)
                .put(update_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .with_state(registry)
}

pub(crate) async fn create_handler<R>(
    State(registry): State<Arc<OfficeRegistry<R>>>,
    Json(payload): Json<NewOffice>,
) -> Result<(StatusCode, Json<OfficeView>), LifecycleError>
where
    R: OfficeRepository + 'static,
{
    let office = registry.create_office(payload)?;
    Ok((StatusCode::CREATED, Json(OfficeView::from(&office))))
}

pub(crate) async fn list_handler<R>(
    State(registry): State<Arc<OfficeRegistry<R>>>,
) -> Result<Json<Vec<OfficeView>>, LifecycleError>
where
    R: OfficeRepository + 'static,
{
    let offices = registry.list_offices()?;
    Ok(Json(offices.iter().map(OfficeView::from).collect()))
}

pub(crate) async fn available_handler<R>(
    State(registry): State<Arc<OfficeRegistry<R>>>,
) -> Result<Json<Vec<OfficeView>>, LifecycleError>
where
    R: OfficeRepository + 'static,
{
    let offices = registry.available_offices()?;
    Ok(Json(offices.iter().map(OfficeView::from).collect()))
}

pub(crate) async fn fetch_handler<R>(
    State(registry): State<Arc<OfficeRegistry<R>>>,
    Path(office_id): Path<String>,
) -> Result<Json<OfficeView>, LifecycleError>
where
    R: OfficeRepository + 'static,
{
    let office = registry.office(&OfficeId(office_id))?;
    Ok(Json(OfficeView::from(&office)))
}

pub(crate) async fn update_handler<R>(
    State(registry): State<Arc<OfficeRegistry<R>>>,
    Path(office_id): Path<String>,
    Json(update): Json<OfficeUpdate>,
) -> Result<Json<OfficeView>, LifecycleError>
where
    R: OfficeRepository + 'static,
{
    let office = registry.update_office(&OfficeId(office_id), update)?;
    Ok(Json(OfficeView::from(&office)))
}

pub(crate) async fn delete_handler<R>(
    State(registry): State<Arc<OfficeRegistry<R>>>,
    Path(office_id): Path<String>,
) -> Result<StatusCode, LifecycleError>
where
    R: OfficeRepository + 'static,
{
    registry.delete_office(&OfficeId(office_id))?;
    Ok(StatusCode::NO_CONTENT)
}
