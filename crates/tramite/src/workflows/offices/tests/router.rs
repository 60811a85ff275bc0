use super::common::*;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;
use tower::ServiceExt;

use crate::workflows::offices::router::{delete_handler, fetch_handler};
use crate::workflows::offices::{office_router, OfficePriority};
use crate::workflows::store::InMemoryStore;

#[tokio::test]
async fn create_route_returns_created_view() {
    let router = office_router(registry());

    let response = router
        .oneshot(
            Request::post("/api/v1/offices")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "Mesa de Partes",
                        "office_type": "RECEPCION",
                        "max_capacity": 3,
                        "priority": "ALTA"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["priority"], "ALTA");
    assert_eq!(body["available_slots"], 3);
    assert_eq!(body["is_active"], true);
}

#[tokio::test]
async fn create_route_rejects_zero_capacity() {
    let router = office_router(registry());

    let response = router
        .oneshot(
            Request::post("/api/v1/offices")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "name": "Legal", "office_type": "LEGAL", "max_capacity": 0 })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["kind"], "validation");
}

#[tokio::test]
async fn available_route_lists_receiving_offices() {
    let registry = registry();
    let open = create(&registry, "Open", 2, OfficePriority::Normal);
    let full = create(&registry, "Full", 1, OfficePriority::Critical);
    registry.reserve_slot(&full.id).unwrap();

    let response = office_router(registry)
        .oneshot(
            Request::get("/api/v1/offices/available")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let listed = body.as_array().expect("array");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], open.id.0);
}

#[tokio::test]
async fn fetch_handler_maps_missing_office_to_not_found() {
    let response = fetch_handler::<InMemoryStore>(
        State(registry()),
        Path("ofi-unknown".to_string()),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_handler_conflicts_while_office_is_occupied() {
    let registry = registry();
    let office = create(&registry, "Occupied", 2, OfficePriority::Normal);
    registry.reserve_slot(&office.id).unwrap();

    let response = delete_handler::<InMemoryStore>(State(registry.clone()), Path(office.id.0.clone()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    registry.release_slot(&office.id).unwrap();
    let response = delete_handler::<InMemoryStore>(State(registry), Path(office.id.0.clone()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn update_route_applies_partial_changes() {
    let registry = registry();
    let office = create(&registry, "Planning", 2, OfficePriority::Low);

    let response = office_router(registry)
        .oneshot(
            Request::put(format!("/api/v1/offices/{}", office.id))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "priority": "CRITICA" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["priority"], "CRITICA");
    assert_eq!(body["name"], "Planning");
}
