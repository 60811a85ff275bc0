use std::sync::Arc;

use axum::body::to_bytes;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::offices::{NewOffice, Office, OfficePriority, OfficeRegistry};
use crate::workflows::store::InMemoryStore;

pub(super) fn registry() -> Arc<OfficeRegistry<InMemoryStore>> {
    Arc::new(OfficeRegistry::new(Arc::new(InMemoryStore::default())))
}

pub(super) fn new_office(name: &str, max_capacity: u32) -> NewOffice {
    NewOffice {
        name: name.to_string(),
        office_type: "TRAMITE".to_string(),
        max_capacity,
        average_processing_days: 3.5,
        priority: OfficePriority::Normal,
        is_active: true,
    }
}

pub(super) fn create(
    registry: &OfficeRegistry<InMemoryStore>,
    name: &str,
    max_capacity: u32,
    priority: OfficePriority,
) -> Office {
    registry
        .create_office(NewOffice {
            priority,
            ..new_office(name, max_capacity)
        })
        .expect("office created")
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
