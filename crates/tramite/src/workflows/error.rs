use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use super::store::RepositoryError;

/// Entities addressed by the lifecycle engines, used to give errors context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Office,
    CaseFile,
    ArchiveRecord,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Office => write!(f, "office"),
            EntityKind::CaseFile => write!(f, "case file"),
            EntityKind::ArchiveRecord => write!(f, "archive record"),
        }
    }
}

/// Why an office refused a slot reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityRejection {
    Full { max_capacity: u32 },
    Inactive,
}

impl fmt::Display for CapacityRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityRejection::Full { max_capacity } => {
                write!(f, "at capacity ({max_capacity} active case files)")
            }
            CapacityRejection::Inactive => write!(f, "office is inactive"),
        }
    }
}

/// Error taxonomy shared by the office registry, routing engine, and archival engine.
///
/// Every variant is final: the engines never retry, and a failed call leaves no partial
/// state behind.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("validation failed: {message}")]
    Validation { message: String },
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },
    #[error("office {office_id} cannot accept case files: {reason}")]
    CapacityExceeded {
        office_id: String,
        reason: CapacityRejection,
    },
    #[error("{entity} {id} is in an invalid state: {detail}")]
    InvalidState {
        entity: EntityKind,
        id: String,
        detail: String,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl LifecycleError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(
        entity: EntityKind,
        id: impl fmt::Display,
        detail: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.to_string(),
            detail: detail.into(),
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            LifecycleError::Validation { .. } => "validation",
            LifecycleError::NotFound { .. } => "not_found",
            LifecycleError::CapacityExceeded { .. } => "capacity_exceeded",
            LifecycleError::InvalidState { .. } => "invalid_state",
            LifecycleError::Repository(_) => "repository",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            LifecycleError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LifecycleError::NotFound { .. } => StatusCode::NOT_FOUND,
            LifecycleError::CapacityExceeded { .. } | LifecycleError::InvalidState { .. } => {
                StatusCode::CONFLICT
            }
            LifecycleError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LifecycleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}
