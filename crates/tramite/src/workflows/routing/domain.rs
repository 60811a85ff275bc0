use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::actor::UserId;
use crate::workflows::offices::OfficeId;

/// Identifier wrapper for case files (expedientes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseFileId(pub String);

impl CaseFileId {
    pub fn generate() -> Self {
        Self(format!("exp-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for CaseFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processing status of a case file.
///
/// `Pending -> InProcess -> {Completed, Rejected}`; the last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseFileStatus {
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[serde(rename = "EN_PROCESO")]
    InProcess,
    #[serde(rename = "COMPLETADO")]
    Completed,
    #[serde(rename = "RECHAZADO")]
    Rejected,
}

impl CaseFileStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CaseFileStatus::Pending => "PENDIENTE",
            CaseFileStatus::InProcess => "EN_PROCESO",
            CaseFileStatus::Completed => "COMPLETADO",
            CaseFileStatus::Rejected => "RECHAZADO",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, CaseFileStatus::Completed | CaseFileStatus::Rejected)
    }

    pub const fn can_transition_to(self, next: CaseFileStatus) -> bool {
        matches!(
            (self, next),
            (CaseFileStatus::Pending, CaseFileStatus::InProcess)
                | (CaseFileStatus::InProcess, CaseFileStatus::Completed)
                | (CaseFileStatus::InProcess, CaseFileStatus::Rejected)
        )
    }
}

impl fmt::Display for CaseFileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Administrative dossier routed between offices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFile {
    pub id: CaseFileId,
    pub number: String,
    pub company_id: String,
    pub status: CaseFileStatus,
    pub current_office_id: Option<OfficeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload used to register a case file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCaseFile {
    pub number: String,
    pub company_id: String,
}

/// Why a case file was handed to another office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementReason {
    #[serde(rename = "DERIVACION")]
    Referral,
    #[serde(rename = "REVISION")]
    Review,
    #[serde(rename = "SUBSANACION")]
    Correction,
    #[serde(rename = "DICTAMEN")]
    Opinion,
    #[serde(rename = "FIRMA")]
    Signature,
    #[serde(rename = "NOTIFICACION")]
    Notification,
    #[serde(rename = "ARCHIVO")]
    Archival,
    #[serde(rename = "OTRO")]
    Other,
}

/// Immutable audit record of a transfer between offices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub case_file_id: CaseFileId,
    /// `None` for the first assignment of a case file.
    pub from_office_id: Option<OfficeId>,
    pub to_office_id: OfficeId,
    pub reason: MovementReason,
    pub notes: Option<String>,
    pub required_documents: BTreeSet<String>,
    pub delivered_documents: BTreeSet<String>,
    pub moved_at: DateTime<Utc>,
    pub user_id: UserId,
}

impl Movement {
    /// Required documents that were not handed over with the case file.
    pub fn pending_documents(&self) -> Vec<&str> {
        self.required_documents
            .difference(&self.delivered_documents)
            .map(String::as_str)
            .collect()
    }
}

/// Request to move a case file into another office.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub case_file_id: CaseFileId,
    pub to_office_id: OfficeId,
    pub reason: MovementReason,
    pub notes: Option<String>,
    pub required_documents: BTreeSet<String>,
    pub delivered_documents: BTreeSet<String>,
    pub user_id: UserId,
}

impl MoveRequest {
    pub fn new(
        case_file_id: CaseFileId,
        to_office_id: OfficeId,
        reason: MovementReason,
        user_id: UserId,
    ) -> Self {
        Self {
            case_file_id,
            to_office_id,
            reason,
            notes: None,
            required_documents: BTreeSet::new(),
            delivered_documents: BTreeSet::new(),
            user_id,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_documents<I, J>(mut self, required: I, delivered: J) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        J: IntoIterator,
        J::Item: Into<String>,
    {
        self.required_documents = required.into_iter().map(Into::into).collect();
        self.delivered_documents = delivered.into_iter().map(Into::into).collect();
        self
    }
}

/// Full routing history of a case file, oldest movement first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseFileFlow {
    pub case_file_id: CaseFileId,
    pub status: CaseFileStatus,
    pub current_office_id: Option<OfficeId>,
    pub movements: Vec<Movement>,
}

impl CaseFileFlow {
    /// Office reached by replaying the movement history.
    pub fn replayed_office(&self) -> Option<&OfficeId> {
        self.movements.last().map(|movement| &movement.to_office_id)
    }
}

/// Outcome of forcing a case file back into processing, kept so the change can be undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReopenReceipt {
    pub case_file_id: CaseFileId,
    pub previous_status: CaseFileStatus,
    pub previous_updated_at: DateTime<Utc>,
}
