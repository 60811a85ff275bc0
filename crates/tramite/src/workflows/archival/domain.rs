use std::fmt;

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::actor::UserId;
use crate::workflows::routing::CaseFileId;


/// Identifier wrapper for archive records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveId(pub String);

impl ArchiveId {
    pub fn generate() -> Self {
        Self(format!("arc-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the document being archived.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Documentary classification of an archived document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "TRAMITE_DOCUMENTARIO")]
    DocumentProcessing,
    #[serde(rename = "ADMINISTRATIVO")]
    Administrative,
    #[serde(rename = "LEGAL")]
    Legal,
    #[serde(rename = "CONTABLE")]
    Accounting,
    #[serde(rename = "RECURSOS_HUMANOS")]
    HumanResources,
    #[serde(rename = "TECNICO")]
    Technical,
    #[serde(rename = "OTROS")]
    Other,
}

impl Classification {
    /// Short code used inside location codes.
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Classification::DocumentProcessing => "TD",
            Classification::Administrative => "ADM",
            Classification::Legal => "LEG",
            Classification::Accounting => "CON",
            Classification::HumanResources => "RH",
            Classification::Technical => "TEC",
            Classification::Other => "OTR",
        }
    }
}

/// How long an archived document must be kept before it becomes disposal-eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetentionPolicy {
    #[serde(rename = "PERMANENTE")]
    Permanent,
    #[serde(rename = "DIEZ_ANOS")]
    TenYears,
    #[serde(rename = "CINCO_ANOS")]
    FiveYears,
    #[serde(rename = "TRES_ANOS")]
    ThreeYears,
    #[serde(rename = "UN_ANO")]
    OneYear,
}

impl RetentionPolicy {
    pub const fn years(self) -> Option<u32> {
        match self {
            RetentionPolicy::Permanent => None,
            RetentionPolicy::TenYears => Some(10),
            RetentionPolicy::FiveYears => Some(5),
            RetentionPolicy::ThreeYears => Some(3),
            RetentionPolicy::OneYear => Some(1),
        }
    }

    /// Expiry for a document archived at `archived_at`.
    ///
    /// Calendar arithmetic: same month and day N years later, clamped to the last day of
    /// the month when that day does not exist (Feb 29). The outer `None` signals an
    /// instant beyond the supported date range.
    pub fn expiry_from(self, archived_at: DateTime<Utc>) -> Option<Option<DateTime<Utc>>> {
        match self.years() {
            None => Some(None),
            Some(years) => archived_at
                .checked_add_months(Months::new(years * 12))
                .map(Some),
        }
    }
}

/// Lifecycle state of an archive record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveState {
    #[serde(rename = "ARCHIVADO")]
    Archived,
    #[serde(rename = "RESTAURADO")]
    Restored,
}

impl ArchiveState {
    pub const fn label(self) -> &'static str {
        match self {
            ArchiveState::Archived => "ARCHIVADO",
            ArchiveState::Restored => "RESTAURADO",
        }
    }
}

/// Key of an independent location-code sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationSequenceKey {
    pub site: String,
    pub classification: Classification,
    pub year: i32,
}

impl LocationSequenceKey {
    pub fn new(site: impl Into<String>, classification: Classification, at: DateTime<Utc>) -> Self {
        Self {
            site: site.into(),
            classification,
            year: at.year(),
        }
    }

    /// `<SITE>-<ABBR>-<YYYY>-<SEQ4>`, e.g. `EST-TD-2025-0001`.
    pub fn location_code(&self, sequence: u32) -> String {
        format!(
            "{}-{}-{:04}-{:04}",
            self.site,
            self.classification.abbreviation(),
            self.year,
            sequence
        )
    }
}

/// Archival record carrying retention metadata for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub id: ArchiveId,
    pub document_id: DocumentId,
    pub case_file_id: CaseFileId,
    pub classification: Classification,
    pub retention_policy: RetentionPolicy,
    pub location_code: String,
    pub physical_location: Option<String>,
    pub archived_at: DateTime<Utc>,
    pub retention_expires_at: Option<DateTime<Utc>>,
    pub archived_by: UserId,
    pub archive_reason: Option<String>,
    pub state: ArchiveState,
    pub restored_at: Option<DateTime<Utc>>,
    pub restored_by: Option<UserId>,
    pub restoration_reason: Option<String>,
}

impl ArchiveRecord {
    pub fn is_archived(&self) -> bool {
        self.state == ArchiveState::Archived
    }

    /// Whole days left before the retention period ends, rounded toward negative infinity
    /// so that an already-expired record never reports zero.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.retention_expires_at
            .map(|expires| floor_days(expires - now))
    }

    pub fn expires_within(&self, now: DateTime<Utc>, days: u32) -> bool {
        self.is_archived()
            && self
                .days_until_expiry(now)
                .is_some_and(|remaining| (0..=i64::from(days)).contains(&remaining))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_archived()
            && self
                .retention_expires_at
                .is_some_and(|expires| expires < now)
    }
}

/// `num_days` truncates toward zero; step down once more for any negative remainder, even a
/// sub-second one.
fn floor_days(remaining: Duration) -> i64 {
    let days = remaining.num_days();
    if remaining < Duration::days(days) {
        days - 1
    } else {
        days
    }
}

/// Request to archive a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRequest {
    pub document_id: DocumentId,
    pub case_file_id: CaseFileId,
    pub classification: Classification,
    pub retention_policy: RetentionPolicy,
    #[serde(default)]
    pub physical_location: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    pub user_id: UserId,
}
