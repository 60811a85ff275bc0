//! Storage boundary for the lifecycle engines.
//!
//! The engines enforce the business rules; repositories only persist what they are handed and
//! enforce identity uniqueness. `InMemoryStore` implements all four traits over an arena
//! of maps and backs the service binary, the demo, and the tests.

mod memory;

pub use memory::InMemoryStore;

use super::archival::{ArchiveId, ArchiveRecord, DocumentId, LocationSequenceKey};
use super::offices::{Office, OfficeId};
use super::routing::{CaseFile, CaseFileId, Movement};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub trait OfficeRepository: Send + Sync {
    fn insert_office(&self, office: Office) -> Result<Office, RepositoryError>;
    fn update_office(&self, office: Office) -> Result<(), RepositoryError>;
    fn fetch_office(&self, id: &OfficeId) -> Result<Option<Office>, RepositoryError>;
    fn list_offices(&self) -> Result<Vec<Office>, RepositoryError>;
    fn remove_office(&self, id: &OfficeId) -> Result<(), RepositoryError>;
}

pub trait CaseFileRepository: Send + Sync {
    /// Fails with `Conflict` when the id or the case number is already taken.
    fn insert_case_file(&self, case_file: CaseFile) -> Result<CaseFile, RepositoryError>;
    fn update_case_file(&self, case_file: CaseFile) -> Result<(), RepositoryError>;
    fn fetch_case_file(&self, id: &CaseFileId) -> Result<Option<CaseFile>, RepositoryError>;
    fn find_case_file_by_number(&self, number: &str)
        -> Result<Option<CaseFile>, RepositoryError>;
    fn case_files_in_office(&self, office_id: &OfficeId) -> Result<Vec<CaseFile>, RepositoryError>;
}

/// Append-only movement log.
pub trait MovementRepository: Send + Sync {
    fn append_movement(&self, movement: Movement) -> Result<(), RepositoryError>;
    /// Movements of a case file ordered by `moved_at`, ties kept in append order.
    fn movements_for(&self, case_file_id: &CaseFileId) -> Result<Vec<Movement>, RepositoryError>;
}

pub trait ArchiveRepository: Send + Sync {
    /// Fails with `Conflict` when the id or location code is taken, or when the document
    /// already has an archived record.
    fn insert_archive(&self, record: ArchiveRecord) -> Result<ArchiveRecord, RepositoryError>;
    fn update_archive(&self, record: ArchiveRecord) -> Result<(), RepositoryError>;
    fn fetch_archive(&self, id: &ArchiveId) -> Result<Option<ArchiveRecord>, RepositoryError>;
    /// The record currently in `ARCHIVADO` state for a document, if any.
    fn archived_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<ArchiveRecord>, RepositoryError>;
    /// All records currently in `ARCHIVADO` state.
    fn archived_records(&self) -> Result<Vec<ArchiveRecord>, RepositoryError>;
    /// Hands out the next value of a location-code sequence, starting at 1. Values are never
    /// handed out twice.
    fn next_location_sequence(&self, key: &LocationSequenceKey) -> Result<u32, RepositoryError>;
}
