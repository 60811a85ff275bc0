use std::sync::Arc;

use tracing::{error, info, warn};

use super::domain::{
    ArchiveId, ArchiveRecord, ArchiveRequest, ArchiveState, DocumentId, LocationSequenceKey,
};
use super::sweep::ExpirationSnapshot;
use crate::workflows::actor::UserId;
use crate::workflows::clock::Clock;
use crate::workflows::error::{EntityKind, LifecycleError};
use crate::workflows::locks::KeyedLocks;
use crate::workflows::routing::CaseReopener;
use crate::workflows::store::{ArchiveRepository, RepositoryError};

/// Shortest restoration reason accepted, in characters.
pub const MIN_RESTORATION_REASON_CHARS: usize = 10;

/// Site prefix used when none is configured.
pub const DEFAULT_SITE_PREFIX: &str = "EST";

/// Archive and restore lifecycle with retention-expiry queries.
pub struct ArchivalEngine<A, C> {
    repository: Arc<A>,
    cases: Arc<C>,
    clock: Arc<dyn Clock>,
    site_prefix: String,
    record_locks: KeyedLocks<ArchiveId>,
    document_locks: KeyedLocks<DocumentId>,
}

impl<A, C> ArchivalEngine<A, C>
where
    A: ArchiveRepository + 'static,
    C: CaseReopener + 'static,
{
    pub fn new(
        repository: Arc<A>,
        cases: Arc<C>,
        clock: Arc<dyn Clock>,
        site_prefix: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            cases,
            clock,
            site_prefix: site_prefix.into(),
            record_locks: KeyedLocks::default(),
            document_locks: KeyedLocks::default(),
        }
    }

    pub fn site_prefix(&self) -> &str {
        &self.site_prefix
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Archive a document under a retention policy.
    ///
    /// The expiry is fixed here, once, from the archival instant. The location-code
    /// sequence value is consumed even if the insert fails afterwards, so codes are never
    /// reused.
    pub fn archive_document(
        &self,
        request: ArchiveRequest,
    ) -> Result<ArchiveRecord, LifecycleError> {
        let document_id = request.document_id.clone();
        self.document_locks
            .with(&document_id, || self.archive_locked(request))
    }

    fn archive_locked(&self, request: ArchiveRequest) -> Result<ArchiveRecord, LifecycleError> {
        if request.document_id.0.trim().is_empty() {
            return Err(LifecycleError::validation("document_id must not be blank"));
        }
        self.cases.ensure_case_file(&request.case_file_id)?;

        if let Some(existing) = self.repository.archived_for_document(&request.document_id)? {
            return Err(LifecycleError::validation(format!(
                "document {} is already archived as {} ({})",
                request.document_id, existing.id, existing.location_code
            )));
        }

        let now = self.clock.now();
        let retention_expires_at = request
            .retention_policy
            .expiry_from(now)
            .ok_or_else(|| {
                LifecycleError::validation(format!(
                    "retention expiry for {:?} falls outside the supported date range",
                    request.retention_policy
                ))
            })?;

        let key = LocationSequenceKey::new(self.site_prefix.as_str(), request.classification, now);
        let sequence = self.repository.next_location_sequence(&key)?;

        let record = ArchiveRecord {
            id: ArchiveId::generate(),
            document_id: request.document_id,
            case_file_id: request.case_file_id,
            classification: request.classification,
            retention_policy: request.retention_policy,
            location_code: key.location_code(sequence),
            physical_location: request.physical_location,
            archived_at: now,
            retention_expires_at,
            archived_by: request.user_id,
            archive_reason: request.reason,
            state: ArchiveState::Archived,
            restored_at: None,
            restored_by: None,
            restoration_reason: None,
        };

        let stored = match self.repository.insert_archive(record) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => {
                return Err(LifecycleError::validation(
                    "document or location code already archived",
                ))
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            archive_id = %stored.id,
            document_id = %stored.document_id,
            location_code = %stored.location_code,
            expires_at = ?stored.retention_expires_at,
            "document archived"
        );
        Ok(stored)
    }

    pub fn archive_record(&self, id: &ArchiveId) -> Result<ArchiveRecord, LifecycleError> {
        self.repository
            .fetch_archive(id)?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::ArchiveRecord, id))
    }

    /// The record currently holding a document in the archive, if any.
    pub fn archive_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<ArchiveRecord>, LifecycleError> {
        Ok(self.repository.archived_for_document(document_id)?)
    }

    /// Restore an archived document and reopen its case file.
    ///
    /// The case file is reopened first; if that fails the record is untouched, and if the
    /// record cannot be saved afterwards the reopen is reverted.
    ///
    /// `reason` is trimmed before anything else: the minimum length of 10 characters applies
    /// to the trimmed text, and the trimmed text is what the record stores.
    pub fn restore_document(
        &self,
        id: &ArchiveId,
        reason: &str,
        user_id: UserId,
    ) -> Result<ArchiveRecord, LifecycleError> {
        let reason = reason.trim();
        if reason.chars().count() < MIN_RESTORATION_REASON_CHARS {
            return Err(LifecycleError::validation(format!(
                "restoration reason must have at least {MIN_RESTORATION_REASON_CHARS} characters"
            )));
        }

        self.record_locks.with(id, || {
            let mut record = self.archive_record(id)?;
            if record.state != ArchiveState::Archived {
                warn!(archive_id = %id, state = record.state.label(), "restore refused");
                return Err(LifecycleError::invalid_state(
                    EntityKind::ArchiveRecord,
                    id,
                    format!("cannot restore a record in state {}", record.state.label()),
                ));
            }

            let receipt = self.cases.reopen(&record.case_file_id)?;

            record.state = ArchiveState::Restored;
            record.restored_at = Some(self.clock.now());
            record.restored_by = Some(user_id);
            record.restoration_reason = Some(reason.to_string());

            if let Err(err) = self.repository.update_archive(record.clone()) {
                if let Err(revert_err) = self.cases.revert_reopen(&receipt) {
                    error!(
                        archive_id = %id,
                        case_file_id = %receipt.case_file_id,
                        error = %revert_err,
                        "failed to revert case file after aborted restore"
                    );
                }
                return Err(err.into());
            }

            info!(
                archive_id = %id,
                document_id = %record.document_id,
                case_file_id = %record.case_file_id,
                "document restored"
            );
            Ok(record)
        })
    }

    /// Archived records whose retention ends within `days` whole days from now, both
    /// bounds inclusive.
    pub fn expiring_within(&self, days: u32) -> Result<Vec<ArchiveRecord>, LifecycleError> {
        let now = self.clock.now();
        Ok(self
            .repository
            .archived_records()?
            .into_iter()
            .filter(|record| record.expires_within(now, days))
            .collect())
    }

    /// Archived records whose retention already ended. Enumeration only: nothing changes
    /// state.
    pub fn expired(&self) -> Result<Vec<ArchiveRecord>, LifecycleError> {
        let now = self.clock.now();
        Ok(self
            .repository
            .archived_records()?
            .into_iter()
            .filter(|record| record.is_expired(now))
            .collect())
    }

    /// Expiring and expired sets computed from a single read and a single clock instant.
    pub fn expiration_snapshot(&self, days: u32) -> Result<ExpirationSnapshot, LifecycleError> {
        let computed_at = self.clock.now();
        let (expiring, expired) = self
            .repository
            .archived_records()?
            .into_iter()
            .fold((Vec::new(), Vec::new()), |(mut expiring, mut expired), record| {
                if record.is_expired(computed_at) {
                    expired.push(record);
                } else if record.expires_within(computed_at, days) {
                    expiring.push(record);
                }
                (expiring, expired)
            });

        Ok(ExpirationSnapshot {
            computed_at,
            alert_days: days,
            expiring,
            expired,
        })
    }
}
