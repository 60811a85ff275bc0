use std::sync::Arc;

use tracing::{error, info, warn};

use super::domain::{
    CaseFile, CaseFileFlow, CaseFileId, CaseFileStatus, Movement, MoveRequest, NewCaseFile,
    ReopenReceipt,
};
use super::reopen::CaseReopener;
use crate::workflows::clock::Clock;
use crate::workflows::error::{EntityKind, LifecycleError};
use crate::workflows::locks::KeyedLocks;
use crate::workflows::offices::{Office, OfficeId, OfficeRegistry};
use crate::workflows::store::{
    CaseFileRepository, MovementRepository, OfficeRepository, RepositoryError,
};

/// Drives case files between offices and through their status machine.
///
/// Every operation on a case file runs under a lock keyed by its id, so two moves of the
/// same case file never interleave; slot accounting is delegated to the office registry.
pub struct RoutingEngine<S> {
    store: Arc<S>,
    offices: Arc<OfficeRegistry<S>>,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks<CaseFileId>,
}

impl<S> RoutingEngine<S>
where
    S: OfficeRepository + CaseFileRepository + MovementRepository + 'static,
{
    pub fn new(store: Arc<S>, offices: Arc<OfficeRegistry<S>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            offices,
            clock,
            locks: KeyedLocks::default(),
        }
    }

    pub fn offices(&self) -> &Arc<OfficeRegistry<S>> {
        &self.offices
    }

    /// Register a new case file in `PENDIENTE`, not yet assigned to any office.
    pub fn register_case_file(&self, new_case: NewCaseFile) -> Result<CaseFile, LifecycleError> {
        let number = new_case.number.trim().to_string();
        if number.is_empty() {
            return Err(LifecycleError::validation("case file number must not be blank"));
        }
        if self.store.find_case_file_by_number(&number)?.is_some() {
            return Err(LifecycleError::validation(format!(
                "case file number {number} is already registered"
            )));
        }

        let now = self.clock.now();
        let case_file = CaseFile {
            id: CaseFileId::generate(),
            number,
            company_id: new_case.company_id.trim().to_string(),
            status: CaseFileStatus::Pending,
            current_office_id: None,
            created_at: now,
            updated_at: now,
        };

        let stored = match self.store.insert_case_file(case_file) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => {
                return Err(LifecycleError::validation(format!(
                    "case file number {} is already registered",
                    new_case.number.trim()
                )))
            }
            Err(other) => return Err(other.into()),
        };

        info!(case_file_id = %stored.id, number = %stored.number, "case file registered");
        Ok(stored)
    }

    pub fn case_file(&self, id: &CaseFileId) -> Result<CaseFile, LifecycleError> {
        self.store
            .fetch_case_file(id)?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::CaseFile, id))
    }

    /// Case files whose current location is the given office.
    pub fn case_files_in_office(
        &self,
        office_id: &OfficeId,
    ) -> Result<Vec<CaseFile>, LifecycleError> {
        self.offices.office(office_id)?;
        Ok(self.store.case_files_in_office(office_id)?)
    }

    /// Move a case file into another office.
    ///
    /// The target slot is reserved before anything else changes; if persisting the case
    /// file or the movement fails afterwards, the reservation is handed back and the case
    /// file restored, so a failed move leaves no trace.
    pub fn move_case_file(&self, request: MoveRequest) -> Result<Movement, LifecycleError> {
        let case_file_id = request.case_file_id.clone();
        self.locks
            .with(&case_file_id, || self.move_locked(request))
    }

    fn move_locked(&self, request: MoveRequest) -> Result<Movement, LifecycleError> {
        let case_file = self.case_file(&request.case_file_id)?;
        self.offices.office(&request.to_office_id)?;

        if case_file.status.is_terminal() {
            return Err(LifecycleError::invalid_state(
                EntityKind::CaseFile,
                &case_file.id,
                format!(
                    "cannot move a case file in terminal status {}",
                    case_file.status
                ),
            ));
        }
        if case_file.current_office_id.as_ref() == Some(&request.to_office_id) {
            return Err(LifecycleError::validation(format!(
                "case file {} is already in office {}",
                case_file.id, request.to_office_id
            )));
        }

        // History is ordered by `moved_at`; a wall clock stepping backwards must not put
        // this move ahead of the previous one.
        let last_moved_at = self
            .store
            .movements_for(&case_file.id)?
            .last()
            .map(|movement| movement.moved_at);
        let now = match last_moved_at {
            Some(last) => self.clock.now().max(last),
            None => self.clock.now(),
        };

        self.offices.reserve_slot(&request.to_office_id)?;

        let origin = case_file.current_office_id.clone();
        let movement = Movement {
            case_file_id: case_file.id.clone(),
            from_office_id: origin.clone(),
            to_office_id: request.to_office_id.clone(),
            reason: request.reason,
            notes: request.notes,
            required_documents: request.required_documents,
            delivered_documents: request.delivered_documents,
            moved_at: now,
            user_id: request.user_id,
        };

        let mut moved = case_file.clone();
        moved.current_office_id = Some(request.to_office_id.clone());
        moved.updated_at = now;

        if let Err(err) = self.store.update_case_file(moved) {
            self.undo_reservation(&request.to_office_id);
            return Err(err.into());
        }
        if let Err(err) = self.store.append_movement(movement.clone()) {
            if let Err(restore_err) = self.store.update_case_file(case_file.clone()) {
                error!(case_file_id = %case_file.id, error = %restore_err, "failed to restore case file after aborted move");
            }
            self.undo_reservation(&request.to_office_id);
            return Err(err.into());
        }

        if let Some(origin_id) = &origin {
            // The move is committed at this point; a failed release is logged, not surfaced.
            if let Err(err) = self.offices.release_slot(origin_id) {
                error!(office_id = %origin_id, error = %err, "failed to release origin slot");
            }
        }

        info!(
            case_file_id = %movement.case_file_id,
            from = ?movement.from_office_id,
            to = %movement.to_office_id,
            reason = ?movement.reason,
            pending_documents = movement.pending_documents().len(),
            "case file moved"
        );
        Ok(movement)
    }

    fn undo_reservation(&self, office_id: &OfficeId) {
        if let Err(err) = self.offices.release_slot(office_id) {
            error!(office_id = %office_id, error = %err, "failed to hand back reserved slot");
        }
    }

    /// Ordered movement history plus the current location.
    pub fn flow(&self, id: &CaseFileId) -> Result<CaseFileFlow, LifecycleError> {
        let case_file = self.case_file(id)?;
        let movements = self.store.movements_for(id)?;
        Ok(CaseFileFlow {
            case_file_id: case_file.id,
            status: case_file.status,
            current_office_id: case_file.current_office_id,
            movements,
        })
    }

    /// Apply an explicit status transition; only forward moves along the status machine
    /// are accepted.
    pub fn transition_status(
        &self,
        id: &CaseFileId,
        next: CaseFileStatus,
    ) -> Result<CaseFile, LifecycleError> {
        self.locks.with(id, || {
            let mut case_file = self.case_file(id)?;
            if !case_file.status.can_transition_to(next) {
                warn!(case_file_id = %id, from = %case_file.status, to = %next, "status transition refused");
                return Err(LifecycleError::invalid_state(
                    EntityKind::CaseFile,
                    id,
                    format!("illegal transition {} -> {}", case_file.status, next),
                ));
            }

            let previous = case_file.status;
            case_file.status = next;
            case_file.updated_at = self.clock.now();
            self.store.update_case_file(case_file.clone())?;
            info!(case_file_id = %id, from = %previous, to = %next, "case file status changed");
            Ok(case_file)
        })
    }

    /// Office currently holding the case file, if it has been assigned.
    pub fn current_office(&self, id: &CaseFileId) -> Result<Option<Office>, LifecycleError> {
        let case_file = self.case_file(id)?;
        case_file
            .current_office_id
            .map(|office_id| self.offices.office(&office_id))
            .transpose()
    }
}

impl<S> CaseReopener for RoutingEngine<S>
where
    S: OfficeRepository + CaseFileRepository + MovementRepository + 'static,
{
    fn ensure_case_file(&self, id: &CaseFileId) -> Result<(), LifecycleError> {
        self.case_file(id).map(|_| ())
    }

    fn reopen(&self, id: &CaseFileId) -> Result<ReopenReceipt, LifecycleError> {
        self.locks.with(id, || {
            let mut case_file = self.case_file(id)?;
            let receipt = ReopenReceipt {
                case_file_id: case_file.id.clone(),
                previous_status: case_file.status,
                previous_updated_at: case_file.updated_at,
            };

            if case_file.status != CaseFileStatus::InProcess {
                case_file.status = CaseFileStatus::InProcess;
                case_file.updated_at = self.clock.now();
                self.store.update_case_file(case_file)?;
                info!(case_file_id = %id, from = %receipt.previous_status, "case file reopened");
            }

            Ok(receipt)
        })
    }

    fn revert_reopen(&self, receipt: &ReopenReceipt) -> Result<(), LifecycleError> {
        let id = &receipt.case_file_id;
        self.locks.with(id, || {
            let mut case_file = self.case_file(id)?;
            // Anything other than the reopened status means a later transition won; keep it.
            if case_file.status != CaseFileStatus::InProcess
                || case_file.status == receipt.previous_status
            {
                return Ok(());
            }
            case_file.status = receipt.previous_status;
            case_file.updated_at = receipt.previous_updated_at;
            self.store.update_case_file(case_file)?;
            warn!(case_file_id = %id, status = %receipt.previous_status, "case file reopen reverted");
            Ok(())
        })
    }
}
