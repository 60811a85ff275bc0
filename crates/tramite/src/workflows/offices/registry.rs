use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::domain::{NewOffice, Office, OfficeId, OfficeUpdate};
use crate::workflows::error::{CapacityRejection, EntityKind, LifecycleError};
use crate::workflows::locks::KeyedLocks;
use crate::workflows::store::OfficeRepository;

/// Directory of offices and the single owner of their occupancy counters.
///
/// `reserve_slot`/`release_slot` are the only writers of `active_case_files` and are
/// reachable only from the routing engine, so capacity accounting follows routing state.
pub struct OfficeRegistry<R> {
    repository: Arc<R>,
    locks: KeyedLocks<OfficeId>,
}

impl<R> OfficeRegistry<R>
where
    R: OfficeRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            locks: KeyedLocks::default(),
        }
    }

    pub fn create_office(&self, new_office: NewOffice) -> Result<Office, LifecycleError> {
        validate_name(&new_office.name)?;
        validate_capacity(new_office.max_capacity)?;
        validate_processing_days(new_office.average_processing_days)?;

        let office = Office {
            id: OfficeId::generate(),
            name: new_office.name.trim().to_string(),
            office_type: new_office.office_type.trim().to_string(),
            max_capacity: new_office.max_capacity,
            active_case_files: 0,
            average_processing_days: new_office.average_processing_days,
            priority: new_office.priority,
            is_active: new_office.is_active,
        };

        let stored = self.repository.insert_office(office)?;
        info!(office_id = %stored.id, name = %stored.name, capacity = stored.max_capacity, "office registered");
        Ok(stored)
    }

    pub fn office(&self, id: &OfficeId) -> Result<Office, LifecycleError> {
        self.repository
            .fetch_office(id)?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Office, id))
    }

    /// Every office, ordered by name.
    pub fn list_offices(&self) -> Result<Vec<Office>, LifecycleError> {
        let mut offices = self.repository.list_offices()?;
        offices.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(offices)
    }

    /// Active offices with free capacity: most urgent priority first, then least loaded.
    pub fn available_offices(&self) -> Result<Vec<Office>, LifecycleError> {
        let mut offices: Vec<Office> = self
            .repository
            .list_offices()?
            .into_iter()
            .filter(Office::can_receive)
            .collect();
        offices.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| {
                    a.load_ratio()
                        .partial_cmp(&b.load_ratio())
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(offices)
    }

    pub fn update_office(
        &self,
        id: &OfficeId,
        update: OfficeUpdate,
    ) -> Result<Office, LifecycleError> {
        self.locks.with(id, || {
            let mut office = self.office(id)?;

            if let Some(name) = update.name {
                validate_name(&name)?;
                office.name = name.trim().to_string();
            }
            if let Some(office_type) = update.office_type {
                office.office_type = office_type.trim().to_string();
            }
            if let Some(max_capacity) = update.max_capacity {
                validate_capacity(max_capacity)?;
                if max_capacity < office.active_case_files {
                    return Err(LifecycleError::validation(format!(
                        "max_capacity {max_capacity} is below the {} case files currently held by office {id}",
                        office.active_case_files
                    )));
                }
                office.max_capacity = max_capacity;
            }
            if let Some(days) = update.average_processing_days {
                validate_processing_days(days)?;
                office.average_processing_days = days;
            }
            if let Some(priority) = update.priority {
                office.priority = priority;
            }
            if let Some(is_active) = update.is_active {
                office.is_active = is_active;
            }

            self.repository.update_office(office.clone())?;
            info!(office_id = %id, active = office.is_active, capacity = office.max_capacity, "office updated");
            Ok(office)
        })
    }

    pub fn delete_office(&self, id: &OfficeId) -> Result<(), LifecycleError> {
        self.locks.with(id, || {
            let office = self.office(id)?;
            if office.active_case_files > 0 {
                return Err(LifecycleError::invalid_state(
                    EntityKind::Office,
                    id,
                    format!(
                        "office still holds {} case files",
                        office.active_case_files
                    ),
                ));
            }
            self.repository.remove_office(id)?;
            info!(office_id = %id, "office removed");
            Ok(())
        })
    }

    /// Claim one slot in an office, refusing inactive or full offices.
    pub(crate) fn reserve_slot(&self, id: &OfficeId) -> Result<Office, LifecycleError> {
        self.locks.with(id, || {
            let mut office = self.office(id)?;

            let rejection = if !office.is_active {
                Some(CapacityRejection::Inactive)
            } else if office.is_full() {
                Some(CapacityRejection::Full {
                    max_capacity: office.max_capacity,
                })
            } else {
                None
            };

            if let Some(reason) = rejection {
                warn!(office_id = %id, %reason, "slot reservation refused");
                return Err(LifecycleError::CapacityExceeded {
                    office_id: id.to_string(),
                    reason,
                });
            }

            office.active_case_files += 1;
            self.repository.update_office(office.clone())?;
            debug!(office_id = %id, active = office.active_case_files, "slot reserved");
            Ok(office)
        })
    }

    /// Give back one slot. Never drops below zero.
    pub(crate) fn release_slot(&self, id: &OfficeId) -> Result<Office, LifecycleError> {
        self.locks.with(id, || {
            let mut office = self.office(id)?;
            if office.active_case_files == 0 {
                warn!(office_id = %id, "slot release on an empty office ignored");
                return Ok(office);
            }
            office.active_case_files -= 1;
            self.repository.update_office(office.clone())?;
            debug!(office_id = %id, active = office.active_case_files, "slot released");
            Ok(office)
        })
    }
}

fn validate_name(name: &str) -> Result<(), LifecycleError> {
    if name.trim().is_empty() {
        return Err(LifecycleError::validation("office name must not be blank"));
    }
    Ok(())
}

fn validate_capacity(max_capacity: u32) -> Result<(), LifecycleError> {
    if max_capacity == 0 {
        return Err(LifecycleError::validation(
            "max_capacity must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_processing_days(days: f64) -> Result<(), LifecycleError> {
    if !days.is_finite() || days < 0.0 {
        return Err(LifecycleError::validation(format!(
            "average_processing_days must be a non-negative number, got {days}"
        )));
    }
    Ok(())
}
