use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    ArchiveRepository, CaseFileRepository, MovementRepository, OfficeRepository, RepositoryError,
};
use crate::workflows::archival::{
    ArchiveId, ArchiveRecord, ArchiveState, DocumentId, LocationSequenceKey,
};
use crate::workflows::offices::{Office, OfficeId};
use crate::workflows::routing::{CaseFile, CaseFileId, Movement};

/// Arena-style store keyed by id, with secondary indexes where uniqueness is required.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    offices: Arc<Mutex<HashMap<OfficeId, Office>>>,
    case_files: Arc<Mutex<CaseFileArena>>,
    movements: Arc<Mutex<HashMap<CaseFileId, Vec<Movement>>>>,
    archives: Arc<Mutex<ArchiveArena>>,
}

#[derive(Default)]
struct CaseFileArena {
    records: HashMap<CaseFileId, CaseFile>,
    by_number: HashMap<String, CaseFileId>,
}

#[derive(Default)]
struct ArchiveArena {
    records: HashMap<ArchiveId, ArchiveRecord>,
    archived_by_document: HashMap<DocumentId, ArchiveId>,
    location_codes: HashSet<String>,
    sequences: HashMap<LocationSequenceKey, u32>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} store lock poisoned")))
}

impl OfficeRepository for InMemoryStore {
    fn insert_office(&self, office: Office) -> Result<Office, RepositoryError> {
        let mut guard = lock(&self.offices, "office")?;
        if guard.contains_key(&office.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(office.id.clone(), office.clone());
        Ok(office)
    }

    fn update_office(&self, office: Office) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.offices, "office")?;
        match guard.get_mut(&office.id) {
            Some(slot) => {
                *slot = office;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_office(&self, id: &OfficeId) -> Result<Option<Office>, RepositoryError> {
        let guard = lock(&self.offices, "office")?;
        Ok(guard.get(id).cloned())
    }

    fn list_offices(&self) -> Result<Vec<Office>, RepositoryError> {
        let guard = lock(&self.offices, "office")?;
        Ok(guard.values().cloned().collect())
    }

    fn remove_office(&self, id: &OfficeId) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.offices, "office")?;
        guard
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl CaseFileRepository for InMemoryStore {
    fn insert_case_file(&self, case_file: CaseFile) -> Result<CaseFile, RepositoryError> {
        let mut guard = lock(&self.case_files, "case file")?;
        if guard.records.contains_key(&case_file.id)
            || guard.by_number.contains_key(&case_file.number)
        {
            return Err(RepositoryError::Conflict);
        }
        guard
            .by_number
            .insert(case_file.number.clone(), case_file.id.clone());
        guard
            .records
            .insert(case_file.id.clone(), case_file.clone());
        Ok(case_file)
    }

    fn update_case_file(&self, case_file: CaseFile) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.case_files, "case file")?;
        let existing_number = match guard.records.get(&case_file.id) {
            Some(existing) => existing.number.clone(),
            None => return Err(RepositoryError::NotFound),
        };
        if existing_number != case_file.number {
            if guard.by_number.contains_key(&case_file.number) {
                return Err(RepositoryError::Conflict);
            }
            guard.by_number.remove(&existing_number);
            guard
                .by_number
                .insert(case_file.number.clone(), case_file.id.clone());
        }
        guard.records.insert(case_file.id.clone(), case_file);
        Ok(())
    }

    fn fetch_case_file(&self, id: &CaseFileId) -> Result<Option<CaseFile>, RepositoryError> {
        let guard = lock(&self.case_files, "case file")?;
        Ok(guard.records.get(id).cloned())
    }

    fn find_case_file_by_number(
        &self,
        number: &str,
    ) -> Result<Option<CaseFile>, RepositoryError> {
        let guard = lock(&self.case_files, "case file")?;
        Ok(guard
            .by_number
            .get(number)
            .and_then(|id| guard.records.get(id))
            .cloned())
    }

    fn case_files_in_office(&self, office_id: &OfficeId) -> Result<Vec<CaseFile>, RepositoryError> {
        let guard = lock(&self.case_files, "case file")?;
        let mut found: Vec<CaseFile> = guard
            .records
            .values()
            .filter(|case_file| case_file.current_office_id.as_ref() == Some(office_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(found)
    }
}

impl MovementRepository for InMemoryStore {
    fn append_movement(&self, movement: Movement) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.movements, "movement")?;
        guard
            .entry(movement.case_file_id.clone())
            .or_default()
            .push(movement);
        Ok(())
    }

    fn movements_for(&self, case_file_id: &CaseFileId) -> Result<Vec<Movement>, RepositoryError> {
        let guard = lock(&self.movements, "movement")?;
        let mut movements = guard.get(case_file_id).cloned().unwrap_or_default();
        // Stable sort keeps append order for identical timestamps.
        movements.sort_by_key(|movement| movement.moved_at);
        Ok(movements)
    }
}

impl ArchiveRepository for InMemoryStore {
    fn insert_archive(&self, record: ArchiveRecord) -> Result<ArchiveRecord, RepositoryError> {
        let mut guard = lock(&self.archives, "archive")?;
        if guard.records.contains_key(&record.id)
            || guard.location_codes.contains(&record.location_code)
        {
            return Err(RepositoryError::Conflict);
        }
        if record.is_archived() && guard.archived_by_document.contains_key(&record.document_id) {
            return Err(RepositoryError::Conflict);
        }

        if record.is_archived() {
            guard
                .archived_by_document
                .insert(record.document_id.clone(), record.id.clone());
        }
        guard.location_codes.insert(record.location_code.clone());
        guard.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update_archive(&self, record: ArchiveRecord) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.archives, "archive")?;
        if !guard.records.contains_key(&record.id) {
            return Err(RepositoryError::NotFound);
        }

        match record.state {
            ArchiveState::Archived => {
                if let Some(holder) = guard.archived_by_document.get(&record.document_id) {
                    if holder != &record.id {
                        return Err(RepositoryError::Conflict);
                    }
                }
                guard
                    .archived_by_document
                    .insert(record.document_id.clone(), record.id.clone());
            }
            ArchiveState::Restored => {
                if guard.archived_by_document.get(&record.document_id) == Some(&record.id) {
                    guard.archived_by_document.remove(&record.document_id);
                }
            }
        }

        guard.records.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch_archive(&self, id: &ArchiveId) -> Result<Option<ArchiveRecord>, RepositoryError> {
        let guard = lock(&self.archives, "archive")?;
        Ok(guard.records.get(id).cloned())
    }

    fn archived_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<ArchiveRecord>, RepositoryError> {
        let guard = lock(&self.archives, "archive")?;
        Ok(guard
            .archived_by_document
            .get(document_id)
            .and_then(|id| guard.records.get(id))
            .cloned())
    }

    fn archived_records(&self) -> Result<Vec<ArchiveRecord>, RepositoryError> {
        let guard = lock(&self.archives, "archive")?;
        let mut records: Vec<ArchiveRecord> = guard
            .records
            .values()
            .filter(|record| record.is_archived())
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.retention_expires_at
                .cmp(&b.retention_expires_at)
                .then_with(|| a.location_code.cmp(&b.location_code))
        });
        Ok(records)
    }

    fn next_location_sequence(&self, key: &LocationSequenceKey) -> Result<u32, RepositoryError> {
        let mut guard = lock(&self.archives, "archive")?;
        let counter = guard.sequences.entry(key.clone()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}
