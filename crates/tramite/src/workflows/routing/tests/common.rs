use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::to_bytes;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::actor::UserId;
use crate::workflows::clock::FixedClock;
use crate::workflows::error::LifecycleError;
use crate::workflows::offices::{NewOffice, Office, OfficeId, OfficePriority, OfficeRegistry};
use crate::workflows::routing::{
    CaseFile, CaseFileId, Movement, MovementReason, MoveRequest, NewCaseFile, RoutingEngine,
};
use crate::workflows::store::{
    CaseFileRepository, InMemoryStore, MovementRepository, OfficeRepository, RepositoryError,
};

pub(super) struct Harness<S> {
    pub(super) store: Arc<S>,
    pub(super) engine: Arc<RoutingEngine<S>>,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
}

pub(super) fn harness() -> Harness<InMemoryStore> {
    build(Arc::new(InMemoryStore::default()))
}

pub(super) fn flaky_harness() -> Harness<FlakyStore> {
    build(Arc::new(FlakyStore::default()))
}

fn build<S>(store: Arc<S>) -> Harness<S>
where
    S: OfficeRepository + CaseFileRepository + MovementRepository + 'static,
{
    let clock = Arc::new(FixedClock::new(start()));
    let offices = Arc::new(OfficeRegistry::new(store.clone()));
    let engine = Arc::new(RoutingEngine::new(store.clone(), offices, clock.clone()));
    Harness {
        store,
        engine,
        clock,
    }
}

impl<S> Harness<S>
where
    S: OfficeRepository + CaseFileRepository + MovementRepository + 'static,
{
    pub(super) fn office(&self, name: &str, max_capacity: u32) -> Office {
        self.engine
            .offices()
            .create_office(NewOffice {
                name: name.to_string(),
                office_type: "TRAMITE".to_string(),
                max_capacity,
                average_processing_days: 2.0,
                priority: OfficePriority::Normal,
                is_active: true,
            })
            .expect("office created")
    }

    pub(super) fn case_file(&self, number: &str) -> CaseFile {
        self.engine
            .register_case_file(NewCaseFile {
                number: number.to_string(),
                company_id: "20100070970".to_string(),
            })
            .expect("case file registered")
    }

    pub(super) fn move_to(
        &self,
        case_file: &CaseFileId,
        office: &OfficeId,
    ) -> Result<Movement, LifecycleError> {
        self.engine.move_case_file(MoveRequest::new(
            case_file.clone(),
            office.clone(),
            MovementReason::Referral,
            user(),
        ))
    }

    pub(super) fn load(&self, office: &OfficeId) -> u32 {
        self.engine
            .offices()
            .office(office)
            .expect("office exists")
            .active_case_files
    }
}

pub(super) fn user() -> UserId {
    UserId("mesa.partes".to_string())
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

/// In-memory store whose case-file updates and movement appends can be made to fail.
#[derive(Default)]
pub(super) struct FlakyStore {
    inner: InMemoryStore,
    fail_case_file_updates: AtomicBool,
    fail_movement_appends: AtomicBool,
}

impl FlakyStore {
    pub(super) fn fail_case_file_updates(&self, fail: bool) {
        self.fail_case_file_updates.store(fail, Ordering::SeqCst);
    }

    pub(super) fn fail_movement_appends(&self, fail: bool) {
        self.fail_movement_appends.store(fail, Ordering::SeqCst);
    }
}

impl OfficeRepository for FlakyStore {
    fn insert_office(&self, office: Office) -> Result<Office, RepositoryError> {
        self.inner.insert_office(office)
    }

    fn update_office(&self, office: Office) -> Result<(), RepositoryError> {
        self.inner.update_office(office)
    }

    fn fetch_office(&self, id: &OfficeId) -> Result<Option<Office>, RepositoryError> {
        self.inner.fetch_office(id)
    }

    fn list_offices(&self) -> Result<Vec<Office>, RepositoryError> {
        self.inner.list_offices()
    }

    fn remove_office(&self, id: &OfficeId) -> Result<(), RepositoryError> {
        self.inner.remove_office(id)
    }
}

impl CaseFileRepository for FlakyStore {
    fn insert_case_file(&self, case_file: CaseFile) -> Result<CaseFile, RepositoryError> {
        self.inner.insert_case_file(case_file)
    }

    fn update_case_file(&self, case_file: CaseFile) -> Result<(), RepositoryError> {
        if self.fail_case_file_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("case file store offline".to_string()));
        }
        self.inner.update_case_file(case_file)
    }

    fn fetch_case_file(&self, id: &CaseFileId) -> Result<Option<CaseFile>, RepositoryError> {
        self.inner.fetch_case_file(id)
    }

    fn find_case_file_by_number(
        &self,
        number: &str,
    ) -> Result<Option<CaseFile>, RepositoryError> {
        self.inner.find_case_file_by_number(number)
    }

    fn case_files_in_office(&self, office_id: &OfficeId) -> Result<Vec<CaseFile>, RepositoryError> {
        self.inner.case_files_in_office(office_id)
    }
}

impl MovementRepository for FlakyStore {
    fn append_movement(&self, movement: Movement) -> Result<(), RepositoryError> {
        if self.fail_movement_appends.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("movement log offline".to_string()));
        }
        self.inner.append_movement(movement)
    }

    fn movements_for(&self, case_file_id: &CaseFileId) -> Result<Vec<Movement>, RepositoryError> {
        self.inner.movements_for(case_file_id)
    }
}
