use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::to_bytes;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::watch;

use crate::workflows::actor::UserId;
use crate::workflows::archival::{
    AlertError, ArchivalEngine, ArchiveId, ArchiveRecord, ArchiveRequest, Classification,
    DocumentId, ExpirationAlert, ExpirationAlertPublisher, LocationSequenceKey, RetentionPolicy,
};
use crate::workflows::clock::FixedClock;
use crate::workflows::error::LifecycleError;
use crate::workflows::offices::OfficeRegistry;
use crate::workflows::routing::{
    CaseFile, CaseFileId, CaseFileStatus, CaseReopener, NewCaseFile, ReopenReceipt, RoutingEngine,
};
use crate::workflows::store::{ArchiveRepository, InMemoryStore, RepositoryError};

pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub(super) struct Harness<A, C> {
    pub(super) archives: Arc<A>,
    pub(super) routing: Arc<RoutingEngine<InMemoryStore>>,
    pub(super) cases: Arc<C>,
    pub(super) engine: Arc<ArchivalEngine<A, C>>,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) type MemoryHarness = Harness<InMemoryStore, RoutingEngine<InMemoryStore>>;
pub(super) type FlakyHarness = Harness<FlakyArchives, SwitchableReopener>;

/// Harness on the plain in-memory store, clock starting at 2025-01-01.
pub(super) fn harness() -> MemoryHarness {
    let store = Arc::new(InMemoryStore::default());
    let clock = Arc::new(FixedClock::new(at(2025, 1, 1)));
    let routing = routing_engine(store.clone(), clock.clone());
    let engine = Arc::new(ArchivalEngine::new(
        store.clone(),
        routing.clone(),
        clock.clone(),
        "EST",
    ));
    Harness {
        archives: store,
        routing: routing.clone(),
        cases: routing,
        engine,
        clock,
    }
}

pub(super) fn flaky_harness() -> FlakyHarness {
    let store = Arc::new(InMemoryStore::default());
    let clock = Arc::new(FixedClock::new(at(2025, 1, 1)));
    let routing = routing_engine(store.clone(), clock.clone());
    let archives = Arc::new(FlakyArchives {
        inner: store,
        fail_updates: AtomicBool::new(false),
    });
    let cases = Arc::new(SwitchableReopener {
        inner: routing.clone(),
        fail_reopen: AtomicBool::new(false),
    });
    let engine = Arc::new(ArchivalEngine::new(
        archives.clone(),
        cases.clone(),
        clock.clone(),
        "EST",
    ));
    Harness {
        archives,
        routing,
        cases,
        engine,
        clock,
    }
}

fn routing_engine(
    store: Arc<InMemoryStore>,
    clock: Arc<FixedClock>,
) -> Arc<RoutingEngine<InMemoryStore>> {
    let offices = Arc::new(OfficeRegistry::new(store.clone()));
    Arc::new(RoutingEngine::new(store, offices, clock))
}

impl<A, C> Harness<A, C>
where
    A: ArchiveRepository + 'static,
    C: CaseReopener + 'static,
{
    /// Registers a case file and walks it to `COMPLETADO`.
    pub(super) fn completed_case_file(&self, number: &str) -> CaseFile {
        let case_file = self
            .routing
            .register_case_file(NewCaseFile {
                number: number.to_string(),
                company_id: "20100070970".to_string(),
            })
            .expect("registered");
        self.routing
            .transition_status(&case_file.id, CaseFileStatus::InProcess)
            .expect("in process");
        self.routing
            .transition_status(&case_file.id, CaseFileStatus::Completed)
            .expect("completed")
    }

    pub(super) fn archive(
        &self,
        document: &str,
        case_file: &CaseFileId,
        classification: Classification,
        policy: RetentionPolicy,
    ) -> ArchiveRecord {
        self.engine
            .archive_document(request(document, case_file, classification, policy))
            .expect("archived")
    }

    pub(super) fn status_of(&self, case_file: &CaseFileId) -> CaseFileStatus {
        self.routing.case_file(case_file).expect("case file").status
    }
}

pub(super) fn request(
    document: &str,
    case_file: &CaseFileId,
    classification: Classification,
    retention_policy: RetentionPolicy,
) -> ArchiveRequest {
    ArchiveRequest {
        document_id: DocumentId(document.to_string()),
        case_file_id: case_file.clone(),
        classification,
        retention_policy,
        physical_location: Some("Estante 4, caja 12".to_string()),
        reason: Some("Expediente concluido".to_string()),
        user_id: archivist(),
    }
}

pub(super) fn archivist() -> UserId {
    UserId("archivo.central".to_string())
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Archive store whose record updates can be made to fail.
pub(super) struct FlakyArchives {
    inner: Arc<InMemoryStore>,
    fail_updates: AtomicBool,
}

impl FlakyArchives {
    pub(super) fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

impl ArchiveRepository for FlakyArchives {
    fn insert_archive(&self, record: ArchiveRecord) -> Result<ArchiveRecord, RepositoryError> {
        self.inner.insert_archive(record)
    }

    fn update_archive(&self, record: ArchiveRecord) -> Result<(), RepositoryError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("archive store offline".to_string()));
        }
        self.inner.update_archive(record)
    }

    fn fetch_archive(&self, id: &ArchiveId) -> Result<Option<ArchiveRecord>, RepositoryError> {
        self.inner.fetch_archive(id)
    }

    fn archived_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<ArchiveRecord>, RepositoryError> {
        self.inner.archived_for_document(document_id)
    }

    fn archived_records(&self) -> Result<Vec<ArchiveRecord>, RepositoryError> {
        self.inner.archived_records()
    }

    fn next_location_sequence(&self, key: &LocationSequenceKey) -> Result<u32, RepositoryError> {
        self.inner.next_location_sequence(key)
    }
}

/// Routing engine wrapper whose reopen step can be made to fail.
pub(super) struct SwitchableReopener {
    inner: Arc<RoutingEngine<InMemoryStore>>,
    fail_reopen: AtomicBool,
}

impl SwitchableReopener {
    pub(super) fn fail_reopen(&self, fail: bool) {
        self.fail_reopen.store(fail, Ordering::SeqCst);
    }
}

impl CaseReopener for SwitchableReopener {
    fn ensure_case_file(&self, id: &CaseFileId) -> Result<(), LifecycleError> {
        self.inner.ensure_case_file(id)
    }

    fn reopen(&self, id: &CaseFileId) -> Result<ReopenReceipt, LifecycleError> {
        if self.fail_reopen.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("routing offline".to_string()).into());
        }
        self.inner.reopen(id)
    }

    fn revert_reopen(&self, receipt: &ReopenReceipt) -> Result<(), LifecycleError> {
        self.inner.revert_reopen(receipt)
    }
}

/// Publisher recording every alert; can fail on demand or raise shutdown after a number
/// of deliveries.
#[derive(Default)]
pub(super) struct RecordingPublisher {
    pub(super) alerts: Mutex<Vec<ExpirationAlert>>,
    pub(super) fail: AtomicBool,
    pub(super) shutdown_after: Mutex<Option<(usize, watch::Sender<bool>)>>,
}

impl RecordingPublisher {
    pub(super) fn delivered(&self) -> Vec<ExpirationAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

impl ExpirationAlertPublisher for RecordingPublisher {
    fn publish(&self, alert: ExpirationAlert) -> Result<(), AlertError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AlertError::Transport("smtp relay down".to_string()));
        }
        let mut alerts = self.alerts.lock().unwrap();
        alerts.push(alert);
        if let Some((limit, sender)) = self.shutdown_after.lock().unwrap().as_ref() {
            if alerts.len() >= *limit {
                let _ = sender.send(true);
            }
        }
        Ok(())
    }
}
