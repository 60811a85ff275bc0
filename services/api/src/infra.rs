use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tramite::workflows::archival::{
    AlertError, ArchivalEngine, ExpirationAlert, ExpirationAlertPublisher, SnapshotReader,
};
use tramite::workflows::offices::OfficeRegistry;
use tramite::workflows::routing::RoutingEngine;
use tramite::workflows::store::InMemoryStore;
use tramite::workflows::Clock;
use tracing::warn;

pub(crate) type Routing = RoutingEngine<InMemoryStore>;
pub(crate) type Archival = ArchivalEngine<InMemoryStore, Routing>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) retention: SnapshotReader,
}

/// The three engines wired over one shared in-memory store.
pub(crate) struct Engines {
    pub(crate) offices: Arc<OfficeRegistry<InMemoryStore>>,
    pub(crate) routing: Arc<Routing>,
    pub(crate) archival: Arc<Archival>,
}

pub(crate) fn build_engines(clock: Arc<dyn Clock>, site_prefix: &str) -> Engines {
    let store = Arc::new(InMemoryStore::default());
    let offices = Arc::new(OfficeRegistry::new(store.clone()));
    let routing = Arc::new(RoutingEngine::new(
        store.clone(),
        offices.clone(),
        clock.clone(),
    ));
    let archival = Arc::new(ArchivalEngine::new(
        store,
        routing.clone(),
        clock,
        site_prefix,
    ));

    Engines {
        offices,
        routing,
        archival,
    }
}

/// Publisher that keeps alerts in memory and mirrors them to the log.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAlertPublisher {
    events: Arc<Mutex<Vec<ExpirationAlert>>>,
}

impl ExpirationAlertPublisher for InMemoryAlertPublisher {
    fn publish(&self, alert: ExpirationAlert) -> Result<(), AlertError> {
        warn!(
            kind = ?alert.kind,
            archive_id = %alert.archive_id,
            location_code = %alert.location_code,
            days_remaining = alert.days_remaining,
            "retention alert"
        );
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(alert);
        Ok(())
    }
}

impl InMemoryAlertPublisher {
    pub(crate) fn events(&self) -> Vec<ExpirationAlert> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
