use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::domain::{ArchiveId, ArchiveRecord, DocumentId};
use super::engine::ArchivalEngine;
use crate::workflows::error::LifecycleError;
use crate::workflows::routing::{CaseFileId, CaseReopener};
use crate::workflows::store::ArchiveRepository;

/// Expiring and expired archive sets as of `computed_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpirationSnapshot {
    pub computed_at: DateTime<Utc>,
    pub alert_days: u32,
    pub expiring: Vec<ArchiveRecord>,
    pub expired: Vec<ArchiveRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationAlertKind {
    Expiring,
    Expired,
}

/// Alert payload handed to publishers; delivery is up to the implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationAlert {
    pub kind: ExpirationAlertKind,
    pub archive_id: ArchiveId,
    pub document_id: DocumentId,
    pub case_file_id: CaseFileId,
    pub location_code: String,
    pub retention_expires_at: DateTime<Utc>,
    pub days_remaining: i64,
}

impl ExpirationAlert {
    fn from_record(
        record: &ArchiveRecord,
        kind: ExpirationAlertKind,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let retention_expires_at = record.retention_expires_at?;
        Some(Self {
            kind,
            archive_id: record.id.clone(),
            document_id: record.document_id.clone(),
            case_file_id: record.case_file_id.clone(),
            location_code: record.location_code.clone(),
            retention_expires_at,
            days_remaining: record.days_until_expiry(now).unwrap_or_default(),
        })
    }
}

/// Outbound hook for retention alerts.
pub trait ExpirationAlertPublisher: Send + Sync {
    fn publish(&self, alert: ExpirationAlert) -> Result<(), AlertError>;
}

/// Alert dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}

/// Publisher that only writes alerts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertPublisher;

impl ExpirationAlertPublisher for TracingAlertPublisher {
    fn publish(&self, alert: ExpirationAlert) -> Result<(), AlertError> {
        warn!(
            kind = ?alert.kind,
            archive_id = %alert.archive_id,
            location_code = %alert.location_code,
            expires_at = %alert.retention_expires_at,
            days_remaining = alert.days_remaining,
            "retention alert"
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub interval: Duration,
    pub alert_days: u32,
    pub batch_size: usize,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            alert_days: 30,
            batch_size: 100,
        }
    }
}

/// Result of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expiring: usize,
    pub expired: usize,
    pub published: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Periodic recomputation of the expiring and expired sets.
///
/// A sweep never changes archive state, so re-running it is harmless. Cancellation is
/// checked before each batch of alerts; a cancelled sweep leaves the previous snapshot in
/// place.
pub struct ExpirationSweeper<A, C, P> {
    engine: Arc<ArchivalEngine<A, C>>,
    publisher: Arc<P>,
    settings: SweepSettings,
    snapshots: SnapshotReader,
}

impl<A, C, P> ExpirationSweeper<A, C, P>
where
    A: ArchiveRepository + 'static,
    C: CaseReopener + 'static,
    P: ExpirationAlertPublisher + 'static,
{
    pub fn new(
        engine: Arc<ArchivalEngine<A, C>>,
        publisher: Arc<P>,
        settings: SweepSettings,
    ) -> Self {
        Self {
            engine,
            publisher,
            settings,
            snapshots: SnapshotReader::default(),
        }
    }

    pub fn latest(&self) -> Option<ExpirationSnapshot> {
        self.snapshots.latest()
    }

    pub fn snapshots(&self) -> SnapshotReader {
        self.snapshots.clone()
    }

    pub fn sweep(&self, shutdown: &watch::Receiver<bool>) -> Result<SweepReport, LifecycleError> {
        let snapshot = self.engine.expiration_snapshot(self.settings.alert_days)?;
        let now = snapshot.computed_at;

        let alerts: Vec<ExpirationAlert> = snapshot
            .expired
            .iter()
            .filter_map(|record| {
                ExpirationAlert::from_record(record, ExpirationAlertKind::Expired, now)
            })
            .chain(snapshot.expiring.iter().filter_map(|record| {
                ExpirationAlert::from_record(record, ExpirationAlertKind::Expiring, now)
            }))
            .collect();

        let mut report = SweepReport {
            expiring: snapshot.expiring.len(),
            expired: snapshot.expired.len(),
            ..SweepReport::default()
        };

        for batch in alerts.chunks(self.settings.batch_size.max(1)) {
            if *shutdown.borrow() {
                info!(published = report.published, "retention sweep cancelled");
                report.cancelled = true;
                return Ok(report);
            }
            for alert in batch {
                match self.publisher.publish(alert.clone()) {
                    Ok(()) => report.published += 1,
                    Err(err) => {
                        warn!(archive_id = %alert.archive_id, error = %err, "retention alert not delivered");
                        report.failed += 1;
                    }
                }
            }
        }

        self.snapshots.store(snapshot);
        debug!(
            expiring = report.expiring,
            expired = report.expired,
            published = report.published,
            "retention sweep finished"
        );
        Ok(report)
    }

    /// Start sweeping on the configured interval in a background task; the first sweep
    /// runs immediately.
    pub fn start(self) -> SweepHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let snapshots = self.snapshots.clone();
        let task = tokio::spawn(async move {
            self.run_loop(shutdown_rx).await;
        });

        SweepHandle {
            shutdown_tx,
            task,
            snapshots,
        }
    }

    async fn run_loop(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.settings.interval.as_secs(),
            alert_days = self.settings.alert_days,
            "retention sweeper started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sweep(&shutdown_rx) {
                        Ok(report) if report.cancelled => break,
                        Ok(report) => {
                            if report.expiring + report.expired > 0 {
                                info!(
                                    expiring = report.expiring,
                                    expired = report.expired,
                                    failed = report.failed,
                                    "retention sweep raised alerts"
                                );
                            }
                        }
                        Err(err) => warn!(error = %err, "retention sweep failed"),
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("retention sweeper stopped");
    }
}

/// Handle for controlling a running sweeper.
pub struct SweepHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    snapshots: SnapshotReader,
}

impl SweepHandle {
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn latest(&self) -> Option<ExpirationSnapshot> {
        self.snapshots.latest()
    }

    pub fn snapshots(&self) -> SnapshotReader {
        self.snapshots.clone()
    }
}

/// Shared view of the most recent completed sweep.
#[derive(Debug, Clone, Default)]
pub struct SnapshotReader {
    latest: Arc<RwLock<Option<ExpirationSnapshot>>>,
}

impl SnapshotReader {
    pub fn latest(&self) -> Option<ExpirationSnapshot> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, snapshot: ExpirationSnapshot) {
        *self
            .latest
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }
}
