//! Archival of finished documents under retention policies, restoration, and expiry
//! alerting.

pub mod domain;
pub mod engine;
pub mod router;
pub mod sweep;

#[cfg(test)]
mod tests;

pub use domain::{
    ArchiveId, ArchiveRecord, ArchiveRequest, ArchiveState, Classification, DocumentId,
    LocationSequenceKey, RetentionPolicy,
};
pub use engine::{ArchivalEngine, DEFAULT_SITE_PREFIX, MIN_RESTORATION_REASON_CHARS};
pub use router::{archive_router, ExpiringQuery, RestorePayload};
pub use sweep::{
    AlertError, ExpirationAlert, ExpirationAlertKind, ExpirationAlertPublisher,
    ExpirationSnapshot, ExpirationSweeper, SnapshotReader, SweepHandle, SweepReport, SweepSettings,
    TracingAlertPublisher,
};
