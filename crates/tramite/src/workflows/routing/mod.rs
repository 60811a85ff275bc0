//! Case-file routing between offices and the movement audit trail.

pub mod domain;
pub mod engine;
pub mod reopen;
pub mod router;

#[cfg(test)]
mod tests;

pub use domain::{
    CaseFile, CaseFileFlow, CaseFileId, CaseFileStatus, Movement, MovementReason, MoveRequest,
    NewCaseFile, ReopenReceipt,
};
pub use engine::RoutingEngine;
pub use reopen::CaseReopener;
pub use router::{case_file_router, MovePayload, StatusPayload};
