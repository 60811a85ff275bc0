use super::domain::{CaseFileId, ReopenReceipt};
use crate::workflows::error::LifecycleError;

/// Routing-side contract used by archival to reopen a case file when one of its documents
/// is restored.
///
/// `reopen` forces the case file back to `EN_PROCESO` (the only way out of a terminal
/// status) and returns what it replaced; `revert_reopen` undoes that if the caller cannot
/// commit its own half of the operation.
pub trait CaseReopener: Send + Sync {
    fn ensure_case_file(&self, id: &CaseFileId) -> Result<(), LifecycleError>;
    fn reopen(&self, id: &CaseFileId) -> Result<ReopenReceipt, LifecycleError>;
    fn revert_reopen(&self, receipt: &ReopenReceipt) -> Result<(), LifecycleError>;
}
