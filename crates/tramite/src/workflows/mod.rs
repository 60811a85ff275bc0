//! Case-file routing and archival lifecycle.
//!
//! `offices` owns capacity accounting, `routing` drives case files between offices and
//! keeps the movement audit trail, and `archival` manages retention of finished documents.
//! All three talk to storage through the traits in `store`.

pub mod actor;
pub mod archival;
pub mod clock;
pub mod error;
pub(crate) mod locks;
pub mod offices;
pub mod routing;
pub mod store;

pub use actor::UserId;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CapacityRejection, EntityKind, LifecycleError};
