//! Office directory with capacity, priority, and activity state.

pub mod domain;
pub mod registry;
pub mod router;

#[cfg(test)]
mod tests;

pub use domain::{NewOffice, Office, OfficeId, OfficePriority, OfficeUpdate, OfficeView};
pub use registry::OfficeRegistry;
pub use router::office_router;
