use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for offices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfficeId(pub String);

impl OfficeId {
    pub fn generate() -> Self {
        Self(format!("ofi-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for OfficeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attention priority of an office, lowest first so `Ord` follows urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OfficePriority {
    #[serde(rename = "BAJA")]
    Low,
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "ALTA")]
    High,
    #[serde(rename = "CRITICA")]
    Critical,
}

impl OfficePriority {
    pub const fn label(self) -> &'static str {
        match self {
            OfficePriority::Low => "BAJA",
            OfficePriority::Normal => "NORMAL",
            OfficePriority::High => "ALTA",
            OfficePriority::Critical => "CRITICA",
        }
    }
}

/// Organizational unit able to receive case files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Office {
    pub id: OfficeId,
    pub name: String,
    pub office_type: String,
    pub max_capacity: u32,
    pub active_case_files: u32,
    /// Average processing time in days.
    pub average_processing_days: f64,
    pub priority: OfficePriority,
    pub is_active: bool,
}

impl Office {
    pub fn available_slots(&self) -> u32 {
        self.max_capacity.saturating_sub(self.active_case_files)
    }

    pub fn is_full(&self) -> bool {
        self.active_case_files >= self.max_capacity
    }

    /// Fraction of capacity in use, in `[0, 1]`.
    pub fn load_ratio(&self) -> f64 {
        if self.max_capacity == 0 {
            return 1.0;
        }
        f64::from(self.active_case_files) / f64::from(self.max_capacity)
    }

    pub fn can_receive(&self) -> bool {
        self.is_active && !self.is_full()
    }
}

/// Payload used to register an office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOffice {
    pub name: String,
    pub office_type: String,
    pub max_capacity: u32,
    #[serde(default)]
    pub average_processing_days: f64,
    #[serde(default = "default_priority")]
    pub priority: OfficePriority,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_priority() -> OfficePriority {
    OfficePriority::Normal
}

fn default_active() -> bool {
    true
}

/// Partial update of office attributes. Occupancy is absent: it only moves
/// through slot reservations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfficeUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub office_type: Option<String>,
    #[serde(default)]
    pub max_capacity: Option<u32>,
    #[serde(default)]
    pub average_processing_days: Option<f64>,
    #[serde(default)]
    pub priority: Option<OfficePriority>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Serializable summary exposed by the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct OfficeView {
    pub id: OfficeId,
    pub name: String,
    pub office_type: String,
    pub priority: OfficePriority,
    pub is_active: bool,
    pub max_capacity: u32,
    pub active_case_files: u32,
    pub available_slots: u32,
    pub load_ratio: f64,
    pub average_processing_days: f64,
}

impl From<&Office> for OfficeView {
    fn from(office: &Office) -> Self {
        Self {
            id: office.id.clone(),
            name: office.name.clone(),
            office_type: office.office_type.clone(),
            priority: office.priority,
            is_active: office.is_active,
            max_capacity: office.max_capacity,
            active_case_files: office.active_case_files,
            available_slots: office.available_slots(),
            load_ratio: office.load_ratio(),
            average_processing_days: office.average_processing_days,
        }
    }
}
