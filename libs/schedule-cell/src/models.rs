// libs/schedule-cell/src/models.rs
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::supabase::DbError;

use crate::time::Weekday;

// ==============================================================================
// SCHEDULE MODELS
// ==============================================================================

/// A physical clinic location a doctor may serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Hennur,
    Indiranagar,
    Koramangala,
    Jayanagar,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Hennur => write!(f, "hennur"),
            Branch::Indiranagar => write!(f, "indiranagar"),
            Branch::Koramangala => write!(f, "koramangala"),
            Branch::Jayanagar => write!(f, "jayanagar"),
        }
    }
}

/// One availability window inside a weekday. Times are "HH:MM" wall-clock
/// strings; windows on the same weekday may overlap (stored as given).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateWindow {
    pub branch: Branch,
    pub from: String,
    pub to: String,
}

pub const DEFAULT_SLOT_DURATION: i32 = 30;

/// Recurring per-weekday availability for one doctor, created lazily on the
/// first window save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyTemplate {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub slot_duration: i32,
    #[serde(default)]
    pub windows: HashMap<Weekday, Vec<TemplateWindow>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WeeklyTemplate {
    /// Whether any window on any weekday names this branch.
    pub fn serves_branch(&self, branch: Branch) -> bool {
        self.windows
            .values()
            .flatten()
            .any(|window| window.branch == branch)
    }

    pub fn windows_for(&self, weekday: Weekday, branch: Branch) -> Vec<&TemplateWindow> {
        self.windows
            .get(&weekday)
            .map(|windows| {
                windows
                    .iter()
                    .filter(|window| window.branch == branch)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A date on which a doctor takes no appointments at any branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holiday {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub holiday_date: NaiveDate,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A blocked "HH:MM" range on one date; suppresses any slot it overlaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedRange {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub blocked_date: NaiveDate,
    pub from_time: String,
    pub to_time: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Derived bookable interval; produced fresh on every query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub from: String,
    pub to: String,
    pub branch: Branch,
    pub booked: bool,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertWindowsRequest {
    pub windows: Vec<TemplateWindow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSlotDurationRequest {
    pub slot_duration: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddHolidayRequest {
    pub date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBlockedRangeRequest {
    pub date: NaiveDate,
    pub from: String,
    pub to: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: String,
    pub branch: Branch,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScheduleError {
    #[error("Doctor schedule not found")]
    TemplateNotFound,

    #[error("Doctor does not serve the {0} branch")]
    BranchNotServed(Branch),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DbError> for ScheduleError {
    fn from(e: DbError) -> Self {
        ScheduleError::Database(e.to_string())
    }
}
