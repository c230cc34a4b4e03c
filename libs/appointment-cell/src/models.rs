// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use schedule_cell::models::{Branch, ScheduleError};
use shared_database::supabase::DbError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    /// "HH:MM" start time matching a generated slot's `from`.
    pub appointment_time: String,
    pub branch: Branch,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub confirmed_by: Option<Uuid>,
    pub prescription_id: Option<Uuid>,
    pub cancelled_by: Option<Uuid>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Non-terminal appointments hold their (doctor, date, time) key.
    pub fn occupies_slot(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    /// Staff bookings name the patient; patients book only for themselves.
    pub patient_id: Option<Uuid>,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub branch: Branch,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub doctor_id: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<String>,
    pub branch: Option<Branch>,
    pub reason: Option<String>,
}

impl UpdateAppointmentRequest {
    /// Whether the patch moves the appointment to a different slot key.
    pub fn touches_slot_key(&self) -> bool {
        self.doctor_id.is_some()
            || self.appointment_date.is_some()
            || self.appointment_time.is_some()
            || self.branch.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachPrescriptionRequest {
    pub prescription_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct DoctorAppointmentsQuery {
    pub date: Option<NaiveDate>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor schedule not found")]
    ScheduleNotFound,

    #[error("Doctor does not serve the requested branch")]
    BranchNotServed,

    #[error("Requested time is not an available slot")]
    SlotNotAvailable,

    #[error("Appointment conflicts with existing booking")]
    ConflictDetected,

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DbError> for AppointmentError {
    fn from(e: DbError) -> Self {
        match e {
            // The partial unique index on (doctor, date, time) reports as 409
            DbError::Conflict(_) => AppointmentError::ConflictDetected,
            DbError::NotFound(_) => AppointmentError::NotFound,
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ScheduleError> for AppointmentError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::TemplateNotFound => AppointmentError::ScheduleNotFound,
            ScheduleError::BranchNotServed(_) => AppointmentError::BranchNotServed,
            ScheduleError::Validation(msg) => AppointmentError::ValidationError(msg),
            ScheduleError::Database(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}
