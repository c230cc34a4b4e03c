// libs/notification-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The single event name carried on the live channel.
pub const APPOINTMENT_EVENT: &str = "appointment_update";

/// Payload emitted on every appointment lifecycle transition. Delivered to
/// the doctor's and patient's live connections only, never broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentEvent {
    pub appointment_id: Uuid,
    pub new_status: String,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub updated_by: Uuid,
}
