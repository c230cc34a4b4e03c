// libs/appointment-cell/src/services/booking.rs
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::models::AppointmentEvent;
use notification_cell::services::relay::NotificationRelay;
use schedule_cell::models::Branch;
use schedule_cell::services::exceptions::ExceptionService;
use schedule_cell::services::slots::SlotGeneratorService;
use schedule_cell::time::{overlaps, to_minutes};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest,
    CancelAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct AppointmentBookingService {
    supabase: SupabaseClient,
    slot_generator: SlotGeneratorService,
    exception_service: ExceptionService,
    lifecycle_service: AppointmentLifecycleService,
    relay: NotificationRelay,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig, relay: NotificationRelay) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            slot_generator: SlotGeneratorService::new(config),
            exception_service: ExceptionService::new(config),
            lifecycle_service: AppointmentLifecycleService::new(),
            relay,
        }
    }

    /// Book an appointment. Patients create their own as Pending; staff and
    /// doctors create on behalf of a patient directly as Confirmed.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking appointment with doctor {} on {} at {}",
            request.doctor_id, request.appointment_date, request.appointment_time
        );

        let actor_id = parse_actor_id(actor)?;

        // **Step 1: Resolve the patient and initial status from the actor**
        let staff_booking = actor.is_staff() || actor.is_doctor();
        let patient_id = if staff_booking {
            request.patient_id.ok_or_else(|| {
                AppointmentError::ValidationError(
                    "patient_id is required when booking on behalf of a patient".to_string(),
                )
            })?
        } else {
            match request.patient_id {
                Some(patient_id) if patient_id != actor_id => {
                    return Err(AppointmentError::Unauthorized);
                }
                _ => actor_id,
            }
        };

        let (status, confirmed_by) = if staff_booking {
            (AppointmentStatus::Confirmed, Some(actor_id))
        } else {
            (AppointmentStatus::Pending, None)
        };

        // **Step 2: The requested time must be a generated, unblocked slot**
        self.ensure_time_available(
            request.doctor_id,
            request.appointment_date,
            &request.appointment_time,
            request.branch,
            None,
            auth_token,
        )
        .await?;

        // **Step 3: Atomic insert. The partial unique index on
        // (doctor_id, appointment_date, appointment_time) over non-terminal
        // rows is the final defense against the check/insert race.**
        let body = json!({
            "patient_id": patient_id,
            "doctor_id": request.doctor_id,
            "appointment_date": request.appointment_date,
            "appointment_time": request.appointment_time,
            "branch": request.branch,
            "reason": request.reason,
            "status": status,
            "confirmed_by": confirmed_by,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self
            .supabase
            .write(Method::POST, "/rest/v1/appointments", Some(auth_token), body)
            .await?;

        let appointment = Self::parse_row(result)?;

        // **Step 4: Tell the two interested parties**
        self.notify(&appointment, actor_id).await;

        info!("Appointment {} booked as {}", appointment.id, appointment.status);
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let row = result.into_iter().next().ok_or(AppointmentError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    /// Update an appointment. A patch that moves the slot key re-validates
    /// availability against the new key (excluding this appointment's own
    /// row) and forces the status to Confirmed.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;
        let actor_id = ensure_actor_involved(actor, &current)?;

        if current.status.is_terminal() {
            return Err(AppointmentError::InvalidStatusTransition(current.status));
        }

        let mut update = Map::new();
        if let Some(reason) = &request.reason {
            update.insert("reason".to_string(), json!(reason));
        }

        let rescheduled = request.touches_slot_key();
        if rescheduled {
            let doctor_id = request.doctor_id.unwrap_or(current.doctor_id);
            let date = request.appointment_date.unwrap_or(current.appointment_date);
            let time = request
                .appointment_time
                .clone()
                .unwrap_or_else(|| current.appointment_time.clone());
            let branch = request.branch.unwrap_or(current.branch);

            self.ensure_time_available(doctor_id, date, &time, branch, Some(appointment_id), auth_token)
                .await?;

            update.insert("doctor_id".to_string(), json!(doctor_id));
            update.insert("appointment_date".to_string(), json!(date));
            update.insert("appointment_time".to_string(), json!(time));
            update.insert("branch".to_string(), json!(branch));
            // Any reschedule re-validates availability and re-confirms
            update.insert("status".to_string(), json!(AppointmentStatus::Confirmed));
            update.insert("confirmed_by".to_string(), json!(actor_id));
        }

        if update.is_empty() {
            return Ok(current);
        }
        update.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .write(Method::PATCH, &path, Some(auth_token), Value::Object(update))
            .await?;

        let appointment = Self::parse_row(result)?;

        if rescheduled {
            self.notify(&appointment, actor_id).await;
        }

        Ok(appointment)
    }

    /// Staff confirmation of a pending appointment.
    pub async fn confirm_appointment(
        &self,
        appointment_id: Uuid,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;
        let actor_id = ensure_actor_involved(actor, &current)?;

        self.lifecycle_service
            .validate_status_transition(&current.status, &AppointmentStatus::Confirmed)?;

        let appointment = self
            .patch_appointment(
                appointment_id,
                json!({
                    "status": AppointmentStatus::Confirmed,
                    "confirmed_by": actor_id,
                    "updated_at": Utc::now().to_rfc3339()
                }),
                auth_token,
            )
            .await?;

        self.notify(&appointment, actor_id).await;
        Ok(appointment)
    }

    /// Cancel a non-terminal appointment, recording who and why.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;
        let actor_id = ensure_actor_involved(actor, &current)?;

        if !self.lifecycle_service.can_cancel(&current.status) {
            warn!(
                "Cancellation rejected for appointment {} in status {}",
                appointment_id, current.status
            );
            return Err(AppointmentError::InvalidStatusTransition(current.status));
        }

        let appointment = self
            .patch_appointment(
                appointment_id,
                json!({
                    "status": AppointmentStatus::Cancelled,
                    "cancelled_by": actor_id,
                    "cancel_reason": request.reason,
                    "updated_at": Utc::now().to_rfc3339()
                }),
                auth_token,
            )
            .await?;

        self.notify(&appointment, actor_id).await;
        Ok(appointment)
    }

    /// Attach a prescription to a confirmed appointment. Required before the
    /// appointment can be completed.
    pub async fn attach_prescription(
        &self,
        appointment_id: Uuid,
        prescription_id: Uuid,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;
        ensure_actor_involved(actor, &current)?;

        if current.status != AppointmentStatus::Confirmed {
            return Err(AppointmentError::PreconditionFailed(
                "Prescriptions can only be attached to a confirmed appointment".to_string(),
            ));
        }

        self.patch_appointment(
            appointment_id,
            json!({
                "prescription_id": prescription_id,
                "updated_at": Utc::now().to_rfc3339()
            }),
            auth_token,
        )
        .await
    }

    /// Complete a confirmed appointment. Irreversible; demands a prescription.
    pub async fn complete_appointment(
        &self,
        appointment_id: Uuid,
        actor: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;
        let actor_id = ensure_actor_involved(actor, &current)?;

        self.lifecycle_service
            .validate_status_transition(&current.status, &AppointmentStatus::Completed)?;

        if current.prescription_id.is_none() {
            return Err(AppointmentError::PreconditionFailed(
                "A prescription must be attached before completing the appointment".to_string(),
            ));
        }

        let appointment = self
            .patch_appointment(
                appointment_id,
                json!({
                    "status": AppointmentStatus::Completed,
                    "updated_at": Utc::now().to_rfc3339()
                }),
                auth_token,
            )
            .await?;

        self.notify(&appointment, actor_id).await;
        Ok(appointment)
    }

    /// Administrative escape hatch: removes history rather than modeling a
    /// state. Not part of the normal lifecycle, so no event is emitted.
    pub async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        self.supabase
            .execute(Method::DELETE, &path, Some(auth_token))
            .await?;
        Ok(())
    }

    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=appointment_date.asc,appointment_time.asc",
            patient_id
        );
        self.fetch_appointments(&path, auth_token).await
    }

    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=appointment_date.asc,appointment_time.asc",
            doctor_id
        );
        if let Some(date) = date {
            path.push_str(&format!("&appointment_date=eq.{}", date));
        }
        self.fetch_appointments(&path, auth_token).await
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    /// Availability preconditions, first failure wins:
    /// (a) the time is a generated slot not suppressed by an exception;
    /// (b) no other non-terminal appointment holds the key (fast pre-check;
    ///     the unique index closes the remaining race).
    async fn ensure_time_available(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
        branch: Branch,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        to_minutes(time)?;

        let slots = self
            .slot_generator
            .generate_slots(doctor_id, date, branch, auth_token)
            .await?;

        let slot = slots
            .iter()
            .find(|slot| slot.from == time)
            .ok_or(AppointmentError::SlotNotAvailable)?;

        let start = to_minutes(&slot.from)?;
        let end = to_minutes(&slot.to)?;

        let blocked = self
            .exception_service
            .blocked_ranges_for(doctor_id, date, auth_token)
            .await?;
        for range in &blocked {
            if overlaps(start, end, to_minutes(&range.from_time)?, to_minutes(&range.to_time)?) {
                debug!("Requested time {} is blocked on {}", time, date);
                return Err(AppointmentError::SlotNotAvailable);
            }
        }

        let mut path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&appointment_time=eq.{}&status=in.(pending,confirmed)",
            doctor_id, date, time
        );
        if let Some(exclude_id) = exclude_appointment_id {
            path.push_str(&format!("&id=neq.{}", exclude_id));
        }

        let occupied: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if !occupied.is_empty() {
            warn!(
                "Conflict detected for doctor {} on {} at {}",
                doctor_id, date, time
            );
            return Err(AppointmentError::ConflictDetected);
        }

        Ok(())
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        body: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .write(Method::PATCH, &path, Some(auth_token), body)
            .await?;
        Self::parse_row(result)
    }

    async fn fetch_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await?;

        result
            .into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e))
                })
            })
            .collect()
    }

    async fn notify(&self, appointment: &Appointment, updated_by: Uuid) {
        let event = AppointmentEvent {
            appointment_id: appointment.id,
            new_status: appointment.status.to_string(),
            doctor_id: appointment.doctor_id,
            patient_id: appointment.patient_id,
            updated_by,
        };
        self.relay.publish(&event).await;
    }

    fn parse_row(result: Vec<Value>) -> Result<Appointment, AppointmentError> {
        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Write returned no rows".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }
}

fn parse_actor_id(actor: &User) -> Result<Uuid, AppointmentError> {
    Uuid::parse_str(&actor.id)
        .map_err(|_| AppointmentError::ValidationError("Invalid user ID format".to_string()))
}

/// The owning patient, the assigned doctor, and staff may act on an
/// appointment; anyone else is rejected.
fn ensure_actor_involved(actor: &User, appointment: &Appointment) -> Result<Uuid, AppointmentError> {
    let actor_id = parse_actor_id(actor)?;

    if actor.is_staff() {
        return Ok(actor_id);
    }
    if actor.is_doctor() && appointment.doctor_id == actor_id {
        return Ok(actor_id);
    }
    if !actor.is_doctor() && appointment.patient_id == actor_id {
        return Ok(actor_id);
    }

    Err(AppointmentError::Unauthorized)
}
