// libs/schedule-cell/src/services/slots.rs
use std::collections::HashSet;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Branch, ScheduleError, Slot};
use crate::services::exceptions::ExceptionService;
use crate::services::template::ScheduleTemplateService;
use crate::time::{overlaps, to_minutes, to_time_string, Weekday};

pub struct SlotGeneratorService {
    template_service: ScheduleTemplateService,
    exception_service: ExceptionService,
    supabase: SupabaseClient,
}

impl SlotGeneratorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            template_service: ScheduleTemplateService::new(config),
            exception_service: ExceptionService::new(config),
            supabase: SupabaseClient::new(config),
        }
    }

    /// Derive the bookable slots for one doctor/date/branch.
    ///
    /// Holidays win over everything; blocked ranges and existing non-terminal
    /// appointments mark slots booked rather than removing them. Windows are
    /// walked in stored order and a trailing partial slot is dropped, never
    /// truncated.
    pub async fn generate_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        branch: Branch,
        auth_token: &str,
    ) -> Result<Vec<Slot>, ScheduleError> {
        debug!(
            "Generating slots for doctor {} on {} at {}",
            doctor_id, date, branch
        );

        let template = self.template_service.get_template(doctor_id, auth_token).await?;

        if !template.serves_branch(branch) {
            return Err(ScheduleError::BranchNotServed(branch));
        }

        if self.exception_service.is_holiday(doctor_id, date, auth_token).await? {
            debug!("Doctor {} is on holiday on {}", doctor_id, date);
            return Ok(vec![]);
        }

        let weekday = Weekday::from_date(date);
        let windows = template.windows_for(weekday, branch);
        if windows.is_empty() {
            return Ok(vec![]);
        }

        let duration = u16::try_from(template.slot_duration)
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| {
                ScheduleError::Validation("Slot duration must be a positive number of minutes".to_string())
            })?;

        let blocked = self
            .exception_service
            .blocked_ranges_for(doctor_id, date, auth_token)
            .await?;
        let blocked_minutes: Vec<(u16, u16)> = blocked
            .iter()
            .map(|range| Ok((to_minutes(&range.from_time)?, to_minutes(&range.to_time)?)))
            .collect::<Result<_, ScheduleError>>()?;

        let booked_times = self.booked_times(doctor_id, date, auth_token).await?;

        let mut slots = Vec::new();
        for window in windows {
            let window_start = to_minutes(&window.from)?;
            let window_end = to_minutes(&window.to)?;

            let mut start = window_start;
            while start + duration <= window_end {
                let end = start + duration;
                let from = to_time_string(start);

                let booked = booked_times.contains(&from)
                    || blocked_minutes
                        .iter()
                        .any(|&(b_from, b_to)| overlaps(start, end, b_from, b_to));

                slots.push(Slot {
                    from,
                    to: to_time_string(end),
                    branch,
                    booked,
                });

                start = end;
            }
        }

        debug!("Generated {} slots ({} booked)", slots.len(), slots.iter().filter(|s| s.booked).count());
        Ok(slots)
    }

    pub async fn is_holiday(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<bool, ScheduleError> {
        self.exception_service.is_holiday(doctor_id, date, auth_token).await
    }

    /// Start times held by non-terminal appointments for this doctor/date.
    /// Occupancy ignores the branch: the ledger's uniqueness key does too,
    /// and a doctor cannot be in two branches at once.
    async fn booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<HashSet<String>, ScheduleError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&status=in.(pending,confirmed)&select=appointment_time",
            doctor_id, date
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(result
            .into_iter()
            .filter_map(|row| row["appointment_time"].as_str().map(str::to_string))
            .collect())
    }
}
