// libs/schedule-cell/src/services/template.rs
use std::collections::HashMap;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    ScheduleError, TemplateWindow, WeeklyTemplate, DEFAULT_SLOT_DURATION,
};
use crate::time::{to_minutes, Weekday};

pub struct ScheduleTemplateService {
    supabase: SupabaseClient,
}

impl ScheduleTemplateService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_template(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<WeeklyTemplate, ScheduleError> {
        debug!("Fetching weekly template for doctor: {}", doctor_id);

        let path = format!("/rest/v1/weekly_templates?doctor_id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let row = result
            .into_iter()
            .next()
            .ok_or(ScheduleError::TemplateNotFound)?;

        serde_json::from_value(row)
            .map_err(|e| ScheduleError::Database(format!("Failed to parse template: {}", e)))
    }

    /// Replace the window list for one weekday, creating the template row on
    /// first save.
    pub async fn upsert_windows(
        &self,
        doctor_id: Uuid,
        weekday: Weekday,
        windows: Vec<TemplateWindow>,
        auth_token: &str,
    ) -> Result<WeeklyTemplate, ScheduleError> {
        debug!(
            "Replacing {} windows for doctor {} ({} entries)",
            weekday,
            doctor_id,
            windows.len()
        );

        for window in &windows {
            let from = to_minutes(&window.from)?;
            let to = to_minutes(&window.to)?;
            if from >= to {
                return Err(ScheduleError::Validation(format!(
                    "Window {}-{} must start before it ends",
                    window.from, window.to
                )));
            }
        }

        match self.get_template(doctor_id, auth_token).await {
            Ok(mut template) => {
                template.windows.insert(weekday, windows);

                let path = format!("/rest/v1/weekly_templates?doctor_id=eq.{}", doctor_id);
                let body = json!({
                    "windows": template.windows,
                    "updated_at": Utc::now().to_rfc3339()
                });

                let result: Vec<Value> = self
                    .supabase
                    .write(Method::PATCH, &path, Some(auth_token), body)
                    .await?;
                Self::parse_row(result)
            }
            Err(ScheduleError::TemplateNotFound) => {
                let mut window_map = HashMap::new();
                window_map.insert(weekday, windows);

                let body = json!({
                    "doctor_id": doctor_id,
                    "slot_duration": DEFAULT_SLOT_DURATION,
                    "windows": window_map,
                    "created_at": Utc::now().to_rfc3339(),
                    "updated_at": Utc::now().to_rfc3339()
                });

                let result: Vec<Value> = self
                    .supabase
                    .write(Method::POST, "/rest/v1/weekly_templates", Some(auth_token), body)
                    .await?;
                Self::parse_row(result)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn set_slot_duration(
        &self,
        doctor_id: Uuid,
        minutes: i32,
        auth_token: &str,
    ) -> Result<WeeklyTemplate, ScheduleError> {
        if minutes <= 0 {
            return Err(ScheduleError::Validation(
                "Slot duration must be a positive number of minutes".to_string(),
            ));
        }

        let path = format!("/rest/v1/weekly_templates?doctor_id=eq.{}", doctor_id);
        let body = json!({
            "slot_duration": minutes,
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self
            .supabase
            .write(Method::PATCH, &path, Some(auth_token), body)
            .await?;

        if result.is_empty() {
            return Err(ScheduleError::TemplateNotFound);
        }
        Self::parse_row(result)
    }

    /// Explicit schedule-delete: removes the whole template.
    pub async fn delete_template(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ScheduleError> {
        debug!("Deleting weekly template for doctor: {}", doctor_id);

        let path = format!("/rest/v1/weekly_templates?doctor_id=eq.{}", doctor_id);
        self.supabase
            .execute(Method::DELETE, &path, Some(auth_token))
            .await?;

        Ok(())
    }

    fn parse_row(result: Vec<Value>) -> Result<WeeklyTemplate, ScheduleError> {
        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::Database("Write returned no rows".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| ScheduleError::Database(format!("Failed to parse template: {}", e)))
    }
}
