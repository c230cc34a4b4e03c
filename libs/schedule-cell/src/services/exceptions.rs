// libs/schedule-cell/src/services/exceptions.rs
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AddBlockedRangeRequest, AddHolidayRequest, BlockedRange, Holiday, ScheduleError};
use crate::time::to_minutes;

pub struct ExceptionService {
    supabase: SupabaseClient,
}

impl ExceptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn add_holiday(
        &self,
        doctor_id: Uuid,
        request: AddHolidayRequest,
        auth_token: &str,
    ) -> Result<Holiday, ScheduleError> {
        debug!("Adding holiday for doctor {} on {}", doctor_id, request.date);

        let body = json!({
            "doctor_id": doctor_id,
            "holiday_date": request.date,
            "reason": request.reason,
            "created_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self
            .supabase
            .write(Method::POST, "/rest/v1/holidays", Some(auth_token), body)
            .await?;

        Self::parse_row(result, "holiday")
    }

    pub async fn remove_holiday(
        &self,
        holiday_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ScheduleError> {
        let path = format!("/rest/v1/holidays?id=eq.{}", holiday_id);
        self.supabase
            .execute(Method::DELETE, &path, Some(auth_token))
            .await?;
        Ok(())
    }

    pub async fn add_blocked_range(
        &self,
        doctor_id: Uuid,
        request: AddBlockedRangeRequest,
        auth_token: &str,
    ) -> Result<BlockedRange, ScheduleError> {
        debug!(
            "Blocking {}-{} for doctor {} on {}",
            request.from, request.to, doctor_id, request.date
        );

        let from = to_minutes(&request.from)?;
        let to = to_minutes(&request.to)?;
        if from >= to {
            return Err(ScheduleError::Validation(format!(
                "Blocked range {}-{} must start before it ends",
                request.from, request.to
            )));
        }

        let body = json!({
            "doctor_id": doctor_id,
            "blocked_date": request.date,
            "from_time": request.from,
            "to_time": request.to,
            "reason": request.reason,
            "created_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self
            .supabase
            .write(Method::POST, "/rest/v1/blocked_ranges", Some(auth_token), body)
            .await?;

        Self::parse_row(result, "blocked range")
    }

    pub async fn remove_blocked_range(
        &self,
        range_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ScheduleError> {
        let path = format!("/rest/v1/blocked_ranges?id=eq.{}", range_id);
        self.supabase
            .execute(Method::DELETE, &path, Some(auth_token))
            .await?;
        Ok(())
    }

    /// A date present in the holiday list zeroes out every slot for that
    /// doctor regardless of branch.
    pub async fn is_holiday(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<bool, ScheduleError> {
        let path = format!(
            "/rest/v1/holidays?doctor_id=eq.{}&holiday_date=eq.{}",
            doctor_id, date
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(!result.is_empty())
    }

    pub async fn holidays_for(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Holiday>, ScheduleError> {
        let path = format!(
            "/rest/v1/holidays?doctor_id=eq.{}&order=holiday_date.asc",
            doctor_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        result
            .into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| ScheduleError::Database(format!("Failed to parse holiday: {}", e)))
            })
            .collect()
    }

    pub async fn blocked_ranges_for(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<BlockedRange>, ScheduleError> {
        let path = format!(
            "/rest/v1/blocked_ranges?doctor_id=eq.{}&blocked_date=eq.{}&order=from_time.asc",
            doctor_id, date
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        result
            .into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    ScheduleError::Database(format!("Failed to parse blocked range: {}", e))
                })
            })
            .collect()
    }

    fn parse_row<T: serde::de::DeserializeOwned>(
        result: Vec<Value>,
        what: &str,
    ) -> Result<T, ScheduleError> {
        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::Database(format!("Failed to create {}", what)))?;

        serde_json::from_value(row)
            .map_err(|e| ScheduleError::Database(format!("Failed to parse {}: {}", what, e)))
    }
}
