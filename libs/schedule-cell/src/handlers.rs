// libs/schedule-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AddBlockedRangeRequest, AddHolidayRequest, ScheduleError, SetSlotDurationRequest, SlotQuery,
    UpsertWindowsRequest,
};
use crate::services::exceptions::ExceptionService;
use crate::services::slots::SlotGeneratorService;
use crate::services::template::ScheduleTemplateService;
use crate::time::Weekday;

fn map_schedule_error(e: ScheduleError) -> AppError {
    match e {
        ScheduleError::TemplateNotFound => AppError::NotFound("Doctor schedule not found".to_string()),
        ScheduleError::BranchNotServed(branch) => {
            AppError::NotFound(format!("Doctor does not serve the {} branch", branch))
        }
        ScheduleError::Validation(msg) => AppError::ValidationError(msg),
        ScheduleError::Database(msg) => AppError::Database(msg),
    }
}

fn ensure_can_manage_schedule(doctor_id: Uuid, user: &User) -> Result<(), AppError> {
    let is_owner = user.is_doctor() && user.id == doctor_id.to_string();
    if is_owner || user.is_staff() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Not authorized to manage this doctor's schedule".to_string(),
        ))
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError(format!("Invalid date '{}': expected YYYY-MM-DD", raw)))
}

// ==============================================================================
// SLOT QUERY
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let date = parse_date(&query.date)?;

    let generator = SlotGeneratorService::new(&state);

    let slots = generator
        .generate_slots(doctor_id, date, query.branch, token)
        .await
        .map_err(map_schedule_error)?;

    let on_holiday = slots.is_empty()
        && generator
            .is_holiday(doctor_id, date, token)
            .await
            .map_err(map_schedule_error)?;

    let mut response = json!({
        "date": date,
        "branch": query.branch,
        "slots": slots,
    });

    if on_holiday {
        response["message"] = json!("Doctor is on holiday on this date");
    }

    Ok(Json(response))
}

// ==============================================================================
// WEEKLY TEMPLATE MANAGEMENT
// ==============================================================================

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleTemplateService::new(&state);

    let template = service
        .get_template(doctor_id, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({ "schedule": template })))
}

#[axum::debug_handler]
pub async fn upsert_windows(
    State(state): State<Arc<AppConfig>>,
    Path((doctor_id, weekday)): Path<(Uuid, Weekday)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpsertWindowsRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_can_manage_schedule(doctor_id, &user)?;

    let service = ScheduleTemplateService::new(&state);

    let template = service
        .upsert_windows(doctor_id, weekday, request.windows, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "schedule": template,
    })))
}

#[axum::debug_handler]
pub async fn set_slot_duration(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SetSlotDurationRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_can_manage_schedule(doctor_id, &user)?;

    let service = ScheduleTemplateService::new(&state);

    let template = service
        .set_slot_duration(doctor_id, request.slot_duration, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "schedule": template,
    })))
}

#[axum::debug_handler]
pub async fn delete_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    ensure_can_manage_schedule(doctor_id, &user)?;

    let service = ScheduleTemplateService::new(&state);

    service
        .delete_template(doctor_id, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Schedule deleted",
    })))
}

// ==============================================================================
// EXCEPTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn add_holiday(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AddHolidayRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_can_manage_schedule(doctor_id, &user)?;

    let service = ExceptionService::new(&state);

    let holiday = service
        .add_holiday(doctor_id, request, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "holiday": holiday,
    })))
}

#[axum::debug_handler]
pub async fn list_holidays(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ExceptionService::new(&state);

    let holidays = service
        .holidays_for(doctor_id, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({ "holidays": holidays })))
}

#[axum::debug_handler]
pub async fn remove_holiday(
    State(state): State<Arc<AppConfig>>,
    Path(holiday_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() && !user.is_staff() {
        return Err(AppError::Forbidden(
            "Not authorized to manage schedules".to_string(),
        ));
    }

    let service = ExceptionService::new(&state);

    service
        .remove_holiday(holiday_id, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Holiday removed",
    })))
}

#[axum::debug_handler]
pub async fn add_blocked_range(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AddBlockedRangeRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_can_manage_schedule(doctor_id, &user)?;

    let service = ExceptionService::new(&state);

    let blocked_range = service
        .add_blocked_range(doctor_id, request, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "blocked_range": blocked_range,
    })))
}

#[axum::debug_handler]
pub async fn remove_blocked_range(
    State(state): State<Arc<AppConfig>>,
    Path(range_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() && !user.is_staff() {
        return Err(AppError::Forbidden(
            "Not authorized to manage schedules".to_string(),
        ));
    }

    let service = ExceptionService::new(&state);

    service
        .remove_blocked_range(range_id, auth.token())
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Blocked range removed",
    })))
}
