// libs/schedule-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn schedule_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/doctors/{doctor_id}/slots", get(handlers::get_available_slots))
        .route("/doctors/{doctor_id}", get(handlers::get_schedule))
        .route("/doctors/{doctor_id}", delete(handlers::delete_schedule))
        .route("/doctors/{doctor_id}/windows/{weekday}", put(handlers::upsert_windows))
        .route("/doctors/{doctor_id}/slot-duration", patch(handlers::set_slot_duration))
        .route("/doctors/{doctor_id}/holidays", get(handlers::list_holidays))
        .route("/doctors/{doctor_id}/holidays", post(handlers::add_holiday))
        .route("/holidays/{holiday_id}", delete(handlers::remove_holiday))
        .route("/doctors/{doctor_id}/blocked-ranges", post(handlers::add_blocked_range))
        .route("/blocked-ranges/{range_id}", delete(handlers::remove_blocked_range))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
