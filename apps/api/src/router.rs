use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use notification_cell::router::notification_routes;
use notification_cell::services::presence::PresenceDirectory;
use notification_cell::services::relay::NotificationRelay;
use schedule_cell::router::schedule_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    // One presence directory per process; the relay and the websocket
    // endpoint share it.
    let presence = PresenceDirectory::new();
    let relay = NotificationRelay::new(presence.clone());

    Router::new()
        .route("/", get(|| async { "Arogya Clinic API is running!" }))
        .nest("/schedule", schedule_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone(), relay))
        .nest("/notifications", notification_routes(state, presence))
}
