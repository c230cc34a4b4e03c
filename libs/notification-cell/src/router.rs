// libs/notification-cell/src/router.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, NotificationState};
use crate::services::presence::PresenceDirectory;

pub fn notification_routes(config: Arc<AppConfig>, presence: PresenceDirectory) -> Router {
    let protected_routes = Router::new()
        .route("/ws", get(handlers::appointment_events_ws))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(NotificationState { presence })
}
