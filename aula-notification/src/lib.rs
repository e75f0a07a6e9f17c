use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod events;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod surface;

use config::AppConfig;
use services::NotificationService;

pub struct ApiState {
    pub service: NotificationService,
    pub config: AppConfig,
}

impl ApiState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            service: NotificationService::new(),
            config,
        }
    }
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/notifications", get(routes::notifications::list_notifications))
        .route("/notifications/unread-count", get(routes::notifications::unread_count))
        .route("/notifications/read-all", post(routes::notifications::mark_all_read))
        .route("/notifications/stream", get(routes::stream::notification_stream))
        .route("/notifications/:id/read", post(routes::notifications::mark_read))
        .route("/notifications/:id", delete(routes::notifications::delete_notification))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
