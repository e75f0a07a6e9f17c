use axum::Json;
use aula_shared::types::api::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("aula-notification", env!("CARGO_PKG_VERSION")))
}
