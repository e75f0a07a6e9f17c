use std::sync::Arc;

use axum::routing::get;

use aula_notification::config::AppConfig;
use aula_notification::{events, router, ApiState};
use aula_shared::clients::rabbitmq::RabbitMQClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aula_shared::middleware::init_tracing("aula-notification");

    let config = AppConfig::load()?;
    let port = config.port;

    // Set JWT_SECRET env var for the auth extractor middleware
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let metrics_handle = aula_shared::middleware::init_metrics();

    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;

    let state = Arc::new(ApiState::new(config));

    // Spawn course event subscriber (assignments, announcements)
    let course_rabbitmq = rabbitmq.clone();
    let course_service = state.service.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_course_events(course_rabbitmq, course_service).await {
            tracing::error!(error = %e, "course event subscriber failed");
        }
    });

    // Spawn grade event subscriber
    let grade_rabbitmq = rabbitmq.clone();
    let grade_service = state.service.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_grade_events(grade_rabbitmq, grade_service).await {
            tracing::error!(error = %e, "grade event subscriber failed");
        }
    });

    // Spawn system notice subscriber
    let system_rabbitmq = rabbitmq.clone();
    let system_service = state.service.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_system_events(system_rabbitmq, system_service).await {
            tracing::error!(error = %e, "system event subscriber failed");
        }
    });

    let app = router(state)
        .route("/metrics", get(move || async move { metrics_handle.render() }))
        .layer(axum::middleware::from_fn(
            aula_shared::middleware::metrics_middleware,
        ));

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "aula-notification starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
