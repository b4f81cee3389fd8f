use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use police_core::config::TransportMode;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    transport: TransportMode,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub transport: &'static str,
    pub checked_at: String,
}

pub fn router(transport: TransportMode) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { transport })
}

/// Socket mode has no webhook listener, so health gets one of its own.
pub async fn spawn(bind_address: &str, port: u16, transport: TransportMode) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(transport)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: env!("CARGO_PKG_NAME"),
        transport: state.transport.as_str(),
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
