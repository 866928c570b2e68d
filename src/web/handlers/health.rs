use axum::{response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub time: DateTime<Utc>,
}

/// Liveness probe
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        time: Utc::now(),
    })
}
