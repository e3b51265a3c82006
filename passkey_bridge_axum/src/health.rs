use axum::Json;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct HealthStatus {
    status: &'static str,
    timestamp: String,
}

pub(crate) async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "OK",
        timestamp: Utc::now().to_rfc3339(),
    })
}
