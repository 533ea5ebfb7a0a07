use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_status = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::warn!(error = %e, "Health check database probe failed");
            "unhealthy"
        }
    };

    let status = if db_status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ok" } else { "error" },
            "database": db_status,
            "service": env!("CARGO_PKG_NAME"),
        })),
    )
}
