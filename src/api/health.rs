use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use tracing::error;

use super::{response::ApiResult, AppState};

pub async fn health_check(State(state): State<AppState>) -> ApiResult {
    sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .map_err(|err| {
            error!("Health check failed: {}", err);
            StatusCode::SERVICE_UNAVAILABLE
        })?;

    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
