/// Health check endpoint
///
/// Provides a simple health check endpoint that verifies:
/// - The server is running
/// - Storage connectivity (PostgreSQL backend only)
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "storage": "connected"
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use reviewrota_shared::db::pool;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Storage status: "connected", "disconnected" or "memory"
    pub storage: String,
}

/// Health check handler
///
/// Returns service health status including database connectivity. The
/// in-memory backend is always reported healthy.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let storage_status = match &state.db {
        Some(db) => match pool::health_check(db).await {
            Ok(()) => "connected",
            Err(_) => "disconnected",
        },
        None => "memory",
    };

    Ok(Json(HealthResponse {
        status: if storage_status == "disconnected" {
            "degraded".to_string()
        } else {
            "healthy".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: storage_status.to_string(),
    }))
}
