//! Health check 핸들러

use axum::Json;
use serde_json::{json, Value};

/// Health check
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
