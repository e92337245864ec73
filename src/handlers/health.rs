use axum::{extract::State, Json};
use chrono::Utc;
use sea_orm::{ConnectionTrait, Statement};
use serde_json::{json, Value};

use crate::AppState;

/// Liveness/readiness probe. Reports the database round-trip alongside the
/// process status.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let db_ok = state
        .db
        .execute(Statement::from_string(
            state.db.get_database_backend(),
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "database": db_ok,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
