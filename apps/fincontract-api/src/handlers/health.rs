use crate::AppState;
use crate::utils::current_version;
use axum::{extract::State, Json};
use serde_json::{json, Value};

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": current_version(),
        "demo_mode": state.config.demo_mode,
    }))
}
