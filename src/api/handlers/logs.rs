//! Buffered log lines

use axum::extract::State;
use axum::Json;

use crate::api::server::AppState;
use crate::models::LogEntry;

/// Current contents of the log ring buffer, oldest first
pub async fn list_logs(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.hub.recent_logs())
}
