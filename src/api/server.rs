use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::api::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthInfo {
    pub status: &'static str,
    pub version: &'static str,
    pub build_time: &'static str,
    pub started_at: i64,
    /// Entries across all tables / 已索引条目数
    pub entries: usize,
    pub rebuilding: bool,
}

/// GET /api/health - 健康检查
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthInfo>> {
    let entries = state
        .engine()
        .table_stats()
        .iter()
        .map(|s| s.entry_count)
        .sum();

    Json(ApiResponse::success(HealthInfo {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        build_time: env!("BUILD_TIME"),
        started_at: state.started_at,
        entries,
        rebuilding: state.runner.is_rebuilding(),
    }))
}
