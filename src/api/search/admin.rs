use axum::{extract::State, Json};
use std::sync::Arc;

use sc_cn_dict::RebuildProgress;

use super::types::*;
use crate::api::{error_response, ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/languages - 语言与索引统计
pub async fn list_languages(State(state): State<Arc<AppState>>) -> Json<ApiResponse<LanguagesResponse>> {
    let engine = state.engine();
    let langs = &engine.config().languages;

    Json(ApiResponse::success(LanguagesResponse {
        primary: langs.primary.clone(),
        secondary: langs.secondary.clone(),
        auxiliary: langs.enable_auxiliary.then(|| langs.auxiliary.clone()),
        enabled: engine.languages(),
        tables: engine.table_stats(),
    }))
}

/// POST /api/rebuild - 后台重建索引
pub async fn rebuild(State(state): State<Arc<AppState>>) -> ApiResult<RebuildProgress> {
    state.runner.start_rebuild().map_err(|e| error_response(&e))?;
    tracing::info!("Rebuild requested");
    Ok(Json(ApiResponse::success(state.runner.progress())))
}

/// GET /api/rebuild/status - 重建进度
pub async fn rebuild_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<RebuildProgress>> {
    Json(ApiResponse::success(state.runner.progress()))
}
