use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use sc_cn_dict::{DictError, SearchQuery};

use super::types::*;
use crate::api::{error_response, ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /api/search - 搜索
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<SearchResponse> {
    let engine = state.engine();
    let search_config = &state.config().search;

    let mut query = SearchQuery::new(req.keyword.clone())
        .with_limit(resolve_limit(req.limit.as_ref(), search_config))
        .with_languages(engine.languages_for(req.mode, req.include_auxiliary))
        .with_auxiliary(req.include_auxiliary)
        .fuzzy(req.fuzzy);
    if !req.include_long_text {
        query = query.with_max_raw_length(search_config.long_text_length);
    }

    let mut outcome = state
        .runner
        .search(query)
        .await
        .map_err(|e| error_response(&e))?;

    let results: Vec<SearchResultItem> = outcome
        .keys
        .iter()
        .map(|key| SearchResultItem {
            key: key.clone(),
            texts: outcome.results.remove(key).unwrap_or_default(),
        })
        .collect();

    Ok(Json(ApiResponse::success(SearchResponse {
        keyword: req.keyword,
        total: results.len(),
        results,
    })))
}

/// GET /api/text/:key - 获取完整文本
pub async fn get_text(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<TextResponse> {
    let texts = state.engine().get_full_text(&key);
    if texts.is_empty() {
        return Err(error_response(&DictError::UnknownKey(key)));
    }
    Ok(Json(ApiResponse::success(TextResponse { key, texts })))
}
