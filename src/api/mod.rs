pub mod search;
pub mod server;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use sc_cn_dict::DictError;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: StatusCode, message: &str) -> Self {
        Self {
            code: code.as_u16() as i32,
            message: message.to_string(),
            data: None,
        }
    }
}

/// Error half of every handler result / 错误响应
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Map an engine error to status and envelope / 错误转换为响应
pub fn error_response(err: &DictError) -> ApiError {
    let status = match err {
        DictError::UnknownKey(_) => StatusCode::NOT_FOUND,
        DictError::RebuildInProgress => StatusCode::CONFLICT,
        DictError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    }
    (status, Json(ApiResponse::error(status, &err.to_string())))
}

/// Build the HTTP router / 构建路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(server::health_check))
        .route("/api/languages", get(search::admin::list_languages))
        .route("/api/search", post(search::query::search))
        .route("/api/text/:key", get(search::query::get_text))
        .route("/api/rebuild", post(search::admin::rebuild))
        .route("/api/rebuild/status", get(search::admin::rebuild_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
