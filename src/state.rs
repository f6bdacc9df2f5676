use std::sync::Arc;

use sc_cn_dict::{AppConfig, DictEngine, TaskRunner};

/// Shared handler state / 应用状态
pub struct AppState {
    pub runner: Arc<TaskRunner>,
    /// Unix time the server started / 服务启动时间
    pub started_at: i64,
}

impl AppState {
    pub fn new(runner: Arc<TaskRunner>) -> Self {
        Self {
            runner,
            started_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn engine(&self) -> &DictEngine {
        self.runner.engine()
    }

    pub fn config(&self) -> &AppConfig {
        self.engine().config()
    }
}
