//! Error taxonomy / 错误类型
//!
//! Rebuild failures are surfaced to the caller, search failures are reported
//! without touching any published index generation.

use std::path::PathBuf;

use crate::search::schema::Language;

/// Dictionary error / 词典错误
#[derive(Debug, thiserror::Error)]
pub enum DictError {
    /// Source text file for an enabled language does not exist / 文本文件不存在
    #[error("source file for language `{language}` not found: {}", .path.display())]
    SourceMissing { language: Language, path: PathBuf },

    /// Text key unknown in every table / 文本ID不存在
    #[error("unknown text key: {0}")]
    UnknownKey(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("a rebuild is already running")]
    RebuildInProgress,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Background task panicked or was cancelled / 后台任务失败
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for DictError {
    fn from(e: tokio::task::JoinError) -> Self {
        DictError::Task(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DictError>;
