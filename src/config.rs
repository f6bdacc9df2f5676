//! Application configuration module / 应用配置模块
//!
//! Configuration is loaded from config.json and passed explicitly to the engine.
//! Creates default config file on first run / 首次运行时创建默认配置文件

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DictError, Result};
use crate::search::schema::Language;

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Data file locations / 数据文件位置
    pub data: DataConfig,
    /// Enabled languages / 启用的语言
    pub languages: LanguageConfig,
    /// Search tuning / 搜索配置
    pub search: SearchConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Data configuration / 数据配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// Source text directory (relative to data_dir) / 文本文件目录
    pub text_dir: String,
    /// Index database file (relative to data_dir) / 索引数据库文件
    pub db_file: String,
}

/// Language configuration / 语言配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Primary language, always enabled / 主语言
    pub primary: Language,
    /// Secondary language, always enabled / 第二语言
    pub secondary: Language,
    /// Auxiliary dataset (community translation) / 辅助语言（社区汉化）
    pub auxiliary: Language,
    /// Whether the auxiliary table is built and searchable / 是否启用辅助语言
    pub enable_auxiliary: bool,
}

/// Search configuration / 搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Default result limit / 默认搜索数量限制
    pub default_limit: usize,
    /// Upper bound accepted from callers / 搜索数量上限
    pub max_limit: usize,
    /// Minimum partial-ratio similarity for fuzzy hits / 模糊搜索阈值
    pub fuzzy_threshold: f64,
    /// Snippet budget for non-CJK text, halved for CJK / 摘要长度
    pub snippet_length: usize,
    /// Texts at least this long count as long text / 长文本阈值
    pub long_text_length: usize,
    /// Emphasis tags / 高亮标签
    pub highlight_pre: String,
    pub highlight_post: String,
    /// Truncation marker / 省略号
    pub ellipsis: String,
    /// Rebuild on startup when the persisted index is empty / 启动时索引为空则重建
    pub auto_rebuild_on_start: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8190,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            text_dir: "text_files".to_string(),
            db_file: "dict.db".to_string(),
        }
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            primary: Language::new("cn"),
            secondary: Language::new("en"),
            auxiliary: Language::new("rsui"),
            enable_auxiliary: false,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 1_000_000,
            fuzzy_threshold: 0.6,
            snippet_length: 100,
            long_text_length: 100,
            highlight_pre: "<b>".to_string(),
            highlight_post: "</b>".to_string(),
            ellipsis: "...".to_string(),
            auto_rebuild_on_start: true,
        }
    }
}

impl LanguageConfig {
    /// Primary and secondary languages / 核心语言
    pub fn core(&self) -> [Language; 2] {
        [self.primary.clone(), self.secondary.clone()]
    }

    /// All languages with a table, primary first / 所有启用的语言
    pub fn enabled(&self) -> Vec<Language> {
        let mut langs = self.core().to_vec();
        if self.enable_auxiliary {
            langs.push(self.auxiliary.clone());
        }
        langs
    }
}

impl AppConfig {
    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.data_dir)
    }

    /// Get the source text directory / 获取文本文件目录
    pub fn get_text_dir(&self) -> PathBuf {
        self.get_data_dir().join(&self.data.text_dir)
    }

    /// Get the source file of a language (`<lang>.ini`) / 获取语言对应的文本文件
    pub fn get_source_path(&self, language: &Language) -> PathBuf {
        self.get_text_dir().join(format!("{}.ini", language))
    }

    /// Get the index database path / 获取索引数据库路径
    pub fn get_db_path(&self) -> PathBuf {
        self.get_data_dir().join(&self.data.db_file)
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Check values that would break the engine / 校验配置
    pub fn validate(&self) -> Result<()> {
        let langs = [
            &self.languages.primary,
            &self.languages.secondary,
            &self.languages.auxiliary,
        ];
        for lang in langs {
            if !lang.is_valid() {
                return Err(DictError::Config(format!(
                    "language code `{}` must match [a-z0-9_]+",
                    lang
                )));
            }
        }
        if self.languages.primary == self.languages.secondary
            || self.languages.auxiliary == self.languages.primary
            || self.languages.auxiliary == self.languages.secondary
        {
            return Err(DictError::Config("language codes must be distinct".to_string()));
        }
        if !(0.0..=1.0).contains(&self.search.fuzzy_threshold) {
            return Err(DictError::Config(format!(
                "fuzzy_threshold {} outside [0, 1]",
                self.search.fuzzy_threshold
            )));
        }
        if self.search.snippet_length < 2 {
            return Err(DictError::Config("snippet_length must be at least 2".to_string()));
        }
        Ok(())
    }
}

/// Get the default config file path / 获取配置文件路径
pub fn default_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config(config_path: &Path) -> Result<AppConfig> {
    let config = if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| DictError::Config(format!("Failed to read config file: {}", e)))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| DictError::Config(format!("Failed to parse config file: {}", e)))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        config
    } else {
        let config = AppConfig::default();
        save_config(&config, config_path)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        config
    };

    config.validate()?;
    Ok(config)
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config: &AppConfig, config_path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| DictError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(config_path, content)?;
    Ok(())
}
