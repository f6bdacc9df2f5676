//! Search types / 搜索相关类型定义

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Default number of ranked keys returned / 默认搜索数量限制
pub const DEFAULT_LIMIT: usize = 100;

/// Language code, e.g. `cn`, `en`, `rsui` / 语言代码
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Codes double as SQLite table suffixes, so only `[a-z0-9_]+` is accepted
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Language {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// One localized string / 单条文本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Stable text key / 文本ID
    pub key: String,
    /// Original text, untouched by search / 原始文本
    pub raw_text: String,
    /// Whitespace-joined tokens, computed at build time / 分词结果
    pub tokenized_text: String,
}

/// Search direction, the user-facing shortcut for the language set / 搜索模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Search both core languages / 双边搜索
    #[default]
    Both,
    /// Search the primary language only / 中->英
    PrimaryToSecondary,
    /// Search the secondary language only / 英->中
    SecondaryToPrimary,
}

/// Search query options / 搜索查询选项
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Search keyword as typed / 搜索关键词
    pub keyword: String,
    /// Maximum number of ranked keys / 最大返回结果数
    pub limit: usize,
    /// Tables to search, empty means the two core languages / 搜索的语言
    pub languages: BTreeSet<Language>,
    /// Show the auxiliary language in snippets / 结果包括辅助语言
    pub include_auxiliary: bool,
    /// Exclude texts whose length is at least this / 排除长文本
    pub max_raw_length: Option<usize>,
    /// Enable fuzzy full scan / 启用模糊搜索
    pub fuzzy: bool,
}

impl SearchQuery {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            limit: DEFAULT_LIMIT,
            languages: BTreeSet::new(),
            include_auxiliary: false,
            max_raw_length: None,
            fuzzy: false,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_languages<I, L>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Language>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_auxiliary(mut self, include: bool) -> Self {
        self.include_auxiliary = include;
        self
    }

    pub fn with_max_raw_length(mut self, max_raw_length: usize) -> Self {
        self.max_raw_length = Some(max_raw_length);
        self
    }

    pub fn fuzzy(mut self, enabled: bool) -> Self {
        self.fuzzy = enabled;
        self
    }
}

/// Ranked keys plus per-language snippets / 搜索结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// Keys sorted by ascending rank / 按相关性排序的文本ID
    pub keys: Vec<String>,
    /// key -> language -> highlighted snippet / 高亮片段
    pub results: HashMap<String, BTreeMap<Language, String>>,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Per-table statistics / 索引统计
#[derive(Debug, Clone, Serialize)]
pub struct TableStats {
    pub language: Language,
    pub entry_count: usize,
    pub token_count: usize,
    /// Number of published generations since startup / 已发布的索引代数
    pub generation: u64,
    /// Exact-match queries served / 查询次数
    pub query_count: u64,
    pub last_updated: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_validation() {
        assert!(Language::new("cn").is_valid());
        assert!(Language::new("zh_tw2").is_valid());
        assert!(!Language::new("").is_valid());
        assert!(!Language::new("EN").is_valid());
        assert!(!Language::new("en-us").is_valid());
    }

    #[test]
    fn test_query_defaults() {
        let query = SearchQuery::new("你好");
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert!(query.languages.is_empty());
        assert!(!query.fuzzy);
        assert!(query.max_raw_length.is_none());
    }

    #[test]
    fn test_query_builder_normalizes_languages() {
        let query = SearchQuery::new("x").with_languages(["en", "cn", "en"]);
        assert_eq!(query.languages.len(), 2);
        assert!(query.languages.contains(&Language::new("cn")));
    }
}
