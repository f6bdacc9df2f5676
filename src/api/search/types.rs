use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use sc_cn_dict::config::SearchConfig;
use sc_cn_dict::search::TableStats;
use sc_cn_dict::{Language, SearchMode};

/// POST /api/search request body
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub keyword: String,
    /// Number or numeric string, anything else falls back to the default
    #[serde(default)]
    pub limit: Option<Value>,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default)]
    pub include_auxiliary: bool,
    #[serde(default = "default_true")]
    pub include_long_text: bool,
    #[serde(default)]
    pub fuzzy: bool,
}

fn default_true() -> bool {
    true
}

/// Effective limit: invalid or negative falls back to the default, capped at `max_limit` / 解析数量限制
pub fn resolve_limit(raw: Option<&Value>, search: &SearchConfig) -> usize {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let limit = match parsed {
        Some(n) if n >= 0 => n as usize,
        _ => search.default_limit,
    };
    limit.min(search.max_limit)
}

#[derive(Debug, Serialize)]
pub struct SearchResultItem {
    pub key: String,
    /// language -> highlighted snippet
    pub texts: BTreeMap<Language, String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub keyword: String,
    pub total: usize,
    pub results: Vec<SearchResultItem>,
}

#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub key: String,
    pub texts: BTreeMap<Language, String>,
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub primary: Language,
    pub secondary: Language,
    pub auxiliary: Option<Language>,
    pub enabled: Vec<Language>,
    pub tables: Vec<TableStats>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_limit() {
        let search = SearchConfig::default();
        assert_eq!(resolve_limit(None, &search), 100);
        assert_eq!(resolve_limit(Some(&json!(20)), &search), 20);
        assert_eq!(resolve_limit(Some(&json!("30")), &search), 30);
        assert_eq!(resolve_limit(Some(&json!(-1)), &search), 100);
        assert_eq!(resolve_limit(Some(&json!("abc")), &search), 100);
        assert_eq!(resolve_limit(Some(&json!(2.5)), &search), 100);
        assert_eq!(resolve_limit(Some(&json!(0)), &search), 0);
        assert_eq!(resolve_limit(Some(&json!(5_000_000)), &search), 1_000_000);
    }

    #[test]
    fn test_request_defaults() {
        let req: SearchRequest = serde_json::from_value(json!({"keyword": "x"})).unwrap();
        assert_eq!(req.mode, SearchMode::Both);
        assert!(req.include_long_text);
        assert!(!req.fuzzy);
    }
}
