//! Chinese tokenizer - uses jieba-rs for Chinese word segmentation / 中文分词器
//!
//! Supports / 支持：
//! - Chinese word segmentation (jieba, search mode) / 中文分词
//! - English words split on punctuation and lowercased / 英文分词
//! - Mixed text processing / 混合文本处理
//!
//! The same functions run at index build time and on query keywords.

use jieba_rs::Jieba;
use once_cell::sync::Lazy;

/// Global jieba tokenizer instance / 全局 jieba 分词器实例
static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// Characters with meaning in a token query grammar / 查询语法中的特殊字符
const QUERY_SYNTAX_CHARS: [char; 6] = ['"', '-', '(', ')', '*', ':'];

/// Tokenize text / 对文本进行分词
///
/// jieba keeps runs like `test.txt` together, so every word is further split
/// on non-alphanumeric characters. Punctuation never becomes a token.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    // Search engine mode, finer granularity / 搜索引擎模式
    for word in JIEBA.cut_for_search(text, true) {
        for part in word.split(|c: char| !c.is_alphanumeric()) {
            if part.is_empty() {
                continue;
            }
            tokens.push(part.to_lowercase());
        }
    }

    tokens
}

/// Tokenize into the whitespace-joined field stored per entry / 生成索引字段
pub fn tokenize_to_field(text: &str) -> String {
    tokenize(text).join(" ")
}

/// Strip query-grammar characters and trim / 清理搜索关键词
pub fn sanitize_keyword(keyword: &str) -> String {
    keyword
        .chars()
        .map(|c| if QUERY_SYNTAX_CHARS.contains(&c) { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Check if text contains CJK characters (Chinese, Japanese, Korean) / 检测文本是否包含CJK字符
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4e00}'..='\u{9fff}' |  // CJK Unified Ideographs
        '\u{3400}'..='\u{4dbf}' |  // CJK Extension A
        '\u{3000}'..='\u{303f}' |  // CJK Symbols and Punctuation
        '\u{3040}'..='\u{309f}' |  // Hiragana
        '\u{30a0}'..='\u{30ff}' |  // Katakana
        '\u{ac00}'..='\u{d7af}' |  // Hangul Syllables
        '\u{ff00}'..='\u{ffef}'    // Fullwidth forms
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_chinese() {
        let tokens = tokenize("中华人民共和国");
        assert!(!tokens.is_empty());
        assert!(tokens.iter().all(|t| !t.trim().is_empty()));
    }

    #[test]
    fn test_tokenize_english() {
        let tokens = tokenize("Hello World Test");
        assert!(tokens.contains(&"hello".to_string()));
        assert!(tokens.contains(&"world".to_string()));
        assert!(tokens.contains(&"test".to_string()));
    }

    #[test]
    fn test_tokenize_splits_dotted_words() {
        let tokens = tokenize("test.txt");
        assert!(tokens.contains(&"test".to_string()));
        assert!(tokens.contains(&"txt".to_string()));
    }

    #[test]
    fn test_tokenize_drops_punctuation() {
        let tokens = tokenize("hello, world!");
        assert!(tokens.contains(&"hello".to_string()));
        assert!(tokens.iter().all(|t| t.chars().all(char::is_alphanumeric)));
    }

    #[test]
    fn test_query_tokens_are_subset_of_indexed_tokens() {
        let indexed = tokenize("你好世界");
        for token in tokenize("你好") {
            assert!(indexed.contains(&token), "{} missing from {:?}", token, indexed);
        }
    }

    #[test]
    fn test_tokenize_to_field() {
        let field = tokenize_to_field("Quantum  Drive");
        assert!(field.starts_with("quantum"));
        assert!(!field.contains("  "));
        assert_eq!(tokenize_to_field("   "), "");
    }

    #[test]
    fn test_sanitize_keyword() {
        assert_eq!(sanitize_keyword("\"quantum-drive\""), "quantum drive");
        assert_eq!(sanitize_keyword("a:(b*)"), "a  b");
        assert_eq!(sanitize_keyword("  ---  "), "");
        assert_eq!(sanitize_keyword("量子引擎"), "量子引擎");
    }

    #[test]
    fn test_contains_cjk() {
        assert!(contains_cjk("测试"));
        assert!(contains_cjk("test测试"));
        assert!(!contains_cjk("test"));
    }
}
