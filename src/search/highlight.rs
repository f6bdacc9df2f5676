//! Snippet highlighter / 搜索结果高亮
//!
//! Produces an HTML-escaped snippet with every keyword occurrence wrapped in
//! emphasis tags, bounded to a display budget (halved for CJK text).
//!
//! Lengths are counted in characters of the escaped text, but cuts only fall
//! between source characters and segments are escaped after cutting. An
//! entity or a tag is never split, and a cut inside a match still closes its
//! emphasis.

use std::ops::Range;

use regex::RegexBuilder;

use super::tokenizer::contains_cjk;

/// Highlight options / 高亮选项
#[derive(Debug, Clone)]
pub struct HighlightOptions {
    pub pre_tag: String,
    pub post_tag: String,
    pub ellipsis: String,
    /// Budget for non-CJK text in chars / 摘要长度
    pub max_length: usize,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            pre_tag: "<b>".to_string(),
            post_tag: "</b>".to_string(),
            ellipsis: "...".to_string(),
            max_length: 100,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    options: HighlightOptions,
}

impl Highlighter {
    pub fn new(options: HighlightOptions) -> Self {
        Self { options }
    }

    /// Display budget for a text / 显示长度
    pub fn budget(&self, raw_text: &str) -> usize {
        if contains_cjk(raw_text) {
            self.options.max_length / 2
        } else {
            self.options.max_length
        }
    }

    /// Build the snippet of `raw_text` for `keyword` / 生成高亮摘要
    pub fn highlight(&self, raw_text: &str, keyword: &str) -> String {
        let matches = find_matches(raw_text, keyword);
        let budget = self.budget(raw_text);

        if escaped_len(raw_text) < budget {
            return self.render(raw_text, &matches, 0, usize::MAX);
        }

        let (first, last) = match (matches.first(), matches.last()) {
            (Some(first), Some(last)) => (first.start, last.end),
            _ => {
                // Fuzzy-only hits may not contain the keyword literally
                return format!("{}{}", escape_html(take_escaped(raw_text, budget)), self.options.ellipsis);
            }
        };

        let prefix = &raw_text[..first];
        let prefix_len = escaped_len(prefix);
        if prefix_len >= budget {
            return format!("{}{}", escape_html(take_escaped(prefix, budget)), self.options.ellipsis);
        }

        let content = self.render(&raw_text[..last], &matches, first, budget - prefix_len);
        format!("{}{}{}", escape_html(prefix), content, self.options.ellipsis)
    }

    /// Render `text[from..]` with emphasis, keeping at most `limit` escaped chars
    fn render(&self, text: &str, matches: &[Range<usize>], from: usize, limit: usize) -> String {
        let mut out = String::with_capacity(text.len() + matches.len() * 8);
        let mut remaining = limit;
        let mut pos = from;

        for m in matches.iter().filter(|m| m.start >= from && m.end <= text.len()) {
            if remaining == 0 {
                return out;
            }
            let segment = &text[pos..m.start];
            let plain = take_escaped(segment, remaining);
            remaining -= escaped_len(plain);
            out.push_str(&escape_html(plain));
            if remaining == 0 || plain.len() < segment.len() {
                return out;
            }

            let matched = &text[m.start..m.end];
            let hit = take_escaped(matched, remaining);
            remaining -= escaped_len(hit);
            if !hit.is_empty() {
                out.push_str(&self.options.pre_tag);
                out.push_str(&escape_html(hit));
                out.push_str(&self.options.post_tag);
            }
            if hit.len() < matched.len() {
                return out;
            }
            pos = m.end;
        }

        if remaining > 0 && pos < text.len() {
            out.push_str(&escape_html(take_escaped(&text[pos..], remaining)));
        }
        out
    }
}

/// Byte ranges of every case-insensitive literal occurrence / 查找所有匹配
fn find_matches(text: &str, keyword: &str) -> Vec<Range<usize>> {
    if keyword.trim().is_empty() {
        return Vec::new();
    }
    match RegexBuilder::new(&regex::escape(keyword))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.find_iter(text).map(|m| m.range()).collect(),
        Err(e) => {
            tracing::warn!("Highlight pattern rejected: {}", e);
            Vec::new()
        }
    }
}

/// HTML entity of a special character / 特殊字符的转义
fn entity(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        '\'' => Some("&#x27;"),
        _ => None,
    }
}

/// Width of a char once escaped / 转义后的字符宽度
fn escaped_width(c: char) -> usize {
    entity(c).map_or(1, str::len)
}

/// Length in chars of the escaped text / 转义后的长度
fn escaped_len(text: &str) -> usize {
    text.chars().map(escaped_width).sum()
}

/// Longest prefix whose escaped length is at most `n` / 按转义长度截取
fn take_escaped(text: &str, n: usize) -> &str {
    let mut used = 0;
    for (idx, c) in text.char_indices() {
        used += escaped_width(c);
        if used > n {
            return &text[..idx];
        }
    }
    text
}

/// Escape HTML special characters / HTML 转义
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match entity(c) {
            Some(e) => out.push_str(e),
            None => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_tags(s: &str) -> String {
        s.replace("<b>", "").replace("</b>", "")
    }

    #[test]
    fn test_short_text_all_occurrences() {
        let h = Highlighter::default();
        let out = h.highlight("Cargo and more CARGO", "cargo");
        assert_eq!(out, "<b>Cargo</b> and more <b>CARGO</b>");
    }

    #[test]
    fn test_escapes_before_emphasis() {
        let h = Highlighter::default();
        let raw = "<script>alert('x')</script> & cargo";
        let out = h.highlight(raw, "cargo");
        assert!(out.ends_with("&amp; <b>cargo</b>"));
        assert_eq!(strip_tags(&out), escape_html(raw));
    }

    #[test]
    fn test_keyword_with_special_chars() {
        let h = Highlighter::default();
        let out = h.highlight("R&D dept", "r&d");
        assert_eq!(out, "<b>R&amp;D</b> dept");
    }

    #[test]
    fn test_no_match_short_text() {
        let h = Highlighter::default();
        assert_eq!(h.highlight("hello <world>", "zzz"), "hello &lt;world&gt;");
    }

    #[test]
    fn test_long_prefix_loses_emphasis() {
        let h = Highlighter::default();
        let mut raw = "a".repeat(250);
        raw.push_str("cargo");
        raw.push_str(&"b".repeat(45));
        assert_eq!(raw.chars().count(), 300);

        let out = h.highlight(&raw, "cargo");
        assert!(out.chars().count() <= 100 + 3);
        assert_eq!(out, format!("{}...", "a".repeat(100)));
    }

    #[test]
    fn test_truncates_content_region() {
        let h = Highlighter::default();
        let raw = format!("{}cargo{}cargo{}", "x".repeat(30), "y".repeat(40), "z".repeat(100));
        let out = h.highlight(&raw, "cargo");

        assert!(out.starts_with(&format!("{}<b>cargo</b>", "x".repeat(30))));
        assert!(out.ends_with("..."));
        assert!(!out.contains('z'));
        assert_eq!(strip_tags(&out).trim_end_matches("...").chars().count(), 80);
    }

    #[test]
    fn test_cut_inside_match_closes_tag() {
        let h = Highlighter::default();
        let raw = format!("{}cargo{}", "x".repeat(98), "y".repeat(50));
        let out = h.highlight(&raw, "cargo");
        assert_eq!(out, format!("{}<b>ca</b>...", "x".repeat(98)));
    }

    #[test]
    fn test_cjk_budget_is_halved() {
        let h = Highlighter::default();
        let raw = format!("{}量子引擎{}", "测".repeat(10), "试".repeat(60));
        let out = h.highlight(&raw, "量子");
        assert!(out.starts_with(&format!("{}<b>量子</b>", "测".repeat(10))));
        // Content after the last match is discarded / 最后一个匹配之后的内容被丢弃
        assert_eq!(out, format!("{}<b>量子</b>...", "测".repeat(10)));
    }

    #[test]
    fn test_no_match_long_text_plain_truncation() {
        let h = Highlighter::default();
        let raw = "w".repeat(150);
        assert_eq!(h.highlight(&raw, "cargo"), format!("{}...", "w".repeat(100)));
    }

    #[test]
    fn test_budget_counts_escaped_chars() {
        let h = Highlighter::default();
        let raw = format!("{}cargo", "<".repeat(60));
        let out = h.highlight(&raw, "cargo");
        assert_eq!(out, format!("{}...", "&lt;".repeat(25)));
        assert!(out.trim_end_matches("...").chars().count() <= 100);
    }

    #[test]
    fn test_escaped_prefix_shrinks_content() {
        let h = Highlighter::default();
        let raw = format!("{}cargo{}cargo", "&".repeat(18), "y".repeat(20));
        let out = h.highlight(&raw, "cargo");
        // 90 escaped prefix chars leave 10 for the content region
        assert_eq!(out, format!("{}<b>cargo</b>yyyyy...", "&amp;".repeat(18)));
    }

    #[test]
    fn test_cut_never_splits_entity() {
        let h = Highlighter::default();
        let raw = format!("{}&{}", "a".repeat(98), "b".repeat(20));
        assert_eq!(h.highlight(&raw, "zzz"), format!("{}...", "a".repeat(98)));
    }

    #[test]
    fn test_custom_tags() {
        let h = Highlighter::new(HighlightOptions {
            pre_tag: "<em>".to_string(),
            post_tag: "</em>".to_string(),
            ..HighlightOptions::default()
        });
        assert_eq!(h.highlight("cargo bay", "bay"), "cargo <em>bay</em>");
    }
}
