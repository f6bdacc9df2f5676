//! Fuzzy matcher - approximate fallback over raw text / 模糊匹配
//!
//! Scoring is a case-insensitive partial ratio: the shorter string is aligned
//! against every window of the longer one and the best normalized indel
//! similarity `2 * LCS / (|a| + |b|)` wins.
//!
//! A fuzzy query scans every entry of a table. It is much slower than a token
//! lookup and should be run off the interactive thread.

use rayon::prelude::*;

use super::index::{Generation, Rank};

/// Default minimum similarity / 默认相似度阈值
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Similarity in [0, 1] between keyword and text / 计算相似度
pub fn score(keyword: &str, raw_text: &str) -> f64 {
    let a: Vec<char> = keyword.to_lowercase().chars().collect();
    let b: Vec<char> = raw_text.to_lowercase().chars().collect();
    partial_ratio(&a, &b)
}

fn partial_ratio(a: &[char], b: &[char]) -> f64 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0.0;
    }
    if short.len() == long.len() {
        return ratio(short, long);
    }

    // Windows anchored on a shared character, clamped into the text
    let width = short.len();
    let last_start = long.len() - width;
    let mut candidates = vec![false; last_start + 1];
    let mut any = false;
    for (j, c) in long.iter().enumerate() {
        for (i, s) in short.iter().enumerate() {
            if c == s {
                candidates[j.saturating_sub(i).min(last_start)] = true;
                any = true;
            }
        }
    }
    if !any {
        return 0.0;
    }

    let mut best = 0.0f64;
    for (start, _) in candidates.iter().enumerate().filter(|(_, hit)| **hit) {
        let r = ratio(short, &long[start..start + width]);
        if r > best {
            best = r;
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}

/// Normalized indel similarity / 归一化相似度
fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * lcs_len(a, b) as f64 / total as f64
}

/// Longest common subsequence length, two-row DP / 最长公共子序列
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Full-scan fuzzy matcher / 模糊搜索
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    threshold: f64,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Scan every entry; hits get rank `-score`, within [-1, -threshold] / 全表扫描
    pub fn scan(
        &self,
        keyword: &str,
        generation: &Generation,
        max_raw_length: Option<usize>,
    ) -> Vec<(String, Rank)> {
        let needle: Vec<char> = keyword.to_lowercase().chars().collect();
        if needle.is_empty() {
            return Vec::new();
        }

        generation
            .entries()
            .par_iter()
            .enumerate()
            .filter(|(idx, _)| match max_raw_length {
                Some(max) => generation.char_len(*idx) < max,
                None => true,
            })
            .filter_map(|(_, entry)| {
                let haystack: Vec<char> = entry.raw_text.to_lowercase().chars().collect();
                let similarity = partial_ratio(&needle, &haystack);
                (similarity >= self.threshold).then(|| (entry.key.clone(), -similarity))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typo_scores_above_threshold() {
        let s = score("helo", "hello world");
        assert!(s >= 0.6, "score {}", s);
        assert!(s < 1.0);
    }

    #[test]
    fn test_exact_substring_is_perfect() {
        assert_eq!(score("world", "Hello World"), 1.0);
        assert_eq!(score("量子", "量子引擎"), 1.0);
    }

    #[test]
    fn test_case_insensitive_and_symmetric() {
        assert_eq!(score("HELLO", "hello"), 1.0);
        assert_eq!(score("hello world", "helo"), score("helo", "hello world"));
    }

    #[test]
    fn test_unrelated_text() {
        assert_eq!(score("xyz", "hello"), 0.0);
        assert!(score("cargo", "shield generator") < 0.6);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(score("", "hello"), 0.0);
        assert_eq!(score("", ""), 0.0);
    }

    #[test]
    fn test_extra_leading_char() {
        let s = score("xquantum", "quantum drive");
        assert!(s >= 0.85, "score {}", s);
        assert!((score("abc", "bcxxxx") - 4.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_lcs() {
        let a: Vec<char> = "helo".chars().collect();
        let b: Vec<char> = "hell".chars().collect();
        assert_eq!(lcs_len(&a, &b), 3);
    }

    #[test]
    fn test_scan_threshold_and_rank() {
        let generation = Generation::build(vec![
            ("a".to_string(), "hello world".to_string()),
            ("b".to_string(), "cargo bay".to_string()),
        ]);
        let hits = FuzzyMatcher::default().scan("helo", &generation, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "a");
        assert!(hits[0].1 <= -0.6 && hits[0].1 >= -1.0);

        assert!(FuzzyMatcher::default().scan("helo", &generation, Some(5)).is_empty());
    }

    #[test]
    fn test_scan_window_at_text_start() {
        let generation = Generation::build(vec![
            ("qd".to_string(), "quantum drive".to_string()),
            ("sh".to_string(), "shield generator".to_string()),
        ]);
        let hits = FuzzyMatcher::default().scan("xquantum", &generation, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "qd");
        assert!(hits[0].1 <= -0.85);
    }
}
