//! Per-language index store / 单语言索引
//!
//! Each table holds one immutable [`Generation`]: the entries, their
//! tokenized fields and an inverted index over them. A rebuild builds a new
//! generation off to the side and publishes it with a single pointer swap, so
//! readers never observe a cleared or partially filled table.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rayon::prelude::*;

use super::schema::{Entry, Language, TableStats};
use super::tokenizer::tokenize_to_field;

/// BM25 term saturation / 词频饱和参数
const BM25_K1: f64 = 1.2;
/// BM25 length normalization / 长度归一化参数
const BM25_B: f64 = 0.75;

/// Relevance rank, lower is better / 排名值（越小越相关）
pub type Rank = f64;

/// Inverted index entry / 倒排索引条目
#[derive(Debug, Clone, Copy)]
struct Posting {
    doc: u32,
    tf: u32,
}

/// One complete, immutable table content / 一代索引数据
#[derive(Debug, Default)]
pub struct Generation {
    entries: Vec<Entry>,
    /// Token count per entry / 每条文本的词数
    doc_lens: Vec<u32>,
    /// Raw text length in chars per entry / 每条文本的字符数
    char_lens: Vec<usize>,
    by_key: HashMap<String, usize>,
    postings: HashMap<String, Vec<Posting>>,
    avg_doc_len: f64,
    built_at: Option<i64>,
}

impl Generation {
    /// Empty generation, served before the first rebuild / 空索引
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a generation from (key, raw text) pairs / 构建索引
    ///
    /// Later duplicates of a key replace earlier ones. Tokenization happens
    /// here, once per entry, never at query time.
    pub fn build(pairs: Vec<(String, String)>) -> Self {
        let mut by_key: HashMap<String, usize> = HashMap::with_capacity(pairs.len());
        let mut raw: Vec<(String, String)> = Vec::with_capacity(pairs.len());
        for (key, text) in pairs {
            match by_key.get(&key) {
                Some(&idx) => raw[idx].1 = text,
                None => {
                    by_key.insert(key.clone(), raw.len());
                    raw.push((key, text));
                }
            }
        }

        let entries: Vec<Entry> = raw
            .into_par_iter()
            .map(|(key, raw_text)| {
                let tokenized_text = tokenize_to_field(&raw_text);
                Entry {
                    key,
                    raw_text,
                    tokenized_text,
                }
            })
            .collect();

        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lens = Vec::with_capacity(entries.len());
        let mut char_lens = Vec::with_capacity(entries.len());
        let mut total_len: u64 = 0;

        for (doc, entry) in entries.iter().enumerate() {
            let mut term_freqs: HashMap<&str, u32> = HashMap::new();
            let mut len = 0u32;
            for token in entry.tokenized_text.split_whitespace() {
                *term_freqs.entry(token).or_default() += 1;
                len += 1;
            }
            for (term, tf) in term_freqs {
                postings.entry(term.to_string()).or_default().push(Posting {
                    doc: doc as u32,
                    tf,
                });
            }
            doc_lens.push(len);
            char_lens.push(entry.raw_text.chars().count());
            total_len += len as u64;
        }

        let avg_doc_len = if entries.is_empty() {
            0.0
        } else {
            total_len as f64 / entries.len() as f64
        };

        Self {
            entries,
            doc_lens,
            char_lens,
            by_key,
            postings,
            avg_doc_len,
            built_at: Some(chrono::Utc::now().timestamp()),
        }
    }

    /// Override the build timestamp (restored generations) / 设置更新时间
    pub fn with_built_at(mut self, built_at: Option<i64>) -> Self {
        self.built_at = built_at;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.by_key.get(key).map(|&idx| &self.entries[idx])
    }

    pub fn built_at(&self) -> Option<i64> {
        self.built_at
    }

    /// Distinct indexed terms / 词项数量
    pub fn token_count(&self) -> usize {
        self.postings.len()
    }

    /// Raw length in chars of the entry at `idx`
    pub fn char_len(&self, idx: usize) -> usize {
        self.char_lens[idx]
    }

    /// Ranked token lookup / 分词检索
    ///
    /// Every query token must be present in the entry. Rank is the negated
    /// BM25 score; the idf used here is always positive, so every hit has a
    /// rank strictly below zero.
    pub fn query(
        &self,
        tokenized_keyword: &str,
        limit: usize,
        max_raw_length: Option<usize>,
    ) -> Vec<(String, Rank)> {
        if limit == 0 || self.entries.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let terms: Vec<&str> = tokenized_keyword
            .split_whitespace()
            .filter(|t| seen.insert(*t))
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut lists = Vec::with_capacity(terms.len());
        for term in &terms {
            match self.postings.get(*term) {
                Some(list) => lists.push(list),
                None => return Vec::new(),
            }
        }
        // Rarest term first keeps the candidate set small
        lists.sort_by_key(|list| list.len());

        let admitted = |doc: usize| match max_raw_length {
            Some(max) => self.char_lens[doc] < max,
            None => true,
        };

        let mut scores: HashMap<u32, f64> = lists[0]
            .iter()
            .filter(|p| admitted(p.doc as usize))
            .map(|p| (p.doc, self.term_score(lists[0].len(), p)))
            .collect();

        for list in &lists[1..] {
            if scores.is_empty() {
                break;
            }
            let mut next = HashMap::with_capacity(scores.len());
            for posting in list.iter() {
                if let Some(score) = scores.get(&posting.doc) {
                    next.insert(posting.doc, score + self.term_score(list.len(), posting));
                }
            }
            scores = next;
        }

        let mut hits: Vec<(String, Rank)> = scores
            .into_iter()
            .map(|(doc, score)| (self.entries[doc as usize].key.clone(), -score))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        hits.truncate(limit);
        hits
    }

    fn term_score(&self, doc_freq: usize, posting: &Posting) -> f64 {
        let n = self.entries.len() as f64;
        let df = doc_freq as f64;
        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

        let tf = posting.tf as f64;
        let doc_len = self.doc_lens[posting.doc as usize] as f64;
        let avg_len = if self.avg_doc_len > 0.0 { self.avg_doc_len } else { 1.0 };
        idf * (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * doc_len / avg_len))
    }
}

/// Long-lived index handle of one language / 单语言索引句柄
pub struct IndexStore {
    language: Language,
    current: RwLock<Arc<Generation>>,
    generation: AtomicU64,
    query_count: AtomicU64,
}

impl IndexStore {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            current: RwLock::new(Arc::new(Generation::empty())),
            generation: AtomicU64::new(0),
            query_count: AtomicU64::new(0),
        }
    }

    /// Current generation; stays valid even if a rebuild publishes meanwhile / 当前索引快照
    pub fn snapshot(&self) -> Arc<Generation> {
        self.current.read().clone()
    }

    /// Atomically replace the table content / 原子替换索引
    pub fn publish(&self, generation: Generation) -> u64 {
        let entries = generation.len();
        let generation = Arc::new(generation);
        *self.current.write() = generation;
        let number = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            "Published generation {} of table {} ({} entries)",
            number,
            self.language,
            entries
        );
        number
    }

    /// Build and publish in one step / 重建索引
    pub fn rebuild(&self, pairs: Vec<(String, String)>) -> u64 {
        self.publish(Generation::build(pairs))
    }

    /// Ranked token lookup against the current generation / 分词检索
    pub fn query(
        &self,
        tokenized_keyword: &str,
        limit: usize,
        max_raw_length: Option<usize>,
    ) -> Vec<(String, Rank)> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        self.snapshot().query(tokenized_keyword, limit, max_raw_length)
    }

    /// Point lookups; unknown keys are omitted / 按文本ID取原文
    pub fn fetch_raw<'a, I>(&self, keys: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let generation = self.snapshot();
        keys.into_iter()
            .filter_map(|key| {
                generation
                    .get(key)
                    .map(|entry| (key.to_string(), entry.raw_text.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn query_count(&self) -> u64 {
        self.query_count.load(Ordering::Relaxed)
    }

    /// Get index statistics / 获取索引统计信息
    pub fn stats(&self) -> TableStats {
        let generation = self.snapshot();
        TableStats {
            language: self.language.clone(),
            entry_count: generation.len(),
            token_count: generation.token_count(),
            generation: self.generation.load(Ordering::SeqCst),
            query_count: self.query_count(),
            last_updated: generation.built_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tokenizer::tokenize_to_field;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn store(items: &[(&str, &str)]) -> IndexStore {
        let store = IndexStore::new(Language::new("en"));
        store.rebuild(pairs(items));
        store
    }

    #[test]
    fn test_query_matches_tokens() {
        let store = store(&[
            ("qd", "quantum drive"),
            ("sh", "shield generator"),
            ("qt", "quantum travel drive spool"),
        ]);

        let hits = store.query(&tokenize_to_field("quantum"), 10, None);
        let keys: Vec<_> = hits.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"qd"));
        assert!(keys.contains(&"qt"));
        assert!(hits.iter().all(|(_, rank)| *rank < 0.0));
    }

    #[test]
    fn test_all_terms_required() {
        let store = store(&[("a", "quantum drive"), ("b", "quantum fuel")]);
        let hits = store.query("quantum drive", 10, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "a");
    }

    #[test]
    fn test_shorter_entry_ranks_first() {
        let store = store(&[
            ("long", "shield shield generator module with extra words attached"),
            ("short", "shield"),
            ("other", "cargo"),
        ]);
        let hits = store.query("shield", 10, None);
        assert_eq!(hits[0].0, "short");
        assert!(hits[0].1 <= hits[1].1);
    }

    #[test]
    fn test_ties_broken_by_key() {
        let store = store(&[("b", "cargo"), ("a", "cargo"), ("c", "cargo")]);
        let keys: Vec<_> = store.query("cargo", 10, None).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_limit_and_max_raw_length() {
        let store = store(&[("a", "cargo"), ("b", "cargo bay door"), ("c", "cargo grid")]);
        assert_eq!(store.query("cargo", 2, None).len(), 2);
        assert!(store.query("cargo", 0, None).is_empty());

        let hits = store.query("cargo", 10, Some(6));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "a");
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let store = store(&[("a", "old text"), ("a", "new text")]);
        assert_eq!(store.len(), 1);
        assert!(store.query("old", 10, None).is_empty());
        assert_eq!(store.query("new", 10, None)[0].0, "a");
    }

    #[test]
    fn test_fetch_raw_omits_unknown() {
        let store = store(&[("a", "line one\nline two")]);
        let raw = store.fetch_raw(["a", "missing"]);
        assert_eq!(raw.len(), 1);
        assert_eq!(raw["a"], "line one\nline two");
    }

    #[test]
    fn test_publish_swaps_generation() {
        let store = store(&[("a", "alpha")]);
        let before = store.snapshot();

        store.rebuild(pairs(&[("b", "beta")]));

        // Old readers keep their generation / 旧快照保持不变
        assert!(before.get("a").is_some());
        assert!(store.snapshot().get("a").is_none());
        assert_eq!(store.stats().generation, 2);
    }

    #[test]
    fn test_query_count() {
        let store = store(&[("a", "alpha")]);
        store.query("alpha", 10, None);
        store.query("beta", 10, None);
        assert_eq!(store.query_count(), 2);
    }

    #[test]
    fn test_empty_store() {
        let store = IndexStore::new(Language::new("cn"));
        assert!(store.is_empty());
        assert!(store.query("anything", 10, None).is_empty());
        assert_eq!(store.stats().generation, 0);
    }
}
