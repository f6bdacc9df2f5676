//! Search engine - bilingual lookup over per-language tables / 搜索引擎
//!
//! Flow of a query / 查询流程:
//! - sanitize and tokenize the keyword once
//! - exact token lookup per requested table, shifted into the exact tier
//! - optional fuzzy full scan per requested table
//! - merge by best rank, sort, truncate
//! - highlighted snippets for every display language
//!
//! Rebuilds are serialized by an async mutex. A rebuild parses and tokenizes
//! on the blocking pool, persists all tables in one transaction, then
//! publishes each new generation. Any failure before publishing leaves the
//! previous generations in place.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::config::AppConfig;
use crate::error::{DictError, Result};

use super::fuzzy::FuzzyMatcher;
use super::highlight::{escape_html, HighlightOptions, Highlighter};
use super::index::{Generation, IndexStore, Rank};
use super::loader::load_source;
use super::schema::{Language, SearchMode, SearchOutcome, SearchQuery, TableStats};
use super::store::DictStore;
use super::tokenizer::{sanitize_keyword, tokenize_to_field};

/// Added to every exact-match rank / 精确匹配排名偏移
///
/// BM25 ranks are strictly negative, so a shifted exact rank is always
/// below -1 while fuzzy ranks stay within [-1, -threshold].
pub const EXACT_TIER_OFFSET: Rank = -1.0;

/// Entries indexed for one table / 单表重建结果
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub language: Language,
    pub entries: usize,
}

/// Rebuild summary / 重建结果
#[derive(Debug, Clone, Serialize)]
pub struct RebuildReport {
    pub tables: Vec<TableReport>,
    pub elapsed_ms: u64,
}

impl RebuildReport {
    pub fn total_entries(&self) -> usize {
        self.tables.iter().map(|t| t.entries).sum()
    }
}

/// Dictionary engine / 词典引擎
pub struct DictEngine {
    config: AppConfig,
    tables: BTreeMap<Language, IndexStore>,
    store: Option<DictStore>,
    fuzzy: FuzzyMatcher,
    highlighter: Highlighter,
    rebuild_lock: tokio::sync::Mutex<()>,
}

impl DictEngine {
    /// In-memory engine with empty tables and no database / 创建内存引擎
    pub fn new(config: AppConfig) -> Self {
        let tables = config
            .languages
            .enabled()
            .into_iter()
            .map(|lang| (lang.clone(), IndexStore::new(lang)))
            .collect();

        let highlighter = Highlighter::new(HighlightOptions {
            pre_tag: config.search.highlight_pre.clone(),
            post_tag: config.search.highlight_post.clone(),
            ellipsis: config.search.ellipsis.clone(),
            max_length: config.search.snippet_length,
        });

        Self {
            fuzzy: FuzzyMatcher::new(config.search.fuzzy_threshold),
            highlighter,
            tables,
            store: None,
            rebuild_lock: tokio::sync::Mutex::new(()),
            config,
        }
    }

    /// Open the database and restore persisted tables / 打开数据库并加载已持久化的表
    pub async fn open(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let store = DictStore::open(&config.get_db_path()).await?;

        let mut engine = Self::new(config);
        for lang in engine.languages() {
            let stored = store.load_table(&lang).await?;
            if stored.entries.is_empty() {
                tracing::warn!("Table {} is empty, a rebuild is required", lang);
                continue;
            }

            let generation = tokio::task::spawn_blocking(move || {
                Generation::build(stored.entries).with_built_at(stored.last_updated)
            })
            .await?;

            if let Some(table) = engine.tables.get(&lang) {
                tracing::info!("Restored {} entries of table {}", generation.len(), lang);
                table.publish(generation);
            }
        }

        engine.store = Some(store);
        Ok(engine)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Enabled languages, primary first / 启用的语言
    pub fn languages(&self) -> Vec<Language> {
        self.config.languages.enabled()
    }

    /// Index handle of one table / 获取单表索引
    pub fn table(&self, language: &Language) -> Option<&IndexStore> {
        self.tables.get(language)
    }

    /// True when no table holds any entry / 所有表都为空
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(IndexStore::is_empty)
    }

    /// Statistics of every table, primary first / 所有表的统计信息
    pub fn table_stats(&self) -> Vec<TableStats> {
        self.languages()
            .iter()
            .filter_map(|lang| self.tables.get(lang))
            .map(IndexStore::stats)
            .collect()
    }

    /// Tables searched for a direction / 根据搜索模式确定搜索的语言
    ///
    /// The auxiliary table joins whenever the primary language is searched.
    pub fn languages_for(&self, mode: SearchMode, include_auxiliary: bool) -> BTreeSet<Language> {
        let langs = &self.config.languages;
        let mut set = BTreeSet::new();
        match mode {
            SearchMode::Both => {
                set.insert(langs.primary.clone());
                set.insert(langs.secondary.clone());
            }
            SearchMode::PrimaryToSecondary => {
                set.insert(langs.primary.clone());
            }
            SearchMode::SecondaryToPrimary => {
                set.insert(langs.secondary.clone());
            }
        }
        if include_auxiliary && langs.enable_auxiliary && set.contains(&langs.primary) {
            set.insert(langs.auxiliary.clone());
        }
        set
    }

    /// Languages shown in result snippets / 结果显示的语言
    pub fn display_languages(&self, include_auxiliary: bool) -> Vec<Language> {
        let langs = &self.config.languages;
        let mut display = langs.core().to_vec();
        if include_auxiliary && langs.enable_auxiliary {
            display.push(langs.auxiliary.clone());
        }
        display
    }

    /// Run a query / 搜索
    ///
    /// Synchronous; fuzzy queries scan whole tables, callers on an async
    /// runtime should go through the blocking pool.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchOutcome> {
        if query.limit == 0 {
            return Ok(SearchOutcome::default());
        }

        let sanitized = sanitize_keyword(&query.keyword);
        if sanitized.is_empty() {
            return Ok(SearchOutcome::default());
        }

        let targets = self.resolve_languages(&query.languages)?;
        let started = Instant::now();
        let tokenized = tokenize_to_field(&sanitized);

        let mut best: HashMap<String, Rank> = HashMap::new();
        let mut merge = |key: String, rank: Rank| {
            best.entry(key)
                .and_modify(|current| {
                    if rank < *current {
                        *current = rank;
                    }
                })
                .or_insert(rank);
        };

        for table in &targets {
            if !tokenized.is_empty() {
                for (key, rank) in table.query(&tokenized, query.limit, query.max_raw_length) {
                    merge(key, rank + EXACT_TIER_OFFSET);
                }
            }
            if query.fuzzy {
                let generation = table.snapshot();
                for (key, rank) in self.fuzzy.scan(&sanitized, &generation, query.max_raw_length) {
                    merge(key, rank);
                }
            }
        }

        let mut ranked: Vec<(String, Rank)> = best.into_iter().collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(query.limit);

        let keys: Vec<String> = ranked.into_iter().map(|(key, _)| key).collect();
        let results = self.build_payload(&keys, query.keyword.trim(), query.include_auxiliary);

        tracing::debug!(
            "Search '{}' over {} tables (fuzzy: {}): {} hits in {:?}",
            query.keyword,
            targets.len(),
            query.fuzzy,
            keys.len(),
            started.elapsed()
        );

        Ok(SearchOutcome { keys, results })
    }

    /// Full text of a key in every enabled table, HTML-escaped / 获取完整文本
    pub fn get_full_text(&self, key: &str) -> BTreeMap<Language, String> {
        self.tables
            .iter()
            .filter_map(|(lang, table)| {
                table
                    .snapshot()
                    .get(key)
                    .map(|entry| (lang.clone(), escape_html(&entry.raw_text)))
            })
            .collect()
    }

    /// Rebuild every enabled table / 重建所有表
    pub async fn rebuild_all(&self) -> Result<RebuildReport> {
        self.rebuild_all_with(|_, _| {}).await
    }

    /// Rebuild every enabled table, reporting each built table / 重建所有表并报告进度
    pub async fn rebuild_all_with<F>(&self, on_table: F) -> Result<RebuildReport>
    where
        F: FnMut(&Language, usize) + Send,
    {
        self.rebuild_tables(self.languages(), on_table).await
    }

    /// Rebuild one table / 重建单个表
    pub async fn rebuild_language(&self, language: &Language) -> Result<RebuildReport> {
        if !self.tables.contains_key(language) {
            return Err(DictError::InvalidQuery(format!(
                "language `{}` is not enabled",
                language
            )));
        }
        self.rebuild_tables(vec![language.clone()], |_, _| {}).await
    }

    /// True while a rebuild holds the lock / 是否正在重建
    pub fn is_rebuilding(&self) -> bool {
        self.rebuild_lock.try_lock().is_err()
    }

    async fn rebuild_tables<F>(&self, languages: Vec<Language>, mut on_table: F) -> Result<RebuildReport>
    where
        F: FnMut(&Language, usize) + Send,
    {
        let _guard = self.rebuild_lock.lock().await;
        let started = Instant::now();
        tracing::info!("Rebuilding tables: {:?}", languages);

        // Every source must exist before anything is built / 先检查所有文本文件
        let sources: Vec<(Language, PathBuf)> = languages
            .into_iter()
            .map(|lang| {
                let path = self.config.get_source_path(&lang);
                (lang, path)
            })
            .collect();
        if let Some((language, path)) = sources.iter().find(|(_, path)| !path.exists()) {
            tracing::warn!("Source file missing for {}: {:?}", language, path);
            return Err(DictError::SourceMissing {
                language: language.clone(),
                path: path.clone(),
            });
        }

        let mut built: Vec<(Language, Generation)> = Vec::with_capacity(sources.len());
        for (lang, path) in sources {
            let (lang, generation) = tokio::task::spawn_blocking(move || -> Result<_> {
                let pairs = load_source(&lang, &path)?;
                Ok((lang, Generation::build(pairs)))
            })
            .await??;

            tracing::info!("Built table {} with {} entries", lang, generation.len());
            on_table(&lang, generation.len());
            built.push((lang, generation));
        }

        if let Some(store) = &self.store {
            let rows: Vec<(&Language, &[_])> = built
                .iter()
                .map(|(lang, generation)| (lang, generation.entries()))
                .collect();
            store.replace_tables(&rows).await?;
        }

        let mut tables = Vec::with_capacity(built.len());
        for (lang, generation) in built {
            let entries = generation.len();
            if let Some(table) = self.tables.get(&lang) {
                table.publish(generation);
            }
            tables.push(TableReport {
                language: lang,
                entries,
            });
        }

        let report = RebuildReport {
            tables,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            "Rebuild finished: {} entries in {}ms",
            report.total_entries(),
            report.elapsed_ms
        );
        Ok(report)
    }

    /// Requested set to table handles; empty means the core languages / 解析搜索语言
    fn resolve_languages(&self, requested: &BTreeSet<Language>) -> Result<Vec<&IndexStore>> {
        if requested.is_empty() {
            return Ok(self
                .config
                .languages
                .core()
                .iter()
                .filter_map(|lang| self.tables.get(lang))
                .collect());
        }

        requested
            .iter()
            .map(|lang| {
                self.tables.get(lang).ok_or_else(|| {
                    DictError::InvalidQuery(format!("language `{}` is not enabled", lang))
                })
            })
            .collect()
    }

    fn build_payload(
        &self,
        keys: &[String],
        keyword: &str,
        include_auxiliary: bool,
    ) -> HashMap<String, BTreeMap<Language, String>> {
        let mut results: HashMap<String, BTreeMap<Language, String>> = keys
            .iter()
            .map(|key| (key.clone(), BTreeMap::new()))
            .collect();

        for lang in self.display_languages(include_auxiliary) {
            let Some(table) = self.tables.get(&lang) else {
                continue;
            };
            for (key, raw) in table.fetch_raw(keys.iter().map(String::as_str)) {
                let snippet = self.highlighter.highlight(&strip_newlines(&raw), keyword);
                if let Some(per_lang) = results.get_mut(&key) {
                    per_lang.insert(lang.clone(), snippet);
                }
            }
        }
        results
    }
}

/// Remove line breaks, including the literal `\n` used by source files / 去除换行
fn strip_newlines(text: &str) -> String {
    text.replace("\\n", "").replace(['\r', '\n'], "")
}
