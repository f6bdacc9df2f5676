//! Search module - bilingual dictionary lookup / 搜索模块
//!
//! Components / 组成：
//! - tokenizer: jieba segmentation shared by indexing and queries
//! - loader: `key=text` source files, one per language
//! - index: per-language inverted index generations, swapped atomically
//! - fuzzy: partial-ratio full scan fallback
//! - highlight: escaped, emphasized, truncated snippets
//! - store: SQLite copy of the published tables
//! - engine: orchestrates the above

pub mod engine;
pub mod fuzzy;
pub mod highlight;
pub mod index;
pub mod loader;
pub mod schema;
pub mod store;
pub mod tokenizer;

pub use engine::{DictEngine, RebuildReport, TableReport, EXACT_TIER_OFFSET};
pub use fuzzy::FuzzyMatcher;
pub use highlight::{HighlightOptions, Highlighter};
pub use index::{Generation, IndexStore, Rank};
pub use schema::{Entry, Language, SearchMode, SearchOutcome, SearchQuery, TableStats, DEFAULT_LIMIT};
pub use store::DictStore;
