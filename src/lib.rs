pub mod config;
pub mod error;
pub mod runner;
pub mod search;

pub use config::AppConfig;
pub use error::{DictError, Result};
pub use runner::{DictEvent, RebuildProgress, TaskRunner};
pub use search::{DictEngine, Language, SearchMode, SearchOutcome, SearchQuery};
