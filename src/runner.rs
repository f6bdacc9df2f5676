//! Task runner - async front of the engine / 任务执行器
//!
//! Searches run on the blocking pool, rebuilds run as background tasks.
//! Every step is broadcast as a [`DictEvent`] for subscribers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::{DictError, Result};
use crate::search::{DictEngine, Language, RebuildReport, SearchOutcome, SearchQuery};

/// Engine events (pushed to subscribers) / 引擎事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DictEvent {
    SearchStarted { keyword: String },
    SearchCompleted { keyword: String, hits: usize, elapsed_ms: u64 },
    SearchFailed { keyword: String, error: String },
    RebuildStarted { languages: Vec<Language> },
    RebuildProgress { language: Language, entries: usize },
    RebuildCompleted { report: RebuildReport },
    RebuildFailed { error: String },
}

/// Rebuild progress / 重建进度
#[derive(Debug, Clone, Serialize)]
pub struct RebuildProgress {
    pub is_running: bool,
    pub is_done: bool,
    pub tables_done: usize,
    pub entries_indexed: usize,
    pub error: Option<String>,
    pub last_done_time: Option<i64>,
}

impl Default for RebuildProgress {
    fn default() -> Self {
        Self {
            is_running: false,
            is_done: true,
            tables_done: 0,
            entries_indexed: 0,
            error: None,
            last_done_time: None,
        }
    }
}

/// Rebuild state management / 重建状态管理
struct RebuildState {
    running: AtomicBool,
    progress: RwLock<RebuildProgress>,
}

impl RebuildState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            progress: RwLock::new(RebuildProgress::default()),
        }
    }

    /// Claim the rebuild slot; false if already taken / 开始重建
    fn try_start(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        let mut progress = self.progress.write();
        progress.is_running = true;
        progress.is_done = false;
        progress.tables_done = 0;
        progress.entries_indexed = 0;
        progress.error = None;
        true
    }

    fn table_done(&self, entries: usize) {
        let mut progress = self.progress.write();
        progress.tables_done += 1;
        progress.entries_indexed += entries;
    }

    fn finish(&self, error: Option<String>) {
        {
            let mut progress = self.progress.write();
            progress.is_running = false;
            progress.is_done = error.is_none();
            progress.error = error;
            progress.last_done_time = Some(chrono::Utc::now().timestamp());
        }
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn get_progress(&self) -> RebuildProgress {
        self.progress.read().clone()
    }
}

/// Task runner / 任务执行器
pub struct TaskRunner {
    engine: Arc<DictEngine>,
    rebuild: RebuildState,
    event_sender: broadcast::Sender<DictEvent>,
}

impl TaskRunner {
    pub fn new(engine: Arc<DictEngine>) -> Self {
        let (event_sender, _) = broadcast::channel(256);
        Self {
            engine,
            rebuild: RebuildState::new(),
            event_sender,
        }
    }

    pub fn engine(&self) -> &Arc<DictEngine> {
        &self.engine
    }

    /// Subscribe to engine events / 订阅事件
    pub fn subscribe(&self) -> broadcast::Receiver<DictEvent> {
        self.event_sender.subscribe()
    }

    fn broadcast(&self, event: DictEvent) {
        // No subscriber is not an error
        let _ = self.event_sender.send(event);
    }

    /// Search on the blocking pool / 在阻塞线程池中搜索
    pub async fn search(&self, query: SearchQuery) -> Result<SearchOutcome> {
        let keyword = query.keyword.clone();
        self.broadcast(DictEvent::SearchStarted {
            keyword: keyword.clone(),
        });

        let started = Instant::now();
        let engine = Arc::clone(&self.engine);
        let result = match tokio::task::spawn_blocking(move || engine.search(&query)).await {
            Ok(result) => result,
            Err(e) => Err(DictError::from(e)),
        };

        match &result {
            Ok(outcome) => self.broadcast(DictEvent::SearchCompleted {
                keyword,
                hits: outcome.len(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
            Err(e) => {
                tracing::warn!("Search '{}' failed: {}", keyword, e);
                self.broadcast(DictEvent::SearchFailed {
                    keyword,
                    error: e.to_string(),
                });
            }
        }
        result
    }

    /// Start a background rebuild of every table / 启动后台重建
    pub fn start_rebuild(self: &Arc<Self>) -> Result<()> {
        if !self.rebuild.try_start() {
            return Err(DictError::RebuildInProgress);
        }
        let runner = Arc::clone(self);
        tokio::spawn(async move {
            let _ = runner.run_rebuild().await;
        });
        Ok(())
    }

    /// Rebuild every table and wait for it / 重建并等待完成
    pub async fn rebuild(&self) -> Result<RebuildReport> {
        if !self.rebuild.try_start() {
            return Err(DictError::RebuildInProgress);
        }
        self.run_rebuild().await
    }

    /// Current rebuild progress / 获取重建进度
    pub fn progress(&self) -> RebuildProgress {
        self.rebuild.get_progress()
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuild.is_running()
    }

    async fn run_rebuild(&self) -> Result<RebuildReport> {
        self.broadcast(DictEvent::RebuildStarted {
            languages: self.engine.languages(),
        });

        let result = self
            .engine
            .rebuild_all_with(|language, entries| {
                self.rebuild.table_done(entries);
                self.broadcast(DictEvent::RebuildProgress {
                    language: language.clone(),
                    entries,
                });
            })
            .await;

        match &result {
            Ok(report) => {
                self.rebuild.finish(None);
                self.broadcast(DictEvent::RebuildCompleted {
                    report: report.clone(),
                });
            }
            Err(e) => {
                tracing::error!("Rebuild failed: {}", e);
                self.rebuild.finish(Some(e.to_string()));
                self.broadcast(DictEvent::RebuildFailed {
                    error: e.to_string(),
                });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn runner_with_sources(dir: &std::path::Path) -> Arc<TaskRunner> {
        let mut config = AppConfig::default();
        config.data.data_dir = dir.to_string_lossy().to_string();
        let text_dir = config.get_text_dir();
        std::fs::create_dir_all(&text_dir).unwrap();
        std::fs::write(text_dir.join("cn.ini"), "greet001=你好世界\n").unwrap();
        std::fs::write(text_dir.join("en.ini"), "greet001=Hello world\n").unwrap();
        Arc::new(TaskRunner::new(Arc::new(DictEngine::new(config))))
    }

    #[tokio::test]
    async fn test_rebuild_events_and_progress() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_with_sources(dir.path());
        let mut events = runner.subscribe();

        let report = runner.rebuild().await.unwrap();
        assert_eq!(report.total_entries(), 2);

        assert!(matches!(events.recv().await.unwrap(), DictEvent::RebuildStarted { .. }));
        assert!(matches!(events.recv().await.unwrap(), DictEvent::RebuildProgress { .. }));
        assert!(matches!(events.recv().await.unwrap(), DictEvent::RebuildProgress { .. }));
        assert!(matches!(events.recv().await.unwrap(), DictEvent::RebuildCompleted { .. }));

        let progress = runner.progress();
        assert!(!progress.is_running);
        assert!(progress.is_done);
        assert_eq!(progress.tables_done, 2);
        assert_eq!(progress.entries_indexed, 2);
        assert!(progress.last_done_time.is_some());
    }

    #[tokio::test]
    async fn test_second_rebuild_refused() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_with_sources(dir.path());
        let mut events = runner.subscribe();

        runner.start_rebuild().unwrap();
        assert!(matches!(runner.start_rebuild(), Err(DictError::RebuildInProgress)));

        loop {
            match events.recv().await.unwrap() {
                DictEvent::RebuildCompleted { .. } => break,
                DictEvent::RebuildFailed { error } => panic!("rebuild failed: {}", error),
                _ => {}
            }
        }
        assert!(!runner.is_rebuilding());
    }

    #[tokio::test]
    async fn test_failed_rebuild_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.data.data_dir = dir.path().to_string_lossy().to_string();
        let runner = TaskRunner::new(Arc::new(DictEngine::new(config)));

        let err = runner.rebuild().await.unwrap_err();
        assert!(matches!(err, DictError::SourceMissing { .. }));

        let progress = runner.progress();
        assert!(!progress.is_done);
        assert!(progress.error.is_some());
        assert!(!runner.is_rebuilding());
    }

    #[tokio::test]
    async fn test_search_events() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_with_sources(dir.path());
        runner.rebuild().await.unwrap();

        let mut events = runner.subscribe();
        let outcome = runner.search(SearchQuery::new("hello")).await.unwrap();
        assert_eq!(outcome.keys, vec!["greet001"]);

        assert!(matches!(events.recv().await.unwrap(), DictEvent::SearchStarted { .. }));
        match events.recv().await.unwrap() {
            DictEvent::SearchCompleted { hits, .. } => assert_eq!(hits, 1),
            other => panic!("unexpected event {:?}", other),
        }

        let err = runner
            .search(SearchQuery::new("hello").with_languages(["xx"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DictError::InvalidQuery(_)));
        assert!(matches!(events.recv().await.unwrap(), DictEvent::SearchStarted { .. }));
        assert!(matches!(events.recv().await.unwrap(), DictEvent::SearchFailed { .. }));
    }
}
