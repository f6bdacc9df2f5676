use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use sc_cn_dict::config;
use sc_cn_dict::{DictEngine, DictEvent, TaskRunner};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sc_cn_dict=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config(&config::default_config_path())?;
    tracing::info!("Server will listen on {}:{}", app_config.server.host, app_config.server.port);

    // Create data directories if not exist / 创建数据目录
    let text_dir = app_config.get_text_dir();
    if !text_dir.exists() {
        std::fs::create_dir_all(&text_dir)?;
        tracing::info!("Created text directory: {:?}", text_dir);
    }

    let engine = Arc::new(DictEngine::open(app_config.clone()).await?);
    let runner = Arc::new(TaskRunner::new(Arc::clone(&engine)));

    // Log engine events in the background / 后台记录引擎事件
    let mut events = runner.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(DictEvent::RebuildProgress { language, entries }) => {
                    tracing::debug!("Rebuild progress: {} ({} entries)", language, entries);
                }
                Ok(DictEvent::RebuildFailed { error }) => {
                    tracing::warn!("Rebuild failed: {}", error);
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Event logger skipped {} events", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    if engine.is_empty() && app_config.search.auto_rebuild_on_start {
        tracing::info!("Index is empty, starting initial rebuild");
        if let Err(e) = runner.start_rebuild() {
            tracing::warn!("Initial rebuild not started: {}", e);
        }
    }

    let state = Arc::new(AppState::new(runner));
    let app = api::router(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
