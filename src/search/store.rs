//! SQLite copy of the published tables / 数据库持久化
//!
//! Storage layout:
//! - one table per language: `text_<lang>(id, text_id UNIQUE, text)`
//! - `dict_meta`: last rebuild time per language
//!
//! The in-memory generations are authoritative for queries; this store only
//! lets a restart skip re-parsing the source files. One pool lives for the
//! whole process, nothing is reopened per query.

use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;

use crate::error::Result;
use crate::search::schema::{Entry, Language};

/// Language codes are validated as `[a-z0-9_]+` before they reach SQL
fn create_table_sql(language: &Language) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS text_{} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text_id TEXT NOT NULL UNIQUE,
            text TEXT NOT NULL
        )
        "#,
        language
    )
}

/// Persisted table content plus its rebuild time / 持久化的表内容
pub struct StoredTable {
    pub entries: Vec<(String, String)>,
    pub last_updated: Option<i64>,
}

/// Dictionary database / 词典数据库
#[derive(Clone)]
pub struct DictStore {
    db: Pool<Sqlite>,
}

impl DictStore {
    /// Open (or create) the database file in WAL mode / 打开数据库
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.to_string_lossy());
        let db = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&db_url)
            .await?;

        // 启用WAL模式，提高并发性能
        sqlx::query("PRAGMA journal_mode=WAL").execute(&db).await?;
        // 设置busy_timeout，避免锁超时
        sqlx::query("PRAGMA busy_timeout=5000").execute(&db).await?;
        sqlx::query("PRAGMA synchronous=NORMAL").execute(&db).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dict_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await?;

        tracing::info!("Dictionary database opened: {:?} (WAL mode)", db_path);
        Ok(Self { db })
    }

    /// Close database connection pool / 关闭数据库连接池
    pub async fn close(&self) {
        self.db.close().await;
    }

    /// Create the table of a language if missing / 创建语言表
    pub async fn init_table(&self, language: &Language) -> Result<()> {
        sqlx::query(&create_table_sql(language))
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Replace several tables in a single transaction / 在一个事务中替换多张表
    ///
    /// Either every table gets its new content or none does.
    pub async fn replace_tables(&self, tables: &[(&Language, &[Entry])]) -> Result<()> {
        let mut tx = self.db.begin().await?;
        let now = chrono::Utc::now().timestamp();

        for (language, entries) in tables {
            sqlx::query(&create_table_sql(language))
                .execute(&mut *tx)
                .await?;

            sqlx::query(&format!("DELETE FROM text_{}", language))
                .execute(&mut *tx)
                .await?;

            let insert = format!(
                "INSERT OR REPLACE INTO text_{} (text_id, text) VALUES (?, ?)",
                language
            );
            for entry in entries.iter() {
                sqlx::query(&insert)
                    .bind(&entry.key)
                    .bind(&entry.raw_text)
                    .execute(&mut *tx)
                    .await?;
            }

            sqlx::query("INSERT OR REPLACE INTO dict_meta (key, value) VALUES (?, ?)")
                .bind(format!("last_updated_{}", language))
                .bind(now.to_string())
                .execute(&mut *tx)
                .await?;

            tracing::debug!("Persisted {} entries into text_{}", entries.len(), language);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Load a table in insertion order / 读取语言表
    pub async fn load_table(&self, language: &Language) -> Result<StoredTable> {
        self.init_table(language).await?;

        let rows = sqlx::query(&format!("SELECT text_id, text FROM text_{} ORDER BY id", language))
            .fetch_all(&self.db)
            .await?;

        let entries = rows
            .iter()
            .map(|row| (row.get::<String, _>("text_id"), row.get::<String, _>("text")))
            .collect();

        Ok(StoredTable {
            entries,
            last_updated: self.get_last_updated(language).await,
        })
    }

    /// Get table rebuild time / 获取表更新时间
    pub async fn get_last_updated(&self, language: &Language) -> Option<i64> {
        let result: Option<(String,)> = sqlx::query_as("SELECT value FROM dict_meta WHERE key = ?")
            .bind(format!("last_updated_{}", language))
            .fetch_optional(&self.db)
            .await
            .ok()
            .flatten();

        result.and_then(|(v,)| v.parse::<i64>().ok())
    }

    /// Row count of a table / 表的行数
    pub async fn count(&self, language: &Language) -> Result<i64> {
        self.init_table(language).await?;
        let row = sqlx::query(&format!("SELECT COUNT(*) as cnt FROM text_{}", language))
            .fetch_one(&self.db)
            .await?;
        Ok(row.get("cnt"))
    }
}
