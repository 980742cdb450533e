//! Analysis persistence: a key-value store of finished analyses.
//!
//! The scheduler only sees the [`AnalysisStore`] trait; the default backend
//! is libsql (in-memory for development and tests, file-backed in
//! production).

use crate::types::{AppError, Result, StoredAnalysis};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{Builder, Connection, Database};

/// Store of persisted analyses, keyed by generated id.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Persist one finished analysis. Append-only: ids are never overwritten.
    async fn save(&self, record: &StoredAnalysis) -> Result<()>;

    /// Fetch a persisted analysis; `Ok(None)` for an unknown id.
    async fn fetch(&self, id: &str) -> Result<Option<StoredAnalysis>>;
}

pub struct LibsqlStore {
    db: Database,
}

impl LibsqlStore {
    /// In-memory store, lost on restart.
    pub async fn new_memory() -> Result<Self> {
        Self::build(":memory:").await
    }

    /// File-backed store.
    pub async fn new_file(path: &str) -> Result<Self> {
        Self::build(path).await
    }

    async fn build(path: &str) -> Result<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let store = Self { db };
        store.initialize_schema().await?;
        Ok(store)
    }

    fn connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS analyses (
                id TEXT PRIMARY KEY,
                topic TEXT NOT NULL,
                result TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create analyses table: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl AnalysisStore for LibsqlStore {
    async fn save(&self, record: &StoredAnalysis) -> Result<()> {
        let conn = self.connection()?;
        let result_json = serde_json::to_string(&record.result)
            .map_err(|e| AppError::Database(format!("Failed to serialize result: {}", e)))?;

        conn.execute(
            "INSERT INTO analyses (id, topic, result, created_at) VALUES (?1, ?2, ?3, ?4)",
            (
                record.id.as_str(),
                record.topic.as_str(),
                result_json,
                Utc::now().timestamp(),
            ),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to save analysis: {}", e)))?;

        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<StoredAnalysis>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query("SELECT id, topic, result FROM analyses WHERE id = ?1", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to fetch analysis: {}", e)))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(format!("Failed to read row: {}", e)))?
        else {
            return Ok(None);
        };

        let id: String = row
            .get(0)
            .map_err(|e| AppError::Database(format!("Failed to read id column: {}", e)))?;
        let topic: String = row
            .get(1)
            .map_err(|e| AppError::Database(format!("Failed to read topic column: {}", e)))?;
        let result_json: String = row
            .get(2)
            .map_err(|e| AppError::Database(format!("Failed to read result column: {}", e)))?;

        let result = serde_json::from_str(&result_json)
            .map_err(|e| AppError::Database(format!("Failed to deserialize result: {}", e)))?;

        Ok(Some(StoredAnalysis { id, topic, result }))
    }
}
