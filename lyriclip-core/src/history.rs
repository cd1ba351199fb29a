use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

const SCHEMA_SQL: &str = r"
-- Append-only log of completed generations
CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    song TEXT NOT NULL,
    artist TEXT NOT NULL,
    filename TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
";

/// A completed generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub song: String,
    pub artist: String,
    /// Video file name inside the output directory
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

/// Fields of a history record before it is assigned an ID
#[derive(Debug, Clone)]
pub struct NewHistoryRecord {
    pub song: String,
    pub artist: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only log of completed generations
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    /// Append a record, returning its ID
    async fn append(&self, record: NewHistoryRecord) -> Result<i64>;

    /// All records, newest first
    async fn list_all(&self) -> Result<Vec<HistoryRecord>>;
}

/// SQLite-backed generation history
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open the history at a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub async fn open(path: &Path) -> Result<Self> {
        info!("Opening history database at {:?}", path);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).await?;
        Self::init(conn).await
    }

    /// Open a throwaway in-memory history
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA_SQL)?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            Ok(())
        })
        .await?;

        info!("History database initialized");
        Ok(Self { conn })
    }

    /// Checkpoint WAL for clean shutdown
    ///
    /// # Errors
    ///
    /// Returns an error if the WAL checkpoint fails.
    pub async fn checkpoint(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")?;
                Ok(())
            })
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl HistoryRecorder for HistoryStore {
    async fn append(&self, record: NewHistoryRecord) -> Result<i64> {
        debug!(
            "Recording generation: {} - {} ({})",
            record.artist, record.song, record.filename
        );

        self.conn
            .call(move |conn| {
                conn.execute(
                    r"
                    INSERT INTO history (song, artist, filename, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                ",
                    rusqlite::params![
                        record.song,
                        record.artist,
                        record.filename,
                        record.created_at.timestamp()
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Into::into)
    }

    async fn list_all(&self) -> Result<Vec<HistoryRecord>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare_cached(
                    r"
                    SELECT id, song, artist, filename, created_at
                    FROM history
                    ORDER BY id DESC
                ",
                )?;

                let records = stmt
                    .query_map([], |row| {
                        Ok(HistoryRecord {
                            id: row.get(0)?,
                            song: row.get(1)?,
                            artist: row.get(2)?,
                            filename: row.get(3)?,
                            created_at: DateTime::from_timestamp(row.get::<_, i64>(4)?, 0)
                                .unwrap_or_default(),
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                Ok(records)
            })
            .await
            .map_err(Into::into)
    }
}
