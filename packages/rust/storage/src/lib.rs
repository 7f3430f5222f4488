//! libSQL storage layer (local file, offline mode).
//!
//! The [`Storage`] struct persists the pipeline state record per channel and
//! a history of pipeline runs.
//!
//! **Access rules:**
//! - `analyze` / `generate`: read-write via [`Storage::open`]
//! - `status` / `history`: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use channelscope_shared::{ChannelScopeError, Result};
use libsql::{Connection, Database, params};
use serde::Serialize;
use uuid::Uuid;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// One row of run history.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: String,
    pub channel_id: String,
    /// `analyze` or `generate`.
    pub kind: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Terminal phase label, `None` while the run is in flight.
    pub phase: Option<String>,
    pub detail: Option<String>,
    pub artifact_path: Option<String>,
}

/// A stored state record and when it was last written.
#[derive(Debug, Clone)]
pub struct StoredState {
    pub channel_id: String,
    pub state_json: String,
    pub updated_at: DateTime<Utc>,
}

fn storage_err(e: impl std::fmt::Display) -> ChannelScopeError {
    ChannelScopeError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ChannelScopeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ChannelScopeError::Storage(format!(
                "no state database at {}; run `channelscope analyze` first",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        ChannelScopeError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 on a fresh database.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(ChannelScopeError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Pipeline state
    // -----------------------------------------------------------------------

    /// Store the serialized state record for a channel (upserts).
    pub async fn save_state(&self, channel_id: &str, state_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = now_ts();
        self.conn
            .execute(
                "INSERT INTO pipeline_state (channel_id, state_json, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(channel_id) DO UPDATE SET
                   state_json = excluded.state_json,
                   updated_at = excluded.updated_at",
                params![channel_id, state_json, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Load the serialized state record for a channel.
    pub async fn load_state(&self, channel_id: &str) -> Result<Option<StoredState>> {
        let mut rows = self
            .conn
            .query(
                "SELECT channel_id, state_json, updated_at FROM pipeline_state
                 WHERE channel_id = ?1",
                params![channel_id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(row_to_state(&row)?)),
            None => Ok(None),
        }
    }

    /// The most recently updated state record of any channel.
    pub async fn latest_state(&self) -> Result<Option<StoredState>> {
        let mut rows = self
            .conn
            .query(
                "SELECT channel_id, state_json, updated_at FROM pipeline_state
                 ORDER BY updated_at DESC LIMIT 1",
                params![],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(row_to_state(&row)?)),
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Run history
    // -----------------------------------------------------------------------

    /// Record the start of a run. Returns the generated run ID.
    pub async fn insert_run(&self, channel_id: &str, kind: &str) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = now_ts();
        self.conn
            .execute(
                "INSERT INTO runs (id, channel_id, kind, started_at) VALUES (?1, ?2, ?3, ?4)",
                params![id.as_str(), channel_id, kind, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(id)
    }

    /// Mark a run finished with its terminal phase.
    pub async fn finish_run(
        &self,
        run_id: &str,
        phase: &str,
        detail: &str,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        self.check_writable()?;
        let now = now_ts();
        self.conn
            .execute(
                "UPDATE runs SET finished_at = ?1, phase = ?2, detail = ?3, artifact_path = ?4
                 WHERE id = ?5",
                params![now.as_str(), phase, detail, artifact_path, run_id],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Most recent runs first.
    pub async fn list_runs(&self, limit: u32) -> Result<Vec<RunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, channel_id, kind, started_at, finished_at, phase, detail, artifact_path
                 FROM runs ORDER BY started_at DESC, id DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_run(&row)?);
        }
        Ok(results)
    }
}

/// Fixed-width timestamps so `ORDER BY` on the text column is chronological.
fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ChannelScopeError::Storage(format!("invalid date: {e}")))
}

fn row_to_state(row: &libsql::Row) -> Result<StoredState> {
    let updated: String = row.get(2).map_err(storage_err)?;
    Ok(StoredState {
        channel_id: row.get::<String>(0).map_err(storage_err)?,
        state_json: row.get::<String>(1).map_err(storage_err)?,
        updated_at: parse_ts(&updated)?,
    })
}

fn row_to_run(row: &libsql::Row) -> Result<RunRecord> {
    let started: String = row.get(3).map_err(storage_err)?;
    let finished: Option<String> = row.get::<String>(4).ok();
    Ok(RunRecord {
        id: row.get::<String>(0).map_err(storage_err)?,
        channel_id: row.get::<String>(1).map_err(storage_err)?,
        kind: row.get::<String>(2).map_err(storage_err)?,
        started_at: parse_ts(&started)?,
        finished_at: finished.as_deref().map(parse_ts).transpose()?,
        phase: row.get::<String>(5).ok(),
        detail: row.get::<String>(6).ok(),
        artifact_path: row.get::<String>(7).ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("cs_test_{}.db", Uuid::now_v7()))
    }

    async fn test_storage() -> Storage {
        Storage::open(&temp_db_path()).await.expect("open test db")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = temp_db_path();
        let first = Storage::open(&tmp).await.expect("first open");
        drop(first);
        let second = Storage::open(&tmp).await.expect("second open");
        assert_eq!(second.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn state_roundtrip_and_upsert() {
        let storage = test_storage().await;
        assert!(storage.load_state("UC1").await.expect("load").is_none());

        storage
            .save_state("UC1", r#"{"phase":"waiting"}"#)
            .await
            .expect("save");
        storage
            .save_state("UC1", r#"{"phase":"completed"}"#)
            .await
            .expect("save again");

        let after_save = Utc::now();
        let state = storage.load_state("UC1").await.expect("load").expect("present");
        assert!(state.state_json.contains("completed"));
        assert_eq!(state.channel_id, "UC1");
        assert!(state.updated_at <= after_save);
        assert!(storage.load_state("UC2").await.expect("load").is_none());
    }

    #[tokio::test]
    async fn latest_state_tracks_last_write() {
        let storage = test_storage().await;
        assert!(storage.latest_state().await.expect("latest").is_none());

        storage.save_state("UCa", "{}").await.expect("save a");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        storage.save_state("UCb", "{}").await.expect("save b");

        let latest = storage.latest_state().await.expect("latest").expect("some");
        assert_eq!(latest.channel_id, "UCb");
    }

    #[tokio::test]
    async fn run_lifecycle() {
        let storage = test_storage().await;
        let run_id = storage.insert_run("UC1", "analyze").await.expect("insert");
        assert!(!run_id.is_empty());

        let runs = storage.list_runs(10).await.expect("list");
        assert_eq!(runs.len(), 1);
        assert!(runs[0].finished_at.is_none());
        assert!(runs[0].phase.is_none());

        storage
            .finish_run(&run_id, "completed", "done", Some("/tmp/storyboard.json"))
            .await
            .expect("finish");

        let runs = storage.list_runs(10).await.expect("list");
        assert_eq!(runs[0].kind, "analyze");
        assert_eq!(runs[0].phase.as_deref(), Some("completed"));
        assert_eq!(runs[0].artifact_path.as_deref(), Some("/tmp/storyboard.json"));
        assert!(runs[0].finished_at.is_some());
    }

    #[tokio::test]
    async fn list_runs_respects_limit() {
        let storage = test_storage().await;
        for _ in 0..3 {
            storage.insert_run("UC1", "generate").await.expect("insert");
        }
        assert_eq!(storage.list_runs(2).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = temp_db_path();
        let rw = Storage::open(&tmp).await.expect("open");
        rw.save_state("UC1", "{}").await.expect("save");
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.expect("open readonly");
        assert!(ro.load_state("UC1").await.expect("read").is_some());
        let result = ro.save_state("UC1", "{}").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        assert!(Storage::open_readonly(&temp_db_path()).await.is_err());
    }
}
