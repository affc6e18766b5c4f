//! Database connection and migrations.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::info;

use crate::clip_jobs::ClipJobRepository;
use crate::error::StoreResult;
use crate::recordings::RecordingRepository;
use crate::render_jobs::RenderJobRepository;
use crate::selections::SelectionRepository;

/// The backing SQLite store. Cheap to clone; repositories share the
/// pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Open (or create) the database file and run migrations.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", path.as_ref().display());
        Self::connect(&db_url).await
    }

    /// Open an in-memory database; used by tests.
    pub async fn open_in_memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    async fn connect(db_url: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Store ready");
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS recordings (
                id TEXT PRIMARY KEY,
                patron_name TEXT NOT NULL,
                staff_name TEXT NOT NULL,
                status TEXT NOT NULL,
                scene_durations TEXT NOT NULL DEFAULT '{}',
                shareable_link TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS slot_selections (
                recording_id TEXT NOT NULL REFERENCES recordings(id),
                slot_number INTEGER NOT NULL,
                window_start REAL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (recording_id, slot_number)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS clip_jobs (
                id TEXT PRIMARY KEY,
                recording_id TEXT NOT NULL REFERENCES recordings(id),
                scene TEXT NOT NULL,
                slot_number INTEGER NOT NULL,
                attempt INTEGER NOT NULL,
                status TEXT NOT NULL,
                input_path TEXT NOT NULL,
                output_path TEXT,
                size_bytes INTEGER,
                duration_seconds REAL NOT NULL,
                error_message TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_clip_jobs_recording ON clip_jobs(recording_id, attempt)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS render_jobs (
                id TEXT PRIMARY KEY,
                recording_id TEXT NOT NULL REFERENCES recordings(id),
                status TEXT NOT NULL,
                job_file_path TEXT,
                output_path TEXT,
                progress INTEGER NOT NULL DEFAULT 0,
                external_job_id TEXT,
                error_message TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_render_jobs_recording ON render_jobs(recording_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Cheap connectivity check for readiness probes.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Recording repository.
    pub fn recordings(&self) -> RecordingRepository {
        RecordingRepository::new(self.pool.clone())
    }

    /// Slot selection repository.
    pub fn selections(&self) -> SelectionRepository {
        SelectionRepository::new(self.pool.clone())
    }

    /// Clip job repository.
    pub fn clip_jobs(&self) -> ClipJobRepository {
        ClipJobRepository::new(self.pool.clone())
    }

    /// Render job repository.
    pub fn render_jobs(&self) -> RenderJobRepository {
        RenderJobRepository::new(self.pool.clone())
    }
}

/// Parse an RFC 3339 timestamp stored as TEXT.
pub(crate) fn parse_timestamp(s: &str) -> crate::error::StoreResult<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| crate::error::StoreError::corrupt(format!("bad timestamp {:?}: {}", s, e)))
}
