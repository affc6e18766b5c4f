//! Clip job repository.

use sqlx::{Pool, Row, Sqlite};

use tourcut_models::{ClipJob, ClipJobId, ClipJobStatus, RecordingId, SceneId};

use crate::db::parse_timestamp;
use crate::error::{StoreError, StoreResult};

/// Typed access to the `clip_jobs` table.
///
/// Rows are scoped by extraction attempt: each run of the extractor
/// writes a full set under a fresh attempt number, and the highest
/// attempt is the live set.
pub struct ClipJobRepository {
    pool: Pool<Sqlite>,
}

impl ClipJobRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Insert a job row.
    pub async fn insert(&self, job: &ClipJob) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO clip_jobs (id, recording_id, scene, slot_number, attempt, status, input_path, output_path, size_bytes, duration_seconds, error_message, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.as_str())
        .bind(job.recording_id.as_str())
        .bind(job.scene.as_str())
        .bind(job.slot_number as i64)
        .bind(job.attempt as i64)
        .bind(job.status.as_str())
        .bind(&job.input_path)
        .bind(&job.output_path)
        .bind(job.size_bytes.map(|b| b as i64))
        .bind(job.duration_seconds)
        .bind(&job.error_message)
        .bind(job.created_at.to_rfc3339())
        .bind(job.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist a job's mutable fields after a state change.
    pub async fn update(&self, job: &ClipJob) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE clip_jobs
            SET status = ?, output_path = ?, size_bytes = ?, error_message = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(job.status.as_str())
        .bind(&job.output_path)
        .bind(job.size_bytes.map(|b| b as i64))
        .bind(&job.error_message)
        .bind(job.updated_at.to_rfc3339())
        .bind(job.id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Highest attempt number recorded for a recording, 0 if none.
    pub async fn latest_attempt(&self, recording_id: &RecordingId) -> StoreResult<u32> {
        let attempt: Option<i64> =
            sqlx::query_scalar("SELECT MAX(attempt) FROM clip_jobs WHERE recording_id = ?")
                .bind(recording_id.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(attempt.unwrap_or(0) as u32)
    }

    /// The live job set: rows of the highest attempt, in slot order.
    pub async fn list_latest(&self, recording_id: &RecordingId) -> StoreResult<Vec<ClipJob>> {
        let rows = sqlx::query(
            r#"
            SELECT id, recording_id, scene, slot_number, attempt, status, input_path, output_path, size_bytes, duration_seconds, error_message, created_at, updated_at
            FROM clip_jobs
            WHERE recording_id = ?
              AND attempt = (SELECT MAX(attempt) FROM clip_jobs WHERE recording_id = ?)
            ORDER BY slot_number
            "#,
        )
        .bind(recording_id.as_str())
        .bind(recording_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_job).collect()
    }
}

fn row_to_job(row: sqlx::sqlite::SqliteRow) -> StoreResult<ClipJob> {
    let scene_str: String = row.get("scene");
    let scene = SceneId::parse(&scene_str)
        .ok_or_else(|| StoreError::corrupt(format!("bad scene {:?}", scene_str)))?;
    let status_str: String = row.get("status");
    let status = parse_status(&status_str)?;
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(ClipJob {
        id: ClipJobId::from_string(row.get::<String, _>("id")),
        recording_id: RecordingId::from_string(row.get::<String, _>("recording_id")),
        scene,
        slot_number: row.get::<i64, _>("slot_number") as u8,
        attempt: row.get::<i64, _>("attempt") as u32,
        status,
        input_path: row.get("input_path"),
        output_path: row.get("output_path"),
        size_bytes: row.get::<Option<i64>, _>("size_bytes").map(|b| b as u64),
        duration_seconds: row.get("duration_seconds"),
        error_message: row.get("error_message"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_status(s: &str) -> StoreResult<ClipJobStatus> {
    match s {
        "pending" => Ok(ClipJobStatus::Pending),
        "processing" => Ok(ClipJobStatus::Processing),
        "completed" => Ok(ClipJobStatus::Completed),
        "failed" => Ok(ClipJobStatus::Failed),
        other => Err(StoreError::corrupt(format!("bad clip job status {:?}", other))),
    }
}
