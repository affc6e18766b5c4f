//! Render job repository.

use sqlx::{Pool, Row, Sqlite};

use tourcut_models::{RecordingId, RenderJob, RenderJobId, RenderJobStatus};

use crate::db::parse_timestamp;
use crate::error::{StoreError, StoreResult};

/// Typed access to the `render_jobs` table.
pub struct RenderJobRepository {
    pool: Pool<Sqlite>,
}

impl RenderJobRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Insert a render job only if the recording has no live
    /// (non-terminal) job. Returns whether the row was created; the
    /// conditional insert makes the one-live-job rule hold even with
    /// concurrent submitters.
    pub async fn try_create(&self, job: &RenderJob) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO render_jobs (id, recording_id, status, job_file_path, output_path, progress, external_job_id, error_message, created_at, updated_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM render_jobs
                WHERE recording_id = ? AND status NOT IN ('completed', 'failed')
            )
            "#,
        )
        .bind(job.id.as_str())
        .bind(job.recording_id.as_str())
        .bind(job.status.as_str())
        .bind(&job.job_file_path)
        .bind(&job.output_path)
        .bind(job.progress as i64)
        .bind(&job.external_job_id)
        .bind(&job.error_message)
        .bind(job.created_at.to_rfc3339())
        .bind(job.updated_at.to_rfc3339())
        .bind(job.recording_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch a job by ID.
    pub async fn get(&self, id: &RenderJobId) -> StoreResult<Option<RenderJob>> {
        let row = sqlx::query(
            "SELECT id, recording_id, status, job_file_path, output_path, progress, external_job_id, error_message, created_at, updated_at FROM render_jobs WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_job).transpose()
    }

    /// The recording's live (non-terminal) job, if any.
    pub async fn live_for_recording(
        &self,
        recording_id: &RecordingId,
    ) -> StoreResult<Option<RenderJob>> {
        let row = sqlx::query(
            r#"
            SELECT id, recording_id, status, job_file_path, output_path, progress, external_job_id, error_message, created_at, updated_at
            FROM render_jobs
            WHERE recording_id = ? AND status NOT IN ('completed', 'failed')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(recording_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_job).transpose()
    }

    /// Most recent job for a recording, live or not.
    pub async fn latest_for_recording(
        &self,
        recording_id: &RecordingId,
    ) -> StoreResult<Option<RenderJob>> {
        let row = sqlx::query(
            r#"
            SELECT id, recording_id, status, job_file_path, output_path, progress, external_job_id, error_message, created_at, updated_at
            FROM render_jobs
            WHERE recording_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(recording_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_job).transpose()
    }

    /// Persist a job's mutable fields after a state change.
    pub async fn update(&self, job: &RenderJob) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE render_jobs
            SET status = ?, job_file_path = ?, output_path = ?, progress = ?, external_job_id = ?, error_message = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(job.status.as_str())
        .bind(&job.job_file_path)
        .bind(&job.output_path)
        .bind(job.progress as i64)
        .bind(&job.external_job_id)
        .bind(&job.error_message)
        .bind(job.updated_at.to_rfc3339())
        .bind(job.id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_job(row: sqlx::sqlite::SqliteRow) -> StoreResult<RenderJob> {
    let status_str: String = row.get("status");
    let status = parse_status(&status_str)?;
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(RenderJob {
        id: RenderJobId::from_string(row.get::<String, _>("id")),
        recording_id: RecordingId::from_string(row.get::<String, _>("recording_id")),
        status,
        job_file_path: row.get("job_file_path"),
        output_path: row.get("output_path"),
        progress: row.get::<i64, _>("progress") as u8,
        external_job_id: row.get("external_job_id"),
        error_message: row.get("error_message"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_status(s: &str) -> StoreResult<RenderJobStatus> {
    match s {
        "pending" => Ok(RenderJobStatus::Pending),
        "processing" => Ok(RenderJobStatus::Processing),
        "rendering" => Ok(RenderJobStatus::Rendering),
        "completed" => Ok(RenderJobStatus::Completed),
        "failed" => Ok(RenderJobStatus::Failed),
        other => Err(StoreError::corrupt(format!("bad render job status {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use crate::Store;
    use tourcut_models::{Recording, RenderJob, RenderJobStatus};

    async fn seeded() -> (Store, tourcut_models::RecordingId) {
        let store = Store::open_in_memory().await.unwrap();
        let rec = Recording::new("Ada", "Kai");
        store.recordings().create(&rec).await.unwrap();
        (store, rec.id)
    }

    #[tokio::test]
    async fn test_one_live_job_per_recording() {
        let (store, rec_id) = seeded().await;
        let repo = store.render_jobs();

        let first = RenderJob::new(rec_id.clone());
        assert!(repo.try_create(&first).await.unwrap());

        // Second submit while the first is live is rejected.
        let second = RenderJob::new(rec_id.clone());
        assert!(!repo.try_create(&second).await.unwrap());
        assert!(repo.get(&second.id).await.unwrap().is_none());

        // Once the first reaches a terminal state, a new job may be created.
        let done = first.complete("/renders/out.mp4");
        repo.update(&done).await.unwrap();
        assert!(repo.live_for_recording(&rec_id).await.unwrap().is_none());

        let third = RenderJob::new(rec_id.clone());
        assert!(repo.try_create(&third).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_round_trips() {
        let (store, rec_id) = seeded().await;
        let repo = store.render_jobs();

        let job = RenderJob::new(rec_id.clone()).with_job_file("/queue/job.json");
        assert!(repo.try_create(&job).await.unwrap());

        let rendering = job.start().rendering();
        repo.update(&rendering).await.unwrap();

        let loaded = repo.get(&rendering.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RenderJobStatus::Rendering);
        assert_eq!(loaded.progress, 50);
        assert_eq!(loaded.job_file_path.as_deref(), Some("/queue/job.json"));

        let latest = repo.latest_for_recording(&rec_id).await.unwrap().unwrap();
        assert_eq!(latest.id, rendering.id);
    }
}
