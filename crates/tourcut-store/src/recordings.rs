//! Recording repository.

use sqlx::{Pool, Row, Sqlite};
use tracing::info;

use tourcut_models::{Recording, RecordingId, RecordingStatus, SceneId};

use crate::db::parse_timestamp;
use crate::error::{StoreError, StoreResult};

/// Typed access to the `recordings` table.
pub struct RecordingRepository {
    pool: Pool<Sqlite>,
}

impl RecordingRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Register a recording.
    pub async fn create(&self, recording: &Recording) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO recordings (id, patron_name, staff_name, status, scene_durations, shareable_link, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(recording.id.as_str())
        .bind(&recording.patron_name)
        .bind(&recording.staff_name)
        .bind(recording.status.as_str())
        .bind(serde_json::to_string(&recording.scene_durations).unwrap_or_else(|_| "{}".into()))
        .bind(&recording.shareable_link)
        .bind(recording.created_at.to_rfc3339())
        .bind(recording.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!(recording_id = %recording.id, "Registered recording");
        Ok(())
    }

    /// Fetch a recording by ID.
    pub async fn get(&self, id: &RecordingId) -> StoreResult<Option<Recording>> {
        let row = sqlx::query(
            "SELECT id, patron_name, staff_name, status, scene_durations, shareable_link, created_at, updated_at FROM recordings WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_recording).transpose()
    }

    /// Fetch a recording, erroring when absent.
    pub async fn get_required(&self, id: &RecordingId) -> StoreResult<Recording> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("recording {}", id)))
    }

    /// Update lifecycle status.
    pub async fn update_status(&self, id: &RecordingId, status: RecordingStatus) -> StoreResult<()> {
        sqlx::query("UPDATE recordings SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record a scene's captured duration.
    pub async fn set_scene_duration(
        &self,
        id: &RecordingId,
        scene: SceneId,
        seconds: f64,
    ) -> StoreResult<()> {
        let mut recording = self.get_required(id).await?;
        recording
            .scene_durations
            .insert(scene.as_str().to_string(), seconds);

        sqlx::query("UPDATE recordings SET scene_durations = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(&recording.scene_durations).unwrap_or_else(|_| "{}".into()))
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record the delivered video's shareable link.
    pub async fn set_shareable_link(&self, id: &RecordingId, link: &str) -> StoreResult<()> {
        sqlx::query("UPDATE recordings SET shareable_link = ?, updated_at = ? WHERE id = ?")
            .bind(link)
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn row_to_recording(row: sqlx::sqlite::SqliteRow) -> StoreResult<Recording> {
    let status_str: String = row.get("status");
    let status = parse_status(&status_str)?;
    let durations_str: String = row.get("scene_durations");
    let scene_durations = serde_json::from_str(&durations_str)
        .map_err(|e| StoreError::corrupt(format!("bad scene_durations: {}", e)))?;
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Recording {
        id: RecordingId::from_string(row.get::<String, _>("id")),
        patron_name: row.get("patron_name"),
        staff_name: row.get("staff_name"),
        status,
        scene_durations,
        shareable_link: row.get("shareable_link"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_status(s: &str) -> StoreResult<RecordingStatus> {
    match s {
        "recording" => Ok(RecordingStatus::Recording),
        "recorded" => Ok(RecordingStatus::Recorded),
        "exporting" => Ok(RecordingStatus::Exporting),
        "rendered" => Ok(RecordingStatus::Rendered),
        "failed" => Ok(RecordingStatus::Failed),
        other => Err(StoreError::corrupt(format!("bad recording status {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use crate::Store;
    use tourcut_models::{Recording, RecordingStatus, SceneId};

    #[tokio::test]
    async fn test_create_and_get_recording() {
        let store = Store::open_in_memory().await.unwrap();
        let repo = store.recordings();

        let rec = Recording::new("Ada", "Kai");
        repo.create(&rec).await.unwrap();

        let loaded = repo.get(&rec.id).await.unwrap().unwrap();
        assert_eq!(loaded.patron_name, "Ada");
        assert_eq!(loaded.status, RecordingStatus::Recording);
    }

    #[tokio::test]
    async fn test_scene_duration_and_status_updates() {
        let store = Store::open_in_memory().await.unwrap();
        let repo = store.recordings();

        let rec = Recording::new("Ada", "Kai");
        repo.create(&rec).await.unwrap();

        repo.set_scene_duration(&rec.id, SceneId::Cruising, 60.0)
            .await
            .unwrap();
        repo.update_status(&rec.id, RecordingStatus::Recorded)
            .await
            .unwrap();

        let loaded = repo.get_required(&rec.id).await.unwrap();
        assert_eq!(loaded.scene_duration(SceneId::Cruising), Some(60.0));
        assert_eq!(loaded.status, RecordingStatus::Recorded);
    }

    #[tokio::test]
    async fn test_get_missing_recording() {
        let store = Store::open_in_memory().await.unwrap();
        let repo = store.recordings();
        let missing = repo
            .get(&tourcut_models::RecordingId::from_string("nope"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
