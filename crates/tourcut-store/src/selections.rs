//! Slot selection repository.

use sqlx::{Pool, Row, Sqlite};

use tourcut_models::{RecordingId, SlotSelection};

use crate::db::parse_timestamp;
use crate::error::StoreResult;

/// Typed access to the `slot_selections` table.
///
/// A NULL `window_start` is the unpositioned sentinel; `0.0` is a
/// real placement at the start of the footage.
pub struct SelectionRepository {
    pool: Pool<Sqlite>,
}

impl SelectionRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Create sentinel rows for every template slot of a recording.
    /// Existing rows are left untouched, so this is safe to repeat.
    pub async fn init_sentinels(
        &self,
        recording_id: &RecordingId,
        slot_numbers: impl IntoIterator<Item = u8>,
    ) -> StoreResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        for slot in slot_numbers {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO slot_selections (recording_id, slot_number, window_start, updated_at)
                VALUES (?, ?, NULL, ?)
                "#,
            )
            .bind(recording_id.as_str())
            .bind(slot as i64)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// All selections for a recording, in slot order.
    pub async fn list(&self, recording_id: &RecordingId) -> StoreResult<Vec<SlotSelection>> {
        let rows = sqlx::query(
            "SELECT recording_id, slot_number, window_start, updated_at FROM slot_selections WHERE recording_id = ? ORDER BY slot_number",
        )
        .bind(recording_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_selection).collect()
    }

    /// One selection.
    pub async fn get(
        &self,
        recording_id: &RecordingId,
        slot_number: u8,
    ) -> StoreResult<Option<SlotSelection>> {
        let row = sqlx::query(
            "SELECT recording_id, slot_number, window_start, updated_at FROM slot_selections WHERE recording_id = ? AND slot_number = ?",
        )
        .bind(recording_id.as_str())
        .bind(slot_number as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_selection).transpose()
    }

    /// Write a batch of placements (slot number, window start).
    pub async fn set_many(
        &self,
        recording_id: &RecordingId,
        placements: &[(u8, f64)],
    ) -> StoreResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        for (slot, start) in placements {
            sqlx::query(
                r#"
                INSERT INTO slot_selections (recording_id, slot_number, window_start, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (recording_id, slot_number)
                DO UPDATE SET window_start = excluded.window_start, updated_at = excluded.updated_at
                "#,
            )
            .bind(recording_id.as_str())
            .bind(*slot as i64)
            .bind(*start)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Delete all selections of a recording.
    pub async fn delete_for_recording(&self, recording_id: &RecordingId) -> StoreResult<()> {
        sqlx::query("DELETE FROM slot_selections WHERE recording_id = ?")
            .bind(recording_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn row_to_selection(row: sqlx::sqlite::SqliteRow) -> StoreResult<SlotSelection> {
    let updated_at: String = row.get("updated_at");
    Ok(SlotSelection {
        recording_id: RecordingId::from_string(row.get::<String, _>("recording_id")),
        slot_number: row.get::<i64, _>("slot_number") as u8,
        window_start: row.get("window_start"),
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Store;
    use tourcut_models::{Recording, SlotCatalog};

    async fn seeded() -> (Store, tourcut_models::RecordingId) {
        let store = Store::open_in_memory().await.unwrap();
        let rec = Recording::new("Ada", "Kai");
        store.recordings().create(&rec).await.unwrap();
        (store, rec.id)
    }

    #[tokio::test]
    async fn test_sentinels_then_placements() {
        let (store, rec_id) = seeded().await;
        let repo = store.selections();
        let catalog = SlotCatalog::standard();

        repo.init_sentinels(&rec_id, catalog.slots().iter().map(|s| s.number))
            .await
            .unwrap();

        let all = repo.list(&rec_id).await.unwrap();
        assert_eq!(all.len(), 14);
        assert!(all.iter().all(|s| !s.is_positioned()));

        repo.set_many(&rec_id, &[(1, 0.0), (2, 1.3)]).await.unwrap();

        let slot1 = repo.get(&rec_id, 1).await.unwrap().unwrap();
        assert_eq!(slot1.window_start, Some(0.0));
        let slot3 = repo.get(&rec_id, 3).await.unwrap().unwrap();
        assert!(!slot3.is_positioned());
    }

    #[tokio::test]
    async fn test_init_sentinels_is_idempotent() {
        let (store, rec_id) = seeded().await;
        let repo = store.selections();

        repo.init_sentinels(&rec_id, 1..=14).await.unwrap();
        repo.set_many(&rec_id, &[(5, 23.6)]).await.unwrap();
        // A second init must not wipe the placement.
        repo.init_sentinels(&rec_id, 1..=14).await.unwrap();

        let slot5 = repo.get(&rec_id, 5).await.unwrap().unwrap();
        assert_eq!(slot5.window_start, Some(23.6));
    }

    #[tokio::test]
    async fn test_delete_for_recording() {
        let (store, rec_id) = seeded().await;
        let repo = store.selections();

        repo.init_sentinels(&rec_id, 1..=14).await.unwrap();
        repo.delete_for_recording(&rec_id).await.unwrap();
        assert!(repo.list(&rec_id).await.unwrap().is_empty());
    }
}
