//! Render finalization and delivery.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use tourcut_models::{RecordingId, RecordingStatus};
use tourcut_storage::{DeliveryClient, StorageResult};
use tourcut_store::Store;

use crate::error::{PipelineError, PipelineResult};

/// Uploads a finished video and returns its shareable link.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn upload_video(&self, path: &str, key: &str) -> StorageResult<String>;
}

#[async_trait]
impl Delivery for DeliveryClient {
    async fn upload_video(&self, path: &str, key: &str) -> StorageResult<String> {
        DeliveryClient::upload_video(self, path, key).await
    }
}

/// Applies terminal render outcomes: statuses, optional cloud upload,
/// shareable link.
///
/// Both entry points are idempotent, keyed on the recording's most
/// recent render job: once that job is terminal, further signals for
/// it are ignored. Upload problems are logged and swallowed; the
/// render itself succeeded and the recording finishes `rendered`
/// without a link.
pub struct DeliveryNotifier {
    store: Store,
    delivery: Option<Arc<dyn Delivery>>,
}

impl DeliveryNotifier {
    pub fn new(store: Store, delivery: Option<Arc<dyn Delivery>>) -> Self {
        Self { store, delivery }
    }

    /// Finalize a successful render.
    pub async fn on_render_complete(
        &self,
        recording_id: &RecordingId,
        output_path: &str,
    ) -> PipelineResult<()> {
        let job = self
            .store
            .render_jobs()
            .latest_for_recording(recording_id)
            .await?
            .ok_or_else(|| {
                PipelineError::not_found(format!("no render job for recording {}", recording_id))
            })?;

        if job.status.is_terminal() {
            info!(
                recording_id = %recording_id,
                render_job_id = %job.id,
                status = %job.status,
                "Render already finalized, ignoring completion signal"
            );
            return Ok(());
        }

        let job = job.complete(output_path);
        self.store.render_jobs().update(&job).await?;
        self.store
            .recordings()
            .update_status(recording_id, RecordingStatus::Rendered)
            .await?;
        info!(
            recording_id = %recording_id,
            render_job_id = %job.id,
            output = output_path,
            "Render completed"
        );

        self.upload_best_effort(recording_id, output_path).await?;
        Ok(())
    }

    /// Finalize a failed render. Terminal; nothing is retried.
    pub async fn on_render_error(
        &self,
        recording_id: &RecordingId,
        message: &str,
    ) -> PipelineResult<()> {
        let job = self
            .store
            .render_jobs()
            .latest_for_recording(recording_id)
            .await?
            .ok_or_else(|| {
                PipelineError::not_found(format!("no render job for recording {}", recording_id))
            })?;

        if job.status.is_terminal() {
            info!(
                recording_id = %recording_id,
                render_job_id = %job.id,
                status = %job.status,
                "Render already finalized, ignoring error signal"
            );
            return Ok(());
        }

        let job = job.fail(message);
        self.store.render_jobs().update(&job).await?;
        self.store
            .recordings()
            .update_status(recording_id, RecordingStatus::Failed)
            .await?;
        info!(
            recording_id = %recording_id,
            render_job_id = %job.id,
            error = message,
            "Render failed"
        );
        Ok(())
    }

    async fn upload_best_effort(
        &self,
        recording_id: &RecordingId,
        output_path: &str,
    ) -> PipelineResult<()> {
        let Some(delivery) = &self.delivery else {
            warn!(
                recording_id = %recording_id,
                "No delivery bucket configured, finished without a shareable link"
            );
            return Ok(());
        };

        let recording = self.store.recordings().get_required(recording_id).await?;
        let key = format!("renders/{}.mp4", recording.project_name());

        match delivery.upload_video(output_path, &key).await {
            Ok(link) => {
                self.store
                    .recordings()
                    .set_shareable_link(recording_id, &link)
                    .await?;
                info!(recording_id = %recording_id, link = %link, "Delivered video");
            }
            Err(e) => {
                warn!(
                    recording_id = %recording_id,
                    error = %e,
                    "Upload failed, finished without a shareable link"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourcut_models::{Recording, RenderJob, RenderJobStatus};
    use tourcut_storage::StorageError;

    struct StubDelivery {
        fail: bool,
    }

    #[async_trait]
    impl Delivery for StubDelivery {
        async fn upload_video(&self, _path: &str, key: &str) -> StorageResult<String> {
            if self.fail {
                Err(StorageError::upload_failed("bucket unreachable"))
            } else {
                Ok(format!("https://videos.example.com/{}", key))
            }
        }
    }

    async fn seeded() -> (Store, Recording, RenderJob) {
        let store = Store::open_in_memory().await.unwrap();
        let rec = Recording::new("Ada", "Kai");
        store.recordings().create(&rec).await.unwrap();
        let job = RenderJob::new(rec.id.clone());
        assert!(store.render_jobs().try_create(&job).await.unwrap());
        (store, rec, job)
    }

    #[tokio::test]
    async fn test_complete_marks_job_and_recording() {
        let (store, rec, job) = seeded().await;
        let notifier = DeliveryNotifier::new(store.clone(), None);

        notifier
            .on_render_complete(&rec.id, "/renders/out.mp4")
            .await
            .unwrap();

        let loaded = store.render_jobs().get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RenderJobStatus::Completed);
        assert_eq!(loaded.output_path.as_deref(), Some("/renders/out.mp4"));

        let recording = store.recordings().get_required(&rec.id).await.unwrap();
        assert_eq!(recording.status, RecordingStatus::Rendered);
        // No delivery configured: rendered, but no link.
        assert!(recording.shareable_link.is_none());
    }

    #[tokio::test]
    async fn test_upload_failure_is_non_fatal() {
        let (store, rec, job) = seeded().await;
        let notifier = DeliveryNotifier::new(
            store.clone(),
            Some(Arc::new(StubDelivery { fail: true })),
        );

        notifier
            .on_render_complete(&rec.id, "/renders/out.mp4")
            .await
            .unwrap();

        // The render still finishes; only the link is missing.
        let loaded = store.render_jobs().get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RenderJobStatus::Completed);
        let recording = store.recordings().get_required(&rec.id).await.unwrap();
        assert_eq!(recording.status, RecordingStatus::Rendered);
        assert!(recording.shareable_link.is_none());
    }

    #[tokio::test]
    async fn test_successful_upload_records_link() {
        let (store, rec, _job) = seeded().await;
        let notifier = DeliveryNotifier::new(
            store.clone(),
            Some(Arc::new(StubDelivery { fail: false })),
        );

        notifier
            .on_render_complete(&rec.id, "/renders/out.mp4")
            .await
            .unwrap();

        let recording = store.recordings().get_required(&rec.id).await.unwrap();
        let link = recording.shareable_link.unwrap();
        assert!(link.starts_with("https://videos.example.com/renders/"));
        assert!(link.ends_with(".mp4"));
    }

    #[tokio::test]
    async fn test_completion_is_idempotent() {
        let (store, rec, job) = seeded().await;
        let notifier = DeliveryNotifier::new(store.clone(), None);

        notifier
            .on_render_complete(&rec.id, "/renders/out.mp4")
            .await
            .unwrap();
        // A duplicate signal (retry from the external watcher) changes nothing.
        notifier
            .on_render_complete(&rec.id, "/renders/other.mp4")
            .await
            .unwrap();

        let loaded = store.render_jobs().get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.output_path.as_deref(), Some("/renders/out.mp4"));
    }

    #[tokio::test]
    async fn test_error_after_completion_is_ignored() {
        let (store, rec, job) = seeded().await;
        let notifier = DeliveryNotifier::new(store.clone(), None);

        notifier
            .on_render_complete(&rec.id, "/renders/out.mp4")
            .await
            .unwrap();
        notifier
            .on_render_error(&rec.id, "late failure report")
            .await
            .unwrap();

        let loaded = store.render_jobs().get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RenderJobStatus::Completed);
        let recording = store.recordings().get_required(&rec.id).await.unwrap();
        assert_eq!(recording.status, RecordingStatus::Rendered);
    }

    #[tokio::test]
    async fn test_error_marks_terminal_failure() {
        let (store, rec, job) = seeded().await;
        let notifier = DeliveryNotifier::new(store.clone(), None);

        notifier
            .on_render_error(&rec.id, "template missing")
            .await
            .unwrap();

        let loaded = store.render_jobs().get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RenderJobStatus::Failed);
        assert_eq!(loaded.error_message.as_deref(), Some("template missing"));
        let recording = store.recordings().get_required(&rec.id).await.unwrap();
        assert_eq!(recording.status, RecordingStatus::Failed);
    }

    #[tokio::test]
    async fn test_signal_without_job_is_not_found() {
        let store = Store::open_in_memory().await.unwrap();
        let rec = Recording::new("Ada", "Kai");
        store.recordings().create(&rec).await.unwrap();
        let notifier = DeliveryNotifier::new(store, None);

        let err = notifier
            .on_render_complete(&rec.id, "/renders/out.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }
}
