//! Background worker that drives queued renders to a terminal state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use tourcut_media::move_file;
use tourcut_models::RenderJobId;
use tourcut_store::Store;

use crate::notifier::DeliveryNotifier;

/// Channel between the orchestrator and the render worker.
pub fn render_channel(capacity: usize) -> (mpsc::Sender<RenderJobId>, mpsc::Receiver<RenderJobId>) {
    mpsc::channel(capacity.max(1))
}

/// Runs the external template renderer for one job file.
#[async_trait]
pub trait RenderTool: Send + Sync {
    /// Render the job described by `job_file`; returns the path of the
    /// finished video.
    async fn render(&self, job_file: &Path) -> Result<PathBuf, String>;
}

/// Shells out to a configured render command, passing the job file
/// path as the single argument. The finished video is expected at
/// `renders_dir/<job file stem>.mp4`.
pub struct CommandRenderTool {
    command: String,
    renders_dir: PathBuf,
}

impl CommandRenderTool {
    pub fn new(command: impl Into<String>, renders_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            renders_dir: renders_dir.into(),
        }
    }
}

#[async_trait]
impl RenderTool for CommandRenderTool {
    async fn render(&self, job_file: &Path) -> Result<PathBuf, String> {
        let output = Command::new(&self.command)
            .arg(job_file)
            .output()
            .await
            .map_err(|e| format!("failed to spawn {}: {}", self.command, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            ));
        }

        let stem = job_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| format!("job file has no stem: {}", job_file.display()))?;
        let video = self.renders_dir.join(format!("{}.mp4", stem));
        if !video.exists() {
            return Err(format!(
                "render command succeeded but produced no video at {}",
                video.display()
            ));
        }
        Ok(video)
    }
}

/// Consumes render job IDs from the channel and runs them one at a
/// time.
///
/// The render tool is the throughput bottleneck; jobs queue behind it
/// in submission order. A failing job never stops the loop: the
/// failure is recorded on the job and the worker moves on.
///
/// With no tool configured the worker only marks jobs as picked up;
/// an external watcher on the queue directory runs the render and
/// reports back through the completion webhook.
pub struct RenderWorker {
    store: Store,
    notifier: Arc<DeliveryNotifier>,
    tool: Option<Arc<dyn RenderTool>>,
    rx: mpsc::Receiver<RenderJobId>,
}

impl RenderWorker {
    pub fn new(
        store: Store,
        notifier: Arc<DeliveryNotifier>,
        tool: Option<Arc<dyn RenderTool>>,
        rx: mpsc::Receiver<RenderJobId>,
    ) -> Self {
        Self {
            store,
            notifier,
            tool,
            rx,
        }
    }

    /// Run until the sending side of the channel is dropped.
    pub async fn run(mut self) {
        info!("Render worker started");
        while let Some(job_id) = self.rx.recv().await {
            if let Err(e) = self.process(&job_id).await {
                error!(render_job_id = %job_id, error = %e, "Render job processing failed");
            }
        }
        info!("Render worker stopped");
    }

    async fn process(&self, job_id: &RenderJobId) -> crate::PipelineResult<()> {
        let Some(job) = self.store.render_jobs().get(job_id).await? else {
            warn!(render_job_id = %job_id, "Queued render job no longer exists");
            return Ok(());
        };
        if job.status.is_terminal() {
            // The completion webhook can beat the worker to the job.
            info!(
                render_job_id = %job_id,
                status = %job.status,
                "Render job already terminal, skipping"
            );
            return Ok(());
        }
        let Some(job_file) = job.job_file_path.clone() else {
            warn!(render_job_id = %job_id, "Render job has no job file, skipping");
            return Ok(());
        };
        let job_file = PathBuf::from(job_file);

        let job = job.start();
        self.store.render_jobs().update(&job).await?;

        let Some(tool) = &self.tool else {
            info!(
                render_job_id = %job_id,
                job_file = %job_file.display(),
                "No render command configured, leaving job for the external watcher"
            );
            return Ok(());
        };

        let job = job.rendering();
        self.store.render_jobs().update(&job).await?;
        info!(
            render_job_id = %job_id,
            recording_id = %job.recording_id,
            job_file = %job_file.display(),
            "Rendering"
        );

        match tool.render(&job_file).await {
            Ok(video) => {
                self.archive_job_file(&job_file).await;
                self.notifier
                    .on_render_complete(&job.recording_id, &video.to_string_lossy())
                    .await?;
            }
            Err(message) => {
                self.mark_job_file_failed(&job_file).await;
                self.notifier
                    .on_render_error(&job.recording_id, &message)
                    .await?;
            }
        }
        Ok(())
    }

    /// Finished job files move to `completed/` inside the queue
    /// directory so the queue itself only ever holds live work.
    async fn archive_job_file(&self, job_file: &Path) {
        let Some(parent) = job_file.parent() else {
            return;
        };
        let Some(name) = job_file.file_name() else {
            return;
        };
        let dst = parent.join("completed").join(name);
        if let Err(e) = move_file(job_file, &dst).await {
            warn!(
                job_file = %job_file.display(),
                error = %e,
                "Failed to archive completed job file"
            );
        }
    }

    /// Failed job files stay in place under a `.error` suffix for
    /// inspection, and so the watcher stops retrying them.
    async fn mark_job_file_failed(&self, job_file: &Path) {
        let dst = PathBuf::from(format!("{}.error", job_file.display()));
        if let Err(e) = move_file(job_file, &dst).await {
            warn!(
                job_file = %job_file.display(),
                error = %e,
                "Failed to mark job file as errored"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourcut_models::{Recording, RecordingStatus, RenderJob, RenderJobStatus};

    struct FakeTool {
        result: Result<PathBuf, String>,
    }

    #[async_trait]
    impl RenderTool for FakeTool {
        async fn render(&self, _job_file: &Path) -> Result<PathBuf, String> {
            self.result.clone()
        }
    }

    async fn seeded(queue_dir: &Path) -> (Store, Recording, RenderJob) {
        let store = Store::open_in_memory().await.unwrap();
        let rec = Recording::new("Ada", "Kai");
        store.recordings().create(&rec).await.unwrap();

        tokio::fs::create_dir_all(queue_dir).await.unwrap();
        let job_file = queue_dir.join("Ada_20260830_1200.json");
        tokio::fs::write(&job_file, b"{}").await.unwrap();

        let job = RenderJob::new(rec.id.clone()).with_job_file(job_file.to_string_lossy());
        assert!(store.render_jobs().try_create(&job).await.unwrap());
        (store, rec, job)
    }

    async fn run_one(store: Store, tool: FakeTool, job_id: RenderJobId) {
        let notifier = Arc::new(DeliveryNotifier::new(store.clone(), None));
        let (tx, rx) = render_channel(4);
        let worker = RenderWorker::new(store, notifier, Some(Arc::new(tool)), rx);
        tx.send(job_id).await.unwrap();
        drop(tx);
        worker.run().await;
    }

    #[tokio::test]
    async fn test_no_tool_leaves_job_for_external_watcher() {
        let dir = tempfile::TempDir::new().unwrap();
        let queue_dir = dir.path().join("queue");
        let (store, _rec, job) = seeded(&queue_dir).await;

        let notifier = Arc::new(DeliveryNotifier::new(store.clone(), None));
        let (tx, rx) = render_channel(4);
        let worker = RenderWorker::new(store.clone(), notifier, None, rx);
        tx.send(job.id.clone()).await.unwrap();
        drop(tx);
        worker.run().await;

        // Picked up but not driven; the webhook will finalize it.
        let loaded = store.render_jobs().get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RenderJobStatus::Processing);
        assert!(queue_dir.join("Ada_20260830_1200.json").exists());
    }

    #[tokio::test]
    async fn test_successful_render_completes_and_archives() {
        let dir = tempfile::TempDir::new().unwrap();
        let queue_dir = dir.path().join("queue");
        let (store, rec, job) = seeded(&queue_dir).await;

        let tool = FakeTool {
            result: Ok(dir.path().join("renders/out.mp4")),
        };
        run_one(store.clone(), tool, job.id.clone()).await;

        let loaded = store.render_jobs().get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RenderJobStatus::Completed);
        assert_eq!(loaded.progress, 100);

        let recording = store.recordings().get_required(&rec.id).await.unwrap();
        assert_eq!(recording.status, RecordingStatus::Rendered);

        // Job file left the queue for completed/.
        assert!(!queue_dir.join("Ada_20260830_1200.json").exists());
        assert!(queue_dir
            .join("completed")
            .join("Ada_20260830_1200.json")
            .exists());
    }

    #[tokio::test]
    async fn test_failed_render_marks_job_and_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let queue_dir = dir.path().join("queue");
        let (store, rec, job) = seeded(&queue_dir).await;

        let tool = FakeTool {
            result: Err("template crashed".to_string()),
        };
        run_one(store.clone(), tool, job.id.clone()).await;

        let loaded = store.render_jobs().get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RenderJobStatus::Failed);
        assert_eq!(loaded.error_message.as_deref(), Some("template crashed"));

        let recording = store.recordings().get_required(&rec.id).await.unwrap();
        assert_eq!(recording.status, RecordingStatus::Failed);

        assert!(!queue_dir.join("Ada_20260830_1200.json").exists());
        assert!(queue_dir.join("Ada_20260830_1200.json.error").exists());
    }

    #[tokio::test]
    async fn test_terminal_job_is_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        let queue_dir = dir.path().join("queue");
        let (store, _rec, job) = seeded(&queue_dir).await;

        let done = job.clone().complete("/renders/already.mp4");
        store.render_jobs().update(&done).await.unwrap();

        let tool = FakeTool {
            result: Err("should never run".to_string()),
        };
        run_one(store.clone(), tool, job.id.clone()).await;

        let loaded = store.render_jobs().get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RenderJobStatus::Completed);
        assert_eq!(loaded.output_path.as_deref(), Some("/renders/already.mp4"));
        // Skipped jobs keep their queue file untouched.
        assert!(queue_dir.join("Ada_20260830_1200.json").exists());
    }

    #[tokio::test]
    async fn test_command_tool_reports_missing_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let job_file = dir.path().join("job.json");
        tokio::fs::write(&job_file, b"{}").await.unwrap();

        // `true` exits 0 but writes nothing.
        let tool = CommandRenderTool::new("true", dir.path().join("renders"));
        let err = tool.render(&job_file).await.unwrap_err();
        assert!(err.contains("produced no video"));
    }
}
