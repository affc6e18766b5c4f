//! Render orchestration: gate, job file, hand-off.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use tourcut_media::probe_video;
use tourcut_models::{
    frames_at_template_rate, ClipDescriptor, ClipJob, ClipJobStatus, Recording, RecordingId,
    RecordingStatus, RenderJob, RenderJobFile, RenderJobId, RenderJobMetadata, RenderSettings,
    SlotCatalog, SLOT_COUNT, TEMPLATE_FRAME_RATE,
};
use tourcut_store::Store;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};

/// Submits render jobs for recordings whose clip set is complete.
///
/// Submission is asynchronous: the caller gets the pending job back
/// immediately and polls its status while the worker drives the
/// render.
pub struct RenderOrchestrator {
    store: Store,
    config: PipelineConfig,
    catalog: SlotCatalog,
    render_tx: mpsc::Sender<RenderJobId>,
}

impl RenderOrchestrator {
    pub fn new(store: Store, config: PipelineConfig, render_tx: mpsc::Sender<RenderJobId>) -> Self {
        Self {
            store,
            config,
            catalog: SlotCatalog::standard(),
            render_tx,
        }
    }

    /// Submit a render for a recording.
    ///
    /// Gates: the live extraction attempt must have all fourteen
    /// clips completed, and the recording must have no live render
    /// job. A failed gate rejects synchronously with nothing
    /// persisted.
    pub async fn submit(&self, recording_id: &RecordingId) -> PipelineResult<RenderJob> {
        let recording = self.store.recordings().get_required(recording_id).await?;

        let clip_jobs = self.store.clip_jobs().list_latest(recording_id).await?;
        if clip_jobs.len() != SLOT_COUNT {
            return Err(PipelineError::precondition(format!(
                "expected {} clips, found {}",
                SLOT_COUNT,
                clip_jobs.len()
            )));
        }
        if let Some(bad) = clip_jobs
            .iter()
            .find(|j| j.status != ClipJobStatus::Completed)
        {
            return Err(PipelineError::precondition(format!(
                "slot {} clip is {}",
                bad.slot_number, bad.status
            )));
        }

        if let Some(live) = self
            .store
            .render_jobs()
            .live_for_recording(recording_id)
            .await?
        {
            return Err(PipelineError::RenderConflict(format!(
                "render job {} is already {}",
                live.id, live.status
            )));
        }

        self.warn_on_frame_rate_mismatch(&clip_jobs).await;

        let render_job = RenderJob::new(recording_id.clone());
        let job_file = self.build_job_file(&recording, &clip_jobs, &render_job.id)?;

        // Conditional insert backs up the live-job check against
        // concurrent submitters.
        if !self.store.render_jobs().try_create(&render_job).await? {
            return Err(PipelineError::RenderConflict(
                "another render was submitted concurrently".to_string(),
            ));
        }

        match self.activate(&recording, render_job.clone(), &job_file).await {
            Ok(job) => Ok(job),
            Err(e) => {
                // The inserted row is now live but has no job file, so
                // nothing would ever finalize it and the live-job guard
                // would reject every later submit. Fail it before
                // propagating.
                let aborted = render_job.fail(e.to_string());
                if let Err(update_err) = self.store.render_jobs().update(&aborted).await {
                    error!(
                        render_job_id = %aborted.id,
                        error = %update_err,
                        "Failed to mark aborted render job as failed"
                    );
                }
                Err(e)
            }
        }
    }

    /// Post-insert submission steps: job file, path bookkeeping,
    /// recording status, worker hand-off.
    async fn activate(
        &self,
        recording: &Recording,
        render_job: RenderJob,
        job_file: &RenderJobFile,
    ) -> PipelineResult<RenderJob> {
        let job_file_path = self
            .write_job_file(&recording.project_name(), job_file)
            .await?;
        let render_job = render_job.with_job_file(job_file_path.to_string_lossy());
        self.store.render_jobs().update(&render_job).await?;

        self.store
            .recordings()
            .update_status(&recording.id, RecordingStatus::Exporting)
            .await?;

        self.render_tx
            .send(render_job.id.clone())
            .await
            .map_err(|_| PipelineError::QueueClosed)?;

        info!(
            recording_id = %recording.id,
            render_job_id = %render_job.id,
            job_file = %job_file_path.display(),
            "Render submitted"
        );
        Ok(render_job)
    }

    /// Poll a recording's most recent render job.
    pub async fn status(&self, recording_id: &RecordingId) -> PipelineResult<Option<RenderJob>> {
        Ok(self
            .store
            .render_jobs()
            .latest_for_recording(recording_id)
            .await?)
    }

    /// Build the queue-directory job description.
    fn build_job_file(
        &self,
        recording: &Recording,
        clip_jobs: &[ClipJob],
        render_job_id: &RenderJobId,
    ) -> PipelineResult<RenderJobFile> {
        let mut clips = BTreeMap::new();
        for job in clip_jobs {
            let slot = self
                .catalog
                .get(job.slot_number)
                .ok_or_else(|| PipelineError::not_found(format!("slot {}", job.slot_number)))?;
            let full_path = job.output_path.clone().ok_or_else(|| {
                PipelineError::precondition(format!("slot {} clip has no output", job.slot_number))
            })?;
            let filename = Path::new(&full_path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| full_path.clone());

            clips.insert(
                job.slot_number.to_string(),
                ClipDescriptor {
                    filename,
                    full_path,
                    scene_type: slot.scene,
                    camera_angle: slot.camera,
                    duration_seconds: slot.duration,
                    in_point: 0,
                    out_point: frames_at_template_rate(slot.duration),
                },
            );
        }

        Ok(RenderJobFile {
            job_id: render_job_id.to_string(),
            project_name: recording.project_name(),
            clips,
            render_settings: RenderSettings::default(),
            metadata: RenderJobMetadata {
                recording_id: recording.id.clone(),
                patron_name: recording.patron_name.clone(),
                staff_name: recording.staff_name.clone(),
                total_clips: clip_jobs.len() as u32,
                created_at: chrono::Utc::now(),
            },
        })
    }

    /// Write the job file atomically: temp file in the queue
    /// directory, then rename, so the render tool never reads a
    /// half-written job.
    async fn write_job_file(
        &self,
        project_name: &str,
        job_file: &RenderJobFile,
    ) -> PipelineResult<PathBuf> {
        fs::create_dir_all(&self.config.queue_dir).await?;
        let path = self.config.queue_dir.join(format!("{}.json", project_name));
        let tmp = path.with_extension("json.tmp");

        let body = serde_json::to_vec_pretty(job_file)?;
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &path).await?;
        Ok(path)
    }

    /// The template is frame-based at a fixed rate; shout when the
    /// cut clips disagree so a wrong-speed render is traceable.
    async fn warn_on_frame_rate_mismatch(&self, clip_jobs: &[ClipJob]) {
        let Some(sample) = clip_jobs.iter().find_map(|j| j.output_path.as_deref()) else {
            return;
        };
        if let Ok(info) = probe_video(sample).await {
            if (info.fps - TEMPLATE_FRAME_RATE).abs() > 0.05 {
                warn!(
                    clip = sample,
                    clip_fps = info.fps,
                    template_fps = TEMPLATE_FRAME_RATE,
                    "Clip frame rate differs from the render template; \
                     frame-based in/out points may drift"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourcut_models::{CameraAngle, SceneId};

    async fn seeded() -> (Store, Recording) {
        let store = Store::open_in_memory().await.unwrap();
        let rec = Recording::new("Ada Lovelace", "Kai");
        store.recordings().create(&rec).await.unwrap();
        (store, rec)
    }

    fn orchestrator(
        store: Store,
        dir: &std::path::Path,
    ) -> (RenderOrchestrator, mpsc::Receiver<RenderJobId>) {
        let (tx, rx) = mpsc::channel(4);
        let config = PipelineConfig {
            footage_dir: dir.join("footage"),
            clips_dir: dir.join("clips"),
            queue_dir: dir.join("queue"),
            renders_dir: dir.join("renders"),
            ..PipelineConfig::default()
        };
        (RenderOrchestrator::new(store, config, tx), rx)
    }

    async fn complete_clip_set(store: &Store, rec: &Recording) {
        let catalog = SlotCatalog::standard();
        for slot in catalog.slots() {
            let job = ClipJob::new(
                rec.id.clone(),
                slot.scene,
                slot.number,
                1,
                "/footage/in.mp4",
                slot.duration,
            )
            .start()
            .complete(format!("/clips/{}/slot_{:02}.mp4", rec.id, slot.number), 1024);
            store.clip_jobs().insert(&job).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_submit_rejects_incomplete_clip_set() {
        let dir = tempfile::TempDir::new().unwrap();
        let (store, rec) = seeded().await;
        let (orch, _rx) = orchestrator(store.clone(), dir.path());

        // No clips at all.
        let err = orch.submit(&rec.id).await.unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));

        // Thirteen completed, one failed.
        let catalog = SlotCatalog::standard();
        for slot in catalog.slots() {
            let job = ClipJob::new(
                rec.id.clone(),
                slot.scene,
                slot.number,
                1,
                "/footage/in.mp4",
                slot.duration,
            );
            let job = if slot.number == 9 {
                job.fail("boom")
            } else {
                job.complete("/clips/x.mp4", 1)
            };
            store.clip_jobs().insert(&job).await.unwrap();
        }
        let err = orch.submit(&rec.id).await.unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));
        // Nothing persisted by the failed gate.
        assert!(store
            .render_jobs()
            .latest_for_recording(&rec.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_submit_writes_job_file_and_enqueues() {
        let dir = tempfile::TempDir::new().unwrap();
        let (store, rec) = seeded().await;
        let (orch, mut rx) = orchestrator(store.clone(), dir.path());
        complete_clip_set(&store, &rec).await;

        let job = orch.submit(&rec.id).await.unwrap();
        assert_eq!(job.status, tourcut_models::RenderJobStatus::Pending);

        // Worker got the hand-off.
        assert_eq!(rx.recv().await.unwrap(), job.id);

        // Job file landed in the queue directory with the full clip map.
        let path = job.job_file_path.as_deref().unwrap();
        let body = std::fs::read_to_string(path).unwrap();
        let parsed: RenderJobFile = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.clips.len(), 14);
        assert_eq!(parsed.metadata.total_clips, 14);
        assert!(parsed.project_name.starts_with("Ada_Lovelace_"));
        assert_eq!(parsed.render_settings.resolution, "1920x1080");

        let slot1 = &parsed.clips["1"];
        assert_eq!(slot1.scene_type, SceneId::Cruising);
        assert_eq!(slot1.camera_angle, CameraAngle::Cam1);
        assert_eq!(slot1.in_point, 0);
        assert_eq!(slot1.out_point, 39);
        assert_eq!(slot1.filename, "slot_01.mp4");

        // Recording moved to exporting.
        let loaded = store.recordings().get_required(&rec.id).await.unwrap();
        assert_eq!(loaded.status, RecordingStatus::Exporting);
    }

    #[tokio::test]
    async fn test_failed_job_file_write_releases_render_guard() {
        let dir = tempfile::TempDir::new().unwrap();
        let (store, rec) = seeded().await;
        let (orch, mut rx) = orchestrator(store.clone(), dir.path());
        complete_clip_set(&store, &rec).await;

        // Occupy the queue directory path with a regular file so the
        // job file cannot be written.
        std::fs::write(dir.path().join("queue"), b"in the way").unwrap();

        let err = orch.submit(&rec.id).await.unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));

        // The aborted job must be terminal, not a live guard.
        let job = store
            .render_jobs()
            .latest_for_recording(&rec.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.status, tourcut_models::RenderJobStatus::Failed);
        assert!(store
            .render_jobs()
            .live_for_recording(&rec.id)
            .await
            .unwrap()
            .is_none());

        // Once the path is clear, a fresh submit goes through.
        std::fs::remove_file(dir.path().join("queue")).unwrap();
        let job = orch.submit(&rec.id).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), job.id);
    }

    #[tokio::test]
    async fn test_submit_rejects_second_live_render() {
        let dir = tempfile::TempDir::new().unwrap();
        let (store, rec) = seeded().await;
        let (orch, _rx) = orchestrator(store.clone(), dir.path());
        complete_clip_set(&store, &rec).await;

        orch.submit(&rec.id).await.unwrap();
        let err = orch.submit(&rec.id).await.unwrap_err();
        assert!(matches!(err, PipelineError::RenderConflict(_)));
    }

    #[tokio::test]
    async fn test_status_polls_latest_job() {
        let dir = tempfile::TempDir::new().unwrap();
        let (store, rec) = seeded().await;
        let (orch, _rx) = orchestrator(store.clone(), dir.path());

        assert!(orch.status(&rec.id).await.unwrap().is_none());

        complete_clip_set(&store, &rec).await;
        let job = orch.submit(&rec.id).await.unwrap();
        let polled = orch.status(&rec.id).await.unwrap().unwrap();
        assert_eq!(polled.id, job.id);
    }
}
