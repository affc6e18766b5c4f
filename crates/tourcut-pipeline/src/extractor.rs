//! Clip extraction: one FFmpeg cut per template slot.

use std::path::PathBuf;

use futures::future::join_all;
use tracing::{error, info};

use tourcut_media::{cut_slot_clip, slot_clip_filename};
use tourcut_models::{
    CameraAngle, ClipJob, ExtractionSummary, Recording, RecordingId, RecordingStatus, SceneId,
    SlotCatalog,
};
use tourcut_store::Store;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};

/// Cuts slot clips out of recorded footage.
///
/// Cuts run in batches of `max_concurrent_jobs`; the whole batch
/// settles before the next starts. One failing cut marks only its own
/// job failed and never cancels its siblings. Nothing is retried
/// automatically; a new call to [`extract_all`](Self::extract_all)
/// starts a fresh attempt whose rows become the live set.
pub struct ClipExtractor {
    store: Store,
    config: PipelineConfig,
    catalog: SlotCatalog,
}

impl ClipExtractor {
    pub fn new(store: Store, config: PipelineConfig) -> Self {
        Self {
            store,
            config,
            catalog: SlotCatalog::standard(),
        }
    }

    /// Source footage path for one scene and camera of a recording.
    pub fn footage_path(
        &self,
        recording_id: &RecordingId,
        scene: SceneId,
        camera: CameraAngle,
    ) -> PathBuf {
        self.config
            .footage_dir
            .join(recording_id.as_str())
            .join(format!("{}_cam{}.mp4", scene, camera))
    }

    /// Output path for one slot's cut clip.
    fn clip_output_path(&self, recording_id: &RecordingId, slot_number: u8) -> PathBuf {
        self.config
            .clips_dir
            .join(recording_id.as_str())
            .join(slot_clip_filename(slot_number))
    }

    /// Cut all fourteen slot clips for a recording.
    ///
    /// Requires every slot to be positioned; rejects otherwise with
    /// nothing persisted. Returns once every batch has settled.
    pub async fn extract_all(&self, recording: &Recording) -> PipelineResult<ExtractionSummary> {
        let selections = self.store.selections().list(&recording.id).await?;

        let mut starts = std::collections::BTreeMap::new();
        for slot in self.catalog.slots() {
            let sel = selections
                .iter()
                .find(|s| s.slot_number == slot.number)
                .and_then(|s| s.window_start);
            match sel {
                Some(start) => {
                    starts.insert(slot.number, start);
                }
                None => {
                    return Err(PipelineError::precondition(format!(
                        "slot {} is not positioned",
                        slot.number
                    )));
                }
            }
        }

        let attempt = self.store.clip_jobs().latest_attempt(&recording.id).await? + 1;
        info!(
            recording_id = %recording.id,
            attempt,
            "Starting clip extraction"
        );

        self.store
            .recordings()
            .update_status(&recording.id, RecordingStatus::Exporting)
            .await?;

        let mut jobs = Vec::with_capacity(self.catalog.slots().len());
        for slot in self.catalog.slots() {
            let input = self.footage_path(&recording.id, slot.scene, slot.camera);
            let job = ClipJob::new(
                recording.id.clone(),
                slot.scene,
                slot.number,
                attempt,
                input.to_string_lossy(),
                slot.duration,
            );
            self.store.clip_jobs().insert(&job).await?;
            jobs.push(job);
        }

        let mut settled = Vec::with_capacity(jobs.len());
        for batch in jobs.chunks(self.config.max_concurrent_jobs.max(1)) {
            let mut running = Vec::with_capacity(batch.len());
            for job in batch {
                let started = job.clone().start();
                self.store.clip_jobs().update(&started).await?;
                running.push(started);
            }

            let results = join_all(
                running
                    .into_iter()
                    .map(|job| self.run_one(job, &starts)),
            )
            .await;

            for job in results {
                self.store.clip_jobs().update(&job).await?;
                settled.push(job);
            }
        }

        let summary = ExtractionSummary::from_jobs(&settled);
        info!(
            recording_id = %recording.id,
            completed = summary.completed,
            failed = summary.failed,
            "Clip extraction finished"
        );
        Ok(summary)
    }

    /// Run one cut; failure is captured in the returned job, never
    /// propagated to siblings.
    async fn run_one(
        &self,
        job: ClipJob,
        starts: &std::collections::BTreeMap<u8, f64>,
    ) -> ClipJob {
        let output = self.clip_output_path(&job.recording_id, job.slot_number);
        // Caller validated every slot before cutting.
        let start = starts.get(&job.slot_number).copied().unwrap_or(0.0);

        match cut_slot_clip(&job.input_path, &output, start, job.duration_seconds).await {
            Ok(size_bytes) => job.complete(output.to_string_lossy(), size_bytes),
            Err(e) => {
                error!(
                    recording_id = %job.recording_id,
                    slot = job.slot_number,
                    error = %e,
                    "Slot cut failed"
                );
                job.fail(e.to_string())
            }
        }
    }

    /// Aggregate status of the live extraction attempt.
    pub async fn extraction_status(
        &self,
        recording_id: &RecordingId,
    ) -> PipelineResult<ExtractionSummary> {
        let jobs = self.store.clip_jobs().list_latest(recording_id).await?;
        Ok(ExtractionSummary::from_jobs(&jobs))
    }
}
