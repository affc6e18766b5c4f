//! Clip extraction jobs: one FFmpeg cut per template slot.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{RecordingId, SceneId};

/// Unique identifier for a clip extraction job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ClipJobId(pub String);

impl ClipJobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClipJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clip extraction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClipJobStatus {
    /// Waiting for its batch
    #[default]
    Pending,
    /// FFmpeg is running
    Processing,
    /// Clip written successfully
    Completed,
    /// Cut failed; never retried automatically
    Failed,
}

impl ClipJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipJobStatus::Pending => "pending",
            ClipJobStatus::Processing => "processing",
            ClipJobStatus::Completed => "completed",
            ClipJobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ClipJobStatus::Completed | ClipJobStatus::Failed)
    }
}

impl fmt::Display for ClipJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One FFmpeg cut of one slot.
///
/// Each extraction run creates a full set of fourteen rows under a
/// fresh attempt number; the highest attempt is the live set and older
/// rows are kept for history.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClipJob {
    /// Unique job ID
    pub id: ClipJobId,

    /// Owning recording
    pub recording_id: RecordingId,

    /// Scene the clip is cut from
    pub scene: SceneId,

    /// Template slot number (1-14)
    pub slot_number: u8,

    /// Extraction attempt this row belongs to
    pub attempt: u32,

    /// Job state
    #[serde(default)]
    pub status: ClipJobStatus,

    /// Source footage path
    pub input_path: String,

    /// Output clip path (set on completion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    /// Output size in bytes (set on completion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    /// Clip duration in seconds
    pub duration_seconds: f64,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ClipJob {
    /// Create a pending job for one slot cut.
    pub fn new(
        recording_id: RecordingId,
        scene: SceneId,
        slot_number: u8,
        attempt: u32,
        input_path: impl Into<String>,
        duration_seconds: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ClipJobId::new(),
            recording_id,
            scene,
            slot_number,
            attempt,
            status: ClipJobStatus::Pending,
            input_path: input_path.into(),
            output_path: None,
            size_bytes: None,
            duration_seconds,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the job as running.
    pub fn start(mut self) -> Self {
        self.status = ClipJobStatus::Processing;
        self.updated_at = Utc::now();
        self
    }

    /// Mark the job as completed with its output artifact.
    pub fn complete(mut self, output_path: impl Into<String>, size_bytes: u64) -> Self {
        self.status = ClipJobStatus::Completed;
        self.output_path = Some(output_path.into());
        self.size_bytes = Some(size_bytes);
        self.updated_at = Utc::now();
        self
    }

    /// Mark the job as failed.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = ClipJobStatus::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
        self
    }
}

/// Aggregate view over one extraction attempt's jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ExtractionSummary {
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
    pub processing: u32,
    pub pending: u32,
}

/// Coarse extraction status derived from job counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// Every job completed
    Completed,
    /// At least one failure and nothing still running
    PartialFailure,
    /// Work still in flight
    Processing,
    /// Nothing has started
    Pending,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Completed => "completed",
            ExtractionStatus::PartialFailure => "partial_failure",
            ExtractionStatus::Processing => "processing",
            ExtractionStatus::Pending => "pending",
        }
    }
}

impl ExtractionSummary {
    /// Tally jobs into a summary.
    pub fn from_jobs(jobs: &[ClipJob]) -> Self {
        let mut summary = Self {
            total: jobs.len() as u32,
            ..Default::default()
        };
        for job in jobs {
            match job.status {
                ClipJobStatus::Completed => summary.completed += 1,
                ClipJobStatus::Failed => summary.failed += 1,
                ClipJobStatus::Processing => summary.processing += 1,
                ClipJobStatus::Pending => summary.pending += 1,
            }
        }
        summary
    }

    /// Collapse the counts into a coarse status.
    ///
    /// A failure only surfaces as `partial_failure` once the attempt
    /// has settled: with jobs still queued or running the summary
    /// stays `processing`, so pollers see one terminal transition
    /// instead of a status that flaps mid-run.
    pub fn status(&self) -> ExtractionStatus {
        if self.total > 0 && self.completed == self.total {
            ExtractionStatus::Completed
        } else if self.failed > 0 && self.processing == 0 && self.pending == 0 {
            ExtractionStatus::PartialFailure
        } else if self.processing > 0 || (self.completed > 0 && self.pending > 0) || self.failed > 0
        {
            ExtractionStatus::Processing
        } else {
            ExtractionStatus::Pending
        }
    }

    /// Whether a render may be submitted from this attempt.
    pub fn is_render_ready(&self) -> bool {
        self.status() == ExtractionStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(status: ClipJobStatus) -> ClipJob {
        let mut j = ClipJob::new(
            RecordingId::new(),
            SceneId::Cruising,
            1,
            1,
            "/footage/in.mp4",
            1.3,
        );
        j.status = status;
        j
    }

    #[test]
    fn test_clip_job_transitions() {
        let j = job(ClipJobStatus::Pending).start();
        assert_eq!(j.status, ClipJobStatus::Processing);

        let done = j.clone().complete("/clips/slot_01.mp4", 1024);
        assert_eq!(done.status, ClipJobStatus::Completed);
        assert_eq!(done.size_bytes, Some(1024));

        let failed = j.fail("ffmpeg exited with status 1");
        assert_eq!(failed.status, ClipJobStatus::Failed);
        assert!(failed.error_message.is_some());
    }

    #[test]
    fn test_summary_all_completed() {
        let jobs: Vec<_> = (0..14).map(|_| job(ClipJobStatus::Completed)).collect();
        let summary = ExtractionSummary::from_jobs(&jobs);
        assert_eq!(summary.status(), ExtractionStatus::Completed);
        assert!(summary.is_render_ready());
    }

    #[test]
    fn test_summary_partial_failure_only_when_settled() {
        let mut jobs: Vec<_> = (0..13).map(|_| job(ClipJobStatus::Completed)).collect();
        jobs.push(job(ClipJobStatus::Failed));
        let summary = ExtractionSummary::from_jobs(&jobs);
        assert_eq!(summary.status(), ExtractionStatus::PartialFailure);
        assert!(!summary.is_render_ready());

        // A failure with work still running reads as processing.
        jobs.push(job(ClipJobStatus::Processing));
        let summary = ExtractionSummary::from_jobs(&jobs);
        assert_eq!(summary.status(), ExtractionStatus::Processing);
    }

    #[test]
    fn test_summary_failure_with_queued_work_still_processing() {
        // Nothing running, but jobs are still queued behind the
        // failure: the attempt has not settled yet.
        let mut jobs = vec![job(ClipJobStatus::Failed)];
        jobs.push(job(ClipJobStatus::Pending));
        jobs.push(job(ClipJobStatus::Pending));
        let summary = ExtractionSummary::from_jobs(&jobs);
        assert_eq!(summary.status(), ExtractionStatus::Processing);
        assert!(!summary.is_render_ready());
    }

    #[test]
    fn test_summary_pending_and_empty() {
        let jobs: Vec<_> = (0..14).map(|_| job(ClipJobStatus::Pending)).collect();
        assert_eq!(
            ExtractionSummary::from_jobs(&jobs).status(),
            ExtractionStatus::Pending
        );
        let summary = ExtractionSummary::from_jobs(&[]);
        assert_eq!(summary.status(), ExtractionStatus::Pending);
        assert!(!summary.is_render_ready());
    }
}
