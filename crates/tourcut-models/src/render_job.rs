//! Render jobs: one submission of a complete clip set to the external
//! template renderer.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::RecordingId;

/// Unique identifier for a render job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RenderJobId(pub String);

impl RenderJobId {
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

impl Default for RenderJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RenderJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderJobStatus {
    /// Queued behind earlier submissions
    #[default]
    Pending,
    /// Picked up by the render worker
    Processing,
    /// The external render tool is running
    Rendering,
    /// Final video produced
    Completed,
    /// Render failed; terminal
    Failed,
}

impl RenderJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderJobStatus::Pending => "pending",
            RenderJobStatus::Processing => "processing",
            RenderJobStatus::Rendering => "rendering",
            RenderJobStatus::Completed => "completed",
            RenderJobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderJobStatus::Completed | RenderJobStatus::Failed)
    }
}

impl fmt::Display for RenderJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One render submission for a recording.
///
/// At most one non-terminal render job may exist per recording.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderJob {
    /// Unique job ID
    pub id: RenderJobId,

    /// Owning recording
    pub recording_id: RecordingId,

    /// Job state
    #[serde(default)]
    pub status: RenderJobStatus,

    /// Path of the job file written into the queue directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_file_path: Option<String>,

    /// Final video path (set on completion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    /// Progress (0-100)
    #[serde(default)]
    pub progress: u8,

    /// Job identifier reported by the external renderer, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_job_id: Option<String>,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl RenderJob {
    /// Create a pending render job for a recording.
    pub fn new(recording_id: RecordingId) -> Self {
        let now = Utc::now();
        Self {
            id: RenderJobId::new(),
            recording_id,
            status: RenderJobStatus::Pending,
            job_file_path: None,
            output_path: None,
            progress: 0,
            external_job_id: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record the queue-directory job file path.
    pub fn with_job_file(mut self, path: impl Into<String>) -> Self {
        self.job_file_path = Some(path.into());
        self.updated_at = Utc::now();
        self
    }

    /// Worker picked the job up.
    pub fn start(mut self) -> Self {
        self.status = RenderJobStatus::Processing;
        self.updated_at = Utc::now();
        self
    }

    /// The external render tool is running.
    pub fn rendering(mut self) -> Self {
        self.status = RenderJobStatus::Rendering;
        self.progress = 50;
        self.updated_at = Utc::now();
        self
    }

    /// Final video produced.
    pub fn complete(mut self, output_path: impl Into<String>) -> Self {
        self.status = RenderJobStatus::Completed;
        self.output_path = Some(output_path.into());
        self.progress = 100;
        self.updated_at = Utc::now();
        self
    }

    /// Render failed; terminal, no retry.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = RenderJobStatus::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_job_lifecycle() {
        let job = RenderJob::new(RecordingId::new());
        assert_eq!(job.status, RenderJobStatus::Pending);
        assert!(!job.status.is_terminal());

        let job = job.start().rendering();
        assert_eq!(job.status, RenderJobStatus::Rendering);
        assert_eq!(job.progress, 50);

        let job = job.complete("/renders/out.mp4");
        assert_eq!(job.status, RenderJobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.status.is_terminal());
    }

    #[test]
    fn test_render_job_failure_is_terminal() {
        let job = RenderJob::new(RecordingId::new()).start().fail("render tool exited 1");
        assert_eq!(job.status, RenderJobStatus::Failed);
        assert!(job.status.is_terminal());
        assert!(job.output_path.is_none());
    }
}
