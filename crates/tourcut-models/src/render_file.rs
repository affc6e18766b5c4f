//! Wire formats shared with the external render tool: the job
//! description file dropped into the queue directory and the
//! completion callback payload.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{CameraAngle, RecordingId, SceneId};

/// Frame rate the render template is authored at. The job file's
/// in/out points are expressed in frames at this rate.
pub const TEMPLATE_FRAME_RATE: f64 = 30.0;

/// Convert a duration in seconds to frames at the template rate.
pub fn frames_at_template_rate(seconds: f64) -> u32 {
    (seconds * TEMPLATE_FRAME_RATE).round() as u32
}

/// One clip entry in the job file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipDescriptor {
    /// Bare file name of the cut clip
    pub filename: String,
    /// Absolute path to the cut clip
    pub full_path: String,
    /// Scene the clip came from
    pub scene_type: SceneId,
    /// Camera angle the clip came from
    pub camera_angle: CameraAngle,
    /// Clip duration in seconds
    pub duration_seconds: f64,
    /// First frame to use, at the template rate (always 0: clips are
    /// pre-cut to exact length)
    pub in_point: u32,
    /// Last frame to use, at the template rate
    pub out_point: u32,
}

/// Fixed output settings for the template render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderSettings {
    pub format: String,
    pub resolution: String,
    pub frame_rate: String,
    pub watermark: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            format: "mp4".to_string(),
            resolution: "1920x1080".to_string(),
            frame_rate: "30".to_string(),
            watermark: false,
        }
    }
}

/// Job metadata block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderJobMetadata {
    pub recording_id: RecordingId,
    pub patron_name: String,
    pub staff_name: String,
    pub total_clips: u32,
    pub created_at: DateTime<Utc>,
}

/// The job description file written into the queue directory.
///
/// Clips are keyed by the slot number as a decimal string, matching
/// what the render tool expects; `BTreeMap` keeps the serialized
/// order stable for diffing and tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderJobFile {
    pub job_id: String,
    pub project_name: String,
    pub clips: BTreeMap<String, ClipDescriptor>,
    pub render_settings: RenderSettings,
    pub metadata: RenderJobMetadata,
}

/// Outcome reported by the completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenderCallbackStatus {
    Completed,
    Failed,
}

/// Completion webhook payload from an external watcher deployment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderCallback {
    pub recording_id: RecordingId,
    pub project_name: String,
    pub status: RenderCallbackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub render_date: DateTime<Utc>,
    /// Shared secret; compared against the server's configured token
    pub token: String,
}
