//! Recordings and their lifecycle.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a recording session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RecordingId(pub String);

impl RecordingId {
    /// Generate a new random recording ID.
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

impl Default for RecordingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recording lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    /// Cameras are rolling (or the session was just registered)
    #[default]
    Recording,
    /// Footage is on disk, slots can be positioned
    Recorded,
    /// Clip extraction or rendering in progress
    Exporting,
    /// Final video produced
    Rendered,
    /// Render failed
    Failed,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStatus::Recording => "recording",
            RecordingStatus::Recorded => "recorded",
            RecordingStatus::Exporting => "exporting",
            RecordingStatus::Rendered => "rendered",
            RecordingStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordingStatus::Rendered | RecordingStatus::Failed)
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tour recording session: one patron flight, three scenes, two
/// cameras per scene.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Recording {
    /// Unique recording ID
    pub id: RecordingId,

    /// Patron (passenger) name, used for the project name
    pub patron_name: String,

    /// Staff or pilot name
    pub staff_name: String,

    /// Lifecycle state
    #[serde(default)]
    pub status: RecordingStatus,

    /// Recorded duration per scene in seconds, keyed by scene name.
    /// Absent until the scene has been captured.
    #[serde(default)]
    pub scene_durations: std::collections::BTreeMap<String, f64>,

    /// Shareable link to the delivered video (once uploaded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shareable_link: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Recording {
    /// Register a new recording session.
    pub fn new(patron_name: impl Into<String>, staff_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecordingId::new(),
            patron_name: patron_name.into(),
            staff_name: staff_name.into(),
            status: RecordingStatus::Recording,
            scene_durations: Default::default(),
            shareable_link: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a scene's captured duration.
    pub fn with_scene_duration(mut self, scene: crate::SceneId, seconds: f64) -> Self {
        self.scene_durations.insert(scene.as_str().to_string(), seconds);
        self.updated_at = Utc::now();
        self
    }

    /// Look up a scene's captured duration.
    pub fn scene_duration(&self, scene: crate::SceneId) -> Option<f64> {
        self.scene_durations.get(scene.as_str()).copied()
    }

    /// Transition lifecycle state.
    pub fn with_status(mut self, status: RecordingStatus) -> Self {
        self.status = status;
        self.updated_at = Utc::now();
        self
    }

    /// Project name for the render tool: patron name plus a
    /// `YYYYMMDD_HHMM` stamp of the recording time.
    pub fn project_name(&self) -> String {
        let safe: String = self
            .patron_name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}_{}", safe, self.created_at.format("%Y%m%d_%H%M"))
    }
}
