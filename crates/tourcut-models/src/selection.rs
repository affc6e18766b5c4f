//! Slot selections: where each template slot's window sits on the
//! recorded footage.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::RecordingId;

/// One slot's placement for one recording.
///
/// `window_start` of `None` is the unpositioned sentinel, distinct
/// from a window placed at `0.0`. Sentinel rows are created when a
/// recording begins and filled in by the initial spread or by a drag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SlotSelection {
    /// Owning recording
    pub recording_id: RecordingId,

    /// Template slot number (1-14)
    pub slot_number: u8,

    /// Window start on the scene's footage, in seconds; `None` until
    /// the slot has been positioned
    pub window_start: Option<f64>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl SlotSelection {
    /// Create an unpositioned sentinel row.
    pub fn sentinel(recording_id: RecordingId, slot_number: u8) -> Self {
        Self {
            recording_id,
            slot_number,
            window_start: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether the slot has been positioned.
    pub fn is_positioned(&self) -> bool {
        self.window_start.is_some()
    }

    /// Place the window.
    pub fn with_start(mut self, start: f64) -> Self {
        self.window_start = Some(start);
        self.updated_at = Utc::now();
        self
    }
}
