//! Shared data models for the TourCut backend.
//!
//! This crate provides Serde-serializable types for:
//! - Recordings and their lifecycle
//! - The fourteen-slot timeline template (scenes, cameras, seamless pairs)
//! - Slot selections (window placements on recorded footage)
//! - Clip extraction jobs and render jobs
//! - The render job file and completion callback wire formats

pub mod clip_job;
pub mod recording;
pub mod render_file;
pub mod render_job;
pub mod selection;
pub mod slot;

// Re-export common types
pub use clip_job::{ClipJob, ClipJobId, ClipJobStatus, ExtractionStatus, ExtractionSummary};
pub use recording::{Recording, RecordingId, RecordingStatus};
pub use render_file::{
    frames_at_template_rate, ClipDescriptor, RenderCallback, RenderCallbackStatus, RenderJobFile,
    RenderJobMetadata, RenderSettings, TEMPLATE_FRAME_RATE,
};
pub use render_job::{RenderJob, RenderJobId, RenderJobStatus};
pub use selection::SlotSelection;
pub use slot::{
    CameraAngle, CatalogError, SceneId, SeamlessPair, SlotCatalog, SlotConfig, SLOT_COUNT,
};
