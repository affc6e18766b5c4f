//! The TourCut export pipeline.
//!
//! Three cooperating pieces turn positioned slots into a delivered
//! video:
//! - [`ClipExtractor`] cuts one clip per slot with FFmpeg, at most
//!   three cuts in flight, each tracked by a durable job row;
//! - [`RenderOrchestrator`] gates on a complete clip set, writes the
//!   job description file into the queue directory, and hands the job
//!   to the render worker;
//! - [`RenderWorker`] drives the external render tool one job at a
//!   time and finalizes through the [`DeliveryNotifier`] (terminal
//!   states, optional cloud upload, shareable link).

pub mod config;
pub mod error;
pub mod extractor;
pub mod notifier;
pub mod orchestrator;
pub mod render_worker;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use extractor::ClipExtractor;
pub use notifier::{Delivery, DeliveryNotifier};
pub use orchestrator::RenderOrchestrator;
pub use render_worker::{render_channel, CommandRenderTool, RenderTool, RenderWorker};
