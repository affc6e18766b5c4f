//! SQLite persistence for the TourCut backend.
//!
//! One [`Store`] owns the connection pool and runs migrations at
//! open; typed repositories hang off it, one per aggregate:
//! recordings, slot selections, clip jobs, and render jobs.

pub mod clip_jobs;
pub mod db;
pub mod error;
pub mod recordings;
pub mod render_jobs;
pub mod selections;

pub use clip_jobs::ClipJobRepository;
pub use db::Store;
pub use error::{StoreError, StoreResult};
pub use recordings::RecordingRepository;
pub use render_jobs::RenderJobRepository;
pub use selections::SelectionRepository;
