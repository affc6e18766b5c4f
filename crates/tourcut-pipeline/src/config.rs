//! Pipeline configuration.

use std::path::PathBuf;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of recorded footage; one subdirectory per recording
    pub footage_dir: PathBuf,
    /// Where cut slot clips are written
    pub clips_dir: PathBuf,
    /// Queue directory shared with the render tool
    pub queue_dir: PathBuf,
    /// Where the render tool writes finished videos
    pub renders_dir: PathBuf,
    /// Maximum FFmpeg cuts in flight
    pub max_concurrent_jobs: usize,
    /// Render worker channel capacity
    pub render_queue_capacity: usize,
    /// Command invoked with the job file path to run a render.
    /// `None` means renders are driven by an external watcher that
    /// reports back through the completion webhook.
    pub render_command: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            footage_dir: PathBuf::from("/var/tourcut/footage"),
            clips_dir: PathBuf::from("/var/tourcut/clips"),
            queue_dir: PathBuf::from("/var/tourcut/render_queue"),
            renders_dir: PathBuf::from("/var/tourcut/renders"),
            max_concurrent_jobs: 3,
            render_queue_capacity: 16,
            render_command: None,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            footage_dir: std::env::var("FOOTAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.footage_dir),
            clips_dir: std::env::var("CLIPS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.clips_dir),
            queue_dir: std::env::var("RENDER_QUEUE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.queue_dir),
            renders_dir: std::env::var("RENDERS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.renders_dir),
            max_concurrent_jobs: std::env::var("MAX_CONCURRENT_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_jobs),
            render_queue_capacity: std::env::var("RENDER_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.render_queue_capacity),
            render_command: std::env::var("RENDER_COMMAND").ok(),
        }
    }
}
