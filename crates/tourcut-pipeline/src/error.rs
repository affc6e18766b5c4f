//! Error types for the export pipeline.

use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur in the export pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A gate was not satisfied; nothing was persisted.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A live render job already exists for the recording.
    #[error("Render conflict: {0}")]
    RenderConflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Render queue closed")]
    QueueClosed,

    #[error("Media error: {0}")]
    Media(#[from] tourcut_media::MediaError),

    #[error("Store error: {0}")]
    Store(#[from] tourcut_store::StoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] tourcut_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
