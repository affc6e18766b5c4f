//! Render submission and polling handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use tourcut_models::{RecordingId, RenderJob, RenderJobId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Render job view returned by submit and status.
#[derive(Serialize)]
pub struct RenderJobResponse {
    pub job_id: RenderJobId,
    pub recording_id: RecordingId,
    pub status: String,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<RenderJob> for RenderJobResponse {
    fn from(job: RenderJob) -> Self {
        Self {
            job_id: job.id,
            recording_id: job.recording_id,
            status: job.status.as_str().to_string(),
            progress: job.progress,
            output_path: job.output_path,
            error: job.error_message,
        }
    }
}

/// Submit a render for a recording with a complete clip set.
///
/// 409 when the clip set is incomplete or another render is live.
pub async fn submit_render(
    State(state): State<AppState>,
    Path(recording_id): Path<String>,
) -> ApiResult<(StatusCode, Json<RenderJobResponse>)> {
    let id = RecordingId::from_string(recording_id);
    let job = state.orchestrator.submit(&id).await?;
    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

/// Poll a recording's most recent render job.
pub async fn render_status(
    State(state): State<AppState>,
    Path(recording_id): Path<String>,
) -> ApiResult<Json<RenderJobResponse>> {
    let id = RecordingId::from_string(recording_id);
    state.store.recordings().get_required(&id).await?;

    let job = state
        .orchestrator
        .status(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no render job for recording {}", id)))?;
    Ok(Json(job.into()))
}
