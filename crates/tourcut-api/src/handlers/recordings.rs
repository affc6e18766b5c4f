//! Recording registration handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use tourcut_models::{Recording, RecordingId, SLOT_COUNT};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Recording registration request.
#[derive(Debug, Deserialize)]
pub struct CreateRecordingRequest {
    pub patron_name: String,
    pub staff_name: String,
}

/// Recording registration response.
#[derive(Serialize)]
pub struct RecordingResponse {
    pub recording_id: RecordingId,
    pub project_name: String,
    pub status: String,
}

/// Register a recording session. Seeds one unpositioned selection per
/// slot so positioning can begin as soon as scenes are captured.
pub async fn create_recording(
    State(state): State<AppState>,
    Json(request): Json<CreateRecordingRequest>,
) -> ApiResult<(StatusCode, Json<RecordingResponse>)> {
    if request.patron_name.trim().is_empty() {
        return Err(ApiError::bad_request("patron_name must not be empty"));
    }

    let recording = Recording::new(request.patron_name.trim(), request.staff_name.trim());
    state.store.recordings().create(&recording).await?;
    state
        .store
        .selections()
        .init_sentinels(&recording.id, 1..=SLOT_COUNT as u8)
        .await?;

    info!(
        recording_id = %recording.id,
        project_name = %recording.project_name(),
        "Recording registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(RecordingResponse {
            project_name: recording.project_name(),
            status: recording.status.as_str().to_string(),
            recording_id: recording.id,
        }),
    ))
}

/// Fetch a recording's current state.
pub async fn get_recording(
    State(state): State<AppState>,
    Path(recording_id): Path<String>,
) -> ApiResult<Json<Recording>> {
    let id = RecordingId::from_string(recording_id);
    let recording = state.store.recordings().get_required(&id).await?;
    Ok(Json(recording))
}
