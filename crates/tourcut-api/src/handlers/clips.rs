//! Clip extraction handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::error;

use tourcut_models::RecordingId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Extraction start acknowledgement.
#[derive(Serialize)]
pub struct ExtractStartResponse {
    pub recording_id: RecordingId,
    pub status: String,
    pub total_clips: u32,
}

/// Start extracting all slot clips for a recording.
///
/// Validates synchronously that every slot is positioned (409 with
/// nothing persisted otherwise), then runs the cuts in the background;
/// callers observe completion through the status endpoint.
pub async fn start_extraction(
    State(state): State<AppState>,
    Path(recording_id): Path<String>,
) -> ApiResult<(StatusCode, Json<ExtractStartResponse>)> {
    let id = RecordingId::from_string(recording_id);
    let recording = state.store.recordings().get_required(&id).await?;

    let selections = state.store.selections().list(&id).await?;
    for slot in state.positioner.catalog().slots() {
        let positioned = selections
            .iter()
            .any(|s| s.slot_number == slot.number && s.is_positioned());
        if !positioned {
            return Err(ApiError::conflict(format!(
                "slot {} is not positioned",
                slot.number
            )));
        }
    }

    let total_clips = state.positioner.catalog().slots().len() as u32;
    let extractor = std::sync::Arc::clone(&state.extractor);
    tokio::spawn(async move {
        if let Err(e) = extractor.extract_all(&recording).await {
            error!(recording_id = %recording.id, error = %e, "Extraction run failed");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ExtractStartResponse {
            recording_id: id,
            status: "started".to_string(),
            total_clips,
        }),
    ))
}

/// Aggregate extraction status response.
#[derive(Serialize)]
pub struct ExtractionStatusResponse {
    pub recording_id: RecordingId,
    pub status: String,
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
    pub processing: u32,
    pub pending: u32,
}

/// Poll the live extraction attempt.
pub async fn extraction_status(
    State(state): State<AppState>,
    Path(recording_id): Path<String>,
) -> ApiResult<Json<ExtractionStatusResponse>> {
    let id = RecordingId::from_string(recording_id);
    state.store.recordings().get_required(&id).await?;

    let summary = state.extractor.extraction_status(&id).await?;
    Ok(Json(ExtractionStatusResponse {
        recording_id: id,
        status: summary.status().as_str().to_string(),
        total: summary.total,
        completed: summary.completed,
        failed: summary.failed,
        processing: summary.processing,
        pending: summary.pending,
    }))
}
