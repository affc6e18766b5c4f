//! Render completion webhook.
//!
//! An external watcher deployment (the machine driving the render
//! tool) reports terminal render outcomes here. Calls carry a shared
//! token; a mismatch is rejected before any state is touched. The
//! handler delegates to the notifier, so duplicate deliveries are
//! no-ops.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use tourcut_models::{RenderCallback, RenderCallbackStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Webhook acknowledgement.
#[derive(Serialize)]
pub struct CallbackResponse {
    pub status: String,
}

/// Handle a render completion/failure callback.
pub async fn render_callback(
    State(state): State<AppState>,
    Json(callback): Json<RenderCallback>,
) -> ApiResult<Json<CallbackResponse>> {
    let Some(expected) = &state.config.render_callback_token else {
        warn!("Render callback received but no token is configured");
        return Err(ApiError::unauthorized("render callback disabled"));
    };
    if callback.token != *expected {
        warn!(
            recording_id = %callback.recording_id,
            project_name = %callback.project_name,
            "Render callback with bad token"
        );
        return Err(ApiError::unauthorized("invalid callback token"));
    }

    info!(
        recording_id = %callback.recording_id,
        project_name = %callback.project_name,
        status = ?callback.status,
        "Render callback received"
    );

    match callback.status {
        RenderCallbackStatus::Completed => {
            let output = callback
                .output_path
                .as_deref()
                .ok_or_else(|| ApiError::bad_request("completed callback without output_path"))?;
            state
                .notifier
                .on_render_complete(&callback.recording_id, output)
                .await?;
        }
        RenderCallbackStatus::Failed => {
            let message = callback.error.as_deref().unwrap_or("render failed");
            state
                .notifier
                .on_render_error(&callback.recording_id, message)
                .await?;
        }
    }

    Ok(Json(CallbackResponse {
        status: "ok".to_string(),
    }))
}
