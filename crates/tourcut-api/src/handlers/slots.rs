//! Slot positioning handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use tourcut_models::{RecordingId, SceneId, SlotSelection};
use tourcut_timeline::PlacedSlot;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Scene duration update request.
#[derive(Debug, Deserialize)]
pub struct SceneDurationRequest {
    pub duration_seconds: f64,
}

/// Positions applied by a scene duration update.
#[derive(Serialize)]
pub struct SceneDurationResponse {
    pub scene: SceneId,
    pub duration_seconds: f64,
    /// `spread` on first capture, `reclamp` afterwards
    pub applied: String,
    pub positions: Vec<PlacedSlot>,
}

/// A scene's recorded duration became known (or changed).
///
/// While every slot of the scene is still unpositioned the slots are
/// spread evenly across the new footage; once anything has been
/// placed, only out-of-range placements are pulled back so manual
/// drags survive duration changes.
pub async fn set_scene_duration(
    State(state): State<AppState>,
    Path((recording_id, scene)): Path<(String, String)>,
    Json(request): Json<SceneDurationRequest>,
) -> ApiResult<Json<SceneDurationResponse>> {
    let id = RecordingId::from_string(recording_id);
    let scene = SceneId::parse(&scene)
        .ok_or_else(|| ApiError::not_found(format!("unknown scene {:?}", scene)))?;

    // 404 before any write for an unknown recording.
    state.store.recordings().get_required(&id).await?;

    let scene_selections = scene_selections(&state, &id, scene).await?;
    let all_sentinel = scene_selections.iter().all(|s| !s.is_positioned());

    let (applied, moves) = if all_sentinel {
        let placed = state
            .positioner
            .initial_spread(scene, request.duration_seconds)?;
        ("spread", placed)
    } else {
        let placed = state
            .positioner
            .reclamp(&scene_selections, request.duration_seconds)?;
        ("reclamp", placed)
    };

    // The duration only persists once the positioner accepted it.
    state
        .store
        .recordings()
        .set_scene_duration(&id, scene, request.duration_seconds)
        .await?;

    let placements: Vec<(u8, f64)> = moves
        .iter()
        .map(|p| (p.slot_number, p.window_start))
        .collect();
    state.store.selections().set_many(&id, &placements).await?;

    info!(
        recording_id = %id,
        scene = %scene,
        duration = request.duration_seconds,
        applied,
        moved = moves.len(),
        "Scene duration applied"
    );

    Ok(Json(SceneDurationResponse {
        scene,
        duration_seconds: request.duration_seconds,
        applied: applied.to_string(),
        positions: moves,
    }))
}

/// Drag reposition request.
#[derive(Debug, Deserialize)]
pub struct RepositionRequest {
    pub window_start: f64,
}

/// Moves applied by a drag, after clamping and pair propagation.
#[derive(Serialize)]
pub struct RepositionResponse {
    pub moves: Vec<PlacedSlot>,
}

/// Drag one slot to a requested start.
///
/// The start is clamped into the scene's valid range; when the slot
/// leads a seamless pair its follow is re-placed directly after it.
pub async fn reposition_slot(
    State(state): State<AppState>,
    Path((recording_id, slot_number)): Path<(String, u8)>,
    Json(request): Json<RepositionRequest>,
) -> ApiResult<Json<RepositionResponse>> {
    let id = RecordingId::from_string(recording_id);
    let recording = state.store.recordings().get_required(&id).await?;

    let slot = state
        .positioner
        .catalog()
        .get(slot_number)
        .ok_or_else(|| ApiError::not_found(format!("unknown slot {}", slot_number)))?;
    let scene_duration = recording.scene_duration(slot.scene).ok_or_else(|| {
        ApiError::conflict(format!("scene {} has no recorded duration", slot.scene))
    })?;

    let moves = state
        .positioner
        .reposition(slot_number, request.window_start, scene_duration)?;

    let placements: Vec<(u8, f64)> = moves
        .iter()
        .map(|p| (p.slot_number, p.window_start))
        .collect();
    state.store.selections().set_many(&id, &placements).await?;

    Ok(Json(RepositionResponse { moves }))
}

/// One slot's current selection.
#[derive(Serialize)]
pub struct SelectionView {
    pub slot_number: u8,
    pub scene: SceneId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_start: Option<f64>,
    pub positioned: bool,
}

/// Current selections response.
#[derive(Serialize)]
pub struct SelectionsResponse {
    pub recording_id: RecordingId,
    pub selections: Vec<SelectionView>,
}

/// List a recording's slot selections.
pub async fn list_selections(
    State(state): State<AppState>,
    Path(recording_id): Path<String>,
) -> ApiResult<Json<SelectionsResponse>> {
    let id = RecordingId::from_string(recording_id);
    state.store.recordings().get_required(&id).await?;

    let selections = state.store.selections().list(&id).await?;
    let views = selections
        .into_iter()
        .filter_map(|s| {
            let slot = state.positioner.catalog().get(s.slot_number)?;
            Some(SelectionView {
                slot_number: s.slot_number,
                scene: slot.scene,
                positioned: s.is_positioned(),
                window_start: s.window_start,
            })
        })
        .collect();

    Ok(Json(SelectionsResponse {
        recording_id: id,
        selections: views,
    }))
}

async fn scene_selections(
    state: &AppState,
    id: &RecordingId,
    scene: SceneId,
) -> ApiResult<Vec<SlotSelection>> {
    let all = state.store.selections().list(id).await?;
    let scene_slots: Vec<u8> = state
        .positioner
        .catalog()
        .scene_slots(scene)
        .iter()
        .map(|s| s.number)
        .collect();
    Ok(all
        .into_iter()
        .filter(|s| scene_slots.contains(&s.slot_number))
        .collect())
}
