//! API routes.

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::clips::{extraction_status, start_extraction};
use crate::handlers::health::{health, ready};
use crate::handlers::recordings::{create_recording, get_recording};
use crate::handlers::render::{render_status, submit_render};
use crate::handlers::slots::{list_selections, reposition_slot, set_scene_duration};
use crate::handlers::webhook::render_callback;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let recording_routes = Router::new()
        .route("/recordings", post(create_recording))
        .route("/recordings/:recording_id", get(get_recording))
        // Positioning
        .route(
            "/recordings/:recording_id/scenes/:scene/duration",
            put(set_scene_duration),
        )
        .route(
            "/recordings/:recording_id/slots/:slot_number",
            put(reposition_slot),
        )
        .route("/recordings/:recording_id/slots", get(list_selections))
        // Extraction
        .route(
            "/recordings/:recording_id/clips/extract",
            post(start_extraction),
        )
        .route(
            "/recordings/:recording_id/clips/status",
            get(extraction_status),
        )
        // Render
        .route("/recordings/:recording_id/render", post(submit_render))
        .route("/recordings/:recording_id/render/status", get(render_status));

    // Token-authenticated; reachable without a session.
    let webhook_routes = Router::new().route("/render/callback", post(render_callback));

    let api_routes = Router::new().merge(recording_routes).merge(webhook_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
