//! Request handlers.
//!
//! The location handlers only adapt HTTP to the store and map failures to [`ApiError`].

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use pottysnitch_core::{validate, LocationSubmission};
use pottysnitch_telemetry::{MetricsSnapshot, Timer};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::{AppState, MapKeys};

/// Body returned after a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// Always `true`.
    pub success: bool,
}

/// `GET /api/locations`
#[tracing::instrument(name = "list_locations", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn list_locations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LocationSubmission>>, ApiError> {
    let timer = Timer::start("list_locations");
    let result = state.store.read_all().await;
    state.metrics.record_list(result.is_ok());
    timer.stop();

    match result {
        Ok(locations) => {
            tracing::debug!(count = locations.len(), "Listed locations");
            Ok(Json(locations))
        },
        Err(e) => {
            tracing::error!(error = %e, store = %state.store.describe(), "Failed to read locations");
            Err(ApiError::FetchFailed(e))
        },
    }
}

/// `POST /api/locations`
#[tracing::instrument(name = "submit_location", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn submit_location(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SubmitResponse>, ApiError> {
    let submission = match decode(&state, &body) {
        Ok(submission) => submission,
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "Rejected submission");
            state.metrics.record_rejected();
            return Err(ApiError::MalformedInput(e));
        },
    };

    let name = submission.name().unwrap_or("<unnamed>").to_string();
    let timer = Timer::start("submit_location");
    let result = state.store.append(submission).await;
    timer.stop();

    match result {
        Ok(count) => {
            tracing::info!(name = %name, count, "Saved location");
            state.metrics.record_accepted();
            Ok(Json(SubmitResponse { success: true }))
        },
        Err(e) => {
            tracing::error!(error = %e, store = %state.store.describe(), "Failed to save location");
            state.metrics.record_failed();
            Err(ApiError::SaveFailed(e))
        },
    }
}

fn decode(state: &AppState, body: &[u8]) -> pottysnitch_core::Result<LocationSubmission> {
    let submission = LocationSubmission::from_json_slice(body)?;
    if state.config.strict_validation {
        validate(&submission)?;
    }
    Ok(submission)
}

/// `GET /health`
pub async fn health() -> &'static str {
    "OK"
}

/// Body of `GET /api/status`.
#[derive(Debug, Serialize)]
pub struct ServerStatus {
    status: String,
    uptime_seconds: u64,
    store: String,
    locations: Option<usize>,
    requests: MetricsSnapshot,
}

/// `GET /api/status`
pub async fn server_status(State(state): State<Arc<AppState>>) -> Json<ServerStatus> {
    let locations = match state.store.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Could not count locations for status");
            None
        },
    };

    Json(ServerStatus {
        status: "running".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        store: state.store.describe(),
        locations,
        requests: state.metrics.snapshot(),
    })
}

/// `GET /api/map-config`
pub async fn map_config(State(state): State<Arc<AppState>>) -> Json<MapKeys> {
    Json(state.config.map_keys.clone())
}
