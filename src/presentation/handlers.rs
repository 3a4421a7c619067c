// HTTP request handlers - operator control surface
use crate::presentation::app_state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Setpoint the controller used on its last tick
    pub setpoint: f64,
    /// Latest operator request, applied on the next tick
    pub requested_setpoint: f64,
    pub ticks: u64,
    pub measured_flow_rate: f64,
    /// Two-decimal rendering for labels
    pub measured_flow_rate_display: String,
    pub valve_position: u32,
}

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub cumulative: Vec<f64>,
    pub flow_rates: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct SetpointResponse {
    pub setpoint: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Latest measured flow rate and valve position
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = state.snapshots.borrow();
    let (measured_flow_rate, valve_position) = snapshot
        .last_tick
        .map(|t| (t.measured_flow_rate, t.valve_position.get()))
        .unwrap_or((0.0, 0));

    Json(StatusResponse {
        setpoint: snapshot.setpoint,
        requested_setpoint: *state.setpoint_tx.borrow(),
        ticks: snapshot.ticks,
        measured_flow_rate,
        measured_flow_rate_display: format!("{:.2}", measured_flow_rate),
        valve_position,
    })
}

/// Full recorded series for plotting
pub async fn get_series(State(state): State<Arc<AppState>>) -> Json<SeriesResponse> {
    let snapshot = state.snapshots.borrow();
    Json(SeriesResponse {
        cumulative: snapshot.history.cumulative.clone(),
        flow_rates: snapshot.history.flow_rates.clone(),
    })
}

/// Set the desired flow rate from a plain-text body
pub async fn set_setpoint(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    match state.bounds.parse_setpoint(&body) {
        Ok(setpoint) => {
            state.setpoint_tx.send_replace(setpoint);
            (StatusCode::OK, Json(SetpointResponse { setpoint })).into_response()
        }
        Err(e) => {
            tracing::warn!("Rejected setpoint: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
