//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::{
    services::Coordinates,
    state::{AppState, ClockReading, QuoteStatus, TimerSnapshot, View, WeatherSnapshot},
};
use super::responses::{
    ApiResponse, CurrentWeatherResponse, HealthResponse, MinutesRequest, StatusResponse,
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, StatusCode>;

fn internal_error(context: &str, e: String) -> StatusCode {
    error!("{}: {}", context, e);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Handle GET /status - Return everything the display shows
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let view = state
        .current_view()
        .map_err(|e| internal_error("Failed to get view", e))?;
    let weather = state
        .weather_snapshot()
        .map_err(|e| internal_error("Failed to get weather", e))?;
    let timer = state
        .timer_snapshot()
        .map_err(|e| internal_error("Failed to get timer state", e))?;
    let quote = state
        .quote_status()
        .map_err(|e| internal_error("Failed to get quote state", e))?;

    Ok(Json(StatusResponse {
        view,
        clock: state.clock_reading(),
        weather,
        timer,
        quote,
        uptime: state.get_uptime(),
        port: state.settings.port,
        host: state.settings.host.clone(),
    }))
}

/// Handle POST /view/:view - Switch between the clock and the timer
pub async fn view_handler(
    State(state): State<Arc<AppState>>,
    Path(view): Path<View>,
) -> ApiResult<View> {
    let view = state
        .switch_view(view)
        .map_err(|e| internal_error("Failed to switch view", e))?;

    Ok(Json(ApiResponse::ok(format!("Showing {} view", view), view)))
}

/// Handle GET /clock - Current time as displayed
pub async fn clock_handler(State(state): State<Arc<AppState>>) -> Json<ClockReading> {
    Json(state.clock_reading())
}

/// Handle GET /weather - Hourly weather strip
pub async fn weather_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<WeatherSnapshot>, StatusCode> {
    state
        .weather_snapshot()
        .map(Json)
        .map_err(|e| internal_error("Failed to get weather", e))
}

/// Handle GET /weather/current - Conditions at the best known location
pub async fn current_weather_handler(State(state): State<Arc<AppState>>) -> Json<CurrentWeatherResponse> {
    let conditions = state.current_conditions().await;
    Json(CurrentWeatherResponse {
        available: conditions.is_some(),
        conditions,
    })
}

/// Handle POST /location - Record a client-reported position
pub async fn location_handler(
    State(state): State<Arc<AppState>>,
    Json(coordinates): Json<Coordinates>,
) -> Result<Json<ApiResponse<Coordinates>>, StatusCode> {
    match state.locator.report(coordinates) {
        Ok(()) => Ok(Json(ApiResponse::ok("Location recorded", coordinates))),
        Err(e) => {
            warn!("Rejected location report: {}", e);
            Err(StatusCode::UNPROCESSABLE_ENTITY)
        }
    }
}

/// Handle GET /timer - Current timer state
pub async fn timer_handler(State(state): State<Arc<AppState>>) -> Result<Json<TimerSnapshot>, StatusCode> {
    state
        .timer_snapshot()
        .map(Json)
        .map_err(|e| internal_error("Failed to get timer state", e))
}

/// Handle POST /timer/toggle - Start or pause the countdown
pub async fn timer_toggle_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerSnapshot> {
    let snapshot = state
        .toggle_timer()
        .map_err(|e| internal_error("Failed to toggle timer", e))?;

    let message = if snapshot.state.is_active {
        "Timer started"
    } else {
        "Timer paused"
    };
    info!("{} at {}", message, snapshot.display);
    Ok(Json(ApiResponse::ok(message, snapshot)))
}

/// Handle POST /timer/reset - Reload the countdown from the minutes field
pub async fn timer_reset_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerSnapshot> {
    let snapshot = state
        .reset_timer()
        .map_err(|e| internal_error("Failed to reset timer", e))?;

    info!("Timer reset to {}", snapshot.display);
    Ok(Json(ApiResponse::ok("Timer reset", snapshot)))
}

/// Handle POST /timer/submit - Enter key in the minutes field
pub async fn timer_submit_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerSnapshot> {
    let snapshot = state
        .submit_timer()
        .map_err(|e| internal_error("Failed to submit timer", e))?;

    let message = if snapshot.state.is_active {
        "Timer running"
    } else {
        "Nothing to start"
    };
    Ok(Json(ApiResponse::ok(message, snapshot)))
}

/// Handle PUT /timer/minutes - Edit the minutes field
pub async fn timer_minutes_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<TimerSnapshot> {
    let minutes = MinutesRequest::from_body(&body).minutes();
    let snapshot = state
        .edit_minutes(minutes)
        .map_err(|e| internal_error("Failed to edit minutes", e))?;

    Ok(Json(ApiResponse::ok(format!("Minutes set to {}", minutes), snapshot)))
}

/// Handle GET /quote - Quote panel state
pub async fn quote_handler(State(state): State<Arc<AppState>>) -> Result<Json<QuoteStatus>, StatusCode> {
    state
        .quote_status()
        .map(Json)
        .map_err(|e| internal_error("Failed to get quote state", e))
}

/// Handle POST /quote/open - Show the quote panel
pub async fn quote_open_handler(State(state): State<Arc<AppState>>) -> ApiResult<QuoteStatus> {
    let status = state
        .open_quote()
        .map_err(|e| internal_error("Failed to open quote panel", e))?;

    Ok(Json(ApiResponse::ok("Quote panel open", status)))
}

/// Handle POST /quote/close - Hide the quote panel
pub async fn quote_close_handler(State(state): State<Arc<AppState>>) -> ApiResult<QuoteStatus> {
    let status = state
        .close_quote()
        .map_err(|e| internal_error("Failed to close quote panel", e))?;

    Ok(Json(ApiResponse::ok("Quote panel closed", status)))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
