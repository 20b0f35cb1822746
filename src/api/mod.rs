//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod events;
pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use events::events_handler;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/view/:view", post(view_handler))
        .route("/clock", get(clock_handler))
        .route("/weather", get(weather_handler))
        .route("/weather/current", get(current_weather_handler))
        .route("/location", post(location_handler))
        .route("/timer", get(timer_handler))
        .route("/timer/toggle", post(timer_toggle_handler))
        .route("/timer/reset", post(timer_reset_handler))
        .route("/timer/submit", post(timer_submit_handler))
        .route("/timer/minutes", put(timer_minutes_handler))
        .route("/quote", get(quote_handler))
        .route("/quote/open", post(quote_open_handler))
        .route("/quote/close", post(quote_close_handler))
        .route("/events", get(events_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
