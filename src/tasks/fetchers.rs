//! One-shot fetches for the weather strip and the quote panel

use std::sync::Arc;
use tracing::{error, warn};

use crate::{
    forecast::filter_to_display_window,
    services::fetch_quote,
    state::AppState,
};

/// Fetch and filter the hourly forecast for the clock view.
///
/// A failed fetch is shown as an empty forecast.
pub async fn weather_fetch_task(state: Arc<AppState>, generation: u64) {
    let entries = match state.weather_provider.fetch_hourly(state.settings.home).await {
        Ok(samples) => filter_to_display_window(&samples, state.now().naive_local()),
        Err(e) => {
            error!("Failed to fetch hourly weather: {:#}", e);
            Vec::new()
        }
    };

    if let Err(e) = state.apply_weather(generation, entries) {
        warn!("Failed to store hourly weather: {}", e);
    }
}

/// Fetch one quote for the quote panel
pub async fn quote_fetch_task(state: Arc<AppState>, generation: u64) {
    let quote = fetch_quote(state.quote_provider.as_ref()).await;

    if let Err(e) = state.apply_quote(generation, quote) {
        warn!("Failed to store quote: {}", e);
    }
}
