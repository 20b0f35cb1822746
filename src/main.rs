//! Lakeside Clock - A state-managed ambient display server
//!
//! This is the main entry point for the lakeside-clock application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use lakeside_clock::{
    api::create_router,
    config::Config,
    services::{GeminiClient, Geolocator, OpenMeteoClient},
    state::AppState,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("lakeside_clock={},tower_http=info", config.log_level()))
        .init();

    info!("Starting lakeside-clock server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, timer={}min, location=({}, {})",
          config.host, config.port, config.minutes, config.latitude, config.longitude);

    let api_key = config.api_key();
    if api_key.is_none() {
        warn!("No quote API key configured; the quote panel will show the fallback quote");
    }

    let settings = config.display_settings()?;
    let weather = OpenMeteoClient::new(config.weather_url.clone(), config.timezone.clone())?;
    let quotes = GeminiClient::new(config.quote_url.clone(), config.quote_model.clone(), api_key)?;
    let locator = Geolocator::new(
        config.home(),
        config.geolocation_timeout(),
        config.geolocation_max_age(),
    );

    // Create application state and show the clock
    let state = Arc::new(AppState::new(settings, Arc::new(weather), Arc::new(quotes), locator));
    if let Err(e) = state.activate() {
        anyhow::bail!("Failed to activate display: {}", e);
    }

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /status          - Everything on the display");
    info!("  POST /view/:view      - Show the clock or the timer");
    info!("  GET  /weather         - Hourly weather strip");
    info!("  GET  /weather/current - Current conditions");
    info!("  POST /location        - Report a location fix");
    info!("  POST /timer/toggle    - Start or pause the countdown");
    info!("  POST /timer/reset     - Reset the countdown");
    info!("  PUT  /timer/minutes   - Edit the countdown minutes");
    info!("  POST /quote/open      - Show a quote");
    info!("  GET  /events          - Display change stream (SSE)");
    info!("  GET  /health          - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.teardown();
    info!("Server shutdown complete");
    Ok(())
}
