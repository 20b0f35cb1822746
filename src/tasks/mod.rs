//! Background tasks module
//!
//! Periodic tickers and one-shot fetches that run alongside the HTTP server.
//! Ticker handles are owned by `AppState`, which aborts them when their
//! driving condition ends.

pub mod clock_ticker;
pub mod countdown;
pub mod fetchers;

// Re-export main functions
pub use clock_ticker::spawn_clock_ticker;
pub use countdown::spawn_countdown;
pub use fetchers::{quote_fetch_task, weather_fetch_task};
