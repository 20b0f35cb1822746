//! Lakeside Clock - A state-managed ambient display server
//!
//! The display toggles between a live clock with an hourly weather strip and
//! a countdown timer, with an optional quote panel. This library holds the
//! display state, the background tasks that drive it and the HTTP API that
//! renderers poll or subscribe to.

pub mod api;
pub mod config;
pub mod forecast;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use state::AppState;
pub use utils::signals::shutdown_signal;
