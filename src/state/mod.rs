//! State management module
//!
//! This module contains the display state and the pure state machines
//! behind it.

pub mod app_state;
pub mod clock;
pub mod events;
pub mod timer_state;
pub mod view_state;

// Re-export main types
pub use app_state::{AppState, DisplaySettings};
pub use clock::ClockReading;
pub use events::DisplayEvent;
pub use timer_state::{TickOutcome, TimerPhase, TimerSnapshot, TimerState};
pub use view_state::{QuotePanel, QuoteStatus, View, WeatherPanel, WeatherSnapshot};
