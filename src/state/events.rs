//! Display change notifications

use serde::Serialize;

use super::{ClockReading, QuoteStatus, TimerSnapshot, View, WeatherSnapshot};

/// Something on the display changed
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayEvent {
    View { view: View },
    Clock(ClockReading),
    Timer(TimerSnapshot),
    /// The countdown reached zero
    TimerExpired { message: String },
    Weather(WeatherSnapshot),
    Quote { quote: QuoteStatus },
}

impl DisplayEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            DisplayEvent::View { .. } => "view",
            DisplayEvent::Clock(_) => "clock",
            DisplayEvent::Timer(_) => "timer",
            DisplayEvent::TimerExpired { .. } => "timer_expired",
            DisplayEvent::Weather(_) => "weather",
            DisplayEvent::Quote { .. } => "quote",
        }
    }
}
