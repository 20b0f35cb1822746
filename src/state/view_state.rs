//! View selection and the panels that load data asynchronously
//!
//! Both panels carry a generation counter. A fetch captures the generation
//! it was started for and its result is only applied while that generation
//! is still current, so late responses for a torn-down view are dropped.

use serde::{Deserialize, Serialize};

use crate::{
    forecast::{current_hour_lookup, HourlyForecastEntry},
    services::QuoteData,
};

/// Which of the two screens is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Clock,
    Timer,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Clock => "clock",
            View::Timer => "timer",
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hourly weather strip of the clock view
#[derive(Debug, Default)]
pub struct WeatherPanel {
    generation: u64,
    loading: bool,
    entries: Vec<HourlyForecastEntry>,
}

/// What the display needs to draw the weather strip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub loading: bool,
    pub location: String,
    /// Chip for the current hour, or the first chip
    pub current: Option<HourlyForecastEntry>,
    pub hourly: Vec<HourlyForecastEntry>,
}

impl WeatherPanel {
    /// Start a new fetch; returns the generation the result must carry
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        self.entries.clear();
        self.generation
    }

    /// Forget any fetch in flight
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    /// Apply a fetch result. Returns false when the result is stale.
    pub fn complete(&mut self, generation: u64, entries: Vec<HourlyForecastEntry>) -> bool {
        if generation != self.generation {
            return false;
        }

        self.loading = false;
        self.entries = entries;
        true
    }

    pub fn snapshot(&self, now_hour: u32, location: &str) -> WeatherSnapshot {
        WeatherSnapshot {
            loading: self.loading,
            location: location.to_string(),
            current: current_hour_lookup(&self.entries, now_hour).cloned(),
            hourly: self.entries.clone(),
        }
    }
}

/// Visibility of the quote panel
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QuoteStatus {
    #[default]
    Hidden,
    Loading,
    Shown(QuoteData),
}

#[derive(Debug, Default)]
pub struct QuotePanel {
    generation: u64,
    status: QuoteStatus,
}

impl QuotePanel {
    /// Open the panel. Returns the fetch generation, or `None` if the panel
    /// is already open and no new fetch is needed.
    pub fn open(&mut self) -> Option<u64> {
        if self.status != QuoteStatus::Hidden {
            return None;
        }

        self.generation += 1;
        self.status = QuoteStatus::Loading;
        Some(self.generation)
    }

    /// Hide the panel. Returns false if it was already hidden.
    pub fn close(&mut self) -> bool {
        if self.status == QuoteStatus::Hidden {
            return false;
        }

        self.generation += 1;
        self.status = QuoteStatus::Hidden;
        true
    }

    pub fn complete(&mut self, generation: u64, quote: QuoteData) -> bool {
        if generation != self.generation || self.status != QuoteStatus::Loading {
            return false;
        }

        self.status = QuoteStatus::Shown(quote);
        true
    }

    pub fn status(&self) -> &QuoteStatus {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chip(time: &str) -> HourlyForecastEntry {
        HourlyForecastEntry {
            time: time.to_string(),
            temperature: 21,
            weather_label: "曇り".to_string(),
            weather_code: Some(3),
            precipitation_probability: 40,
        }
    }

    #[test]
    fn weather_panel_drops_stale_results() {
        let mut panel = WeatherPanel::default();
        let first = panel.begin();
        let second = panel.begin();

        assert!(!panel.complete(first, vec![chip("09:00")]));
        assert!(panel.snapshot(9, "東京都").loading);

        assert!(panel.complete(second, vec![chip("10:00"), chip("12:00")]));
        let snapshot = panel.snapshot(12, "東京都");
        assert!(!snapshot.loading);
        assert_eq!(snapshot.hourly.len(), 2);
        assert_eq!(snapshot.current.map(|c| c.time), Some("12:00".to_string()));
    }

    #[test]
    fn weather_panel_invalidation_discards_fetch_in_flight() {
        let mut panel = WeatherPanel::default();
        let generation = panel.begin();
        panel.invalidate();

        assert!(!panel.complete(generation, vec![chip("09:00")]));
    }

    #[test]
    fn empty_forecast_is_not_loading_and_has_no_current_chip() {
        let mut panel = WeatherPanel::default();
        let generation = panel.begin();
        assert!(panel.complete(generation, Vec::new()));

        let snapshot = panel.snapshot(9, "東京都");
        assert!(!snapshot.loading);
        assert!(snapshot.current.is_none());
    }

    #[test]
    fn quote_panel_fetches_once_per_opening() {
        let mut panel = QuotePanel::default();
        let generation = panel.open().expect("first open starts a fetch");
        assert!(panel.open().is_none());

        let quote = QuoteData::fallback();
        assert!(panel.complete(generation, quote.clone()));
        assert_eq!(panel.status(), &QuoteStatus::Shown(quote));
        assert!(panel.open().is_none());
    }

    #[test]
    fn quote_result_after_close_is_discarded() {
        let mut panel = QuotePanel::default();
        let generation = panel.open().expect("fetch generation");
        assert!(panel.close());

        assert!(!panel.complete(generation, QuoteData::fallback()));
        assert_eq!(panel.status(), &QuoteStatus::Hidden);

        // Re-opening starts a fresh fetch that the old result cannot satisfy
        let reopened = panel.open().expect("new generation");
        assert_ne!(reopened, generation);
        assert!(!panel.complete(generation, QuoteData::fallback()));
        assert_eq!(panel.status(), &QuoteStatus::Loading);
    }

    #[test]
    fn view_names() {
        assert_eq!(View::default(), View::Clock);
        assert_eq!(View::Timer.to_string(), "timer");
    }
}
