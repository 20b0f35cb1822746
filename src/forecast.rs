//! Hourly forecast selection for the clock view
//!
//! The forecast backend delivers up to 48 hourly samples. The clock shows a
//! short strip of chips (every other hour, up to 22:00) and highlights the
//! chip for the current hour.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Last hour of the day that is still shown in the strip
pub const LAST_DISPLAY_HOUR: u32 = 22;

/// Label used for weather codes missing from the table
pub const UNKNOWN_WEATHER: &str = "不明";

/// A single chip of the hourly weather strip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyForecastEntry {
    /// Hour of day formatted as "HH:00"
    pub time: String,
    /// Temperature in °C, rounded
    pub temperature: i32,
    pub weather_label: String,
    /// `None` when the backend had no code for this hour
    pub weather_code: Option<i32>,
    /// Precipitation probability in percent (0-100)
    pub precipitation_probability: u8,
}

impl HourlyForecastEntry {
    /// Hour component of `time`, if it parses
    pub fn hour(&self) -> Option<u32> {
        parse_hour(&self.time)
    }
}

/// Raw hourly sample as delivered by the forecast backend, in backend-local time
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySample {
    pub at: NaiveDateTime,
    /// Missing temperatures are read as 0 °C
    pub temperature: f64,
    pub weather_code: Option<i32>,
    /// Missing values count as 0 %
    pub precipitation_probability: Option<f64>,
}

impl HourlySample {
    /// Convert into a display chip
    pub fn to_entry(&self) -> HourlyForecastEntry {
        HourlyForecastEntry {
            time: format!("{:02}:00", self.at.hour()),
            temperature: round_half_up(self.temperature),
            weather_label: self
                .weather_code
                .map_or(UNKNOWN_WEATHER, weather_label)
                .to_string(),
            weather_code: self.weather_code,
            precipitation_probability: self
                .precipitation_probability
                .filter(|p| p.is_finite())
                .map(|p| p.round().clamp(0.0, 100.0) as u8)
                .unwrap_or(0),
        }
    }
}

/// Parse the hour out of an "HH:00" string; tolerates a leading zero
pub fn parse_hour(time: &str) -> Option<u32> {
    time.split(':').next()?.trim().parse().ok()
}

/// Pick the chip matching `now_hour`.
///
/// Falls back to the first chip when no hour matches, and to `None` for an
/// empty forecast.
pub fn current_hour_lookup(
    forecast: &[HourlyForecastEntry],
    now_hour: u32,
) -> Option<&HourlyForecastEntry> {
    forecast
        .iter()
        .find(|entry| entry.hour() == Some(now_hour))
        .or_else(|| forecast.first())
}

/// Reduce a raw hourly feed to the strip shown on the clock.
///
/// Samples before the current hour are dropped. The scan stops at the first
/// remaining sample later than 22:00, even when the feed continues into the
/// next day. Of what is left, the first chip is always kept and afterwards
/// only hours an even distance away from the current hour.
pub fn filter_to_display_window(
    raw: &[HourlySample],
    now: NaiveDateTime,
) -> Vec<HourlyForecastEntry> {
    let now_hour = now.hour();
    let mut window: Vec<HourlyForecastEntry> = Vec::new();

    for sample in raw.iter().filter(|sample| is_upcoming(sample.at, now)) {
        let hour = sample.at.hour();
        if hour > LAST_DISPLAY_HOUR {
            break;
        }

        let offset = hour as i32 - now_hour as i32;
        if window.is_empty() || offset % 2 == 0 {
            window.push(sample.to_entry());
        }
    }

    window
}

/// Hour granularity: anything in the current hour still counts as upcoming
fn is_upcoming(at: NaiveDateTime, now: NaiveDateTime) -> bool {
    let (day, today) = (at.date(), now.date());
    day > today || (day == today && at.hour() >= now.hour())
}

/// Round like the display does: halves go towards positive infinity
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Convert a WMO weather code into its display label
pub fn weather_label(code: i32) -> &'static str {
    match code {
        0 => "快晴",
        1 => "晴れ",
        2 => "一部曇り",
        3 => "曇り",
        45 => "霧",
        48 => "濃霧",
        51 => "小雨",
        53 => "中程度の雨",
        55 => "強い雨",
        56 => "凍る小雨",
        57 => "凍る強い雨",
        61 => "弱い雨",
        63 => "中程度の雨",
        65 => "強い雨",
        66 => "凍る雨",
        67 => "凍る強い雨",
        71 => "弱い雪",
        73 => "中程度の雪",
        75 => "強い雪",
        77 => "雪粒",
        80 => "弱いにわか雨",
        81 => "中程度のにわか雨",
        82 => "強いにわか雨",
        85 => "弱い雪",
        86 => "強い雪",
        95 => "雷雨",
        96 => "雹を伴う雷雨",
        99 => "強い雹を伴う雷雨",
        _ => UNKNOWN_WEATHER,
    }
}
