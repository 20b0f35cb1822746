//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    services::CurrentConditions,
    state::{ClockReading, QuoteStatus, TimerSnapshot, View, WeatherSnapshot},
};

/// API response structure for actions that change the display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Everything needed to draw the display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub view: View,
    pub clock: ClockReading,
    pub weather: WeatherSnapshot,
    pub timer: TimerSnapshot,
    pub quote: QuoteStatus,
    pub uptime: String,
    pub port: u16,
    pub host: String,
}

/// Current conditions; `conditions` is null when the backend is unavailable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeatherResponse {
    pub available: bool,
    pub conditions: Option<CurrentConditions>,
}

/// Body of `PUT /timer/minutes`.
///
/// Normally `{"value": ...}` with any JSON value, but a bare JSON value or
/// plain text is taken as the value too, so no body is ever rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct MinutesRequest {
    #[serde(default)]
    pub value: serde_json::Value,
}

impl MinutesRequest {
    pub fn from_body(body: &[u8]) -> Self {
        use serde_json::Value;

        if let Ok(request) = serde_json::from_slice::<MinutesRequest>(body) {
            return request;
        }
        let value = serde_json::from_slice::<Value>(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).trim().to_string()));
        Self { value }
    }

    /// Minutes to apply; anything that is not a non-negative number becomes 0
    pub fn minutes(&self) -> u32 {
        use crate::state::timer_state::coerce_minutes;
        use serde_json::Value;

        match &self.value {
            Value::String(raw) => coerce_minutes(raw),
            Value::Number(n) => match (n.as_u64(), n.as_f64()) {
                (Some(whole), _) => u32::try_from(whole).unwrap_or(u32::MAX),
                (None, Some(float)) if float.is_finite() && float > 0.0 => {
                    float.trunc().min(u32::MAX as f64) as u32
                }
                _ => 0,
            },
            _ => 0,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
