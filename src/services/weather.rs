//! Open-Meteo forecast client

use std::{fmt::Debug, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::forecast::{weather_label, HourlySample};

use super::Coordinates;

pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";

/// Days of hourly data requested for the strip
const FORECAST_DAYS: &str = "2";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Conditions right now at a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub temperature: i32,
    pub weather_label: String,
    pub weather_code: i32,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Up to 48 hourly samples starting at local midnight today
    async fn fetch_hourly(&self, at: Coordinates) -> Result<Vec<HourlySample>>;

    async fn fetch_current(&self, at: Coordinates) -> Result<CurrentConditions>;
}

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    base_url: String,
    timezone: String,
    http: Client,
}

impl OpenMeteoClient {
    pub fn new(base_url: String, timezone: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client for Open-Meteo")?;

        Ok(Self {
            base_url,
            timezone,
            http,
        })
    }

    async fn get(&self, at: Coordinates, params: &[(&str, &str)], what: &str) -> Result<String> {
        let latitude = at.latitude.to_string();
        let longitude = at.longitude.to_string();

        let mut query = vec![
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("timezone", self.timezone.as_str()),
        ];
        query.extend_from_slice(params);

        debug!("Requesting {} weather from {}", what, self.base_url);

        let res = self
            .http
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to Open-Meteo ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read Open-Meteo {what} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo {} request failed with status {}: {}",
                what,
                status,
                truncate_body(&body),
            ));
        }

        Ok(body)
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn fetch_hourly(&self, at: Coordinates) -> Result<Vec<HourlySample>> {
        let body = self
            .get(
                at,
                &[
                    ("hourly", "temperature_2m,weather_code,precipitation_probability"),
                    ("forecast_days", FORECAST_DAYS),
                ],
                "hourly",
            )
            .await?;

        parse_hourly(&body)
    }

    async fn fetch_current(&self, at: Coordinates) -> Result<CurrentConditions> {
        let body = self
            .get(at, &[("current", "temperature_2m,weather_code")], "current")
            .await?;

        parse_current(&body)
    }
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    weather_code: Vec<Option<i32>>,
    #[serde(default)]
    precipitation_probability: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmHourlyResponse {
    hourly: OmHourly,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: f64,
    weather_code: i32,
}

#[derive(Debug, Deserialize)]
struct OmCurrentResponse {
    current: OmCurrent,
}

/// Turn the parallel hourly arrays into samples.
///
/// Every hour is kept: a missing temperature reads as 0 °C and a missing
/// weather code is left empty, so the display window still sees each hour.
pub fn parse_hourly(body: &str) -> Result<Vec<HourlySample>> {
    let parsed: OmHourlyResponse =
        serde_json::from_str(body).context("Failed to parse Open-Meteo hourly JSON")?;
    let hourly = parsed.hourly;

    let mut samples = Vec::with_capacity(hourly.time.len());
    for (i, time) in hourly.time.iter().enumerate() {
        let at = NaiveDateTime::parse_from_str(time, TIME_FORMAT)
            .with_context(|| format!("Unexpected Open-Meteo timestamp '{time}'"))?;

        let temperature = hourly.temperature_2m.get(i).copied().flatten();
        let weather_code = hourly.weather_code.get(i).copied().flatten();
        if temperature.is_none() || weather_code.is_none() {
            debug!("Incomplete forecast hour {}", time);
        }

        samples.push(HourlySample {
            at,
            temperature: temperature.unwrap_or(0.0),
            weather_code,
            precipitation_probability: hourly.precipitation_probability.get(i).copied().flatten(),
        });
    }

    Ok(samples)
}

pub fn parse_current(body: &str) -> Result<CurrentConditions> {
    let parsed: OmCurrentResponse =
        serde_json::from_str(body).context("Failed to parse Open-Meteo current JSON")?;
    let current = parsed.current;

    Ok(CurrentConditions {
        temperature: (current.temperature_2m + 0.5).floor() as i32,
        weather_label: weather_label(current.weather_code).to_string(),
        weather_code: current.weather_code,
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
