//! Configuration and CLI argument handling

use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::FixedOffset;
use clap::Parser;
use tracing::warn;

use crate::{
    services::{
        quote::{DEFAULT_QUOTE_MODEL, DEFAULT_QUOTE_URL},
        weather::{DEFAULT_TIMEZONE, DEFAULT_WEATHER_URL},
        ApiKey, Coordinates,
    },
    state::{timer_state::DEFAULT_MINUTES, DisplaySettings},
};

/// UTC offset in hours of the display default
const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;

/// CLI argument parsing structure; every option can also come from the environment
#[derive(Parser)]
#[command(name = "lakeside-clock")]
#[command(about = "A state-managed ambient display server: clock, hourly weather, countdown timer and quotes")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, env = "LAKESIDE_PORT", default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "LAKESIDE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Initial countdown length in minutes
    #[arg(short, long, env = "LAKESIDE_MINUTES", default_value_t = DEFAULT_MINUTES)]
    pub minutes: u32,

    /// Latitude of the hourly forecast and the location fallback
    #[arg(long, env = "LAKESIDE_LATITUDE", default_value_t = Coordinates::TOKYO.latitude, allow_negative_numbers = true)]
    pub latitude: f64,

    /// Longitude of the hourly forecast and the location fallback
    #[arg(long, env = "LAKESIDE_LONGITUDE", default_value_t = Coordinates::TOKYO.longitude, allow_negative_numbers = true)]
    pub longitude: f64,

    /// Place name shown with the weather
    #[arg(long, env = "LAKESIDE_LOCATION_LABEL", default_value = "東京都")]
    pub location_label: String,

    /// IANA timezone the forecast is requested in
    #[arg(long, env = "LAKESIDE_TIMEZONE", default_value = DEFAULT_TIMEZONE)]
    pub timezone: String,

    /// UTC offset of the displayed clock, in hours
    #[arg(long, env = "LAKESIDE_UTC_OFFSET_HOURS", default_value_t = DEFAULT_UTC_OFFSET_HOURS, allow_negative_numbers = true)]
    pub utc_offset_hours: i32,

    /// Seconds to wait for a client location fix
    #[arg(long, env = "LAKESIDE_GEOLOCATION_TIMEOUT_SECS", default_value_t = 5)]
    pub geolocation_timeout_secs: u64,

    /// Maximum age of a client location fix in seconds
    #[arg(long, env = "LAKESIDE_GEOLOCATION_MAX_AGE_SECS", default_value_t = 600)]
    pub geolocation_max_age_secs: u64,

    /// Forecast endpoint
    #[arg(long, env = "LAKESIDE_WEATHER_URL", default_value = DEFAULT_WEATHER_URL)]
    pub weather_url: String,

    /// Base URL of the quote service
    #[arg(long, env = "LAKESIDE_QUOTE_URL", default_value = DEFAULT_QUOTE_URL)]
    pub quote_url: String,

    /// Model used to generate quotes
    #[arg(long, env = "LAKESIDE_QUOTE_MODEL", default_value = DEFAULT_QUOTE_MODEL)]
    pub quote_model: String,

    /// API key of the quote service
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn home(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| anyhow!("Invalid UTC offset: {} hours", self.utc_offset_hours))
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation_timeout_secs)
    }

    pub fn geolocation_max_age(&self) -> Duration {
        Duration::from_secs(self.geolocation_max_age_secs)
    }

    pub fn api_key(&self) -> Option<ApiKey> {
        self.api_key.clone().and_then(ApiKey::new)
    }

    /// Offset of the forecast timezone in hours, for zones that never change offset
    fn forecast_offset_hours(&self) -> Option<i32> {
        let zone = self.timezone.trim();
        match zone {
            "UTC" | "GMT" | "Etc/UTC" | "Etc/GMT" => Some(0),
            DEFAULT_TIMEZONE => Some(DEFAULT_UTC_OFFSET_HOURS),
            // POSIX-style names: Etc/GMT-9 is nine hours ahead of UTC
            _ => zone.strip_prefix("Etc/GMT").and_then(|rest| {
                let hours: i32 = rest.parse().ok()?;
                Some(-hours)
            }),
        }
    }

    /// The forecast hours and the clock must share one offset, or every
    /// hour comparison is shifted.
    fn check_timezone(&self) -> Result<()> {
        match self.forecast_offset_hours() {
            Some(hours) if hours != self.utc_offset_hours => Err(anyhow!(
                "Timezone {} is UTC{:+} but the clock offset is UTC{:+}",
                self.timezone,
                hours,
                self.utc_offset_hours
            )),
            Some(_) => Ok(()),
            None => {
                if self.utc_offset_hours == DEFAULT_UTC_OFFSET_HOURS {
                    warn!(
                        "Timezone {} set without --utc-offset-hours; the clock stays at UTC{:+}",
                        self.timezone, self.utc_offset_hours
                    );
                }
                Ok(())
            }
        }
    }

    /// Validate and collect the settings the display state needs
    pub fn display_settings(&self) -> Result<DisplaySettings> {
        self.check_timezone()?;

        let home = self.home();
        if !home.is_valid() {
            return Err(anyhow!(
                "Invalid coordinates: latitude={}, longitude={}",
                self.latitude,
                self.longitude
            ));
        }

        Ok(DisplaySettings {
            host: self.host.clone(),
            port: self.port,
            utc_offset: self.utc_offset()?,
            home,
            location_label: self.location_label.clone(),
            initial_minutes: self.minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["lakeside-clock"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn defaults_target_tokyo() {
        let config = parse(&[]);
        assert_eq!(config.home(), Coordinates::TOKYO);
        assert_eq!(config.minutes, 10);
        assert_eq!(config.timezone, "Asia/Tokyo");
        assert_eq!(config.geolocation_timeout(), Duration::from_secs(5));
        assert_eq!(config.geolocation_max_age(), Duration::from_secs(600));
        assert_eq!(config.log_level(), "info");

        let settings = config.display_settings().expect("valid settings");
        assert_eq!(settings.utc_offset.local_minus_utc(), 9 * 3600);
        assert_eq!(settings.location_label, "東京都");
    }

    #[test]
    fn accepts_negative_coordinates_and_offsets() {
        let config = parse(&[
            "--latitude", "-33.8688",
            "--longitude", "151.2093",
            "--utc-offset-hours", "-3",
            "--verbose",
        ]);
        assert_eq!(config.latitude, -33.8688);
        assert_eq!(config.utc_offset().expect("offset").local_minus_utc(), -3 * 3600);
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn rejects_impossible_settings() {
        assert!(parse(&["--utc-offset-hours", "30"]).utc_offset().is_err());
        assert!(parse(&["--latitude", "123"]).display_settings().is_err());
    }

    #[test]
    fn timezone_and_clock_offset_must_agree() {
        let offset_only = parse(&["--utc-offset-hours", "1"]);
        assert!(offset_only.display_settings().is_err());

        let zone_only = parse(&["--timezone", "Etc/GMT+5"]);
        assert!(zone_only.display_settings().is_err());

        let both = parse(&["--timezone", "Etc/GMT+5", "--utc-offset-hours", "-5"]);
        assert!(both.display_settings().is_ok());
        assert!(parse(&["--timezone", "UTC", "--utc-offset-hours", "0"])
            .display_settings()
            .is_ok());
    }

    #[test]
    fn zones_with_changing_offsets_are_trusted() {
        let config = parse(&["--timezone", "Europe/Berlin", "--utc-offset-hours", "1"]);
        let settings = config.display_settings().expect("valid settings");
        assert_eq!(settings.utc_offset.local_minus_utc(), 3600);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        assert!(parse(&["--api-key", "  "]).api_key().is_none());
        assert!(parse(&["--api-key", "abc"]).api_key().is_some());
    }

    #[test]
    fn address_joins_host_and_port() {
        let config = parse(&["--host", "127.0.0.1", "--port", "8080"]);
        assert_eq!(config.address(), "127.0.0.1:8080");
    }
}
