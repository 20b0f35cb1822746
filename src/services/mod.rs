//! External service clients
//!
//! Weather forecasts, generated quotes and client-reported locations.

pub mod geolocation;
pub mod quote;
pub mod weather;

// Re-export main types
pub use geolocation::{Coordinates, Geolocator};
pub use quote::{fetch_quote, ApiKey, GeminiClient, QuoteData, QuoteProvider};
pub use weather::{CurrentConditions, OpenMeteoClient, WeatherProvider};
