//! Coordinate resolution for current-conditions lookups
//!
//! Clients that can locate themselves report a fix with `POST /location`.
//! A fix is used while it is younger than the staleness allowance; otherwise
//! the resolver waits briefly for a new report and then falls back to the
//! configured home coordinates.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::{
    sync::watch,
    time::{timeout, Instant},
};
use tracing::{debug, info};

/// How long to wait for a fix before falling back
pub const DEFAULT_ACQUISITION_TIMEOUT: Duration = Duration::from_secs(5);

/// How old a fix may be and still be used
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Central Tokyo
    pub const TOKYO: Coordinates = Coordinates {
        latitude: 35.6762,
        longitude: 139.6503,
    };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Copy)]
struct Fix {
    coordinates: Coordinates,
    taken_at: Instant,
}

#[derive(Debug)]
pub struct Geolocator {
    fallback: Coordinates,
    acquisition_timeout: Duration,
    max_age: Duration,
    fix_tx: watch::Sender<Option<Fix>>,
}

impl Geolocator {
    pub fn new(fallback: Coordinates, acquisition_timeout: Duration, max_age: Duration) -> Self {
        let (fix_tx, _) = watch::channel(None);
        Self {
            fallback,
            acquisition_timeout,
            max_age,
            fix_tx,
        }
    }

    pub fn fallback(&self) -> Coordinates {
        self.fallback
    }

    /// Record a client-reported position
    pub fn report(&self, coordinates: Coordinates) -> Result<(), String> {
        if !coordinates.is_valid() {
            return Err(format!(
                "Invalid coordinates: latitude={}, longitude={}",
                coordinates.latitude, coordinates.longitude
            ));
        }

        info!("Location fix reported");
        debug!(
            "Location fix: latitude={}, longitude={}",
            coordinates.latitude, coordinates.longitude
        );
        self.fix_tx.send_replace(Some(Fix {
            coordinates,
            taken_at: Instant::now(),
        }));
        Ok(())
    }

    /// Coordinates to use right now. Never fails.
    pub async fn resolve(&self) -> Coordinates {
        let mut fix_rx = self.fix_tx.subscribe();

        let fresh = self.fresh(*fix_rx.borrow_and_update());
        if let Some(coordinates) = fresh {
            return coordinates;
        }

        match timeout(self.acquisition_timeout, fix_rx.changed()).await {
            Ok(Ok(())) => {
                let reported = *fix_rx.borrow();
                self.fresh(reported).unwrap_or(self.fallback)
            }
            _ => {
                debug!(
                    "No location fix within {:?}, using default coordinates",
                    self.acquisition_timeout
                );
                self.fallback
            }
        }
    }

    fn fresh(&self, fix: Option<Fix>) -> Option<Coordinates> {
        fix.filter(|fix| fix.taken_at.elapsed() <= self.max_age)
            .map(|fix| fix.coordinates)
    }
}
