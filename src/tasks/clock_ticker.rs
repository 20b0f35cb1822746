//! Clock ticker background task

use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::debug;

use crate::state::{AppState, DisplayEvent};

/// Start the 1 Hz clock for the clock view
pub fn spawn_clock_ticker(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(clock_ticker_task(state))
}

/// Publish the current time once per second until aborted
pub async fn clock_ticker_task(state: Arc<AppState>) {
    debug!("Starting clock ticker");

    let mut interval = interval(Duration::from_secs(1));
    // A late redraw is replaced by the next one, never replayed
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        state.publish(DisplayEvent::Clock(state.clock_reading()));
    }
}
