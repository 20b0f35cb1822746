//! Countdown driver background task

use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, trace};

use crate::state::{AppState, TickOutcome};

const TICK: Duration = Duration::from_secs(1);

/// Start driving the countdown run `epoch`
pub fn spawn_countdown(state: Arc<AppState>, epoch: u64) -> JoinHandle<()> {
    tokio::spawn(countdown_task(state, epoch))
}

/// Tick the timer once per elapsed second until it expires or the run is replaced.
///
/// Deadlines are fixed at start, one second apart, so delays in waking up do
/// not accumulate; missed deadlines are delivered in a burst.
pub async fn countdown_task(state: Arc<AppState>, epoch: u64) {
    debug!("Starting countdown run {}", epoch);

    let mut interval = interval_at(Instant::now() + TICK, TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        interval.tick().await;

        match state.countdown_tick(epoch) {
            Ok(TickOutcome::Counting(remaining)) => {
                trace!("Countdown run {}: {}s remaining", epoch, remaining);
            }
            Ok(TickOutcome::Expired) => {
                debug!("Countdown run {} expired", epoch);
                break;
            }
            Ok(TickOutcome::Ignored) => {
                debug!("Countdown run {} superseded", epoch);
                break;
            }
            Err(e) => {
                error!("Failed to advance countdown: {}", e);
                break;
            }
        }
    }
}
