//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, FixedOffset, Timelike, Utc};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, error, info, trace};

use super::{
    timer_state::EXPIRY_MESSAGE, ClockReading, DisplayEvent, QuotePanel, QuoteStatus, TickOutcome,
    TimerSnapshot, TimerState, View, WeatherPanel, WeatherSnapshot,
};
use crate::{
    forecast::HourlyForecastEntry,
    services::{
        Coordinates, CurrentConditions, Geolocator, QuoteData, QuoteProvider, WeatherProvider,
    },
    tasks,
};

/// Capacity of the display event channel
const EVENT_CAPACITY: usize = 512;

/// Fixed settings derived from the configuration
#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub host: String,
    pub port: u16,
    /// Offset the clock is displayed in
    pub utc_offset: FixedOffset,
    /// Coordinates of the hourly forecast
    pub home: Coordinates,
    /// Place name shown under the weather
    pub location_label: String,
    pub initial_minutes: u32,
}

#[derive(Debug, Default)]
struct ViewRuntime {
    /// `None` until the display is activated and after teardown
    view: Option<View>,
    clock_ticker: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct TimerRuntime {
    timer: TimerState,
    /// Identifies the current countdown run; ticks from older runs are ignored
    epoch: u64,
    ticker: Option<JoinHandle<()>>,
}

/// Display state shared by the HTTP API and the background tasks.
///
/// The timer lives here rather than in a view, so its countdown keeps
/// running while the clock is shown.
#[derive(Debug)]
pub struct AppState {
    pub settings: DisplaySettings,
    pub weather_provider: Arc<dyn WeatherProvider>,
    pub quote_provider: Arc<dyn QuoteProvider>,
    pub locator: Geolocator,
    pub start_time: Instant,
    view: Mutex<ViewRuntime>,
    timer: Mutex<TimerRuntime>,
    weather: Mutex<WeatherPanel>,
    quote: Mutex<QuotePanel>,
    /// Channel for display change notifications
    pub event_tx: broadcast::Sender<DisplayEvent>,
}

impl AppState {
    /// Create a new AppState with the timer set to the configured minutes
    pub fn new(
        settings: DisplaySettings,
        weather_provider: Arc<dyn WeatherProvider>,
        quote_provider: Arc<dyn QuoteProvider>,
        locator: Geolocator,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let timer = TimerRuntime {
            timer: TimerState::with_minutes(settings.initial_minutes),
            ..TimerRuntime::default()
        };

        Self {
            settings,
            weather_provider,
            quote_provider,
            locator,
            start_time: Instant::now(),
            view: Mutex::new(ViewRuntime::default()),
            timer: Mutex::new(timer),
            weather: Mutex::new(WeatherPanel::default()),
            quote: Mutex::new(QuotePanel::default()),
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DisplayEvent> {
        self.event_tx.subscribe()
    }

    /// Notify listeners; having none is fine
    pub fn publish(&self, event: DisplayEvent) {
        if self.event_tx.send(event).is_err() {
            trace!("No display listeners");
        }
    }

    /// Current time in the display offset
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.settings.utc_offset)
    }

    pub fn clock_reading(&self) -> ClockReading {
        ClockReading::at(self.now())
    }

    // ----- views -----

    /// Show the initial view (the clock)
    pub fn activate(self: &Arc<Self>) -> Result<View, String> {
        self.switch_view(View::default())
    }

    pub fn current_view(&self) -> Result<View, String> {
        self.view
            .lock()
            .map(|runtime| runtime.view.unwrap_or_default())
            .map_err(|e| format!("Failed to lock view state: {}", e))
    }

    /// Switch the displayed view.
    ///
    /// Leaving the clock stops its ticker and drops any weather fetch still
    /// in flight; entering it starts a new ticker and fetches the forecast.
    /// The timer is not touched.
    pub fn switch_view(self: &Arc<Self>, view: View) -> Result<View, String> {
        let mut runtime = self
            .view
            .lock()
            .map_err(|e| format!("Failed to lock view state: {}", e))?;

        if runtime.view == Some(view) {
            debug!("{} view already shown", view);
            return Ok(view);
        }

        if runtime.view == Some(View::Clock) {
            self.leave_clock(&mut runtime)?;
        }

        runtime.view = Some(view);

        if view == View::Clock {
            runtime.clock_ticker = Some(tasks::spawn_clock_ticker(Arc::clone(self)));
            self.begin_weather_fetch()?;
        }
        drop(runtime);

        info!("Switched to {} view", view);
        self.publish(DisplayEvent::View { view });
        Ok(view)
    }

    fn leave_clock(&self, runtime: &mut ViewRuntime) -> Result<(), String> {
        if let Some(handle) = runtime.clock_ticker.take() {
            handle.abort();
            debug!("Clock ticker stopped");
        }

        self.weather
            .lock()
            .map_err(|e| format!("Failed to lock weather state: {}", e))?
            .invalidate();
        Ok(())
    }

    /// Stop all periodic work (shutdown)
    pub fn teardown(&self) {
        if let Ok(mut runtime) = self.view.lock() {
            if runtime.view == Some(View::Clock) {
                if let Err(e) = self.leave_clock(&mut runtime) {
                    error!("Failed to tear down clock view: {}", e);
                }
            }
            runtime.view = None;
        }

        if let Ok(mut runtime) = self.timer.lock() {
            if let Some(handle) = runtime.ticker.take() {
                handle.abort();
            }
            runtime.timer.pause();
            runtime.epoch += 1;
        }

        if let Ok(mut panel) = self.quote.lock() {
            panel.close();
        }

        info!("Display torn down");
    }

    // ----- weather -----

    fn begin_weather_fetch(self: &Arc<Self>) -> Result<(), String> {
        let generation = self
            .weather
            .lock()
            .map_err(|e| format!("Failed to lock weather state: {}", e))?
            .begin();

        debug!("Fetching hourly weather (generation {})", generation);
        if let Ok(snapshot) = self.weather_snapshot() {
            self.publish(DisplayEvent::Weather(snapshot));
        }

        tokio::spawn(tasks::weather_fetch_task(Arc::clone(self), generation));
        Ok(())
    }

    /// Store the result of a weather fetch. Returns false for stale results.
    pub fn apply_weather(
        &self,
        generation: u64,
        entries: Vec<HourlyForecastEntry>,
    ) -> Result<bool, String> {
        let snapshot = {
            let mut panel = self
                .weather
                .lock()
                .map_err(|e| format!("Failed to lock weather state: {}", e))?;

            if !panel.complete(generation, entries) {
                debug!("Discarding stale weather result (generation {})", generation);
                return Ok(false);
            }
            panel.snapshot(self.now().hour(), &self.settings.location_label)
        };

        info!("Hourly weather loaded: {} entries", snapshot.hourly.len());
        self.publish(DisplayEvent::Weather(snapshot));
        Ok(true)
    }

    pub fn weather_snapshot(&self) -> Result<WeatherSnapshot, String> {
        self.weather
            .lock()
            .map(|panel| panel.snapshot(self.now().hour(), &self.settings.location_label))
            .map_err(|e| format!("Failed to lock weather state: {}", e))
    }

    /// Current conditions at the best known location; `None` when the backend fails
    pub async fn current_conditions(&self) -> Option<CurrentConditions> {
        let coordinates = self.locator.resolve().await;
        match self.weather_provider.fetch_current(coordinates).await {
            Ok(conditions) => Some(conditions),
            Err(e) => {
                error!("Failed to fetch weather: {:#}", e);
                None
            }
        }
    }

    // ----- timer -----

    pub fn timer_snapshot(&self) -> Result<TimerSnapshot, String> {
        self.timer
            .lock()
            .map(|runtime| runtime.timer.snapshot())
            .map_err(|e| format!("Failed to lock timer state: {}", e))
    }

    /// Apply a user action to the timer and start or stop the countdown to match
    pub fn update_timer<F, R>(
        self: &Arc<Self>,
        action: &str,
        updater: F,
    ) -> Result<(R, TimerSnapshot), String>
    where
        F: FnOnce(&mut TimerState) -> R,
    {
        let mut runtime = self
            .timer
            .lock()
            .map_err(|e| format!("Failed to lock timer state: {}", e))?;

        let result = updater(&mut runtime.timer);
        self.reconcile_countdown(&mut runtime);
        let snapshot = runtime.timer.snapshot();
        drop(runtime);

        debug!("Timer {}: {} ({:?})", action, snapshot.display, snapshot.phase);
        self.publish(DisplayEvent::Timer(snapshot.clone()));
        Ok((result, snapshot))
    }

    /// Start/pause button
    pub fn toggle_timer(self: &Arc<Self>) -> Result<TimerSnapshot, String> {
        self.update_timer("toggle", |timer| timer.toggle())
            .map(|(_, snapshot)| snapshot)
    }

    pub fn reset_timer(self: &Arc<Self>) -> Result<TimerSnapshot, String> {
        self.update_timer("reset", |timer| timer.reset())
            .map(|(_, snapshot)| snapshot)
    }

    /// Enter key in the minutes field
    pub fn submit_timer(self: &Arc<Self>) -> Result<TimerSnapshot, String> {
        self.update_timer("submit", |timer| timer.submit_on_enter())
            .map(|(_, snapshot)| snapshot)
    }

    pub fn edit_minutes(self: &Arc<Self>, minutes: u32) -> Result<TimerSnapshot, String> {
        self.update_timer("edit", |timer| timer.edit_minutes(minutes))
            .map(|(_, snapshot)| snapshot)
    }

    fn reconcile_countdown(self: &Arc<Self>, runtime: &mut TimerRuntime) {
        match (runtime.timer.is_active, runtime.ticker.is_some()) {
            (true, false) => {
                runtime.epoch += 1;
                runtime.ticker = Some(tasks::spawn_countdown(Arc::clone(self), runtime.epoch));
                info!(
                    "Countdown started with {}s remaining",
                    runtime.timer.remaining_seconds
                );
            }
            (false, true) => {
                if let Some(handle) = runtime.ticker.take() {
                    handle.abort();
                }
                runtime.epoch += 1;
                info!(
                    "Countdown stopped with {}s remaining",
                    runtime.timer.remaining_seconds
                );
            }
            _ => {}
        }
    }

    /// Advance the countdown by one second on behalf of the run `epoch`
    pub fn countdown_tick(&self, epoch: u64) -> Result<TickOutcome, String> {
        let mut runtime = self
            .timer
            .lock()
            .map_err(|e| format!("Failed to lock timer state: {}", e))?;

        if runtime.epoch != epoch {
            return Ok(TickOutcome::Ignored);
        }

        let outcome = runtime.timer.tick();
        if !matches!(outcome, TickOutcome::Counting(_)) {
            // The run ends here; the driver returns on its own
            runtime.ticker = None;
            runtime.epoch += 1;
        }
        let snapshot = runtime.timer.snapshot();
        drop(runtime);

        if outcome == TickOutcome::Ignored {
            return Ok(outcome);
        }

        self.publish(DisplayEvent::Timer(snapshot));
        if outcome == TickOutcome::Expired {
            info!("Countdown finished: {}", EXPIRY_MESSAGE);
            self.publish(DisplayEvent::TimerExpired {
                message: EXPIRY_MESSAGE.to_string(),
            });
        }

        Ok(outcome)
    }

    // ----- quote -----

    /// Open the quote panel, fetching a quote unless it is already open
    pub fn open_quote(self: &Arc<Self>) -> Result<QuoteStatus, String> {
        let status = {
            let mut panel = self
                .quote
                .lock()
                .map_err(|e| format!("Failed to lock quote state: {}", e))?;

            if let Some(generation) = panel.open() {
                debug!("Fetching quote (generation {})", generation);
                tokio::spawn(tasks::quote_fetch_task(Arc::clone(self), generation));
            }
            panel.status().clone()
        };

        self.publish(DisplayEvent::Quote {
            quote: status.clone(),
        });
        Ok(status)
    }

    pub fn close_quote(&self) -> Result<QuoteStatus, String> {
        let closed = self
            .quote
            .lock()
            .map_err(|e| format!("Failed to lock quote state: {}", e))?
            .close();

        if closed {
            self.publish(DisplayEvent::Quote {
                quote: QuoteStatus::Hidden,
            });
        }
        Ok(QuoteStatus::Hidden)
    }

    /// Store a fetched quote. Returns false when the panel moved on.
    pub fn apply_quote(&self, generation: u64, quote: QuoteData) -> Result<bool, String> {
        let status = {
            let mut panel = self
                .quote
                .lock()
                .map_err(|e| format!("Failed to lock quote state: {}", e))?;

            if !panel.complete(generation, quote) {
                debug!("Discarding stale quote (generation {})", generation);
                return Ok(false);
            }
            panel.status().clone()
        };

        self.publish(DisplayEvent::Quote { quote: status });
        Ok(true)
    }

    pub fn quote_status(&self) -> Result<QuoteStatus, String> {
        self.quote
            .lock()
            .map(|panel| panel.status().clone())
            .map_err(|e| format!("Failed to lock quote state: {}", e))
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::state::TimerPhase;
    use std::time::Duration;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::time::sleep;

    fn count_expiries(rx: &mut broadcast::Receiver<DisplayEvent>) -> usize {
        let mut expiries = 0;
        loop {
            match rx.try_recv() {
                Ok(DisplayEvent::TimerExpired { .. }) => expiries += 1,
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(_) => return expiries,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn five_minute_countdown_expires_once_at_zero() {
        let state = app_state(5, StubWeather::default(), StubQuotes::default());
        let mut rx = state.subscribe();

        let started = state.toggle_timer().expect("toggle");
        assert_eq!(started.phase, TimerPhase::Running);

        sleep(Duration::from_millis(299_500)).await;
        let almost = state.timer_snapshot().expect("snapshot");
        assert_eq!(almost.state.remaining_seconds, 1);
        assert!(almost.state.is_active);
        assert_eq!(count_expiries(&mut rx), 0);

        sleep(Duration::from_secs(1)).await;
        let done = state.timer_snapshot().expect("snapshot");
        assert_eq!(done.display, "00:00");
        assert!(!done.state.is_active);
        assert_eq!(count_expiries(&mut rx), 1);

        // No further ticks once expired
        sleep(Duration::from_secs(10)).await;
        assert_eq!(count_expiries(&mut rx), 0);
        assert_eq!(state.timer_snapshot().expect("snapshot").state.remaining_seconds, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_ticking_immediately() {
        let state = app_state(1, StubWeather::default(), StubQuotes::default());
        state.toggle_timer().expect("start");

        sleep(Duration::from_millis(10_500)).await;
        let paused = state.toggle_timer().expect("pause");
        assert_eq!(paused.state.remaining_seconds, 50);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(state.timer_snapshot().expect("snapshot").state.remaining_seconds, 50);

        // Resuming counts on from where it stopped
        state.toggle_timer().expect("resume");
        sleep(Duration::from_millis(5_500)).await;
        assert_eq!(state.timer_snapshot().expect("snapshot").state.remaining_seconds, 45);
    }

    #[tokio::test(start_paused = true)]
    async fn quick_pause_and_resume_does_not_double_tick() {
        let state = app_state(1, StubWeather::default(), StubQuotes::default());
        state.toggle_timer().expect("start");
        state.toggle_timer().expect("pause");
        state.toggle_timer().expect("resume");

        sleep(Duration::from_millis(3_500)).await;
        assert_eq!(state.timer_snapshot().expect("snapshot").state.remaining_seconds, 57);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_keeps_running_across_view_switches() {
        let state = app_state(1, StubWeather::default(), StubQuotes::default());
        state.activate().expect("activate");
        state.switch_view(View::Timer).expect("timer view");
        state.toggle_timer().expect("start");

        sleep(Duration::from_millis(2_500)).await;
        state.switch_view(View::Clock).expect("clock view");
        sleep(Duration::from_secs(3)).await;
        state.switch_view(View::Timer).expect("timer view");

        let snapshot = state.timer_snapshot().expect("snapshot");
        assert!(snapshot.state.is_active);
        assert_eq!(snapshot.state.remaining_seconds, 55);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_while_running_stops_countdown() {
        let state = app_state(2, StubWeather::default(), StubQuotes::default());
        state.toggle_timer().expect("start");
        sleep(Duration::from_millis(4_500)).await;

        let reset = state.reset_timer().expect("reset");
        assert_eq!(reset.phase, TimerPhase::Idle);
        assert_eq!(reset.state.remaining_seconds, 120);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(state.timer_snapshot().expect("snapshot").state.remaining_seconds, 120);
    }

    #[tokio::test]
    async fn stale_countdown_ticks_are_ignored() {
        let state = app_state(1, StubWeather::default(), StubQuotes::default());
        assert_eq!(state.countdown_tick(42).expect("tick"), TickOutcome::Ignored);
        assert_eq!(state.timer_snapshot().expect("snapshot").state.remaining_seconds, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn clock_ticks_only_while_clock_is_shown() {
        let state = app_state(10, StubWeather::default(), StubQuotes::default());
        let mut rx = state.subscribe();
        state.activate().expect("activate");

        sleep(Duration::from_millis(3_500)).await;
        state.switch_view(View::Timer).expect("timer view");
        let mut clock_ticks = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, DisplayEvent::Clock(_)) {
                clock_ticks += 1;
            }
        }
        assert!(clock_ticks >= 3, "expected ticks while shown, got {clock_ticks}");

        sleep(Duration::from_secs(5)).await;
        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, DisplayEvent::Clock(_)), "clock ticked while hidden");
        }
    }

    #[tokio::test]
    async fn weather_failure_yields_empty_forecast() {
        let weather = StubWeather {
            fail: true,
            ..StubWeather::default()
        };
        let state = app_state(10, weather, StubQuotes::default());
        let mut rx = state.subscribe();
        state.activate().expect("activate");

        loop {
            match rx.recv().await.expect("event") {
                DisplayEvent::Weather(snapshot) if !snapshot.loading => {
                    assert!(snapshot.hourly.is_empty());
                    assert!(snapshot.current.is_none());
                    break;
                }
                _ => {}
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn late_weather_result_after_leaving_clock_is_dropped() {
        let weather = StubWeather {
            delay: Some(Duration::from_secs(5)),
            ..StubWeather::default()
        };
        let state = app_state(10, weather, StubQuotes::default());
        state.activate().expect("activate");
        state.switch_view(View::Timer).expect("timer view");

        sleep(Duration::from_secs(10)).await;
        assert!(state.weather_snapshot().expect("snapshot").loading);
    }

    #[tokio::test]
    async fn quote_panel_shows_fallback_when_backend_fails() {
        let state = app_state(10, StubWeather::default(), StubQuotes { fail: true });
        let mut rx = state.subscribe();

        assert_eq!(state.open_quote().expect("open"), QuoteStatus::Loading);

        loop {
            if let DisplayEvent::Quote {
                quote: QuoteStatus::Shown(quote),
            } = rx.recv().await.expect("event")
            {
                assert_eq!(quote, QuoteData::fallback());
                break;
            }
        }
    }

    #[tokio::test]
    async fn current_conditions_degrade_to_none() {
        let weather = StubWeather {
            fail: true,
            ..StubWeather::default()
        };
        let state = app_state(10, weather, StubQuotes::default());
        state
            .locator
            .report(Coordinates::new(34.6937, 135.5023))
            .expect("valid fix");

        assert!(state.current_conditions().await.is_none());
    }
}
