//! Countdown timer state machine
//!
//! Pure state: the periodic driver lives in `tasks::countdown` and only
//! calls [`TimerState::tick`] once per elapsed second while running.

use serde::{Deserialize, Serialize};

/// Countdown length used when nothing else is configured
pub const DEFAULT_MINUTES: u32 = 10;

/// Message delivered with the expiry signal
pub const EXPIRY_MESSAGE: &str = "時間になりました！";

/// Derived phase of the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerPhase {
    /// Paused or never started, time left on the clock
    Idle,
    /// Counting down
    Running,
    /// Reached zero
    Expired,
}

/// Result of applying one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer was not running; nothing changed
    Ignored,
    /// One second consumed, this many left
    Counting(u64),
    /// This tick reached zero and the timer stopped
    Expired,
}

/// Countdown timer state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub remaining_seconds: u64,
    pub total_seconds: u64,
    pub is_active: bool,
    pub minutes_input: u32,
}

/// Serializable view of the timer for the display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    #[serde(flatten)]
    pub state: TimerState,
    pub phase: TimerPhase,
    /// "MM:SS"
    pub display: String,
    pub progress_percent: f64,
}

impl TimerState {
    /// Create an idle 10 minute timer
    pub fn new() -> Self {
        Self::with_minutes(DEFAULT_MINUTES)
    }

    /// Create an idle timer set to `minutes`
    pub fn with_minutes(minutes: u32) -> Self {
        let seconds = minutes_to_seconds(minutes);
        Self {
            remaining_seconds: seconds,
            total_seconds: seconds,
            is_active: false,
            minutes_input: minutes,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        if self.is_active {
            TimerPhase::Running
        } else if self.remaining_seconds == 0 {
            TimerPhase::Expired
        } else {
            TimerPhase::Idle
        }
    }

    /// Start counting down. An expired timer is reset first.
    ///
    /// Returns whether the timer is running afterwards; a timer set to zero
    /// minutes cannot start.
    pub fn start(&mut self) -> bool {
        if self.is_active {
            return true;
        }

        if self.remaining_seconds == 0 {
            self.reset();
        }

        if self.remaining_seconds == 0 {
            return false;
        }

        self.is_active = true;
        true
    }

    /// Stop counting, keeping the remaining time
    pub fn pause(&mut self) {
        self.is_active = false;
    }

    /// Start/pause button. Returns whether the timer is running afterwards.
    pub fn toggle(&mut self) -> bool {
        if self.is_active {
            self.pause();
            false
        } else {
            self.start()
        }
    }

    /// Consume one second
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_active || self.remaining_seconds == 0 {
            return TickOutcome::Ignored;
        }

        self.remaining_seconds -= 1;
        if self.remaining_seconds == 0 {
            self.is_active = false;
            TickOutcome::Expired
        } else {
            TickOutcome::Counting(self.remaining_seconds)
        }
    }

    /// Reload the countdown from the minutes field and stop
    pub fn reset(&mut self) {
        let seconds = minutes_to_seconds(self.minutes_input);
        self.remaining_seconds = seconds;
        self.total_seconds = seconds;
        self.is_active = false;
    }

    /// Change the minutes field.
    ///
    /// While stopped the countdown follows the edit immediately; a running
    /// countdown is left alone until the next reset.
    pub fn edit_minutes(&mut self, minutes: u32) {
        self.minutes_input = minutes;
        if !self.is_active {
            let seconds = minutes_to_seconds(minutes);
            self.remaining_seconds = seconds;
            self.total_seconds = seconds;
        }
    }

    /// Change the minutes field from raw user text, see [`coerce_minutes`]
    pub fn edit_minutes_text(&mut self, raw: &str) {
        self.edit_minutes(coerce_minutes(raw));
    }

    /// Enter key in the minutes field: starts only a stopped timer with time left
    pub fn submit_on_enter(&mut self) -> bool {
        if self.is_active || self.remaining_seconds == 0 {
            return false;
        }
        self.start()
    }

    /// Remaining time as "MM:SS"
    pub fn display(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }

    /// Share of the countdown still left, 0 for a zero-length timer
    pub fn progress_percent(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        self.remaining_seconds as f64 / self.total_seconds as f64 * 100.0
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.clone(),
            phase: self.phase(),
            display: self.display(),
            progress_percent: self.progress_percent(),
        }
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}

fn minutes_to_seconds(minutes: u32) -> u64 {
    u64::from(minutes) * 60
}

/// Read a minutes value the way a lenient number field does.
///
/// Leading whitespace is skipped and the leading run of digits is used, so
/// "12abc" is 12. Text without leading digits and negative numbers become 0.
/// Values too large for `u32` saturate.
pub fn coerce_minutes(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = &unsigned[..end];

    if negative || digits.is_empty() {
        return 0;
    }

    digits.parse().unwrap_or(u32::MAX)
}
