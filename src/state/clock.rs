//! Wall-clock readings for the clock view

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// The current time as shown on the clock face
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockReading {
    /// 24-hour "HH:MM:SS"
    pub time: String,
    /// Long Japanese date, e.g. "2026年10月18日 日曜日"
    pub date: String,
    pub hour: u32,
    pub timestamp: DateTime<FixedOffset>,
}

impl ClockReading {
    pub fn at(now: DateTime<FixedOffset>) -> Self {
        Self {
            time: now.format("%H:%M:%S").to_string(),
            date: format!(
                "{}年{}月{}日 {}",
                now.year(),
                now.month(),
                now.day(),
                weekday_name(now.weekday())
            ),
            hour: now.hour(),
            timestamp: now,
        }
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "月曜日",
        Weekday::Tue => "火曜日",
        Weekday::Wed => "水曜日",
        Weekday::Thu => "木曜日",
        Weekday::Fri => "金曜日",
        Weekday::Sat => "土曜日",
        Weekday::Sun => "日曜日",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_time_and_long_date() {
        let jst = FixedOffset::east_opt(9 * 3600).expect("valid offset");
        let now = jst
            .with_ymd_and_hms(2026, 10, 18, 7, 5, 9)
            .single()
            .expect("unambiguous time");

        let reading = ClockReading::at(now);
        assert_eq!(reading.time, "07:05:09");
        assert_eq!(reading.date, "2026年10月18日 日曜日");
        assert_eq!(reading.hour, 7);
    }
}
