//! Domain model: outlets, weekly schedules, and clock arithmetic.
//!
//! All times are integer minutes since midnight (`0..=1439`). Schedules that
//! close after midnight ("overnight" days) keep their stored close time in
//! the same range; arithmetic that needs to rank them adds a full day first.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minutes in one day.
pub const MINUTES_PER_DAY: u16 = 1440;

#[derive(Debug, Error)]
#[error("clock time {0} out of range (expected 0..=1439 minutes)")]
pub struct InvalidClockTime(pub u16);

/// A wall-clock time of day, stored as minutes since midnight.
///
/// Construction is range-checked; a `ClockTime` is always `0..=1439`, so
/// downstream interval logic never has to defend against malformed values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u16", into = "u16")]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime(0);

    /// Build from raw minutes since midnight.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidClockTime`] when `minutes >= 1440`.
    pub fn new(minutes: u16) -> Result<Self, InvalidClockTime> {
        if minutes < MINUTES_PER_DAY {
            Ok(Self(minutes))
        } else {
            Err(InvalidClockTime(minutes))
        }
    }

    /// Build from an hour/minute pair. Returns `None` when either component
    /// is out of range.
    #[must_use]
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour * 60 + minute))
        } else {
            None
        }
    }

    #[must_use]
    pub fn minutes(self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    #[must_use]
    pub fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl TryFrom<u16> for ClockTime {
    type Error = InvalidClockTime;

    fn try_from(minutes: u16) -> Result<Self, Self::Error> {
        Self::new(minutes)
    }
}

impl From<ClockTime> for u16 {
    fn from(t: ClockTime) -> Self {
        t.0
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Day of the week, serialized lowercase to match the stored schedule keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }

    /// Parse a lowercase full day name ("monday".."sunday").
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Weekday::ALL.into_iter().find(|d| d.name() == name)
    }

    #[must_use]
    pub fn is_weekend(self) -> bool {
        matches!(self, Weekday::Saturday | Weekday::Sunday)
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of days a query ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySet {
    /// Monday through Friday.
    Weekdays,
    /// Saturday and Sunday.
    Weekend,
    /// One explicit day.
    Single(Weekday),
}

impl DaySet {
    /// The weekend/weekday class containing `day`.
    #[must_use]
    pub fn class_of(day: Weekday) -> Self {
        if day.is_weekend() {
            DaySet::Weekend
        } else {
            DaySet::Weekdays
        }
    }

    #[must_use]
    pub fn from_weekend_flag(is_weekend: bool) -> Self {
        if is_weekend {
            DaySet::Weekend
        } else {
            DaySet::Weekdays
        }
    }

    /// The candidate days, in calendar order.
    #[must_use]
    pub fn days(self) -> Vec<Weekday> {
        match self {
            DaySet::Weekdays => vec![
                Weekday::Monday,
                Weekday::Tuesday,
                Weekday::Wednesday,
                Weekday::Thursday,
                Weekday::Friday,
            ],
            DaySet::Weekend => vec![Weekday::Saturday, Weekday::Sunday],
            DaySet::Single(day) => vec![day],
        }
    }

    /// Human-facing label used in response messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            DaySet::Weekdays => "weekday",
            DaySet::Weekend => "weekend",
            DaySet::Single(day) => day.name(),
        }
    }
}

/// Open/close pair for a single day. A present entry always has both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open: ClockTime,
    pub close: ClockTime,
}

impl DayHours {
    /// True when closing occurs after midnight (close earlier than open).
    #[must_use]
    pub fn is_overnight(self) -> bool {
        self.close < self.open
    }

    /// Close time in minutes, shifted past midnight for overnight days so it
    /// ranks after same-day closes.
    #[must_use]
    pub fn close_minutes_extended(self) -> u16 {
        if self.is_overnight() {
            self.close.minutes() + MINUTES_PER_DAY
        } else {
            self.close.minutes()
        }
    }

    /// Whether `at` falls inside the open interval, inclusive at both ends.
    ///
    /// Overnight days wrap: the interval is `[open, 23:59]` plus
    /// `[00:00, close]`.
    #[must_use]
    pub fn contains(self, at: ClockTime) -> bool {
        if self.is_overnight() {
            at >= self.open || at <= self.close
        } else {
            at >= self.open && at <= self.close
        }
    }
}

/// Weekly operating hours. Days with no entry are treated as closed (or
/// unknown — the source data does not distinguish).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuesday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wednesday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thursday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunday: Option<DayHours>,
}

impl WeeklySchedule {
    #[must_use]
    pub fn hours(&self, day: Weekday) -> Option<DayHours> {
        match day {
            Weekday::Monday => self.monday,
            Weekday::Tuesday => self.tuesday,
            Weekday::Wednesday => self.wednesday,
            Weekday::Thursday => self.thursday,
            Weekday::Friday => self.friday,
            Weekday::Saturday => self.saturday,
            Weekday::Sunday => self.sunday,
        }
    }

    pub fn set_hours(&mut self, day: Weekday, hours: Option<DayHours>) {
        match day {
            Weekday::Monday => self.monday = hours,
            Weekday::Tuesday => self.tuesday = hours,
            Weekday::Wednesday => self.wednesday = hours,
            Weekday::Thursday => self.thursday = hours,
            Weekday::Friday => self.friday = hours,
            Weekday::Saturday => self.saturday = hours,
            Weekday::Sunday => self.sunday = hours,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        Weekday::ALL.iter().all(|&d| self.hours(d).is_none())
    }
}

/// Substrings of the raw hours text that mark round-the-clock operation.
const ALWAYS_OPEN_MARKERS: &[&str] = &["24 hours", "24 hour", "24-hour", "24hrs", "24hr", "24/7"];

/// A retail outlet record, read-only from the engine's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outlet {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub street_address: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub schedule: Option<WeeklySchedule>,
    pub is_24_hours: bool,
    /// Raw scraped hours text, kept for diagnostics only.
    pub hours_text: Option<String>,
}

impl Outlet {
    /// True when the outlet operates around the clock, either via the stored
    /// flag or a 24-hour marker in the raw hours text.
    #[must_use]
    pub fn always_open(&self) -> bool {
        if self.is_24_hours {
            return true;
        }
        self.hours_text.as_ref().is_some_and(|text| {
            let lower = text.to_lowercase();
            ALWAYS_OPEN_MARKERS.iter().any(|m| lower.contains(m))
        })
    }
}
