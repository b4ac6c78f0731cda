//! Interval evaluation: does an outlet's schedule satisfy a time condition?
//!
//! All comparisons are integer minutes. Overnight days (close < open) wrap
//! across midnight; where a closing time must be ranked it is shifted by a
//! full day first.

use ohdb_core::{ClockTime, DayHours, DaySet, Outlet, MINUTES_PER_DAY};
use regex::Regex;

use crate::timeparse::{convert_12h, CompareMode, ScheduleField, TimePredicate};

/// Minutes of slack accepted by the dedicated opening/closing-time lookups
/// when the query has no before/after direction.
const NEAR_MATCH_TOLERANCE_MINS: u16 = 30;

/// Whether a single day's hours satisfy the predicate.
#[must_use]
pub fn day_satisfies(hours: DayHours, pred: &TimePredicate) -> bool {
    let anchor = pred.anchor.minutes();
    match (pred.mode, pred.field) {
        // Containment: the anchor falls inside the (possibly wrapped) open
        // interval, inclusive at both ends.
        (CompareMode::At, _) => hours.contains(pred.anchor),
        // "Still open after X": for overnight days any anchor inside the
        // wrapped interval counts; otherwise the close must lie past it.
        (CompareMode::After, ScheduleField::Open) => {
            if hours.is_overnight() {
                hours.contains(pred.anchor)
            } else {
                hours.close.minutes() > anchor
            }
        }
        // "Opens before X": strict.
        (CompareMode::Before, ScheduleField::Open) => hours.open.minutes() < anchor,
        (CompareMode::Before, ScheduleField::Close) => hours.close_minutes_extended() < anchor,
        (CompareMode::After, ScheduleField::Close) => hours.close_minutes_extended() > anchor,
    }
}

/// Whether the outlet matches the predicate on any day in its day-set.
///
/// A 24-hour outlet matches unconditionally. Evaluation short-circuits on
/// the first satisfying day, so an outlet is counted once no matter how many
/// days match.
#[must_use]
pub fn outlet_matches(outlet: &Outlet, pred: &TimePredicate) -> bool {
    if outlet.always_open() {
        return true;
    }
    let Some(schedule) = outlet.schedule.as_ref() else {
        return false;
    };
    pred.days
        .days()
        .into_iter()
        .any(|day| schedule.hours(day).is_some_and(|h| day_satisfies(h, pred)))
}

/// All outlets matching the predicate. Always-open outlets lead the result,
/// followed by schedule matches in input order.
#[must_use]
pub fn outlets_matching<'a>(outlets: &'a [Outlet], pred: &TimePredicate) -> Vec<&'a Outlet> {
    let (always_open, rest): (Vec<&Outlet>, Vec<&Outlet>) =
        outlets.iter().partition(|o| o.always_open());

    always_open
        .into_iter()
        .chain(rest.into_iter().filter(|o| outlet_matches(o, pred)))
        .collect()
}

/// Direction extracted from an opening/closing-time lookup phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupDirection {
    Before,
    After,
    /// No direction: accept a near match within the tolerance.
    Near,
}

fn lookup_direction(lower: &str) -> LookupDirection {
    if lower.contains("before") || lower.contains("earlier") {
        LookupDirection::Before
    } else if lower.contains("after") || lower.contains("later") {
        LookupDirection::After
    } else {
        LookupDirection::Near
    }
}

/// Strip the directional and open/close vocabulary from a lookup phrase so
/// only the time expression remains.
fn strip_lookup_keywords(lower: &str) -> String {
    let re = Regex::new(r"before|after|earlier|later|than|open(?:ing|s)?|clos(?:ing|es|e)|at|still")
        .expect("valid keyword-strip regex");
    re.replace_all(lower, "").trim().to_string()
}

/// Parse the target time out of a cleaned lookup phrase.
///
/// `pm_floor_hour`, when set, treats bare hours at or above the floor as PM
/// ("closes at 9" reads as 21:00 — shops rarely close mid-morning).
fn parse_lookup_time(cleaned: &str, pm_floor_hour: Option<u16>) -> Option<ClockTime> {
    if cleaned.contains("am") || cleaned.contains("pm") {
        return convert_12h(cleaned);
    }

    let colon = Regex::new(r"(\d{1,2}):(\d{2})").expect("valid colon regex");
    if let Some(caps) = colon.captures(cleaned) {
        let hour: u16 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u16 = caps.get(2)?.as_str().parse().ok()?;
        return ClockTime::from_hm(hour, minute);
    }

    let bare = Regex::new(r"(\d{1,2})").expect("valid bare-hour regex");
    let caps = bare.captures(cleaned)?;
    let mut hour: u16 = caps.get(1)?.as_str().parse().ok()?;
    let pm_words = cleaned.contains("evening") || cleaned.contains("night");
    let pm_floor = pm_floor_hour.is_some_and(|floor| hour >= floor);
    if (1..=11).contains(&hour) && (pm_words || pm_floor) {
        hour += 12;
    }
    ClockTime::from_hm(hour, 0)
}

fn abs_diff(a: u16, b: u16) -> u16 {
    a.max(b) - a.min(b)
}

/// Outlets that open before/after/around the time in `phrase`, checked over
/// the given day-set.
///
/// Unlike the general predicate evaluation this is schedule-only (the
/// 24-hour bypass does not apply — a round-the-clock outlet has no opening
/// moment) and accepts a ±30-minute near match when the phrase carries no
/// direction. An unparseable phrase yields an empty result.
#[must_use]
pub fn outlets_by_opening_time<'a>(
    outlets: &'a [Outlet],
    phrase: &str,
    days: DaySet,
) -> Vec<&'a Outlet> {
    let lower = phrase.to_lowercase();
    let direction = lookup_direction(&lower);
    let cleaned = strip_lookup_keywords(&lower);
    let Some(target) = parse_lookup_time(&cleaned, None) else {
        tracing::debug!(phrase, "opening-time lookup: no parseable time");
        return Vec::new();
    };
    let target = target.minutes();

    outlets
        .iter()
        .filter(|outlet| {
            let Some(schedule) = outlet.schedule.as_ref() else {
                return false;
            };
            days.days().into_iter().any(|day| {
                schedule.hours(day).is_some_and(|h| {
                    let open = h.open.minutes();
                    match direction {
                        LookupDirection::Before => open < target,
                        LookupDirection::After => open > target,
                        LookupDirection::Near => {
                            abs_diff(open, target) <= NEAR_MATCH_TOLERANCE_MINS
                        }
                    }
                })
            })
        })
        .collect()
}

/// Outlets that close before/after/around the time in `phrase`, checked over
/// the given day-set.
///
/// Overnight closes are shifted past midnight for the directional
/// comparisons so they rank consistently; the near match compares the plain
/// wall-clock close. Bare hours from 7 upward read as PM.
#[must_use]
pub fn outlets_by_closing_time<'a>(
    outlets: &'a [Outlet],
    phrase: &str,
    days: DaySet,
) -> Vec<&'a Outlet> {
    let lower = phrase.to_lowercase();
    let direction = lookup_direction(&lower);
    let cleaned = strip_lookup_keywords(&lower);
    let Some(target) = parse_lookup_time(&cleaned, Some(7)) else {
        tracing::debug!(phrase, "closing-time lookup: no parseable time");
        return Vec::new();
    };
    let target = target.minutes();

    outlets
        .iter()
        .filter(|outlet| {
            let Some(schedule) = outlet.schedule.as_ref() else {
                return false;
            };
            days.days().into_iter().any(|day| {
                schedule.hours(day).is_some_and(|h| {
                    let extended = h.close_minutes_extended();
                    match direction {
                        LookupDirection::Before => extended < target,
                        LookupDirection::After => extended > target,
                        LookupDirection::Near => {
                            let close = extended % MINUTES_PER_DAY;
                            abs_diff(close, target) <= NEAR_MATCH_TOLERANCE_MINS
                        }
                    }
                })
            })
        })
        .collect()
}
