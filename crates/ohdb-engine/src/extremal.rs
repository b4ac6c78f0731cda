//! Extremal queries: which outlets open earliest / latest, close earliest /
//! latest, over a day-set.
//!
//! Ties are a designated outcome: every outlet sharing the extreme value is
//! returned. Overnight closes are excluded from "earliest closing" (they are
//! not a same-day close) and ranked past midnight for "latest closing".

use std::collections::HashSet;

use ohdb_core::{DaySet, Outlet, MINUTES_PER_DAY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtremalAttribute {
    EarliestOpening,
    LatestOpening,
    EarliestClosing,
    LatestClosing,
}

impl ExtremalAttribute {
    /// Parse the wire spelling used by the API and the NL collaborator.
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "earliest_opening" => Some(Self::EarliestOpening),
            "latest_opening" => Some(Self::LatestOpening),
            "earliest_closing" => Some(Self::EarliestClosing),
            "latest_closing" => Some(Self::LatestClosing),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::EarliestOpening => "earliest_opening",
            Self::LatestOpening => "latest_opening",
            Self::EarliestClosing => "earliest_closing",
            Self::LatestClosing => "latest_closing",
        }
    }

    /// Short human phrasing for response messages.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::EarliestOpening => "open earliest",
            Self::LatestOpening => "open latest",
            Self::EarliestClosing => "close earliest",
            Self::LatestClosing => "close latest",
        }
    }

    fn smaller_is_better(self) -> bool {
        matches!(self, Self::EarliestOpening | Self::EarliestClosing)
    }
}

/// An extreme schedule value in minutes, possibly past midnight for
/// overnight closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExtremeValue(pub u16);

impl ExtremeValue {
    /// Wall-clock rendering, wrapping values past midnight back onto the
    /// clock face.
    #[must_use]
    pub fn display(self) -> String {
        let wrapped = self.0 % MINUTES_PER_DAY;
        format!("{:02}:{:02}", wrapped / 60, wrapped % 60)
    }
}

/// Outlets achieving the extreme, plus the extreme itself.
///
/// `value` is `None` exactly when no schedule contributed a candidate; the
/// edges render that as "N/A".
#[derive(Debug, Default)]
pub struct ExtremalResult<'a> {
    pub outlets: Vec<&'a Outlet>,
    pub value: Option<ExtremeValue>,
}

impl ExtremalResult<'_> {
    /// Display form of the extreme value ("N/A" when there is none).
    #[must_use]
    pub fn display_value(&self) -> String {
        self.value
            .map_or_else(|| "N/A".to_string(), ExtremeValue::display)
    }
}

/// Candidate minutes an outlet contributes for the attribute on one day's
/// hours, or `None` when the day does not participate.
fn candidate_minutes(attr: ExtremalAttribute, hours: ohdb_core::DayHours) -> Option<u16> {
    match attr {
        ExtremalAttribute::EarliestOpening | ExtremalAttribute::LatestOpening => {
            Some(hours.open.minutes())
        }
        // An overnight day has no same-day close, so it cannot be the
        // earliest closer.
        ExtremalAttribute::EarliestClosing => {
            if hours.is_overnight() {
                None
            } else {
                Some(hours.close.minutes())
            }
        }
        ExtremalAttribute::LatestClosing => Some(hours.close_minutes_extended()),
    }
}

/// Scan all outlets for the extreme of `attr` over `days`.
#[must_use]
pub fn find_extremal<'a>(
    outlets: &'a [Outlet],
    attr: ExtremalAttribute,
    days: DaySet,
) -> ExtremalResult<'a> {
    let mut best: Option<u16> = None;
    let mut winners: Vec<&Outlet> = Vec::new();
    let mut winner_ids: HashSet<i64> = HashSet::new();

    for outlet in outlets {
        let Some(schedule) = outlet.schedule.as_ref() else {
            continue;
        };
        for day in days.days() {
            let Some(minutes) = schedule.hours(day).and_then(|h| candidate_minutes(attr, h))
            else {
                continue;
            };

            let strictly_better = best.is_none_or(|b| {
                if attr.smaller_is_better() {
                    minutes < b
                } else {
                    minutes > b
                }
            });

            if strictly_better {
                best = Some(minutes);
                winners = vec![outlet];
                winner_ids = HashSet::from([outlet.id]);
            } else if best == Some(minutes) && winner_ids.insert(outlet.id) {
                winners.push(outlet);
            }
        }
    }

    ExtremalResult {
        outlets: winners,
        value: best.map(ExtremeValue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ohdb_core::{ClockTime, DayHours, Weekday, WeeklySchedule};

    fn hours(open: (u16, u16), close: (u16, u16)) -> DayHours {
        DayHours {
            open: ClockTime::from_hm(open.0, open.1).unwrap(),
            close: ClockTime::from_hm(close.0, close.1).unwrap(),
        }
    }

    fn outlet(id: i64, entries: &[(Weekday, DayHours)]) -> Outlet {
        let mut schedule = WeeklySchedule::default();
        for (day, h) in entries {
            schedule.set_hours(*day, Some(*h));
        }
        Outlet {
            id,
            name: format!("Outlet {id}"),
            address: String::new(),
            street_address: None,
            district: None,
            city: None,
            postcode: None,
            latitude: None,
            longitude: None,
            schedule: Some(schedule),
            is_24_hours: false,
            hours_text: None,
        }
    }

    #[test]
    fn earliest_opening_picks_minimum() {
        let outlets = vec![
            outlet(1, &[(Weekday::Monday, hours((9, 0), (21, 0)))]),
            outlet(2, &[(Weekday::Monday, hours((8, 0), (21, 0)))]),
        ];
        let result = find_extremal(&outlets, ExtremalAttribute::EarliestOpening, DaySet::Weekdays);
        assert_eq!(result.outlets.iter().map(|o| o.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(result.display_value(), "08:00");
    }

    #[test]
    fn ties_accumulate_regardless_of_scan_order() {
        let a = outlet(1, &[(Weekday::Monday, hours((8, 0), (21, 0)))]);
        let b = outlet(2, &[(Weekday::Tuesday, hours((8, 0), (22, 0)))]);
        let c = outlet(3, &[(Weekday::Monday, hours((10, 0), (22, 0)))]);

        for order in [vec![&a, &b, &c], vec![&c, &b, &a], vec![&b, &a, &c]] {
            let outlets: Vec<Outlet> = order.into_iter().cloned().collect();
            let result =
                find_extremal(&outlets, ExtremalAttribute::EarliestOpening, DaySet::Weekdays);
            let mut ids: Vec<i64> = result.outlets.iter().map(|o| o.id).collect();
            ids.sort_unstable();
            assert_eq!(ids, vec![1, 2], "tie dropped for some scan order");
            assert_eq!(result.value, Some(ExtremeValue(480)));
        }
    }

    #[test]
    fn outlet_with_equal_value_on_two_days_counted_once() {
        let o = outlet(
            1,
            &[
                (Weekday::Monday, hours((8, 0), (21, 0))),
                (Weekday::Friday, hours((8, 0), (20, 0))),
            ],
        );
        let outlets = [o];
        let result = find_extremal(&outlets, ExtremalAttribute::EarliestOpening, DaySet::Weekdays);
        assert_eq!(result.outlets.len(), 1);
    }

    #[test]
    fn latest_closing_scenario() {
        let outlets = vec![
            outlet(1, &[(Weekday::Monday, hours((9, 0), (21, 0)))]),
            outlet(2, &[(Weekday::Monday, hours((9, 0), (23, 0)))]),
        ];
        let result = find_extremal(&outlets, ExtremalAttribute::LatestClosing, DaySet::Weekdays);
        assert_eq!(result.outlets.iter().map(|o| o.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(result.display_value(), "23:00");
    }

    #[test]
    fn latest_closing_ranks_overnight_past_midnight() {
        let outlets = vec![
            outlet(1, &[(Weekday::Monday, hours((9, 0), (23, 0)))]),
            // Closes 02:00 the next morning — later than 23:00.
            outlet(2, &[(Weekday::Monday, hours((22, 0), (2, 0)))]),
        ];
        let result = find_extremal(&outlets, ExtremalAttribute::LatestClosing, DaySet::Weekdays);
        assert_eq!(result.outlets.iter().map(|o| o.id).collect::<Vec<_>>(), vec![2]);
        // Displayed on the clock face, not as 26:00.
        assert_eq!(result.display_value(), "02:00");
    }

    #[test]
    fn earliest_closing_skips_overnight_days() {
        let outlets = vec![
            outlet(1, &[(Weekday::Monday, hours((22, 0), (2, 0)))]),
            outlet(2, &[(Weekday::Monday, hours((9, 0), (18, 0)))]),
        ];
        let result = find_extremal(&outlets, ExtremalAttribute::EarliestClosing, DaySet::Weekdays);
        assert_eq!(result.outlets.iter().map(|o| o.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(result.display_value(), "18:00");
    }

    #[test]
    fn weekend_day_set_ignores_weekday_hours() {
        let outlets = vec![
            outlet(1, &[(Weekday::Monday, hours((7, 0), (21, 0)))]),
            outlet(2, &[(Weekday::Saturday, hours((10, 0), (21, 0)))]),
        ];
        let result = find_extremal(&outlets, ExtremalAttribute::EarliestOpening, DaySet::Weekend);
        assert_eq!(result.outlets.iter().map(|o| o.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn no_schedules_yields_empty_with_na_display() {
        let mut o = outlet(1, &[]);
        o.schedule = None;
        let outlets = [o];
        let result = find_extremal(&outlets, ExtremalAttribute::LatestClosing, DaySet::Weekdays);
        assert!(result.outlets.is_empty());
        assert_eq!(result.value, None);
        assert_eq!(result.display_value(), "N/A");
    }

    #[test]
    fn attribute_wire_spellings_round_trip() {
        for attr in [
            ExtremalAttribute::EarliestOpening,
            ExtremalAttribute::LatestOpening,
            ExtremalAttribute::EarliestClosing,
            ExtremalAttribute::LatestClosing,
        ] {
            assert_eq!(ExtremalAttribute::from_wire(attr.as_wire()), Some(attr));
        }
        assert_eq!(ExtremalAttribute::from_wire("24hours"), None);
    }
}
