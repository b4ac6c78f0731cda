//! Time expression parsing: free text → [`TimePredicate`].
//!
//! The vocabulary is deliberately small: clock times ("22:30", "9pm",
//! "9:30 AM"), before/after/at qualifiers, day-part words ("evening",
//! "morning"), weekday and weekend selectors, and "now". Anything else is a
//! recoverable parse failure (`None`), which downstream code turns into an
//! empty match set.

use chrono::{Datelike, Local, Timelike};
use regex::Regex;

use ohdb_core::{ClockTime, DaySet, Weekday};

/// How the anchor compares against a schedule field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    At,
    Before,
    After,
}

/// Which side of a day's hours the comparison reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleField {
    Open,
    Close,
}

/// Normalized time condition, produced atomically by the parser.
///
/// Interpretation (see the interval evaluator):
/// - `At` — containment: the anchor falls inside the open interval.
/// - `After`/`Open` — still open after the anchor.
/// - `Before`/`Open` — opens strictly before the anchor.
/// - `Before`/`Close`, `After`/`Close` — closes strictly before/after the
///   anchor, overnight closes ranked past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePredicate {
    pub anchor: ClockTime,
    pub mode: CompareMode,
    pub field: ScheduleField,
    pub days: DaySet,
}

/// Caller-supplied context for parsing: the current clock and any explicit
/// day selection. The parser never reads the system clock itself.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext {
    pub now: ClockTime,
    pub today: Weekday,
    /// Explicit day passed alongside the phrase, if any.
    pub day: Option<Weekday>,
    /// Explicit weekend/weekday flag passed alongside the phrase, if any.
    pub weekend: Option<bool>,
    /// Field a bare "before X" phrase reads (configured; conventionally
    /// `Close`).
    pub bare_before_field: ScheduleField,
}

impl ParseContext {
    /// Context for the local wall clock with no explicit day selection.
    #[must_use]
    pub fn local() -> Self {
        let now = Local::now();
        let minutes = u16::try_from(now.hour() * 60 + now.minute()).unwrap_or(0);
        Self {
            now: ClockTime::new(minutes).unwrap_or(ClockTime::MIDNIGHT),
            today: Weekday::from(now.weekday()),
            day: None,
            weekend: None,
            bare_before_field: ScheduleField::Close,
        }
    }

    #[must_use]
    pub fn with_day(mut self, day: Option<Weekday>) -> Self {
        self.day = day;
        self
    }

    #[must_use]
    pub fn with_weekend(mut self, weekend: Option<bool>) -> Self {
        self.weekend = weekend;
        self
    }
}

const AFTER_KEYWORDS: &[&str] = &["after", "past", "later than", "evening", "night", "afternoon"];
const BEFORE_KEYWORDS: &[&str] = &["before", "earlier than", "prior to", "morning", "dawn"];
const PM_HINT_KEYWORDS: &[&str] = &["evening", "night", "afternoon"];

/// Parse a time phrase into a predicate. Returns `None` when no time can be
/// extracted — callers must treat that as "no match", never as midnight.
#[must_use]
pub fn parse_time_phrase(phrase: &str, ctx: &ParseContext) -> Option<TimePredicate> {
    let lower = phrase.to_lowercase();
    let days = select_day_set(&lower, ctx);

    if lower
        .split_whitespace()
        .any(|w| matches!(w, "now" | "current" | "currently"))
    {
        return Some(TimePredicate {
            anchor: ctx.now,
            mode: CompareMode::At,
            field: ScheduleField::Open,
            days,
        });
    }

    let mode = detect_mode(&lower);
    let anchor = extract_anchor(&lower)?;
    let field = detect_field(&lower, mode, ctx.bare_before_field);

    Some(TimePredicate {
        anchor,
        mode,
        field,
        days,
    })
}

/// Convert a 12-hour clock expression ("9pm", "9:30 AM") to a [`ClockTime`].
///
/// Characters outside `[0-9:APMapm ]` are stripped first. Returns `None`
/// when no hour + AM/PM marker can be matched — deliberately distinct from
/// midnight, which is a valid parse of "12:00 AM".
#[must_use]
pub fn convert_12h(text: &str) -> Option<ClockTime> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ':' | ' ') || "apmAPM".contains(*c))
        .collect();

    let re = Regex::new(r"(?i)(\d{1,2}):?(\d{2})?\s*([ap])m").expect("valid 12h regex");
    let caps = re.captures(&cleaned)?;

    let mut hour: u16 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u16 = caps
        .get(2)
        .map_or(Some(0), |m| m.as_str().parse().ok())?;
    let is_pm = caps.get(3)?.as_str().eq_ignore_ascii_case("p");

    if is_pm && hour < 12 {
        hour += 12;
    } else if !is_pm && hour == 12 {
        hour = 0;
    }

    ClockTime::from_hm(hour, minute)
}

fn detect_mode(lower: &str) -> CompareMode {
    if AFTER_KEYWORDS.iter().any(|k| lower.contains(k)) {
        CompareMode::After
    } else if BEFORE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        CompareMode::Before
    } else {
        CompareMode::At
    }
}

fn detect_field(lower: &str, mode: CompareMode, bare_before_field: ScheduleField) -> ScheduleField {
    if lower.contains("open") {
        ScheduleField::Open
    } else if lower.contains("clos") {
        ScheduleField::Close
    } else {
        match mode {
            // Bare "before 9" conventionally reads as a closing-time
            // question; the default is configured, not hard-coded.
            CompareMode::Before => bare_before_field,
            // Bare "after 9" reads as "still open after 9".
            CompareMode::After | CompareMode::At => ScheduleField::Open,
        }
    }
}

/// Extract the anchor clock time from an already-lowercased phrase.
fn extract_anchor(lower: &str) -> Option<ClockTime> {
    // 12-hour markers win over the colon path so "9:30 pm" parses as 21:30.
    if lower.contains("am") || lower.contains("pm") {
        return convert_12h(lower);
    }

    let colon = Regex::new(r"(\d{1,2}):(\d{2})").expect("valid colon regex");
    if let Some(caps) = colon.captures(lower) {
        let hour: u16 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u16 = caps.get(2)?.as_str().parse().ok()?;
        return ClockTime::from_hm(apply_pm_hint(hour, lower), minute);
    }

    let bare = Regex::new(r"(\d{1,2})").expect("valid bare-hour regex");
    let caps = bare.captures(lower)?;
    let hour: u16 = caps.get(1)?.as_str().parse().ok()?;
    ClockTime::from_hm(apply_pm_hint(hour, lower), 0)
}

/// Shift an ambiguous hour into the afternoon when a day-part word says so
/// ("after 8 evening" means 20:00). Noon itself is left alone.
fn apply_pm_hint(hour: u16, lower: &str) -> u16 {
    if (1..=11).contains(&hour) && PM_HINT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        hour + 12
    } else {
        hour
    }
}

pub(crate) fn select_day_set(lower: &str, ctx: &ParseContext) -> DaySet {
    if let Some(day) = Weekday::ALL.into_iter().find(|d| lower.contains(d.name())) {
        return DaySet::Single(day);
    }
    if let Some(day) = ctx.day {
        return DaySet::Single(day);
    }
    if lower.contains("weekend") {
        return DaySet::Weekend;
    }
    if lower.contains("weekday") {
        return DaySet::Weekdays;
    }
    if let Some(weekend) = ctx.weekend {
        return DaySet::from_weekend_flag(weekend);
    }
    DaySet::class_of(ctx.today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ParseContext {
        ParseContext {
            now: ClockTime::from_hm(14, 30).unwrap(),
            today: Weekday::Wednesday,
            day: None,
            weekend: None,
            bare_before_field: ScheduleField::Close,
        }
    }

    fn t(hour: u16, minute: u16) -> ClockTime {
        ClockTime::from_hm(hour, minute).unwrap()
    }

    #[test]
    fn twelve_hour_conversion_table() {
        assert_eq!(convert_12h("9:00 AM"), Some(t(9, 0)));
        assert_eq!(convert_12h("9:00 PM"), Some(t(21, 0)));
        assert_eq!(convert_12h("12:00 AM"), Some(t(0, 0)));
        assert_eq!(convert_12h("12:00 PM"), Some(t(12, 0)));
        assert_eq!(convert_12h("9pm"), Some(t(21, 0)));
        assert_eq!(convert_12h("9.30pm"), Some(t(21, 30))); // punctuation stripped
    }

    #[test]
    fn unparseable_12h_is_none_not_midnight() {
        assert_eq!(convert_12h("soonish"), None);
        assert_eq!(convert_12h(""), None);
        // A bare number without a marker is not a 12-hour form.
        assert_eq!(convert_12h("9"), None);
    }

    #[test]
    fn now_uses_context_clock() {
        let pred = parse_time_phrase("now", &ctx()).expect("parse now");
        assert_eq!(pred.anchor, t(14, 30));
        assert_eq!(pred.mode, CompareMode::At);
        let pred = parse_time_phrase("currently open", &ctx()).expect("parse currently");
        assert_eq!(pred.anchor, t(14, 30));
    }

    #[test]
    fn colon_time_parses_directly() {
        let pred = parse_time_phrase("22:30", &ctx()).expect("parse");
        assert_eq!(pred.anchor, t(22, 30));
        assert_eq!(pred.mode, CompareMode::At);
    }

    #[test]
    fn colon_with_marker_prefers_twelve_hour_reading() {
        let pred = parse_time_phrase("9:30 pm", &ctx()).expect("parse");
        assert_eq!(pred.anchor, t(21, 30));
    }

    #[test]
    fn directional_keywords_set_mode() {
        let after = parse_time_phrase("after 9pm", &ctx()).expect("parse");
        assert_eq!(after.mode, CompareMode::After);
        let before = parse_time_phrase("before 8am", &ctx()).expect("parse");
        assert_eq!(before.mode, CompareMode::Before);
        let at = parse_time_phrase("9pm", &ctx()).expect("parse");
        assert_eq!(at.mode, CompareMode::At);
    }

    #[test]
    fn evening_hint_shifts_bare_hour() {
        let pred = parse_time_phrase("after 8 evening", &ctx()).expect("parse");
        assert_eq!(pred.anchor, t(20, 0));
        assert_eq!(pred.mode, CompareMode::After);
    }

    #[test]
    fn evening_hint_leaves_noon_and_pm_hours_alone() {
        let pred = parse_time_phrase("after 12 night", &ctx()).expect("parse");
        assert_eq!(pred.anchor, t(12, 0));
        // Explicit pm already resolved the hour; the hint must not double-shift.
        let pred = parse_time_phrase("after 8pm tonight", &ctx()).expect("parse");
        assert_eq!(pred.anchor, t(20, 0));
    }

    #[test]
    fn open_keyword_selects_open_field() {
        let pred = parse_time_phrase("opens before 9am", &ctx()).expect("parse");
        assert_eq!(pred.field, ScheduleField::Open);
        assert_eq!(pred.mode, CompareMode::Before);
    }

    #[test]
    fn close_keyword_selects_close_field() {
        let pred = parse_time_phrase("closes after 10pm", &ctx()).expect("parse");
        assert_eq!(pred.field, ScheduleField::Close);
        assert_eq!(pred.mode, CompareMode::After);
    }

    #[test]
    fn bare_before_defaults_to_configured_field() {
        let pred = parse_time_phrase("before 9pm", &ctx()).expect("parse");
        assert_eq!(pred.field, ScheduleField::Close);

        let mut open_ctx = ctx();
        open_ctx.bare_before_field = ScheduleField::Open;
        let pred = parse_time_phrase("before 9pm", &open_ctx).expect("parse");
        assert_eq!(pred.field, ScheduleField::Open);
    }

    #[test]
    fn still_open_after_reads_as_open_containment() {
        let pred = parse_time_phrase("still open after 10pm", &ctx()).expect("parse");
        assert_eq!(pred.mode, CompareMode::After);
        assert_eq!(pred.field, ScheduleField::Open);
    }

    #[test]
    fn day_selection_precedence() {
        // Explicit weekday name in the phrase wins.
        let pred = parse_time_phrase("9pm on saturday", &ctx()).expect("parse");
        assert_eq!(pred.days, DaySet::Single(Weekday::Saturday));

        // Then the explicit day argument.
        let pred = parse_time_phrase("9pm", &ctx().with_day(Some(Weekday::Friday))).expect("parse");
        assert_eq!(pred.days, DaySet::Single(Weekday::Friday));

        // Then a weekend keyword.
        let pred = parse_time_phrase("9pm weekend", &ctx()).expect("parse");
        assert_eq!(pred.days, DaySet::Weekend);

        // Then the weekend flag.
        let pred = parse_time_phrase("9pm", &ctx().with_weekend(Some(true))).expect("parse");
        assert_eq!(pred.days, DaySet::Weekend);

        // Finally the current day's class.
        let pred = parse_time_phrase("9pm", &ctx()).expect("parse");
        assert_eq!(pred.days, DaySet::Weekdays);
    }

    #[test]
    fn unparseable_phrase_is_none() {
        assert!(parse_time_phrase("sometime soon", &ctx()).is_none());
        assert!(parse_time_phrase("", &ctx()).is_none());
    }

    #[test]
    fn out_of_range_hour_is_none() {
        assert!(parse_time_phrase("at 31:00", &ctx()).is_none());
    }
}
