//! Compound queries: a location filter intersected with a time condition.
//!
//! The time text is classified and routed to the extremal finder, the
//! tolerant opening/closing lookups, or the general predicate evaluation;
//! the routed result is then intersected by id with the location result.
//! The final list is always a subset of both sides.

use std::collections::HashSet;

use ohdb_core::{AreaTable, Outlet};
use regex::Regex;

use crate::extremal::{find_extremal, ExtremalAttribute};
use crate::interval::{outlets_by_closing_time, outlets_by_opening_time, outlets_matching};
use crate::location::resolve_location;
use crate::timeparse::{parse_time_phrase, select_day_set, ParseContext};

/// Behavior knobs for compound routing.
#[derive(Debug, Clone, Copy)]
pub struct CompoundOptions {
    /// Read a bare "before X" (no open/close keyword) as a closing-time
    /// query. Heuristic; configured rather than hard-coded.
    pub bare_before_is_closing: bool,
}

impl Default for CompoundOptions {
    fn default() -> Self {
        Self {
            bare_before_is_closing: true,
        }
    }
}

/// Resolve `location`, optionally narrowed by `time`.
///
/// With no time text this is exactly the location result. A time text that
/// cannot be parsed narrows the result to nothing.
#[must_use]
pub fn compound_search<'a>(
    outlets: &'a [Outlet],
    areas: &AreaTable,
    location: &str,
    time: Option<&str>,
    ctx: &ParseContext,
    opts: &CompoundOptions,
) -> Vec<&'a Outlet> {
    let location_ids = resolve_location(outlets, areas, location);

    let time_raw = time.map(str::trim).filter(|t| !t.is_empty());
    let Some(time_raw) = time_raw else {
        return by_ids(outlets, &location_ids);
    };

    let time_text = strip_location_echo(&time_raw.to_lowercase(), location);
    let id_set: HashSet<i64> = location_ids.iter().copied().collect();
    let days = select_day_set(&time_text, ctx);

    let is_still_open = time_text.contains("still open");
    let has_open = time_text.contains("open");
    let has_close = time_text.contains("clos");
    let has_before = time_text.contains("before");
    let has_after = time_text.contains("after");
    let has_now = time_text.contains("now") || time_text.contains("currently");
    let is_extremal = time_text.contains("earliest") || time_text.contains("latest");

    // "Still open after X" and "open after X" share the containment check.
    let after_open_query = is_still_open || (has_open && has_after);
    let opening_query = has_open && has_before && !has_now;
    let mut closing_query = has_close;

    // A bare "before X" conventionally asks about closing.
    let mut bare_before = false;
    if has_before && !opening_query && !closing_query && !after_open_query
        && opts.bare_before_is_closing
    {
        closing_query = true;
        bare_before = true;
    }

    if after_open_query {
        if let Some(pred) = parse_time_phrase(&time_text, ctx) {
            let matched = intersect(outlets_matching(outlets, &pred), &id_set);
            if !matched.is_empty() {
                return matched;
            }
        }
    } else if opening_query {
        if is_extremal {
            let attr = if time_text.contains("earliest") {
                ExtremalAttribute::EarliestOpening
            } else {
                ExtremalAttribute::LatestOpening
            };
            let matched = intersect(find_extremal(outlets, attr, days).outlets, &id_set);
            if !matched.is_empty() {
                return matched;
            }
        } else {
            let matched = intersect(outlets_by_opening_time(outlets, &time_text, days), &id_set);
            if !matched.is_empty() {
                return matched;
            }
        }
    } else if closing_query {
        if is_extremal {
            let attr = if time_text.contains("earliest") {
                ExtremalAttribute::EarliestClosing
            } else {
                ExtremalAttribute::LatestClosing
            };
            let matched = intersect(find_extremal(outlets, attr, days).outlets, &id_set);
            if !matched.is_empty() {
                return matched;
            }
        } else {
            let phrase = if bare_before && !time_text.starts_with("close") {
                format!("close {time_text}")
            } else {
                time_text.clone()
            };
            let matched = intersect(outlets_by_closing_time(outlets, &phrase, days), &id_set);
            if !matched.is_empty() {
                return matched;
            }
        }
    }

    // General containment/comparison evaluation.
    match parse_time_phrase(&time_text, ctx) {
        Some(pred) => intersect(outlets_matching(outlets, &pred), &id_set),
        None => {
            tracing::debug!(time = %time_text, "compound: unparseable time text");
            Vec::new()
        }
    }
}

/// Remove the already-resolved location text from the time text so location
/// words are not mistaken for time tokens, along with a dangling "at"/"in".
fn strip_location_echo(time_lower: &str, location: &str) -> String {
    let location_lower = location.trim().to_lowercase();
    if location_lower.is_empty() || !time_lower.contains(&location_lower) {
        return time_lower.to_string();
    }
    let stripped = time_lower.replace(&location_lower, "");
    let trailing = Regex::new(r"\s+(?:at|in)\s*$").expect("valid trailing-preposition regex");
    trailing.replace(stripped.trim(), "").trim().to_string()
}

fn by_ids<'a>(outlets: &'a [Outlet], ids: &[i64]) -> Vec<&'a Outlet> {
    ids.iter()
        .filter_map(|id| outlets.iter().find(|o| o.id == *id))
        .collect()
}

fn intersect<'a>(matched: Vec<&'a Outlet>, ids: &HashSet<i64>) -> Vec<&'a Outlet> {
    matched.into_iter().filter(|o| ids.contains(&o.id)).collect()
}
