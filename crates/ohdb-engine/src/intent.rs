//! Rule-cascade intent classification.
//!
//! Turns raw query text into a structured [`QueryIntent`] using keyword and
//! pattern rules over the known area names. An optional NL collaborator can
//! propose its own intent; [`resolve_intent`] applies the fixed precedence
//! (explicit rules outrank the service) so an ambiguous case still yields a
//! deterministic best-effort answer.

use regex::Regex;

use crate::extremal::ExtremalAttribute;

/// The dispatchable action extracted from a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentAction {
    SearchLocation,
    TimeQuery,
    CompoundQuery,
    OpeningTimeQuery,
    ClosingTimeQuery,
    StillOpenAfter,
    StillOpenBefore,
    SpecialTimeInLocation,
    GetAttribute,
    GetNearest,
    /// No rule committed; the answer is a generic help message.
    Unknown,
}

impl IntentAction {
    /// Parse the wire spelling used by the NL collaborator.
    #[must_use]
    pub fn from_wire(s: &str) -> Self {
        match s {
            "search_location" => Self::SearchLocation,
            "time_query" => Self::TimeQuery,
            "compound_query" => Self::CompoundQuery,
            "opening_time_query" => Self::OpeningTimeQuery,
            "closing_time_query" => Self::ClosingTimeQuery,
            "still_open_after" => Self::StillOpenAfter,
            "still_open_before" => Self::StillOpenBefore,
            "special_time_location" => Self::SpecialTimeInLocation,
            "get_attribute" => Self::GetAttribute,
            "get_nearest" => Self::GetNearest,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::SearchLocation => "search_location",
            Self::TimeQuery => "time_query",
            Self::CompoundQuery => "compound_query",
            Self::OpeningTimeQuery => "opening_time_query",
            Self::ClosingTimeQuery => "closing_time_query",
            Self::StillOpenAfter => "still_open_after",
            Self::StillOpenBefore => "still_open_before",
            Self::SpecialTimeInLocation => "special_time_location",
            Self::GetAttribute => "get_attribute",
            Self::GetNearest => "get_nearest",
            Self::Unknown => "",
        }
    }
}

/// Attribute payload for [`IntentAction::GetAttribute`] and
/// [`IntentAction::SpecialTimeInLocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentAttribute {
    Extremal(ExtremalAttribute),
    TwentyFourHours,
}

impl IntentAttribute {
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        if s == "24hours" {
            return Some(Self::TwentyFourHours);
        }
        ExtremalAttribute::from_wire(s).map(Self::Extremal)
    }

    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Extremal(attr) => attr.as_wire(),
            Self::TwentyFourHours => "24hours",
        }
    }
}

/// Structured intent, built once per request and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryIntent {
    pub action: IntentAction,
    pub location: Option<String>,
    pub time: Option<String>,
    pub attribute: Option<IntentAttribute>,
    pub answer: String,
}

impl QueryIntent {
    fn unknown() -> Self {
        Self {
            action: IntentAction::Unknown,
            location: None,
            time: None,
            attribute: None,
            answer: "I'm not sure how to answer that. You can ask about outlets in \
                     specific locations, opening times, or find the nearest outlet."
                .to_string(),
        }
    }
}

const TIME_KEYWORDS: &[&str] = &[
    "open", "close", "opening", "closing", "hour", "time", "now", "late", "early", "24",
];

const EXTREMAL_PHRASES: &[(&str, ExtremalAttribute)] = &[
    ("earliest opening", ExtremalAttribute::EarliestOpening),
    ("open earliest", ExtremalAttribute::EarliestOpening),
    ("open the earliest", ExtremalAttribute::EarliestOpening),
    ("opens earliest", ExtremalAttribute::EarliestOpening),
    ("latest closing", ExtremalAttribute::LatestClosing),
    ("close latest", ExtremalAttribute::LatestClosing),
    ("close the latest", ExtremalAttribute::LatestClosing),
    ("closes latest", ExtremalAttribute::LatestClosing),
    ("earliest closing", ExtremalAttribute::EarliestClosing),
    ("close earliest", ExtremalAttribute::EarliestClosing),
    ("close the earliest", ExtremalAttribute::EarliestClosing),
    ("closes earliest", ExtremalAttribute::EarliestClosing),
    ("latest opening", ExtremalAttribute::LatestOpening),
    ("open latest", ExtremalAttribute::LatestOpening),
    ("open the latest", ExtremalAttribute::LatestOpening),
    ("opens latest", ExtremalAttribute::LatestOpening),
];

/// Classify a query with the deterministic rule cascade.
///
/// `known_areas` is the union of distinct repository cities and curated area
/// names; matching is case-insensitive substring.
#[must_use]
pub fn classify_with_rules(query: &str, known_areas: &[String]) -> QueryIntent {
    let lower = query.to_lowercase();

    let location = extract_location(&lower, known_areas);
    let time = extract_time(&lower);

    let is_opening = lower.contains("open");
    let is_closing = lower.contains("clos");
    let is_still_open = lower.contains("still open") || lower.contains("still operating");
    let is_before = lower.contains("before");

    // Location and time together form a compound query.
    if let (Some(location), Some(time)) = (location.as_deref(), time.as_deref()) {
        let condition = build_time_condition(time, is_opening, is_closing, is_still_open, is_before);
        let condition = strip_location_from_condition(&condition, location);
        return QueryIntent {
            action: IntentAction::CompoundQuery,
            location: Some(location.to_string()),
            time: Some(condition.clone()),
            attribute: None,
            answer: format!(
                "Looking for outlets in {location} that match the time condition: {condition}."
            ),
        };
    }

    if lower.contains("open before") || lower.contains("opens before") {
        if let Some(time) = extract_directional_time(&lower) {
            return QueryIntent {
                action: IntentAction::OpeningTimeQuery,
                location: location.clone(),
                time: Some(time.clone()),
                attribute: None,
                answer: format!("Let me find outlets that open {time}."),
            };
        }
    }

    // Extremal attribute scoped to a location.
    if let Some(location) = location.as_deref() {
        for (pattern, attr) in extremal_regex_rules() {
            if pattern.is_match(&lower) {
                return QueryIntent {
                    action: IntentAction::SpecialTimeInLocation,
                    location: Some(location.to_string()),
                    time: None,
                    attribute: Some(IntentAttribute::Extremal(attr)),
                    answer: format!(
                        "Looking for outlets in {location} that {}.",
                        attr.describe()
                    ),
                };
            }
        }
    }

    if lower.contains("still open after")
        || lower.contains("still open before")
        || lower.contains("open after")
        || lower.contains("opens after")
    {
        if let Some(time) = extract_directional_time(&lower) {
            let action = if time.contains("after") {
                IntentAction::StillOpenAfter
            } else {
                IntentAction::StillOpenBefore
            };
            return QueryIntent {
                action,
                location: location.clone(),
                time: Some(time.clone()),
                attribute: None,
                answer: format!("Let me find outlets that are still open {time}."),
            };
        }
    }

    if lower.contains("close before")
        || lower.contains("close after")
        || lower.contains("closes before")
        || lower.contains("closes after")
    {
        if let Some(time) = extract_directional_time(&lower) {
            return QueryIntent {
                action: IntentAction::ClosingTimeQuery,
                location: location.clone(),
                time: Some(time.clone()),
                attribute: None,
                answer: format!("Let me find outlets that close {time}."),
            };
        }
    }

    if let Some(location) = location {
        if TIME_KEYWORDS.iter().any(|k| lower.contains(k)) {
            let time = lower.contains("now").then(|| "now".to_string());
            return QueryIntent {
                action: IntentAction::TimeQuery,
                location: Some(location.clone()),
                time,
                attribute: None,
                answer: format!("Let me check outlets in {location} for the specified time."),
            };
        }
        return QueryIntent {
            action: IntentAction::SearchLocation,
            location: Some(location.clone()),
            time: None,
            attribute: None,
            answer: format!("Let me find outlets in {location}."),
        };
    }

    if lower.contains("nearest")
        || lower.contains("nearby")
        || lower.contains("near ")
        || lower.contains("close to")
    {
        return QueryIntent {
            action: IntentAction::GetNearest,
            location: None,
            time: None,
            attribute: None,
            answer: "Let me find the nearest outlets to your location.".to_string(),
        };
    }

    if lower.contains("open now") || lower.contains("currently open") || lower.contains("now open")
    {
        return QueryIntent {
            action: IntentAction::TimeQuery,
            location: None,
            time: Some("now".to_string()),
            attribute: None,
            answer: "Let me find outlets that are currently open.".to_string(),
        };
    }

    for (phrase, attr) in EXTREMAL_PHRASES {
        if lower.contains(phrase) {
            return QueryIntent {
                action: IntentAction::GetAttribute,
                location: None,
                time: None,
                attribute: Some(IntentAttribute::Extremal(*attr)),
                answer: format!("Let me find the outlets that {}.", attr.describe()),
            };
        }
    }

    if lower.contains("24 hour")
        || lower.contains("24hour")
        || lower.contains("all day")
        || lower.contains("all night")
    {
        return QueryIntent {
            action: IntentAction::GetAttribute,
            location: None,
            time: None,
            attribute: Some(IntentAttribute::TwentyFourHours),
            answer: "Let me find outlets that are open 24 hours.".to_string(),
        };
    }

    QueryIntent::unknown()
}

/// Merge the rule-cascade intent with an optional NL-service intent.
///
/// Explicit keyword rules outrank the service: a committed rule action wins,
/// keeping the service's answer text only when both agree on the action. The
/// service fills in only when the rules did not commit.
#[must_use]
pub fn resolve_intent(rule: QueryIntent, nl: Option<QueryIntent>) -> QueryIntent {
    let Some(nl) = nl else {
        return rule;
    };

    if rule.action == IntentAction::Unknown {
        if nl.action == IntentAction::Unknown {
            return rule;
        }
        return nl;
    }

    if nl.action == rule.action {
        // Same action: the service usually phrases the answer better.
        return QueryIntent {
            answer: nl.answer,
            ..rule
        };
    }

    tracing::warn!(
        rule_action = rule.action.as_wire(),
        nl_action = nl.action.as_wire(),
        "intent disagreement; keeping rule-cascade result"
    );
    rule
}

fn extract_location(lower: &str, known_areas: &[String]) -> Option<String> {
    for area in known_areas {
        let area_lower = area.to_lowercase();
        if !area_lower.is_empty() && lower.contains(&area_lower) {
            return Some(area.clone());
        }
    }

    // "in Bangsar area", "near KLCC", "Ampang district" and similar shapes.
    let patterns = [
        r"in\s+([a-z\s]+)(?:\s+(?:that|which|area|district))?",
        r"([a-z\s]+)\s+(?:area|district|region)",
        r"near\s+([a-z\s]+)",
        r"around\s+([a-z\s]+)",
    ];
    for pattern in patterns {
        let re = Regex::new(pattern).expect("valid location pattern");
        if let Some(caps) = re.captures(lower) {
            let candidate = caps.get(1).map(|m| m.as_str().trim().to_string())?;
            for area in known_areas {
                let area_lower = area.to_lowercase();
                if !area_lower.is_empty() && candidate.contains(&area_lower) {
                    return Some(area.clone());
                }
            }
        }
    }
    None
}

fn extract_time(lower: &str) -> Option<String> {
    let patterns = [
        r"(?:close|closes|closing)?\s*(?:before|after)\s+\d{1,2}(?::\d{2})?(?:\s*[ap]m)?",
        r"before\s+\d{1,2}(?::\d{2})?(?:\s*[ap]m)?",
        r"after\s+\d{1,2}(?::\d{2})?(?:\s*[ap]m)?",
        r"at\s+\d{1,2}(?::\d{2})?(?:\s*[ap]m)?",
        r"\d{1,2}(?::\d{2})?\s*[ap]m",
        r"now|currently|at this time",
    ];
    for pattern in patterns {
        let re = Regex::new(pattern).expect("valid time pattern");
        if let Some(m) = re.find(lower) {
            return Some(m.as_str().trim().to_string());
        }
    }
    None
}

fn extract_directional_time(lower: &str) -> Option<String> {
    let re = Regex::new(r"(?:before|after)\s+\d{1,2}(?::\d{2})?(?:\s*[ap]m)?")
        .expect("valid directional time pattern");
    re.find(lower).map(|m| m.as_str().to_string())
}

fn build_time_condition(
    time: &str,
    is_opening: bool,
    is_closing: bool,
    is_still_open: bool,
    is_before: bool,
) -> String {
    if is_opening {
        format!("open {time}")
    } else if is_closing {
        format!("close {time}")
    } else if is_still_open || time.contains("after") {
        format!("open {time}")
    } else if is_before {
        // No explicit open/close: read as a closing-time condition.
        format!("close {time}")
    } else {
        time.to_string()
    }
}

fn strip_location_from_condition(condition: &str, location: &str) -> String {
    let location_lower = location.to_lowercase();
    if !condition.contains(&location_lower) {
        return condition.to_string();
    }
    let pattern = format!(r"(?:at|in)?\s+{}", regex::escape(&location_lower));
    let re = Regex::new(&pattern).expect("valid location-strip pattern");
    re.replace_all(condition, "").trim().to_string()
}

fn extremal_regex_rules() -> Vec<(Regex, ExtremalAttribute)> {
    [
        (r"earliest\s+(?:to\s+)?open", ExtremalAttribute::EarliestOpening),
        (r"open(?:s)?\s+(?:the\s+)?earliest", ExtremalAttribute::EarliestOpening),
        (r"latest\s+(?:to\s+)?open", ExtremalAttribute::LatestOpening),
        (r"open(?:s)?\s+(?:the\s+)?latest", ExtremalAttribute::LatestOpening),
        (r"earliest\s+(?:to\s+)?clos", ExtremalAttribute::EarliestClosing),
        (r"clos(?:e|es|ing)\s+(?:the\s+)?earliest", ExtremalAttribute::EarliestClosing),
        (r"latest\s+(?:to\s+)?clos", ExtremalAttribute::LatestClosing),
        (r"clos(?:e|es|ing)\s+(?:the\s+)?latest", ExtremalAttribute::LatestClosing),
    ]
    .into_iter()
    .map(|(pattern, attr)| {
        (
            Regex::new(pattern).expect("valid extremal pattern"),
            attr,
        )
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn areas() -> Vec<String> {
        vec![
            "Bangsar".to_string(),
            "Ampang".to_string(),
            "Subang Jaya".to_string(),
        ]
    }

    #[test]
    fn location_plus_time_is_compound() {
        let intent = classify_with_rules("outlets in Bangsar open after 8pm", &areas());
        assert_eq!(intent.action, IntentAction::CompoundQuery);
        assert_eq!(intent.location.as_deref(), Some("Bangsar"));
        assert_eq!(intent.time.as_deref(), Some("open after 8pm"));
    }

    #[test]
    fn bare_before_becomes_closing_condition() {
        let intent = classify_with_rules("stores in Ampang before 10pm", &areas());
        assert_eq!(intent.action, IntentAction::CompoundQuery);
        assert_eq!(intent.time.as_deref(), Some("close before 10pm"));
    }

    #[test]
    fn opening_time_query_without_location() {
        let intent = classify_with_rules("which outlets open before 9am", &areas());
        assert_eq!(intent.action, IntentAction::OpeningTimeQuery);
        assert_eq!(intent.time.as_deref(), Some("before 9am"));
        assert_eq!(intent.location, None);
    }

    #[test]
    fn extremal_in_location() {
        let intent = classify_with_rules("which store closes latest in Bangsar", &areas());
        assert_eq!(intent.action, IntentAction::SpecialTimeInLocation);
        assert_eq!(intent.location.as_deref(), Some("Bangsar"));
        assert_eq!(
            intent.attribute,
            Some(IntentAttribute::Extremal(ExtremalAttribute::LatestClosing))
        );
    }

    #[test]
    fn still_open_after_without_location() {
        let intent = classify_with_rules("still open after 10pm?", &areas());
        assert_eq!(intent.action, IntentAction::StillOpenAfter);
        assert_eq!(intent.time.as_deref(), Some("after 10pm"));
    }

    #[test]
    fn closing_time_query() {
        let intent = classify_with_rules("what closes before 8pm", &areas());
        assert_eq!(intent.action, IntentAction::ClosingTimeQuery);
        assert_eq!(intent.time.as_deref(), Some("before 8pm"));
    }

    #[test]
    fn plain_location_is_search() {
        let intent = classify_with_rules("outlets in Subang Jaya", &areas());
        assert_eq!(intent.action, IntentAction::SearchLocation);
        assert_eq!(intent.location.as_deref(), Some("Subang Jaya"));
    }

    #[test]
    fn nearest_keywords() {
        let intent = classify_with_rules("find the nearest outlet to me", &areas());
        assert_eq!(intent.action, IntentAction::GetNearest);
    }

    #[test]
    fn open_now_is_time_query() {
        let intent = classify_with_rules("which outlets are open now", &areas());
        assert_eq!(intent.action, IntentAction::TimeQuery);
        assert_eq!(intent.time.as_deref(), Some("now"));
    }

    #[test]
    fn global_extremal_attribute() {
        let intent = classify_with_rules("which outlet opens earliest", &areas());
        assert_eq!(intent.action, IntentAction::GetAttribute);
        assert_eq!(
            intent.attribute,
            Some(IntentAttribute::Extremal(ExtremalAttribute::EarliestOpening))
        );
    }

    #[test]
    fn twenty_four_hours_attribute() {
        let intent = classify_with_rules("any 24 hour outlets?", &areas());
        assert_eq!(intent.action, IntentAction::GetAttribute);
        assert_eq!(intent.attribute, Some(IntentAttribute::TwentyFourHours));
    }

    #[test]
    fn gibberish_is_unknown_with_help_answer() {
        let intent = classify_with_rules("tell me a joke", &areas());
        assert_eq!(intent.action, IntentAction::Unknown);
        assert!(!intent.answer.is_empty());
    }

    #[test]
    fn rules_outrank_nl_on_disagreement() {
        let rule = classify_with_rules("outlets in Bangsar open after 8pm", &areas());
        let nl = QueryIntent {
            action: IntentAction::GetNearest,
            location: None,
            time: None,
            attribute: None,
            answer: "service answer".to_string(),
        };
        let resolved = resolve_intent(rule.clone(), Some(nl));
        assert_eq!(resolved.action, IntentAction::CompoundQuery);
        assert_eq!(resolved.location, rule.location);
    }

    #[test]
    fn nl_fills_in_when_rules_do_not_commit() {
        let rule = classify_with_rules("hmm", &areas());
        let nl = QueryIntent {
            action: IntentAction::SearchLocation,
            location: Some("Bangsar".to_string()),
            time: None,
            attribute: None,
            answer: "service answer".to_string(),
        };
        let resolved = resolve_intent(rule, Some(nl.clone()));
        assert_eq!(resolved, nl);
    }

    #[test]
    fn agreement_keeps_rule_slots_with_nl_answer() {
        let rule = classify_with_rules("outlets in Bangsar", &areas());
        let nl = QueryIntent {
            action: IntentAction::SearchLocation,
            location: Some("bangsar".to_string()),
            time: None,
            attribute: None,
            answer: "There are several outlets in Bangsar.".to_string(),
        };
        let resolved = resolve_intent(rule.clone(), Some(nl));
        assert_eq!(resolved.action, IntentAction::SearchLocation);
        assert_eq!(resolved.location, rule.location);
        assert_eq!(resolved.answer, "There are several outlets in Bangsar.");
    }

    #[test]
    fn action_wire_spellings_round_trip() {
        for action in [
            IntentAction::SearchLocation,
            IntentAction::TimeQuery,
            IntentAction::CompoundQuery,
            IntentAction::OpeningTimeQuery,
            IntentAction::ClosingTimeQuery,
            IntentAction::StillOpenAfter,
            IntentAction::StillOpenBefore,
            IntentAction::SpecialTimeInLocation,
            IntentAction::GetAttribute,
            IntentAction::GetNearest,
        ] {
            assert_eq!(IntentAction::from_wire(action.as_wire()), action);
        }
        assert_eq!(IntentAction::from_wire(""), IntentAction::Unknown);
        assert_eq!(IntentAction::from_wire("bogus"), IntentAction::Unknown);
    }
}
