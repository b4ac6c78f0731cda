//! Location resolution: fuzzy location text → ordered outlet-id list.
//!
//! A precedence cascade of matchers runs over the in-memory outlet slice;
//! the first stage that produces anything wins and later stages never run.
//! Unmatched input resolves to an empty list, never an error.

use ohdb_core::{AreaTable, Outlet};

/// Hard cap on resolver output, applied after deduplication.
pub const MAX_RESULTS: usize = 20;

/// Resolve free location text to a deduplicated outlet-id list, capped at
/// [`MAX_RESULTS`], preserving first-seen order.
#[must_use]
pub fn resolve_location(outlets: &[Outlet], areas: &AreaTable, query: &str) -> Vec<i64> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let exact_postcode = || match_exact_postcode(outlets, &query);
    let named_areas = || match_named_areas(outlets, areas, &query);
    let any_field = || match_any_field(outlets, &query);
    let fuzzy = || match_fuzzy(outlets, areas, &query);
    let stages: [&dyn Fn() -> Vec<i64>; 4] = [&exact_postcode, &named_areas, &any_field, &fuzzy];

    for stage in stages {
        let found = stage();
        if !found.is_empty() {
            return dedup_and_cap(found);
        }
    }
    Vec::new()
}

fn dedup_and_cap(ids: Vec<i64>) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    let mut unique: Vec<i64> = ids.into_iter().filter(|id| seen.insert(*id)).collect();
    unique.truncate(MAX_RESULTS);
    unique
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn contains_ci(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|f| f.to_lowercase().contains(needle))
}

/// Match across every address-ish field plus the outlet name.
fn any_field_contains(outlet: &Outlet, needle: &str) -> bool {
    contains_ci(outlet.city.as_deref(), needle)
        || contains_ci(outlet.district.as_deref(), needle)
        || contains_ci(Some(&outlet.address), needle)
        || contains_ci(outlet.street_address.as_deref(), needle)
        || contains_ci(Some(&outlet.name), needle)
}

/// The narrower field set used by the fuzzy stages.
fn fuzzy_field_contains(outlet: &Outlet, needle: &str) -> bool {
    contains_ci(Some(&outlet.address), needle)
        || contains_ci(Some(&outlet.name), needle)
        || contains_ci(outlet.city.as_deref(), needle)
        || contains_ci(outlet.district.as_deref(), needle)
}

/// Stage 1: the query is itself a 5-digit postcode.
fn match_exact_postcode(outlets: &[Outlet], query: &str) -> Vec<i64> {
    if !(is_digits(query) && query.len() == 5) {
        return Vec::new();
    }
    outlets
        .iter()
        .filter(|o| {
            o.postcode.as_deref() == Some(query) || contains_ci(Some(&o.address), query)
        })
        .map(|o| o.id)
        .collect()
}

/// Stage 2: curated named areas — union of postcode-rule matches and
/// area-name substrings across city/district/address/name.
fn match_named_areas(outlets: &[Outlet], areas: &AreaTable, query: &str) -> Vec<i64> {
    let matched = areas.matching_areas(query);
    let mut ids = Vec::new();
    for area in matched {
        let area_name = area.name.to_lowercase();
        for outlet in outlets {
            let by_postcode = outlet
                .postcode
                .as_deref()
                .is_some_and(|p| area.covers_postcode(p));
            if by_postcode || any_field_contains(outlet, &area_name) {
                ids.push(outlet.id);
            }
        }
    }
    ids
}

/// Stage 3: plain substring across all fields.
fn match_any_field(outlets: &[Outlet], query: &str) -> Vec<i64> {
    outlets
        .iter()
        .filter(|o| any_field_contains(o, query))
        .map(|o| o.id)
        .collect()
}

/// Stage 4: cumulative fallbacks, only reached when stage 3 found nothing.
fn match_fuzzy(outlets: &[Outlet], areas: &AreaTable, query: &str) -> Vec<i64> {
    let mut ids = Vec::new();

    // (a) Per-word matches, skipping short words that would over-match.
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.len() > 1 {
        for word in words {
            if word.len() > 3 {
                ids.extend(
                    outlets
                        .iter()
                        .filter(|o| fuzzy_field_contains(o, word))
                        .map(|o| o.id),
                );
            }
        }
    }

    // (b) Postcode-like digits of the wrong width, left-padded to 5.
    if is_digits(query) && (4..=6).contains(&query.len()) {
        let padded = format!("{query:0>5}");
        ids.extend(
            outlets
                .iter()
                .filter(|o| {
                    o.postcode.as_deref() == Some(padded.as_str())
                        || contains_ci(Some(&o.address), &padded)
                })
                .map(|o| o.id),
        );
    }

    // (c) Shared 3-character prefix, for near-spellings.
    if ids.is_empty() && query.len() > 3 {
        if let Some(prefix) = query.get(..3) {
            ids.extend(
                outlets
                    .iter()
                    .filter(|o| fuzzy_field_contains(o, prefix))
                    .map(|o| o.id),
            );
        }
    }

    // (d) Curated keyword groups: landmarks and synonyms for an area.
    if ids.is_empty() {
        for group in areas.matching_keyword_groups(query) {
            for keyword in &group.keywords {
                ids.extend(
                    outlets
                        .iter()
                        .filter(|o| fuzzy_field_contains(o, keyword))
                        .map(|o| o.id),
                );
            }
        }
    }

    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use ohdb_core::areas::parse_areas;

    fn outlet(id: i64, name: &str, address: &str, city: &str, postcode: &str) -> Outlet {
        Outlet {
            id,
            name: name.to_string(),
            address: address.to_string(),
            street_address: None,
            district: None,
            city: if city.is_empty() {
                None
            } else {
                Some(city.to_string())
            },
            postcode: if postcode.is_empty() {
                None
            } else {
                Some(postcode.to_string())
            },
            latitude: None,
            longitude: None,
            schedule: None,
            is_24_hours: false,
            hours_text: None,
        }
    }

    fn table() -> AreaTable {
        parse_areas(
            r"
postcode_areas:
  - name: Bangsar
    postcodes: ['59000']
  - name: City Centre
    postcodes: ['50000-50999']
keyword_groups:
  - name: klcc
    keywords: [klcc, suria, 'twin towers']
",
        )
        .expect("parse test areas")
    }

    fn fixture() -> Vec<Outlet> {
        vec![
            outlet(
                1,
                "Bangsar Village",
                "Jalan Telawi, Bangsar",
                "Kuala Lumpur",
                "59000",
            ),
            outlet(
                2,
                "Suria Mall Kiosk",
                "Suria KLCC, Jalan Ampang",
                "Kuala Lumpur",
                "50088",
            ),
            outlet(3, "Subang Parade", "Jalan SS16, Subang Jaya", "Subang Jaya", "47500"),
        ]
    }

    #[test]
    fn exact_postcode_short_circuits() {
        let ids = resolve_location(&fixture(), &table(), "59000");
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn named_area_unions_postcodes_and_fields() {
        // "city centre" matches no outlet field, but covers postcode 50088.
        let ids = resolve_location(&fixture(), &table(), "city centre");
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn general_substring_matches_name_and_address() {
        let ids = resolve_location(&fixture(), &table(), "subang");
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn padded_postcode_retry() {
        // 4-digit input pads to 05908 — no hit; 9000-style fragment would be
        // ambiguous, so check the real pad path: "7500" -> "07500" (miss) and
        // "47500" handled by stage 1. Use a 4-digit code that pads to a stored
        // one: store postcode "07500".
        let mut outlets = fixture();
        outlets.push(outlet(4, "Northern Branch", "Jalan Utara", "Alor Setar", "07500"));
        let ids = resolve_location(&outlets, &table(), "7500");
        assert_eq!(ids, vec![4]);
    }

    #[test]
    fn prefix_fallback_catches_near_spellings() {
        // "bangsari" matches nothing whole, but its 3-char prefix "ban" hits
        // both "Bangsar Village" and "Subang Parade".
        let ids = resolve_location(&fixture(), &table(), "bangsari");
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn keyword_group_is_last_resort() {
        // "twin towers" appears in no outlet field; the klcc keyword group
        // maps it to outlets matching its other keywords.
        let ids = resolve_location(&fixture(), &table(), "twin towers");
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn unmatched_input_is_empty_not_error() {
        assert!(resolve_location(&fixture(), &table(), "atlantis").is_empty());
        assert!(resolve_location(&fixture(), &table(), "").is_empty());
    }

    #[test]
    fn resolution_is_idempotent() {
        let outlets = fixture();
        let t = table();
        let first = resolve_location(&outlets, &t, "Bangsar");
        let second = resolve_location(&outlets, &t, "Bangsar");
        assert_eq!(first, second);
    }

    #[test]
    fn results_deduplicate_and_cap() {
        let mut outlets = Vec::new();
        for id in 0..30 {
            outlets.push(outlet(id, "Central Outlet", "Jalan Central", "Central City", ""));
        }
        let ids = resolve_location(&outlets, &table(), "central");
        assert_eq!(ids.len(), MAX_RESULTS);
        let mut sorted = ids.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len(), "no duplicate ids");
    }
}
