//! Chat entry point: classify the query's intent, then dispatch to the same
//! engine operations the dedicated endpoints use.

use axum::{extract::State, Extension, Json};
use ohdb_core::{DaySet, Outlet};
use ohdb_engine::{
    classify_with_rules, compound_search, find_extremal, nearest_outlets, outlets_by_closing_time,
    outlets_by_opening_time, outlets_matching, parse_time_phrase, resolve_intent, resolve_location,
    CompoundOptions, IntentAction, IntentAttribute, ParseContext, QueryIntent, ScheduleField,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ChatRequest {
    pub query: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ChatData {
    pub answer: String,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extreme_time: Option<String>,
    pub count: usize,
    pub outlets: Vec<Outlet>,
}

pub(super) async fn query(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatData>>, ApiError> {
    let outlets = ohdb_db::list_outlets(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let mut known_areas = ohdb_db::list_distinct_cities(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    known_areas.extend(state.areas.area_names());

    let rule_intent = classify_with_rules(&request.query, &known_areas);
    let nl_intent = match &state.nl {
        Some(client) => match client.extract_intent(&request.query, &known_areas).await {
            Ok(intent) => Some(intent.into_query_intent()),
            Err(e) => {
                tracing::warn!(error = %e, "nl-intent collaborator unavailable; using rules");
                None
            }
        },
        None => None,
    };
    let intent = resolve_intent(rule_intent, nl_intent);
    tracing::debug!(action = intent.action.as_wire(), "dispatching intent");

    let dispatch = run_intent(&state, &outlets, &intent, &request);

    Ok(Json(ApiResponse {
        data: ChatData {
            answer: dispatch.answer_override.unwrap_or_else(|| intent.answer.clone()),
            action: intent.action.as_wire(),
            location: intent.location.clone(),
            time: intent.time.clone(),
            attribute: intent.attribute.map(IntentAttribute::as_wire),
            extreme_time: dispatch.extreme_time,
            count: dispatch.outlets.len(),
            outlets: dispatch.outlets,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

struct Dispatch {
    outlets: Vec<Outlet>,
    extreme_time: Option<String>,
    answer_override: Option<String>,
}

impl Dispatch {
    fn of(outlets: Vec<Outlet>) -> Self {
        Self {
            outlets,
            extreme_time: None,
            answer_override: None,
        }
    }

    fn empty() -> Self {
        Self::of(Vec::new())
    }
}

fn run_intent(
    state: &AppState,
    outlets: &[Outlet],
    intent: &QueryIntent,
    request: &ChatRequest,
) -> Dispatch {
    let mut ctx = ParseContext::local();
    ctx.bare_before_field = if state.bare_before_is_closing {
        ScheduleField::Close
    } else {
        ScheduleField::Open
    };
    let opts = CompoundOptions {
        bare_before_is_closing: state.bare_before_is_closing,
    };
    let days = DaySet::class_of(ctx.today);

    let location = intent.location.as_deref();
    let time = intent.time.as_deref();

    match intent.action {
        IntentAction::SearchLocation => match location {
            Some(loc) => {
                let ids = resolve_location(outlets, &state.areas, loc);
                Dispatch::of(by_ids(outlets, &ids))
            }
            None => Dispatch::empty(),
        },
        IntentAction::TimeQuery | IntentAction::CompoundQuery => match (location, time) {
            (Some(loc), time) => Dispatch::of(owned(compound_search(
                outlets,
                &state.areas,
                loc,
                time,
                &ctx,
                &opts,
            ))),
            (None, Some(t)) => match parse_time_phrase(t, &ctx) {
                Some(pred) => Dispatch::of(owned(outlets_matching(outlets, &pred))),
                None => Dispatch::empty(),
            },
            (None, None) => Dispatch::empty(),
        },
        IntentAction::OpeningTimeQuery => {
            let Some(t) = time else {
                return Dispatch::empty();
            };
            match location {
                Some(loc) => Dispatch::of(owned(compound_search(
                    outlets,
                    &state.areas,
                    loc,
                    Some(&format!("open {t}")),
                    &ctx,
                    &opts,
                ))),
                None => Dispatch::of(owned(outlets_by_opening_time(outlets, t, days))),
            }
        }
        IntentAction::ClosingTimeQuery => {
            let Some(t) = time else {
                return Dispatch::empty();
            };
            match location {
                Some(loc) => Dispatch::of(owned(compound_search(
                    outlets,
                    &state.areas,
                    loc,
                    Some(&format!("close {t}")),
                    &ctx,
                    &opts,
                ))),
                None => Dispatch::of(owned(outlets_by_closing_time(outlets, t, days))),
            }
        }
        IntentAction::StillOpenAfter | IntentAction::StillOpenBefore => {
            let Some(t) = time else {
                return Dispatch::empty();
            };
            let phrase = format!("still open {t}");
            match location {
                Some(loc) => Dispatch::of(owned(compound_search(
                    outlets,
                    &state.areas,
                    loc,
                    Some(&phrase),
                    &ctx,
                    &opts,
                ))),
                None => match parse_time_phrase(&phrase, &ctx) {
                    Some(pred) => Dispatch::of(owned(outlets_matching(outlets, &pred))),
                    None => Dispatch::empty(),
                },
            }
        }
        IntentAction::SpecialTimeInLocation => {
            let (Some(loc), Some(attribute)) = (location, intent.attribute) else {
                return Dispatch::empty();
            };
            let ids = resolve_location(outlets, &state.areas, loc);
            let in_location = by_ids(outlets, &ids);
            match attribute {
                IntentAttribute::Extremal(attr) => {
                    let result = find_extremal(&in_location, attr, days);
                    let extreme_time = result.value.map(|_| result.display_value());
                    Dispatch {
                        outlets: owned(result.outlets),
                        extreme_time,
                        answer_override: None,
                    }
                }
                IntentAttribute::TwentyFourHours => Dispatch::of(
                    in_location
                        .into_iter()
                        .filter(Outlet::always_open)
                        .collect(),
                ),
            }
        }
        IntentAction::GetAttribute => match intent.attribute {
            Some(IntentAttribute::Extremal(attr)) => {
                let result = find_extremal(outlets, attr, days);
                let extreme_time = result.value.map(|_| result.display_value());
                Dispatch {
                    outlets: owned(result.outlets),
                    extreme_time,
                    answer_override: None,
                }
            }
            Some(IntentAttribute::TwentyFourHours) => Dispatch::of(
                outlets
                    .iter()
                    .filter(|o| o.always_open())
                    .cloned()
                    .collect(),
            ),
            None => Dispatch::empty(),
        },
        IntentAction::GetNearest => match (request.lat, request.lon) {
            (Some(lat), Some(lon)) => Dispatch::of(
                nearest_outlets(outlets, lat, lon, 5)
                    .into_iter()
                    .map(|n| n.outlet.clone())
                    .collect(),
            ),
            _ => Dispatch {
                outlets: Vec::new(),
                extreme_time: None,
                answer_override: Some(
                    "Share your coordinates (lat, lon) and I can find the nearest outlets."
                        .to_string(),
                ),
            },
        },
        IntentAction::Unknown => Dispatch::empty(),
    }
}

fn owned(outlets: Vec<&Outlet>) -> Vec<Outlet> {
    outlets.into_iter().cloned().collect()
}

fn by_ids(outlets: &[Outlet], ids: &[i64]) -> Vec<Outlet> {
    ids.iter()
        .filter_map(|id| outlets.iter().find(|o| o.id == *id).cloned())
        .collect()
}
