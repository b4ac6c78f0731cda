use axum::{extract::Query, extract::State, Extension, Json};
use ohdb_core::{DaySet, Outlet, Weekday};
use ohdb_engine::{
    compound_search, find_extremal, outlets_by_closing_time, outlets_by_opening_time,
    outlets_matching, parse_time_phrase, resolve_location, CompoundOptions, ExtremalAttribute,
    ParseContext, ScheduleField,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta, SearchData};

fn parse_context(state: &AppState, day: Option<Weekday>, weekend: Option<bool>) -> ParseContext {
    let mut ctx = ParseContext::local().with_day(day).with_weekend(weekend);
    ctx.bare_before_field = if state.bare_before_is_closing {
        ScheduleField::Close
    } else {
        ScheduleField::Open
    };
    ctx
}

fn parse_day_param(
    day: Option<&str>,
    req_id: &str,
) -> Result<Option<Weekday>, ApiError> {
    match day {
        None => Ok(None),
        Some(raw) => Weekday::from_name(&raw.to_lowercase()).map(Some).ok_or_else(|| {
            ApiError::new(
                req_id.to_string(),
                "validation_error",
                format!("unknown day '{raw}'; expected monday..sunday"),
            )
        }),
    }
}

fn parse_attribute(raw: &str, req_id: &str) -> Result<ExtremalAttribute, ApiError> {
    ExtremalAttribute::from_wire(raw).ok_or_else(|| {
        ApiError::new(
            req_id.to_string(),
            "validation_error",
            format!(
                "unknown attribute '{raw}'; expected earliest_opening, latest_opening, \
                 earliest_closing, or latest_closing"
            ),
        )
    })
}

fn owned(outlets: Vec<&Outlet>) -> Vec<Outlet> {
    outlets.into_iter().cloned().collect()
}

fn by_ids(outlets: &[Outlet], ids: &[i64]) -> Vec<Outlet> {
    ids.iter()
        .filter_map(|id| outlets.iter().find(|o| o.id == *id).cloned())
        .collect()
}

#[derive(Debug, Deserialize)]
pub(super) struct LocationParams {
    q: String,
}

pub(super) async fn by_location(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<LocationParams>,
) -> Result<Json<ApiResponse<SearchData>>, ApiError> {
    let outlets = ohdb_db::list_outlets(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let ids = resolve_location(&outlets, &state.areas, &params.q);
    let found = by_ids(&outlets, &ids);
    let message = if found.is_empty() {
        format!("No outlets found matching '{}'", params.q)
    } else {
        format!("Found {} outlets matching '{}'", found.len(), params.q)
    };

    Ok(Json(ApiResponse {
        data: SearchData::new(message, found),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAtParams {
    time: String,
    day: Option<String>,
    weekend: Option<bool>,
}

pub(super) async fn open_at(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<OpenAtParams>,
) -> Result<Json<ApiResponse<SearchData>>, ApiError> {
    let day = parse_day_param(params.day.as_deref(), &req_id.0)?;
    let outlets = ohdb_db::list_outlets_with_schedule(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let ctx = parse_context(&state, day, params.weekend);
    let data = match parse_time_phrase(&params.time, &ctx) {
        Some(pred) => {
            let found = owned(outlets_matching(&outlets, &pred));
            let message = if found.is_empty() {
                format!("No outlets open at '{}'", params.time)
            } else {
                format!("Found {} outlets open at '{}'", found.len(), params.time)
            };
            SearchData::new(message, found)
        }
        None => SearchData::new(
            format!("Could not understand the time '{}'", params.time),
            Vec::new(),
        ),
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct HoursLookupParams {
    time: String,
    weekend: Option<bool>,
}

pub(super) async fn by_opening_time(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<HoursLookupParams>,
) -> Result<Json<ApiResponse<SearchData>>, ApiError> {
    let outlets = ohdb_db::list_outlets_with_schedule(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let days = DaySet::from_weekend_flag(params.weekend.unwrap_or(false));
    let found = owned(outlets_by_opening_time(&outlets, &params.time, days));
    let message = if found.is_empty() {
        format!(
            "No outlets opening '{}' on a {}",
            params.time,
            days.label()
        )
    } else {
        format!(
            "Found {} outlets opening '{}' on a {}",
            found.len(),
            params.time,
            days.label()
        )
    };

    Ok(Json(ApiResponse {
        data: SearchData::new(message, found),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn by_closing_time(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<HoursLookupParams>,
) -> Result<Json<ApiResponse<SearchData>>, ApiError> {
    let outlets = ohdb_db::list_outlets_with_schedule(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let days = DaySet::from_weekend_flag(params.weekend.unwrap_or(false));
    let found = owned(outlets_by_closing_time(&outlets, &params.time, days));
    let message = if found.is_empty() {
        format!(
            "No outlets closing '{}' on a {}",
            params.time,
            days.label()
        )
    } else {
        format!(
            "Found {} outlets closing '{}' on a {}",
            found.len(),
            params.time,
            days.label()
        )
    };

    Ok(Json(ApiResponse {
        data: SearchData::new(message, found),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct CompoundParams {
    location: String,
    time: Option<String>,
    weekend: Option<bool>,
}

pub(super) async fn compound(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<CompoundParams>,
) -> Result<Json<ApiResponse<SearchData>>, ApiError> {
    let outlets = ohdb_db::list_outlets(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let ctx = parse_context(&state, None, params.weekend);
    let opts = CompoundOptions {
        bare_before_is_closing: state.bare_before_is_closing,
    };
    let found = owned(compound_search(
        &outlets,
        &state.areas,
        &params.location,
        params.time.as_deref(),
        &ctx,
        &opts,
    ));

    let message = match (&params.time, found.is_empty()) {
        (Some(time), true) => format!(
            "No outlets in '{}' matching '{}'",
            params.location, time
        ),
        (Some(time), false) => format!(
            "Found {} outlets in '{}' matching '{}'",
            found.len(),
            params.location,
            time
        ),
        (None, true) => format!("No outlets found in '{}'", params.location),
        (None, false) => format!("Found {} outlets in '{}'", found.len(), params.location),
    };

    Ok(Json(ApiResponse {
        data: SearchData::new(message, found),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct ExtremalParams {
    attribute: String,
    weekend: Option<bool>,
}

/// Extremal payload: the search payload plus the extreme value itself.
#[derive(Debug, Serialize)]
pub(super) struct ExtremalData {
    pub message: String,
    pub count: usize,
    pub day_type: &'static str,
    pub attribute: &'static str,
    pub time: String,
    pub outlets: Vec<Outlet>,
}

pub(super) async fn extremal(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ExtremalParams>,
) -> Result<Json<ApiResponse<ExtremalData>>, ApiError> {
    let attr = parse_attribute(&params.attribute, &req_id.0)?;
    let outlets = ohdb_db::list_outlets_with_schedule(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let days = DaySet::from_weekend_flag(params.weekend.unwrap_or(false));
    let result = find_extremal(&outlets, attr, days);
    let time = result.display_value();
    let found = owned(result.outlets);

    let message = if found.is_empty() {
        format!("No outlets {} on a {}", attr.describe(), days.label())
    } else {
        format!(
            "Found {} outlets that {} at {} on a {}",
            found.len(),
            attr.describe(),
            time,
            days.label()
        )
    };

    Ok(Json(ApiResponse {
        data: ExtremalData {
            message,
            count: found.len(),
            day_type: days.label(),
            attribute: attr.as_wire(),
            time,
            outlets: found,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct ExtremalInLocationParams {
    location: String,
    attribute: String,
    weekend: Option<bool>,
}

pub(super) async fn extremal_in_location(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ExtremalInLocationParams>,
) -> Result<Json<ApiResponse<ExtremalData>>, ApiError> {
    let attr = parse_attribute(&params.attribute, &req_id.0)?;
    let outlets = ohdb_db::list_outlets(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let days = DaySet::from_weekend_flag(params.weekend.unwrap_or(false));
    let location_ids = resolve_location(&outlets, &state.areas, &params.location);
    let in_location = by_ids(&outlets, &location_ids);

    let result = find_extremal(&in_location, attr, days);
    let time = result.display_value();
    let found = owned(result.outlets);

    let message = if location_ids.is_empty() {
        format!("No outlets found in '{}'", params.location)
    } else if found.is_empty() {
        format!(
            "No outlets in '{}' {} on a {}",
            params.location,
            attr.describe(),
            days.label()
        )
    } else {
        format!(
            "Found {} outlets in '{}' that {} at {} on a {}",
            found.len(),
            params.location,
            attr.describe(),
            time,
            days.label()
        )
    };

    Ok(Json(ApiResponse {
        data: ExtremalData {
            message,
            count: found.len(),
            day_type: days.label(),
            attribute: attr.as_wire(),
            time,
            outlets: found,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
