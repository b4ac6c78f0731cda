use axum::{extract::Query, extract::State, Extension, Json};
use ohdb_core::Outlet;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta, SearchData};

#[derive(Debug, Deserialize)]
pub(super) struct ListParams {
    /// Optional free-text filter across address/city/district/name.
    q: Option<String>,
}

pub(super) async fn list_all(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<Outlet>>>, ApiError> {
    let outlets = match params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => ohdb_db::search_outlets_by_text(&state.pool, q).await,
        None => ohdb_db::list_outlets(&state.pool).await,
    }
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: outlets,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_24_hours(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SearchData>>, ApiError> {
    let outlets = ohdb_db::list_outlets(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let open_all_day: Vec<Outlet> = outlets.into_iter().filter(Outlet::always_open).collect();
    let message = if open_all_day.is_empty() {
        "No 24-hour outlets found".to_string()
    } else {
        format!("Found {} outlets open 24 hours", open_all_day.len())
    };

    Ok(Json(ApiResponse {
        data: SearchData::new(message, open_all_day),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct NearestParams {
    lat: f64,
    lon: f64,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct NearestItem {
    pub distance_km: Option<f64>,
    #[serde(flatten)]
    pub outlet: Outlet,
}

pub(super) async fn list_nearest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<NearestParams>,
) -> Result<Json<ApiResponse<Vec<NearestItem>>>, ApiError> {
    let outlets = ohdb_db::list_outlets(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let limit = params.limit.unwrap_or(5).clamp(1, 50);
    let data = ohdb_engine::nearest_outlets(&outlets, params.lat, params.lon, limit)
        .into_iter()
        .map(|n| NearestItem {
            distance_km: n.distance_km,
            outlet: n.outlet.clone(),
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
