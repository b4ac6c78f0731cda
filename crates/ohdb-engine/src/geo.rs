//! Great-circle distance and k-nearest outlet selection.

use ohdb_core::Outlet;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinates, in kilometres.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// An outlet with its distance from the query point. `distance_km` is `None`
/// when the outlet has no stored coordinates.
#[derive(Debug)]
pub struct NearbyOutlet<'a> {
    pub outlet: &'a Outlet,
    pub distance_km: Option<f64>,
}

/// The `limit` outlets nearest to (`lat`, `lon`). Outlets without
/// coordinates sort after every located outlet.
#[must_use]
pub fn nearest_outlets(outlets: &[Outlet], lat: f64, lon: f64, limit: usize) -> Vec<NearbyOutlet<'_>> {
    let mut nearby: Vec<NearbyOutlet<'_>> = outlets
        .iter()
        .map(|outlet| {
            let distance_km = match (outlet.latitude, outlet.longitude) {
                (Some(o_lat), Some(o_lon)) => Some(haversine_km(lat, lon, o_lat, o_lon)),
                _ => None,
            };
            NearbyOutlet {
                outlet,
                distance_km,
            }
        })
        .collect();

    nearby.sort_by(|a, b| {
        a.distance_km
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.distance_km.unwrap_or(f64::INFINITY))
    });
    nearby.truncate(limit);
    nearby
}
