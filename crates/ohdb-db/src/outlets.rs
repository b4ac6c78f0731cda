//! Read and seed operations for the `outlets` table.
//!
//! Reads are bulk: the query engine filters in-process, so the repository
//! only needs coarse selections (all rows, rows with hours, free-text
//! substring candidates).

use ohdb_core::{Outlet, WeeklySchedule};
use sqlx::PgPool;

const OUTLET_COLUMNS: &str = "id, name, address, street_address, district, city, postcode, \
     latitude, longitude, opening_hours, is_24_hours, hours_text";

/// A row from the `outlets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutletRow {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub street_address: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub opening_hours: Option<serde_json::Value>,
    pub is_24_hours: bool,
    pub hours_text: Option<String>,
}

impl OutletRow {
    /// Convert to the domain type, parsing the JSONB schedule.
    ///
    /// A malformed schedule is logged and treated as absent rather than
    /// failing the whole read — one bad ingested row must not take down
    /// every query.
    #[must_use]
    pub fn into_outlet(self) -> Outlet {
        let schedule = self.opening_hours.and_then(|value| {
            match serde_json::from_value::<WeeklySchedule>(value) {
                Ok(schedule) if schedule.is_empty() => None,
                Ok(schedule) => Some(schedule),
                Err(e) => {
                    tracing::warn!(outlet_id = self.id, error = %e, "unparseable opening_hours; ignoring");
                    None
                }
            }
        });

        Outlet {
            id: self.id,
            name: self.name,
            address: self.address,
            street_address: self.street_address,
            district: self.district,
            city: self.city,
            postcode: self.postcode,
            latitude: self.latitude,
            longitude: self.longitude,
            schedule,
            is_24_hours: self.is_24_hours,
            hours_text: self.hours_text,
        }
    }
}

/// Input record for inserting/upserting an outlet (used by the seed path).
#[derive(Debug, Clone)]
pub struct NewOutlet {
    pub name: String,
    pub address: String,
    pub street_address: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub schedule: Option<WeeklySchedule>,
    pub is_24_hours: bool,
    pub hours_text: Option<String>,
}

/// Read every outlet, ordered by id.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_outlets(pool: &PgPool) -> Result<Vec<Outlet>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OutletRow>(&format!(
        "SELECT {OUTLET_COLUMNS} FROM outlets ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(OutletRow::into_outlet).collect())
}

/// Read outlets that have any hours information: a parsed schedule, the
/// 24-hour flag, or a 24-marker in the raw hours text.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_outlets_with_schedule(pool: &PgPool) -> Result<Vec<Outlet>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OutletRow>(&format!(
        "SELECT {OUTLET_COLUMNS} FROM outlets \
         WHERE opening_hours IS NOT NULL \
            OR is_24_hours = TRUE \
            OR hours_text ILIKE '%24%' \
         ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(OutletRow::into_outlet).collect())
}

/// Read outlets whose address, city, district, street, or name contains the
/// given text (case-insensitive).
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn search_outlets_by_text(pool: &PgPool, text: &str) -> Result<Vec<Outlet>, sqlx::Error> {
    let pattern = format!("%{text}%");
    let rows = sqlx::query_as::<_, OutletRow>(&format!(
        "SELECT {OUTLET_COLUMNS} FROM outlets \
         WHERE city ILIKE $1 \
            OR district ILIKE $1 \
            OR address ILIKE $1 \
            OR street_address ILIKE $1 \
            OR name ILIKE $1 \
         ORDER BY id"
    ))
    .bind(pattern)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(OutletRow::into_outlet).collect())
}

/// Distinct non-empty city names, used as known areas for intent extraction.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_distinct_cities(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT city FROM outlets \
         WHERE city IS NOT NULL AND city != '' \
         ORDER BY city",
    )
    .fetch_all(pool)
    .await
}

/// Insert or update one outlet keyed by (name, address). Returns its id.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the statement fails or the schedule cannot be
/// serialized.
pub async fn upsert_outlet(pool: &PgPool, outlet: &NewOutlet) -> Result<i64, sqlx::Error> {
    let opening_hours = outlet
        .schedule
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query_scalar::<_, i64>(
        "INSERT INTO outlets \
            (name, address, street_address, district, city, postcode, \
             latitude, longitude, opening_hours, is_24_hours, hours_text) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (name, address) DO UPDATE SET \
            street_address = EXCLUDED.street_address, \
            district = EXCLUDED.district, \
            city = EXCLUDED.city, \
            postcode = EXCLUDED.postcode, \
            latitude = EXCLUDED.latitude, \
            longitude = EXCLUDED.longitude, \
            opening_hours = EXCLUDED.opening_hours, \
            is_24_hours = EXCLUDED.is_24_hours, \
            hours_text = EXCLUDED.hours_text, \
            updated_at = NOW() \
         RETURNING id",
    )
    .bind(&outlet.name)
    .bind(&outlet.address)
    .bind(&outlet.street_address)
    .bind(&outlet.district)
    .bind(&outlet.city)
    .bind(&outlet.postcode)
    .bind(outlet.latitude)
    .bind(outlet.longitude)
    .bind(opening_hours)
    .bind(outlet.is_24_hours)
    .bind(&outlet.hours_text)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ohdb_core::{ClockTime, DayHours, Weekday};

    fn row(opening_hours: Option<serde_json::Value>) -> OutletRow {
        OutletRow {
            id: 7,
            name: "Outlet".to_string(),
            address: "1 Jalan Test".to_string(),
            street_address: None,
            district: None,
            city: Some("Kuala Lumpur".to_string()),
            postcode: Some("50000".to_string()),
            latitude: None,
            longitude: None,
            opening_hours,
            is_24_hours: false,
            hours_text: None,
        }
    }

    #[test]
    fn into_outlet_parses_schedule_minutes() {
        let outlet = row(Some(serde_json::json!({
            "monday": {"open": 480, "close": 1320}
        })))
        .into_outlet();
        let schedule = outlet.schedule.expect("schedule present");
        assert_eq!(
            schedule.hours(Weekday::Monday),
            Some(DayHours {
                open: ClockTime::from_hm(8, 0).unwrap(),
                close: ClockTime::from_hm(22, 0).unwrap(),
            })
        );
    }

    #[test]
    fn into_outlet_drops_malformed_schedule() {
        let outlet = row(Some(serde_json::json!({"monday": {"open": "eight"}}))).into_outlet();
        assert!(outlet.schedule.is_none());
    }

    #[test]
    fn into_outlet_drops_empty_schedule() {
        let outlet = row(Some(serde_json::json!({}))).into_outlet();
        assert!(outlet.schedule.is_none());
    }
}
