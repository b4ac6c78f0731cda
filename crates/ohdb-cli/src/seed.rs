//! Seed the outlets table from a JSON fixture.
//!
//! The fixture is a JSON array of outlet records; `opening_hours` uses the
//! same integer-minutes shape as the stored JSONB column. This stands in for
//! the out-of-scope scraping pipeline.

use std::path::Path;

use anyhow::Context;
use ohdb_core::WeeklySchedule;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct OutletSeed {
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    street_address: Option<String>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    postcode: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    opening_hours: Option<WeeklySchedule>,
    #[serde(default)]
    is_24_hours: bool,
    #[serde(default)]
    hours_text: Option<String>,
}

impl OutletSeed {
    fn into_new_outlet(self) -> ohdb_db::NewOutlet {
        ohdb_db::NewOutlet {
            name: self.name,
            address: self.address,
            street_address: self.street_address,
            district: self.district,
            city: self.city,
            postcode: self.postcode,
            latitude: self.latitude,
            longitude: self.longitude,
            schedule: self.opening_hours.filter(|s| !s.is_empty()),
            is_24_hours: self.is_24_hours,
            hours_text: self.hours_text,
        }
    }
}

pub async fn run(file: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("reading fixture {}", file.display()))?;
    let seeds: Vec<OutletSeed> =
        serde_json::from_str(&content).context("parsing outlet fixture JSON")?;

    let pool = ohdb_db::connect_pool_from_env().await?;
    ohdb_db::run_migrations(&pool).await?;

    let mut upserted = 0usize;
    for seed in seeds {
        let outlet = seed.into_new_outlet();
        ohdb_db::upsert_outlet(&pool, &outlet)
            .await
            .with_context(|| format!("upserting outlet '{}'", outlet.name))?;
        upserted += 1;
    }

    println!("seeded {upserted} outlets from {}", file.display());
    Ok(())
}
