//! Terminal entry point for natural-language queries.
//!
//! Uses the rule cascade only — the optional NL collaborator is a server
//! concern; the engine is fully functional without it.

use ohdb_core::{DaySet, Outlet};
use ohdb_engine::{
    classify_with_rules, compound_search, find_extremal, outlets_by_closing_time,
    outlets_by_opening_time, outlets_matching, parse_time_phrase, resolve_location,
    CompoundOptions, IntentAction, IntentAttribute, ParseContext, QueryIntent,
};

pub async fn run(text: &str) -> anyhow::Result<()> {
    let config = ohdb_core::load_app_config()?;
    let areas = ohdb_core::load_areas(&config.areas_path)?;

    let pool = ohdb_db::connect_pool_from_env().await?;
    let outlets = ohdb_db::list_outlets(&pool).await?;
    let mut known_areas = ohdb_db::list_distinct_cities(&pool).await?;
    known_areas.extend(areas.area_names());

    let intent = classify_with_rules(text, &known_areas);
    println!("{}", intent.answer);

    let ctx = ParseContext::local();
    let opts = CompoundOptions {
        bare_before_is_closing: config.bare_before_is_closing,
    };
    let found = dispatch(&outlets, &areas, &intent, &ctx, &opts);

    if found.is_empty() {
        println!("(no matching outlets)");
    } else {
        println!("{} matching outlets:", found.len());
        for outlet in found {
            print_outlet(outlet);
        }
    }
    Ok(())
}

fn dispatch<'a>(
    outlets: &'a [Outlet],
    areas: &ohdb_core::AreaTable,
    intent: &QueryIntent,
    ctx: &ParseContext,
    opts: &CompoundOptions,
) -> Vec<&'a Outlet> {
    let days = DaySet::class_of(ctx.today);
    let location = intent.location.as_deref();
    let time = intent.time.as_deref();

    match intent.action {
        IntentAction::SearchLocation | IntentAction::TimeQuery | IntentAction::CompoundQuery => {
            match (location, time) {
                (Some(loc), time) => compound_search(outlets, areas, loc, time, ctx, opts),
                (None, Some(t)) => parse_time_phrase(t, ctx)
                    .map(|pred| outlets_matching(outlets, &pred))
                    .unwrap_or_default(),
                (None, None) => Vec::new(),
            }
        }
        IntentAction::OpeningTimeQuery => time
            .map(|t| outlets_by_opening_time(outlets, t, days))
            .unwrap_or_default(),
        IntentAction::ClosingTimeQuery => time
            .map(|t| outlets_by_closing_time(outlets, t, days))
            .unwrap_or_default(),
        IntentAction::StillOpenAfter | IntentAction::StillOpenBefore => time
            .and_then(|t| parse_time_phrase(&format!("still open {t}"), ctx))
            .map(|pred| outlets_matching(outlets, &pred))
            .unwrap_or_default(),
        IntentAction::SpecialTimeInLocation | IntentAction::GetAttribute => {
            let scoped: Vec<&Outlet> = match location {
                Some(loc) => {
                    let ids = resolve_location(outlets, areas, loc);
                    outlets.iter().filter(|o| ids.contains(&o.id)).collect()
                }
                None => outlets.iter().collect(),
            };
            match intent.attribute {
                Some(IntentAttribute::Extremal(attr)) => {
                    let owned: Vec<Outlet> = scoped.into_iter().cloned().collect();
                    let result = find_extremal(&owned, attr, days);
                    println!("extreme value: {}", result.display_value());
                    let ids: Vec<i64> = result.outlets.iter().map(|o| o.id).collect();
                    outlets.iter().filter(|o| ids.contains(&o.id)).collect()
                }
                Some(IntentAttribute::TwentyFourHours) => {
                    scoped.into_iter().filter(|o| o.always_open()).collect()
                }
                None => Vec::new(),
            }
        }
        IntentAction::GetNearest | IntentAction::Unknown => Vec::new(),
    }
}

fn print_outlet(outlet: &Outlet) {
    let city = outlet.city.as_deref().unwrap_or("-");
    let hours = outlet.hours_text.as_deref().unwrap_or("-");
    println!("  [{}] {} | {} | {}", outlet.id, outlet.name, city, hours);
}
