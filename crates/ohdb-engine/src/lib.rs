//! Temporal/location query resolution over outlet schedules.
//!
//! Pure, synchronous logic over in-memory outlet slices: time-phrase
//! parsing, interval evaluation (including overnight wrap-around), fuzzy
//! location resolution, extremal (earliest/latest) queries, and compound
//! composition. The one async piece is the optional NL-intent client, which
//! always has the rule cascade as a deterministic fallback.

pub mod compound;
pub mod extremal;
pub mod geo;
pub mod intent;
pub mod interval;
pub mod location;
pub mod nl;
pub mod timeparse;

pub use compound::{compound_search, CompoundOptions};
pub use extremal::{find_extremal, ExtremalAttribute, ExtremalResult, ExtremeValue};
pub use geo::{haversine_km, nearest_outlets, NearbyOutlet};
pub use intent::{classify_with_rules, resolve_intent, IntentAction, IntentAttribute, QueryIntent};
pub use interval::{
    outlet_matches, outlets_by_closing_time, outlets_by_opening_time, outlets_matching,
};
pub use location::{resolve_location, MAX_RESULTS};
pub use nl::{NlError, NlIntent, NlIntentClient};
pub use timeparse::{
    convert_12h, parse_time_phrase, CompareMode, ParseContext, ScheduleField, TimePredicate,
};
