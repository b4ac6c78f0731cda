pub mod app_config;
pub mod areas;
pub mod config;
pub mod model;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use areas::{load_areas, AreaTable, KeywordGroup, PostcodeArea, PostcodeRule};
pub use config::{load_app_config, load_app_config_from_env};
pub use model::{
    ClockTime, DayHours, DaySet, InvalidClockTime, Outlet, Weekday, WeeklySchedule,
    MINUTES_PER_DAY,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read areas file at {path}")]
    AreasFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse areas file")]
    AreasFileParse(#[source] serde_yaml::Error),
    #[error("invalid areas config: {0}")]
    Validation(String),
}
