//! Shared domain types, configuration, and provider seams for the local
//! market intelligence workspace.

pub mod app_config;
pub mod config;
pub mod error;
pub mod field_map;
pub mod provider;
pub mod records;
pub mod retry;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use field_map::{load_field_map, FieldMap};
pub use provider::{InsightProvider, ScrapeProvider};
pub use records::{
    BusinessRecord, GeoPoint, RatingClass, ScrapeRequest, SearchQuery, MAX_RESULTS_LIMIT,
};
pub use retry::{retry_with_backoff, RetryPolicy, Transient};
