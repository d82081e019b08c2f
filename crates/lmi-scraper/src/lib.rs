//! Apify REST API v2 client for the Google Maps scraper actor.

pub mod client;
pub mod error;
pub mod types;

pub use client::ApifyClient;
pub use error::ApifyError;
pub use types::{ActorRun, RunStatus};
