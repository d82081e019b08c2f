//! Seams for the two external collaborators: the scrape provider that
//! returns raw listings, and the optional narrative provider.

use std::future::Future;

use crate::records::ScrapeRequest;

/// Runs a scrape job and returns its raw records once the job has finished.
///
/// Records are returned exactly as the provider emits them; normalization is
/// the caller's job. An empty `Vec` is a valid, successful result.
pub trait ScrapeProvider: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_places(
        &self,
        request: &ScrapeRequest,
    ) -> impl Future<Output = Result<Vec<serde_json::Value>, Self::Error>> + Send;
}

/// Produces free-text commentary for a prompt.
pub trait InsightProvider: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, Self::Error>> + Send;
}
