use thiserror::Error;

/// Failures surfaced to the user by a search or an offline analysis run.
///
/// Per-record problems are not represented here; see
/// [`crate::normalize::MalformedRecord`].
#[derive(Debug, Error)]
pub enum SearchError {
    /// One or more required query fields are missing. No provider was called.
    #[error("invalid search: {}", .0.join("; "))]
    InputValidation(Vec<String>),

    /// The scrape provider returned zero records.
    #[error("no businesses found for this search")]
    EmptyResult,

    /// A provider call failed; `message` is the provider's own error text.
    #[error("{provider} provider error: {message}")]
    ExternalService {
        provider: &'static str,
        message: String,
    },

    /// The raw payload was not a list of records.
    #[error("invalid raw payload: {0}")]
    InvalidPayload(String),
}
