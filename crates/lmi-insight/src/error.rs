use lmi_core::Transient;
use thiserror::Error;

/// Errors returned by the Gemini client.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid Gemini base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,

    /// Non-2xx response; `message` comes from the Google error body when
    /// one was present.
    #[error("Gemini API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Gemini returned no text")]
    EmptyResponse,
}

impl Transient for InsightError {
    fn is_transient(&self) -> bool {
        match self {
            InsightError::Http(e) => e.is_timeout() || e.is_connect(),
            InsightError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        let api = |status| InsightError::Api {
            status,
            message: String::new(),
        };
        assert!(api(429).is_transient());
        assert!(api(503).is_transient());
        assert!(!api(400).is_transient());
        assert!(!api(403).is_transient());
        assert!(!InsightError::EmptyResponse.is_transient());
    }
}
