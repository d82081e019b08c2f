use lmi_core::Transient;
use thiserror::Error;

use crate::types::RunStatus;

/// Errors returned by the Apify client.
#[derive(Debug, Error)]
pub enum ApifyError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid Apify base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("APIFY_TOKEN is not configured")]
    MissingToken,

    #[error("Apify rejected the token (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("Apify account quota exceeded")]
    QuotaExceeded,

    #[error("rate limited by Apify")]
    RateLimited,

    #[error("unexpected HTTP status {status} from Apify: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("actor run {run_id} finished with status {status}{}", detail(.message.as_deref()))]
    RunFailed {
        run_id: String,
        status: RunStatus,
        message: Option<String>,
    },

    #[error("actor run {run_id} did not finish within {waited_secs}s")]
    JobTimeout { run_id: String, waited_secs: u64 },
}

fn detail(message: Option<&str>) -> String {
    message.map(|m| format!(": {m}")).unwrap_or_default()
}

impl Transient for ApifyError {
    fn is_transient(&self) -> bool {
        match self {
            ApifyError::Http(e) => e.is_timeout() || e.is_connect(),
            ApifyError::RateLimited => true,
            ApifyError::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
