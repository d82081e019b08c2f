//! HTTP client for the Gemini `generateContent` endpoint.

use std::time::Duration;

use lmi_core::{retry_with_backoff, AppConfig, InsightProvider, RetryPolicy};
use reqwest::{Client, Url};

use crate::error::InsightError;
use crate::types::{ErrorEnvelope, GenerateRequest, GenerateResponse};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_USER_AGENT: &str = "lmi/0.1 (local-market-intelligence)";

/// Client for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: Url,
    model: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns [`InsightError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, InsightError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`InsightError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`InsightError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, InsightError> {
        Self::build(api_key, timeout_secs, base_url, DEFAULT_USER_AGENT)
    }

    /// # Errors
    ///
    /// Returns [`InsightError::MissingApiKey`] when `GEMINI_API_KEY` is unset,
    /// or any error from client construction.
    pub fn from_config(config: &AppConfig) -> Result<Self, InsightError> {
        let api_key = config
            .gemini_api_key
            .as_deref()
            .ok_or(InsightError::MissingApiKey)?;
        Ok(Self::build(
            api_key,
            config.request_timeout_secs,
            &config.gemini_base_url,
            &config.user_agent,
        )?
        .with_model(&config.gemini_model)
        .with_retry_policy(RetryPolicy::new(
            config.max_retries,
            config.retry_backoff_base_ms,
        )))
    }

    fn build(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
        user_agent: &str,
    ) -> Result<Self, InsightError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| InsightError::InvalidBaseUrl(base_url.to_owned()))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            model: DEFAULT_MODEL.to_owned(),
            retry: RetryPolicy::new(2, 1_000),
        })
    }

    #[must_use]
    pub fn with_model(mut self, model: &str) -> Self {
        model.clone_into(&mut self.model);
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sends `prompt` and returns the generated text.
    ///
    /// # Errors
    ///
    /// - [`InsightError::Api`] for non-2xx responses (after retrying 429 and
    ///   5xx per the retry policy).
    /// - [`InsightError::EmptyResponse`] when no candidate carries text.
    /// - [`InsightError::Http`] or [`InsightError::Deserialize`] otherwise.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, InsightError> {
        let url = self.generate_url();
        let body = GenerateRequest::from_prompt(prompt);

        let response = retry_with_backoff(self.retry, "gemini generateContent", || {
            let url = url.clone();
            let body = &body;
            async move {
                let response = self
                    .client
                    .post(url)
                    .header("x-goog-api-key", &self.api_key)
                    .json(body)
                    .send()
                    .await?;
                let status = response.status();
                let text = response.text().await?;
                if !status.is_success() {
                    return Err(InsightError::Api {
                        status: status.as_u16(),
                        message: api_error_message(&text),
                    });
                }
                serde_json::from_str::<GenerateResponse>(&text).map_err(|e| {
                    InsightError::Deserialize {
                        context: "generateContent response".to_owned(),
                        source: e,
                    }
                })
            }
        })
        .await?;

        let text = response.text().ok_or(InsightError::EmptyResponse)?;
        tracing::info!(
            model = %self.model,
            prompt_chars = prompt.len(),
            response_chars = text.len(),
            "generated market narrative"
        );
        Ok(text)
    }

    fn generate_url(&self) -> Url {
        let action = format!("{}:generateContent", self.model);
        let mut url = self.base_url.clone();
        // `build` rejects cannot-be-a-base URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["v1beta", "models", action.as_str()]);
        }
        url
    }
}

impl InsightProvider for GeminiClient {
    type Error = InsightError;

    async fn generate(&self, prompt: &str) -> Result<String, InsightError> {
        self.generate_text(prompt).await
    }
}

/// Message from a Google error body, or the raw body when it has another
/// shape.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) => format!("{status}: {}", envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) => body.trim().to_owned(),
    }
}
