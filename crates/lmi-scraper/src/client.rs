//! HTTP client for the Apify actor API.
//!
//! A scrape is three calls: start an actor run, wait for it to reach a
//! terminal status, then read the run's default dataset. Starting a run is
//! never retried since a retry could launch a second billed job. Polling and
//! dataset reads are idempotent and go through [`retry_with_backoff`].

use std::time::Duration;

use lmi_core::{retry_with_backoff, AppConfig, RetryPolicy, ScrapeProvider, ScrapeRequest};
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;
use tokio::time::Instant;

use crate::error::ApifyError;
use crate::types::{ActorRun, RunEnvelope, RunStatus};

const DEFAULT_BASE_URL: &str = "https://api.apify.com";
const DEFAULT_ACTOR: &str = "apify~google-maps-scraper";
const DEFAULT_USER_AGENT: &str = "lmi/0.1 (local-market-intelligence)";
/// Longest server-side wait Apify honours for `waitForFinish`.
const MAX_WAIT_FOR_FINISH_SECS: u64 = 60;
const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_mins(5);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Client for the Apify REST API v2.
///
/// Use [`ApifyClient::new`] for production, [`ApifyClient::from_config`] for
/// the binaries, or [`ApifyClient::with_base_url`] to point at a mock server
/// in tests.
#[derive(Clone)]
pub struct ApifyClient {
    client: Client,
    token: String,
    base_url: Url,
    actor: String,
    job_timeout: Duration,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ApifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApifyClient")
            .field("token", &"[redacted]")
            .field("base_url", &self.base_url.as_str())
            .field("actor", &self.actor)
            .field("job_timeout", &self.job_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ApifyClient {
    /// Creates a client pointed at the production Apify API.
    ///
    /// # Errors
    ///
    /// Returns [`ApifyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(token: &str, timeout_secs: u64) -> Result<Self, ApifyError> {
        Self::with_base_url(token, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ApifyError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`ApifyError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        token: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, ApifyError> {
        Self::build(token, timeout_secs, base_url, DEFAULT_USER_AGENT)
    }

    /// Builds a client from the resolved application config.
    ///
    /// # Errors
    ///
    /// Returns [`ApifyError::MissingToken`] when `APIFY_TOKEN` is unset, or
    /// any error from client construction.
    pub fn from_config(config: &AppConfig) -> Result<Self, ApifyError> {
        let token = config
            .apify_token
            .as_deref()
            .ok_or(ApifyError::MissingToken)?;
        let client = Self::build(
            token,
            config.request_timeout_secs,
            &config.apify_base_url,
            &config.user_agent,
        )?
        .with_actor(&config.apify_actor)
        .with_job_timeout(Duration::from_secs(config.scrape_job_timeout_secs))
        .with_retry_policy(RetryPolicy::new(
            config.max_retries,
            config.retry_backoff_base_ms,
        ));
        Ok(client)
    }

    fn build(
        token: &str,
        timeout_secs: u64,
        base_url: &str,
        user_agent: &str,
    ) -> Result<Self, ApifyError> {
        // The per-request timeout must outlast the server-side waitForFinish.
        let timeout_secs = timeout_secs.max(MAX_WAIT_FOR_FINISH_SECS + 10);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| ApifyError::InvalidBaseUrl(format!("'{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApifyError::InvalidBaseUrl(format!(
                "'{base_url}' cannot be a base"
            )));
        }

        Ok(Self {
            client,
            token: token.to_owned(),
            base_url,
            actor: DEFAULT_ACTOR.to_owned(),
            job_timeout: DEFAULT_JOB_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::new(2, 1_000),
        })
    }

    /// Actor ID in `username~actor-name` form.
    #[must_use]
    pub fn with_actor(mut self, actor: &str) -> Self {
        actor.clone_into(&mut self.actor);
        self
    }

    #[must_use]
    pub fn with_job_timeout(mut self, job_timeout: Duration) -> Self {
        self.job_timeout = job_timeout;
        self
    }

    /// Client-side pause between polls that return a still-pending run.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Starts an actor run for `request`. Not retried.
    ///
    /// # Errors
    ///
    /// Returns [`ApifyError`] for transport failures, non-2xx statuses, or an
    /// unparseable run envelope.
    pub async fn start_run(&self, request: &ScrapeRequest) -> Result<ActorRun, ApifyError> {
        let mut url = self.endpoint(&["v2", "acts", &self.actor, "runs"]);
        let wait = wait_secs(self.job_timeout).to_string();
        url.query_pairs_mut().append_pair("waitForFinish", &wait);

        let input = serde_json::json!({
            "searchStringsArray": [request.search_query],
            "maxCrawledPlacesPerSearch": request.max_results,
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&input)
            .send()
            .await?;
        let body = success_body(response).await?;
        let run = parse_run(&body, "start actor run")?;

        tracing::info!(
            run_id = %run.id,
            status = %run.status,
            actor = %self.actor,
            search = %request.search_query,
            "started Apify actor run"
        );
        Ok(run)
    }

    /// Fetches the current state of a run, waiting server-side for up to
    /// `wait_secs` for it to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ApifyError`] once retries of transient failures are
    /// exhausted, or on the first non-transient failure.
    pub async fn get_run(&self, run_id: &str, wait_secs: u64) -> Result<ActorRun, ApifyError> {
        let mut url = self.endpoint(&["v2", "actor-runs", run_id]);
        let wait = wait_secs.to_string();
        url.query_pairs_mut().append_pair("waitForFinish", &wait);

        retry_with_backoff(self.retry, "apify get run", || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url)
                    .bearer_auth(&self.token)
                    .send()
                    .await?;
                let body = success_body(response).await?;
                parse_run(&body, "get actor run")
            }
        })
        .await
    }

    /// Polls `run` until it reaches a terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`ApifyError::JobTimeout`] when the run is still pending after
    /// the configured job timeout, [`ApifyError::RunFailed`] when it ends in
    /// any status other than `SUCCEEDED`, or a transport error from polling.
    pub async fn wait_for_run(&self, run: ActorRun) -> Result<ActorRun, ApifyError> {
        let started = Instant::now();
        let mut run = run;

        while run.status.is_pending() {
            let elapsed = started.elapsed();
            if elapsed >= self.job_timeout {
                return Err(ApifyError::JobTimeout {
                    run_id: run.id,
                    waited_secs: elapsed.as_secs(),
                });
            }
            let remaining = self.job_timeout.saturating_sub(elapsed);
            tracing::debug!(
                run_id = %run.id,
                status = %run.status,
                remaining_secs = remaining.as_secs(),
                "waiting for Apify actor run"
            );
            let previous = run.id.clone();
            run = self.get_run(&previous, wait_secs(remaining)).await?;
            if run.status.is_pending() && !self.poll_interval.is_zero() {
                tokio::time::sleep(self.poll_interval.min(remaining)).await;
            }
        }

        if run.status == RunStatus::Succeeded {
            tracing::info!(
                run_id = %run.id,
                dataset_id = %run.default_dataset_id,
                "Apify actor run succeeded"
            );
            Ok(run)
        } else {
            Err(ApifyError::RunFailed {
                run_id: run.id,
                status: run.status,
                message: run.status_message,
            })
        }
    }

    /// Reads up to `limit` clean items from a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ApifyError`] once retries are exhausted, or
    /// [`ApifyError::Deserialize`] when the body is not a JSON array.
    pub async fn fetch_dataset_items(
        &self,
        dataset_id: &str,
        limit: u32,
    ) -> Result<Vec<Value>, ApifyError> {
        let mut url = self.endpoint(&["v2", "datasets", dataset_id, "items"]);
        url.query_pairs_mut()
            .append_pair("clean", "true")
            .append_pair("format", "json")
            .append_pair("limit", &limit.to_string());

        let items = retry_with_backoff(self.retry, "apify dataset items", || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url)
                    .bearer_auth(&self.token)
                    .send()
                    .await?;
                let body = success_body(response).await?;
                serde_json::from_str::<Vec<Value>>(&body).map_err(|e| ApifyError::Deserialize {
                    context: format!("dataset {dataset_id} items"),
                    source: e,
                })
            }
        })
        .await?;

        tracing::info!(dataset_id, items = items.len(), "fetched Apify dataset items");
        Ok(items)
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `build` rejects cannot-be-a-base URLs, so this branch always runs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

}

impl ScrapeProvider for ApifyClient {
    type Error = ApifyError;

    async fn fetch_places(&self, request: &ScrapeRequest) -> Result<Vec<Value>, ApifyError> {
        let run = self.start_run(request).await?;
        let run = self.wait_for_run(run).await?;
        self.fetch_dataset_items(&run.default_dataset_id, request.max_results)
            .await
    }
}

fn wait_secs(remaining: Duration) -> u64 {
    remaining.as_secs().min(MAX_WAIT_FOR_FINISH_SECS)
}

/// Maps non-2xx statuses to typed errors and returns the body text otherwise.
async fn success_body(response: Response) -> Result<String, ApifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.text().await?);
    }
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApifyError::Unauthorized {
            status: status.as_u16(),
        },
        StatusCode::PAYMENT_REQUIRED => ApifyError::QuotaExceeded,
        StatusCode::TOO_MANY_REQUESTS => ApifyError::RateLimited,
        _ => ApifyError::UnexpectedStatus {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        },
    })
}

fn parse_run(body: &str, context: &str) -> Result<ActorRun, ApifyError> {
    serde_json::from_str::<RunEnvelope>(body)
        .map(|envelope| envelope.data)
        .map_err(|e| ApifyError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> ApifyClient {
        ApifyClient::with_base_url("test-token", 30, base_url)
            .expect("client construction should not fail")
    }

    #[test]
    fn endpoint_appends_segments_to_root() {
        let client = test_client("https://api.apify.com/");
        let url = client.endpoint(&["v2", "acts", "apify~google-maps-scraper", "runs"]);
        assert_eq!(
            url.as_str(),
            "https://api.apify.com/v2/acts/apify~google-maps-scraper/runs"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let client = test_client("http://localhost:8080/proxy");
        let url = client.endpoint(&["v2", "datasets", "ds 1", "items"]);
        assert_eq!(url.as_str(), "http://localhost:8080/proxy/v2/datasets/ds%201/items");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ApifyClient::with_base_url("t", 30, "not a url").unwrap_err();
        assert!(matches!(err, ApifyError::InvalidBaseUrl(_)));
    }

    #[test]
    fn debug_output_redacts_token() {
        let rendered = format!("{:?}", test_client("https://api.apify.com"));
        assert!(rendered.contains("[redacted]"));
        assert!(!rendered.contains("test-token"));
    }

    #[test]
    fn wait_is_capped_at_apify_maximum() {
        assert_eq!(wait_secs(Duration::from_mins(5)), 60);
        assert_eq!(wait_secs(Duration::from_secs(12)), 12);
    }
}
