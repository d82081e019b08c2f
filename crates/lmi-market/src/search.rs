//! Search orchestration.
//!
//! `validate -> scrape -> normalize -> snapshot -> map view -> narrative`.
//! Only the scrape step can fail after validation; a failed narrative is
//! reported on the outcome and never discards the analysis.

use lmi_core::{FieldMap, InsightProvider, ScrapeProvider, SearchQuery};
use serde::Serialize;
use serde_json::Value;

use crate::encode::MarkerScale;
use crate::error::SearchError;
use crate::map::MapView;
use crate::normalize::{normalize_records, records_from_payload};
use crate::prompt::insight_prompt;
use crate::snapshot::MarketSnapshot;

const DEFAULT_TOP_K: usize = 5;

/// Narrative commentary attached to a search outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum Narrative {
    /// No insight provider was supplied.
    NotRequested,
    /// A provider was supplied but there was nothing to describe.
    Skipped,
    Generated(String),
    /// The provider failed; carries its error text.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub snapshot: MarketSnapshot,
    /// `None` when no record survived normalization and filtering.
    pub map: Option<MapView>,
    pub narrative: Narrative,
}

/// Pipeline settings shared by every search.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub field_map: FieldMap,
    pub scale: MarkerScale,
    /// Length of `MarketMetrics::top_by_reviews`.
    pub top_k: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(FieldMap::default())
    }
}

impl Pipeline {
    #[must_use]
    pub fn new(field_map: FieldMap) -> Self {
        Self {
            field_map,
            scale: MarkerScale::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_scale(mut self, scale: MarkerScale) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Analyzes records that were already scraped. No provider is called.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InputValidation`] for an incomplete query and
    /// [`SearchError::EmptyResult`] when `raw` holds no records.
    pub fn analyze(&self, query: SearchQuery, raw: &[Value]) -> Result<SearchOutcome, SearchError> {
        query.validate().map_err(SearchError::InputValidation)?;
        self.analyze_validated(query, raw)
    }

    /// Same as [`Pipeline::analyze`] for a whole provider payload.
    ///
    /// # Errors
    ///
    /// Additionally returns [`SearchError::InvalidPayload`] when `payload` is
    /// not a JSON array.
    pub fn analyze_payload(
        &self,
        query: SearchQuery,
        payload: &Value,
    ) -> Result<SearchOutcome, SearchError> {
        query.validate().map_err(SearchError::InputValidation)?;
        let raw = records_from_payload(payload)?;
        self.analyze_validated(query, raw)
    }

    /// Runs a live search against `scraper`, then asks `insight` (when given)
    /// for commentary on the result.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InputValidation`] before any provider call,
    /// [`SearchError::ExternalService`] when the scrape fails, and
    /// [`SearchError::EmptyResult`] when the scrape returns nothing.
    pub async fn search<S, I>(
        &self,
        query: SearchQuery,
        scraper: &S,
        insight: Option<&I>,
    ) -> Result<SearchOutcome, SearchError>
    where
        S: ScrapeProvider,
        I: InsightProvider,
    {
        query.validate().map_err(SearchError::InputValidation)?;

        let request = query.scrape_request();
        tracing::info!(
            search = %request.search_query,
            max_results = request.max_results,
            "starting scrape"
        );
        let raw = scraper
            .fetch_places(&request)
            .await
            .map_err(|e| scrape_failed(&e))?;

        let mut outcome = self.analyze_validated(query, &raw)?;

        if let Some(provider) = insight {
            outcome.narrative = narrate(provider, &outcome.snapshot).await;
        }

        Ok(outcome)
    }

    fn analyze_validated(
        &self,
        query: SearchQuery,
        raw: &[Value],
    ) -> Result<SearchOutcome, SearchError> {
        if raw.is_empty() {
            tracing::info!(search = %query.search_string(), "no raw records returned");
            return Err(SearchError::EmptyResult);
        }

        let normalized = normalize_records(raw, &self.field_map);
        let snapshot = MarketSnapshot::build(query, normalized, self.top_k);
        let map = snapshot.map_view(&self.scale);

        tracing::info!(
            count = snapshot.metrics.count,
            dropped = snapshot.dropped_records,
            filtered = snapshot.filtered_records,
            average_rating = ?snapshot.metrics.average_rating,
            "market analysis complete"
        );

        Ok(SearchOutcome {
            snapshot,
            map,
            narrative: Narrative::NotRequested,
        })
    }
}

fn scrape_failed(error: &impl std::fmt::Display) -> SearchError {
    SearchError::ExternalService {
        provider: "scrape",
        message: error.to_string(),
    }
}

async fn narrate<I: InsightProvider>(provider: &I, snapshot: &MarketSnapshot) -> Narrative {
    if snapshot.is_empty() {
        return Narrative::Skipped;
    }
    let prompt = insight_prompt(snapshot);
    match provider.generate(&prompt).await {
        Ok(text) => Narrative::Generated(text),
        Err(e) => {
            tracing::warn!(error = %e, "narrative generation failed");
            Narrative::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
#[path = "search_test.rs"]
mod tests;
