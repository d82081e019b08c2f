use lmi_core::{BusinessRecord, GeoPoint, SearchQuery};
use serde::Serialize;

use crate::aggregate::{aggregate, MarketMetrics};
use crate::encode::MarkerScale;
use crate::map::{build_map_view, centroid, MapView};
use crate::normalize::NormalizeOutcome;

/// The result of one search submission.
///
/// Built fresh per submission and handed explicitly to every renderer and
/// exporter. A new search replaces the previous snapshot entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub query: SearchQuery,
    /// Retained records in provider order.
    pub records: Vec<BusinessRecord>,
    pub metrics: MarketMetrics,
    pub centroid: Option<GeoPoint>,
    /// Raw records the normalizer could not use.
    pub dropped_records: usize,
    /// Normalized records removed by `query.min_reviews`.
    pub filtered_records: usize,
}

impl MarketSnapshot {
    /// Applies the query's review threshold to `outcome` and computes metrics.
    #[must_use]
    pub fn build(query: SearchQuery, outcome: NormalizeOutcome, top_k: usize) -> Self {
        let NormalizeOutcome { records, dropped } = outcome;
        let before = records.len();
        let records: Vec<BusinessRecord> = records
            .into_iter()
            .filter(|r| r.review_count >= query.min_reviews)
            .collect();
        let filtered_records = before - records.len();

        let metrics = aggregate(&records, top_k);
        let centroid = centroid(&records);

        tracing::debug!(
            retained = records.len(),
            dropped,
            filtered_records,
            min_reviews = query.min_reviews,
            "built market snapshot"
        );

        Self {
            query,
            records,
            metrics,
            centroid,
            dropped_records: dropped,
            filtered_records,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn map_view(&self, scale: &MarkerScale) -> Option<MapView> {
        build_map_view(&self.records, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, review_count: u64) -> BusinessRecord {
        BusinessRecord {
            name: name.to_owned(),
            address: None,
            rating: Some(4.0),
            review_count,
            latitude: 1.0,
            longitude: 2.0,
        }
    }

    fn outcome(records: Vec<BusinessRecord>, dropped: usize) -> NormalizeOutcome {
        NormalizeOutcome { records, dropped }
    }

    #[test]
    fn build_filters_below_min_reviews() {
        let query = SearchQuery::new("cafe", "Lisbon").with_min_reviews(10);
        let snapshot = MarketSnapshot::build(
            query,
            outcome(vec![record("a", 9), record("b", 10), record("c", 50)], 2),
            5,
        );
        let names: Vec<&str> = snapshot.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["b", "c"]);
        assert_eq!(snapshot.filtered_records, 1);
        assert_eq!(snapshot.dropped_records, 2);
        assert_eq!(snapshot.metrics.count, 2);
    }

    #[test]
    fn empty_snapshot_has_no_centroid_or_map() {
        let snapshot =
            MarketSnapshot::build(SearchQuery::new("cafe", "Lisbon"), outcome(vec![], 3), 5);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.centroid, None);
        assert!(snapshot.map_view(&MarkerScale::default()).is_none());
    }

    #[test]
    fn map_view_covers_every_retained_record() {
        let snapshot = MarketSnapshot::build(
            SearchQuery::new("cafe", "Lisbon"),
            outcome(vec![record("a", 1), record("b", 2)], 0),
            5,
        );
        let view = snapshot.map_view(&MarkerScale::default()).unwrap();
        assert_eq!(view.markers.len(), 2);
        assert_eq!(Some(view.center), snapshot.centroid);
    }
}
