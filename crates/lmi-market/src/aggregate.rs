//! Summary statistics over normalized records.

use std::cmp::Reverse;

use lmi_core::{BusinessRecord, RatingClass};
use serde::Serialize;

/// Record counts per rating bracket. Unknown ratings are counted as poor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RatingHistogram {
    pub poor: usize,
    pub fair: usize,
    pub good: usize,
    pub excellent: usize,
}

impl RatingHistogram {
    fn record(&mut self, class: RatingClass) {
        match class {
            RatingClass::Poor => self.poor += 1,
            RatingClass::Fair => self.fair += 1,
            RatingClass::Good => self.good += 1,
            RatingClass::Excellent => self.excellent += 1,
        }
    }

    #[must_use]
    pub fn get(&self, class: RatingClass) -> usize {
        match class {
            RatingClass::Poor => self.poor,
            RatingClass::Fair => self.fair,
            RatingClass::Good => self.good,
            RatingClass::Excellent => self.excellent,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.poor + self.fair + self.good + self.excellent
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketMetrics {
    pub count: usize,
    /// Records with a known rating.
    pub rated_count: usize,
    pub total_reviews: u64,
    /// Mean of the known ratings; `None` when no record has one.
    pub average_rating: Option<f64>,
    /// Record with the most reviews; the first one wins a tie.
    pub most_visible: Option<BusinessRecord>,
    pub rating_histogram: RatingHistogram,
    /// Up to `top_k` records by review count, descending, ties in input order.
    pub top_by_reviews: Vec<BusinessRecord>,
}

/// Computes [`MarketMetrics`] for `records`. Safe on empty input.
#[must_use]
pub fn aggregate(records: &[BusinessRecord], top_k: usize) -> MarketMetrics {
    let mut rating_histogram = RatingHistogram::default();
    for record in records {
        rating_histogram.record(RatingClass::from_rating(record.rating));
    }

    MarketMetrics {
        count: records.len(),
        rated_count: records.iter().filter(|r| r.rating.is_some()).count(),
        total_reviews: records.iter().map(|r| r.review_count).sum(),
        average_rating: average_rating(records),
        most_visible: most_visible(records).cloned(),
        rating_histogram,
        top_by_reviews: top_by_reviews(records, top_k)
            .into_iter()
            .cloned()
            .collect(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn average_rating(records: &[BusinessRecord]) -> Option<f64> {
    let known: Vec<f64> = records.iter().filter_map(|r| r.rating).collect();
    if known.is_empty() {
        return None;
    }
    Some(known.iter().sum::<f64>() / known.len() as f64)
}

fn most_visible(records: &[BusinessRecord]) -> Option<&BusinessRecord> {
    // `max_by_key` keeps the last maximum, so fold manually to keep the first.
    records.iter().fold(None, |best, record| match best {
        Some(current) if current.review_count >= record.review_count => Some(current),
        _ => Some(record),
    })
}

/// Up to `top_k` records by review count, descending. The sort is stable, so
/// ties keep input order.
pub(crate) fn top_by_reviews(records: &[BusinessRecord], top_k: usize) -> Vec<&BusinessRecord> {
    let mut ranked: Vec<&BusinessRecord> = records.iter().collect();
    ranked.sort_by_key(|r| Reverse(r.review_count));
    ranked.truncate(top_k);
    ranked
}
