use std::fmt::Write as _;

use lmi_core::RatingClass;

use crate::aggregate::top_by_reviews;
use crate::snapshot::MarketSnapshot;

const PROMPT_TOP_K: usize = 5;

/// Plain-text prompt asking the narrative provider for a short
/// competitive-landscape summary of `snapshot`.
#[must_use]
pub fn insight_prompt(snapshot: &MarketSnapshot) -> String {
    let metrics = &snapshot.metrics;
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are a local market analyst. Summarize the competitive landscape for \
         {} in {} in three to five sentences.",
        snapshot.query.business_type.trim(),
        snapshot.query.location()
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Businesses analyzed: {}", metrics.count);
    let average = metrics
        .average_rating
        .map_or_else(|| "unknown".to_string(), |r| format!("{r:.2}"));
    let _ = writeln!(prompt, "Average rating: {average}");
    let _ = writeln!(prompt, "Total reviews: {}", metrics.total_reviews);

    let _ = writeln!(prompt, "Rating distribution:");
    for class in RatingClass::ALL.iter().rev() {
        let _ = writeln!(prompt, "- {class}: {}", metrics.rating_histogram.get(*class));
    }

    let _ = writeln!(prompt, "Most reviewed businesses:");
    for record in top_by_reviews(&snapshot.records, PROMPT_TOP_K) {
        let rating = record
            .rating
            .map_or_else(|| "unrated".to_string(), |r| format!("{r:.1} stars"));
        let _ = writeln!(
            prompt,
            "- {} ({rating}, {} reviews)",
            record.name, record.review_count
        );
    }

    let _ = writeln!(prompt);
    let _ = write!(
        prompt,
        "Point out who dominates by visibility, where quality gaps exist, and \
         what a new entrant should focus on."
    );
    prompt
}

#[cfg(test)]
mod tests {
    use lmi_core::{BusinessRecord, SearchQuery};

    use super::*;
    use crate::normalize::NormalizeOutcome;

    fn record(name: &str, rating: Option<f64>, reviews: u64) -> BusinessRecord {
        BusinessRecord {
            name: name.to_owned(),
            address: None,
            rating,
            review_count: reviews,
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    fn snapshot(records: Vec<BusinessRecord>) -> MarketSnapshot {
        snapshot_with_top_k(records, 10)
    }

    fn snapshot_with_top_k(records: Vec<BusinessRecord>, top_k: usize) -> MarketSnapshot {
        MarketSnapshot::build(
            SearchQuery::new("dentist", "Toronto").with_country("Canada"),
            NormalizeOutcome {
                records,
                dropped: 0,
            },
            top_k,
        )
    }

    #[test]
    fn prompt_names_search_and_summary() {
        let prompt = insight_prompt(&snapshot(vec![
            record("Acme Dental", Some(4.7), 120),
            record("Bright Smiles", None, 4),
        ]));
        assert!(prompt.contains("dentist in Toronto, Canada"));
        assert!(prompt.contains("Businesses analyzed: 2"));
        assert!(prompt.contains("Average rating: 4.70"));
        assert!(prompt.contains("- excellent: 1"));
        assert!(prompt.contains("- poor: 1"));
        assert!(prompt.contains("- Acme Dental (4.7 stars, 120 reviews)"));
        assert!(prompt.contains("- Bright Smiles (unrated, 4 reviews)"));
    }

    #[test]
    fn prompt_lists_at_most_five_businesses() {
        let records = (0..8)
            .map(|i| record(&format!("biz-{i}"), Some(4.0), i))
            .collect();
        let prompt = insight_prompt(&snapshot(records));
        let listed = prompt.lines().filter(|l| l.starts_with("- biz-")).count();
        assert_eq!(listed, 5);
        assert!(prompt.contains("- biz-7 "));
        assert!(!prompt.contains("- biz-2 "));
    }

    #[test]
    fn prompt_reports_unknown_average() {
        let prompt = insight_prompt(&snapshot(vec![record("X", None, 3)]));
        assert!(prompt.contains("Average rating: unknown"));
    }

    #[test]
    fn prompt_top_five_ignores_snapshot_top_k() {
        for top_k in [0, 2] {
            let records = (0..8)
                .map(|i| record(&format!("biz-{i}"), Some(4.0), i))
                .collect();
            let snapshot = snapshot_with_top_k(records, top_k);
            assert_eq!(snapshot.metrics.top_by_reviews.len(), top_k);

            let prompt = insight_prompt(&snapshot);
            let listed = prompt.lines().filter(|l| l.starts_with("- biz-")).count();
            assert_eq!(listed, 5, "top_k {top_k}");
            assert!(prompt.contains("- biz-7 "));
        }
    }
}
