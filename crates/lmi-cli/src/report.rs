//! Plain-text rendering of a search outcome for the terminal.

use std::fmt::Write as _;

use lmi_core::RatingClass;
use lmi_market::{MarketSnapshot, Narrative, SearchOutcome};

pub(crate) fn print_outcome(outcome: &SearchOutcome) {
    print!("{}", render_summary(&outcome.snapshot));
    if let Some(narrative) = render_narrative(&outcome.narrative) {
        println!();
        println!("{narrative}");
    }
}

pub(crate) fn render_summary(snapshot: &MarketSnapshot) -> String {
    let metrics = &snapshot.metrics;
    let mut out = format!(
        "Found {} businesses for '{}'",
        metrics.count,
        snapshot.query.search_string()
    );
    let mut notes = Vec::new();
    if snapshot.dropped_records > 0 {
        notes.push(format!(
            "{} without usable location",
            snapshot.dropped_records
        ));
    }
    if snapshot.filtered_records > 0 {
        notes.push(format!(
            "{} below {} reviews",
            snapshot.filtered_records, snapshot.query.min_reviews
        ));
    }
    if !notes.is_empty() {
        let _ = write!(out, " ({} skipped)", notes.join(", "));
    }
    out.push('\n');

    if snapshot.is_empty() {
        return out;
    }

    let average = metrics
        .average_rating
        .map_or_else(|| "unknown".to_string(), |r| format!("{r:.2}"));
    let _ = writeln!(
        out,
        "Average rating: {average} ({} rated)",
        metrics.rated_count
    );
    let _ = writeln!(out, "Total reviews:  {}", metrics.total_reviews);

    let mix: Vec<String> = RatingClass::ALL
        .iter()
        .rev()
        .map(|class| format!("{class} {}", metrics.rating_histogram.get(*class)))
        .collect();
    let _ = writeln!(out, "Rating mix:     {}", mix.join(" | "));

    if !metrics.top_by_reviews.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "{:<5}{:<40}{:<8}REVIEWS", "RANK", "NAME", "RATING");
        for (rank, record) in metrics.top_by_reviews.iter().enumerate() {
            let rating = record
                .rating
                .map_or_else(|| "\u{2014}".to_string(), |r| format!("{r:.1}"));
            let _ = writeln!(
                out,
                "{:<5}{:<40}{:<8}{}",
                rank + 1,
                truncate(&record.name, 38),
                rating,
                record.review_count
            );
        }
    }
    out
}

pub(crate) fn render_narrative(narrative: &Narrative) -> Option<String> {
    match narrative {
        Narrative::NotRequested => None,
        Narrative::Skipped => {
            Some("Market summary skipped: no businesses to describe.".to_string())
        }
        Narrative::Generated(text) => Some(format!("Market summary:\n{}", text.trim())),
        Narrative::Failed(message) => Some(format!("Market summary unavailable: {message}")),
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut short: String = value.chars().take(max_chars.saturating_sub(1)).collect();
    short.push('\u{2026}');
    short
}
