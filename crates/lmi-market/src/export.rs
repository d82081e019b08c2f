//! Tabular CSV export of normalized records.
//!
//! Output shape:
//!
//! ```text
//! Business Name,Address,Stars,Reviews Count
//! Acme Dental,"12 King St W, Toronto",4.7,120
//! Corner Cafe,,4.0,8
//! ```
//!
//! Rows are ordered by rating, best first; records with an unknown rating
//! come last and ties keep their input order.

use std::cmp::Ordering;
use std::fmt::Write as _;

use lmi_core::BusinessRecord;

use crate::snapshot::MarketSnapshot;

pub const CSV_HEADER: [&str; 4] = ["Business Name", "Address", "Stars", "Reviews Count"];

/// CSV for every record in `snapshot`.
#[must_use]
pub fn snapshot_csv(snapshot: &MarketSnapshot) -> String {
    records_csv(&snapshot.records)
}

#[must_use]
pub fn records_csv(records: &[BusinessRecord]) -> String {
    let mut ordered: Vec<&BusinessRecord> = records.iter().collect();
    ordered.sort_by(|a, b| by_rating_desc(a.rating, b.rating));

    let mut out = String::new();
    write_row(&mut out, CSV_HEADER);
    for record in ordered {
        let rating = record.rating.map(format_rating).unwrap_or_default();
        let reviews = record.review_count.to_string();
        write_row(
            &mut out,
            [
                record.name.as_str(),
                record.address.as_deref().unwrap_or_default(),
                rating.as_str(),
                reviews.as_str(),
            ],
        );
    }
    out
}

fn by_rating_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// `{:?}` keeps a trailing `.0` on whole ratings (`4.0`, not `4`).
fn format_rating(rating: f64) -> String {
    format!("{rating:?}")
}

fn needs_quotes(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
}

fn write_row<'a>(out: &mut String, cells: impl IntoIterator<Item = &'a str>) {
    for (index, cell) in cells.into_iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        if needs_quotes(cell) {
            let _ = write!(out, "\"{}\"", cell.replace('"', "\"\""));
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}
