//! Market analysis pipeline: raw scrape records in, normalized records,
//! metrics, map markers and exports out.
//!
//! Every function outside [`search`] is synchronous and pure. The search
//! orchestrator is the only place that talks to providers, and it does so
//! through the traits in [`lmi_core::provider`].

pub mod aggregate;
pub mod encode;
pub mod error;
pub mod export;
pub mod map;
pub mod normalize;
pub mod prompt;
pub mod search;
pub mod snapshot;

pub use aggregate::{aggregate, MarketMetrics, RatingHistogram};
pub use encode::{marker_size, rating_class, MarkerScale};
pub use error::SearchError;
pub use export::{records_csv, snapshot_csv, CSV_HEADER};
pub use map::{assemble_markers, build_map_view, centroid, MapView, MarkerDescriptor};
pub use normalize::{
    normalize_record, normalize_records, records_from_payload, MalformedRecord, NormalizeOutcome,
};
pub use prompt::insight_prompt;
pub use search::{Narrative, Pipeline, SearchOutcome};
pub use snapshot::MarketSnapshot;
