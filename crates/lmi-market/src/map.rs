//! Map marker assembly.

use lmi_core::{BusinessRecord, GeoPoint, RatingClass};
use serde::Serialize;

use crate::encode::MarkerScale;

/// Initial zoom level of a rendered market map.
pub const DEFAULT_ZOOM: u8 = 12;

/// Popup content of a marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerDetail {
    pub rating: Option<f64>,
    pub review_count: u64,
    pub address: Option<String>,
}

/// Everything a renderer needs to draw one business on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerDescriptor {
    pub position: GeoPoint,
    pub radius: f64,
    pub color: &'static str,
    pub rating_class: RatingClass,
    pub label: String,
    pub detail: MarkerDetail,
}

impl MarkerDescriptor {
    #[must_use]
    pub fn for_record(record: &BusinessRecord, scale: &MarkerScale) -> Self {
        let rating_class = RatingClass::from_rating(record.rating);
        Self {
            position: record.position(),
            radius: scale.size_for(record.review_count),
            color: rating_class.color(),
            rating_class,
            label: record.name.clone(),
            detail: MarkerDetail {
                rating: record.rating,
                review_count: record.review_count,
                address: record.address.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: GeoPoint,
    pub zoom: u8,
    pub markers: Vec<MarkerDescriptor>,
}

/// Arithmetic mean position of `records`, or `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centroid(records: &[BusinessRecord]) -> Option<GeoPoint> {
    if records.is_empty() {
        return None;
    }
    let n = records.len() as f64;
    let (lat_sum, lon_sum) = records.iter().fold((0.0, 0.0), |(lat, lon), r| {
        (lat + r.latitude, lon + r.longitude)
    });
    Some(GeoPoint {
        latitude: lat_sum / n,
        longitude: lon_sum / n,
    })
}

/// One marker per record, in input order.
#[must_use]
pub fn assemble_markers(records: &[BusinessRecord], scale: &MarkerScale) -> Vec<MarkerDescriptor> {
    records
        .iter()
        .map(|record| MarkerDescriptor::for_record(record, scale))
        .collect()
}

/// Map centered on the records' centroid. `None` when there is nothing to
/// render.
#[must_use]
pub fn build_map_view(records: &[BusinessRecord], scale: &MarkerScale) -> Option<MapView> {
    let center = centroid(records)?;
    Some(MapView {
        center,
        zoom: DEFAULT_ZOOM,
        markers: assemble_markers(records, scale),
    })
}
