//! Normalization from raw scrape records to [`lmi_core::BusinessRecord`].
//!
//! Raw records are JSON objects in whatever naming scheme the provider (or
//! provider version) used. The [`FieldMap`] lists key variants per canonical
//! field in priority order; the first variant holding a non-null value wins.
//!
//! Defaulting is field-specific:
//! - rating: unparseable or out of `[0, 5]` becomes unknown (`None`);
//! - review count: unparseable, negative or non-finite becomes `0`;
//! - name, latitude, longitude: unusable means the record is dropped.

use lmi_core::{BusinessRecord, FieldMap};
use serde_json::{Map, Value};

use crate::error::SearchError;

/// Why a single raw record was dropped. Never fatal for the batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecord {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no usable name")]
    MissingName,

    #[error("record has no usable {field}")]
    MissingCoordinate { field: &'static str },
}

/// Normalized records plus the number of raw records that were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    pub records: Vec<BusinessRecord>,
    pub dropped: usize,
}

/// Borrow the record list out of a raw provider payload.
///
/// # Errors
///
/// Returns [`SearchError::InvalidPayload`] when the payload is not a JSON
/// array.
pub fn records_from_payload(payload: &Value) -> Result<&[Value], SearchError> {
    payload.as_array().map(Vec::as_slice).ok_or_else(|| {
        SearchError::InvalidPayload(format!(
            "expected a JSON array of records, got {}",
            json_kind(payload)
        ))
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Normalizes every raw record, preserving input order and skipping the
/// malformed ones.
#[must_use]
pub fn normalize_records(raw: &[Value], map: &FieldMap) -> NormalizeOutcome {
    let mut records = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;

    for (index, item) in raw.iter().enumerate() {
        match normalize_record(item, map) {
            Ok(record) => records.push(record),
            Err(reason) => {
                dropped += 1;
                tracing::debug!(index, %reason, "dropping malformed raw record");
            }
        }
    }

    tracing::info!(
        retained = records.len(),
        dropped,
        "normalized raw scrape records"
    );

    NormalizeOutcome { records, dropped }
}

/// Normalizes one raw record.
///
/// # Errors
///
/// Returns [`MalformedRecord`] when the record is not an object or lacks a
/// usable name or coordinate.
pub fn normalize_record(raw: &Value, map: &FieldMap) -> Result<BusinessRecord, MalformedRecord> {
    let object = raw.as_object().ok_or(MalformedRecord::NotAnObject)?;

    let name = lookup(object, &map.name)
        .and_then(value_as_text)
        .ok_or(MalformedRecord::MissingName)?;

    let latitude = lookup(object, &map.latitude)
        .and_then(|v| value_as_coordinate(v, 90.0))
        .ok_or(MalformedRecord::MissingCoordinate { field: "latitude" })?;
    let longitude = lookup(object, &map.longitude)
        .and_then(|v| value_as_coordinate(v, 180.0))
        .ok_or(MalformedRecord::MissingCoordinate { field: "longitude" })?;

    let address = lookup(object, &map.address).and_then(value_as_text);
    let rating = lookup(object, &map.rating).and_then(value_as_rating);
    let review_count = lookup(object, &map.review_count).map_or(0, value_as_review_count);

    Ok(BusinessRecord {
        name,
        address,
        rating,
        review_count,
        latitude,
        longitude,
    })
}

/// Returns the value of the first key variant present with a non-null value.
fn lookup<'a>(object: &'a Map<String, Value>, variants: &[String]) -> Option<&'a Value> {
    variants.iter().find_map(|key| lookup_key(object, key))
}

/// A literal key wins over a nested path of the same spelling, so flattened
/// exports (`"location.lat": 43.6`) and nested objects (`"location": {"lat":
/// 43.6}`) both resolve.
fn lookup_key<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = object.get(key).filter(|v| !v.is_null()) {
        return Some(value);
    }
    if !key.contains('.') {
        return None;
    }

    let mut segments = key.split('.');
    let mut current = object.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current).filter(|v| !v.is_null())
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| {
            value
                .as_str()
                .and_then(|raw| raw.trim().parse::<f64>().ok())
        })
        .filter(|v| v.is_finite())
}

fn value_as_coordinate(value: &Value, limit: f64) -> Option<f64> {
    value_as_f64(value).filter(|v| v.abs() <= limit)
}

fn value_as_rating(value: &Value) -> Option<f64> {
    value_as_f64(value).filter(|v| (0.0..=5.0).contains(v))
}

// Float-to-int `as` saturates; fractional counts truncate.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn value_as_review_count(value: &Value) -> u64 {
    if let Some(count) = value.as_u64() {
        return count;
    }
    match value_as_f64(value) {
        Some(v) if v >= 0.0 => v as u64,
        _ => 0,
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
