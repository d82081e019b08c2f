//! Field-name mapping table for raw scrape records.
//!
//! Scrape providers (and different versions of the same provider) name the
//! same concept differently: `title` vs `name`, `totalScore` vs `stars`,
//! nested `location.lat` vs flat `latitude`. Each canonical field carries an
//! ordered list of key variants; the normalizer uses the first one present.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    pub name: Vec<String>,
    pub address: Vec<String>,
    pub rating: Vec<String>,
    pub review_count: Vec<String>,
    pub latitude: Vec<String>,
    pub longitude: Vec<String>,
}

fn keys(variants: &[&str]) -> Vec<String> {
    variants.iter().map(|&v| v.to_string()).collect()
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            name: keys(&["title", "name", "Business Name"]),
            address: keys(&["address", "street", "Address"]),
            rating: keys(&["totalScore", "stars", "rating", "Stars"]),
            review_count: keys(&[
                "reviewsCount",
                "reviews_count",
                "reviewCount",
                "Reviews Count",
            ]),
            latitude: keys(&["location.lat", "latitude", "lat", "Latitude"]),
            longitude: keys(&["location.lng", "longitude", "lng", "lon", "Longitude"]),
        }
    }
}

impl FieldMap {
    fn fields(&self) -> [(&'static str, &[String]); 6] {
        [
            ("name", &self.name),
            ("address", &self.address),
            ("rating", &self.rating),
            ("review_count", &self.review_count),
            ("latitude", &self.latitude),
            ("longitude", &self.longitude),
        ]
    }

    /// Checks that every canonical field lists at least one usable key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, variants) in self.fields() {
            if variants.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "field '{field}' must list at least one key variant"
                )));
            }
            if variants.iter().any(|v| v.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "field '{field}' contains a blank key variant"
                )));
            }
        }
        Ok(())
    }
}

/// Load and validate a field map from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_field_map(path: &Path) -> Result<FieldMap, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FieldMapIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_field_map(&content)
}

fn parse_field_map(content: &str) -> Result<FieldMap, ConfigError> {
    let map: FieldMap = serde_yaml::from_str(content)?;
    map.validate()?;
    Ok(map)
}
