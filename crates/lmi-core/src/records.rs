//! Canonical domain records shared by the pipeline, the provider clients and
//! the presentation surfaces.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Upper bound accepted for [`SearchQuery::max_results`].
pub const MAX_RESULTS_LIMIT: u32 = 500;

const DEFAULT_MAX_RESULTS: u32 = 150;

/// A business listing after normalization.
///
/// Both coordinates are always present and finite; records without them
/// never leave the normalizer. The JSON form also carries the derived
/// `rating_class`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BusinessRecord {
    pub name: String,
    pub address: Option<String>,
    /// Star rating in `[0, 5]`; `None` when the source had no usable value.
    pub rating: Option<f64>,
    pub review_count: u64,
    pub latitude: f64,
    pub longitude: f64,
}

impl BusinessRecord {
    #[must_use]
    pub fn position(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    #[must_use]
    pub fn rating_class(&self) -> RatingClass {
        RatingClass::from_rating(self.rating)
    }
}

impl Serialize for BusinessRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BusinessRecord", 7)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("address", &self.address)?;
        state.serialize_field("rating", &self.rating)?;
        state.serialize_field("review_count", &self.review_count)?;
        state.serialize_field("latitude", &self.latitude)?;
        state.serialize_field("longitude", &self.longitude)?;
        state.serialize_field("rating_class", &self.rating_class())?;
        state.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Discrete rating bracket used for marker colors and the histogram.
///
/// Variants are ordered worst to best, so `Ord` comparisons read as
/// "is at least as good as".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingClass {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl RatingClass {
    pub const ALL: [RatingClass; 4] = [
        RatingClass::Poor,
        RatingClass::Fair,
        RatingClass::Good,
        RatingClass::Excellent,
    ];

    /// Brackets: `[0, 3.5)` poor, `[3.5, 4.0)` fair, `[4.0, 4.5)` good,
    /// `[4.5, 5]` excellent. An unknown rating is classed as poor.
    #[must_use]
    pub fn from_rating(rating: Option<f64>) -> Self {
        match rating {
            Some(r) if r >= 4.5 => RatingClass::Excellent,
            Some(r) if r >= 4.0 => RatingClass::Good,
            Some(r) if r >= 3.5 => RatingClass::Fair,
            _ => RatingClass::Poor,
        }
    }

    /// CSS color name used for map markers of this class.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            RatingClass::Poor => "red",
            RatingClass::Fair => "orange",
            RatingClass::Good => "yellowgreen",
            RatingClass::Excellent => "green",
        }
    }
}

impl std::fmt::Display for RatingClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatingClass::Poor => write!(f, "poor"),
            RatingClass::Fair => write!(f, "fair"),
            RatingClass::Good => write!(f, "good"),
            RatingClass::Excellent => write!(f, "excellent"),
        }
    }
}

/// User-submitted search parameters. Built once per submission and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Missing fields deserialize as blank so [`SearchQuery::validate`]
    /// reports them.
    #[serde(default)]
    pub business_type: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub min_reviews: u64,
}

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

impl SearchQuery {
    #[must_use]
    pub fn new(business_type: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            business_type: business_type.into(),
            city: city.into(),
            country: String::new(),
            max_results: DEFAULT_MAX_RESULTS,
            min_reviews: 0,
        }
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    #[must_use]
    pub fn with_min_reviews(mut self, min_reviews: u64) -> Self {
        self.min_reviews = min_reviews;
        self
    }

    /// Returns every problem with the query, or `Ok(())` when it can be
    /// submitted to the scrape provider.
    ///
    /// # Errors
    ///
    /// Returns the list of human-readable validation messages.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();
        if self.business_type.trim().is_empty() {
            problems.push("business type is required".to_string());
        }
        if self.city.trim().is_empty() {
            problems.push("city is required".to_string());
        }
        if self.max_results == 0 || self.max_results > MAX_RESULTS_LIMIT {
            problems.push(format!(
                "max results must be between 1 and {MAX_RESULTS_LIMIT}"
            ));
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// Human-readable location, e.g. `"Calgary, AB, Canada"`.
    #[must_use]
    pub fn location(&self) -> String {
        let city = self.city.trim();
        let country = self.country.trim();
        if country.is_empty() {
            city.to_string()
        } else {
            format!("{city}, {country}")
        }
    }

    /// Free-text search string handed to the scrape provider.
    #[must_use]
    pub fn search_string(&self) -> String {
        format!("{} in {}", self.business_type.trim(), self.location())
    }

    #[must_use]
    pub fn scrape_request(&self) -> ScrapeRequest {
        ScrapeRequest {
            search_query: self.search_string(),
            max_results: self.max_results,
        }
    }
}

/// The only input the scrape provider receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeRequest {
    pub search_query: String,
    pub max_results: u32,
}
