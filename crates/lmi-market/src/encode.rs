//! Visual encoding: rating to color class, review count to marker radius.

use lmi_core::RatingClass;
use serde::{Deserialize, Serialize};

/// Color class for a rating. Unknown ratings are classed as poor.
#[must_use]
pub fn rating_class(rating: Option<f64>) -> RatingClass {
    RatingClass::from_rating(rating)
}

/// Parameters of the review-count to radius mapping:
/// `clamp(base + scale * sqrt(review_count), min_radius, max_radius)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerScale {
    pub base: f64,
    pub scale: f64,
    pub min_radius: f64,
    pub max_radius: f64,
}

impl Default for MarkerScale {
    fn default() -> Self {
        Self {
            base: 3.0,
            scale: 1.0,
            min_radius: 4.0,
            max_radius: 14.0,
        }
    }
}

impl MarkerScale {
    /// Radius for a marker with `review_count` reviews.
    ///
    /// Non-decreasing in `review_count` and always inside
    /// `[min_radius, max_radius]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn size_for(&self, review_count: u64) -> f64 {
        let raw = self.base + self.scale * (review_count as f64).sqrt();
        // max-then-min instead of f64::clamp: a misconfigured scale with
        // min > max must not panic.
        raw.min(self.max_radius).max(self.min_radius)
    }
}

/// Radius for `review_count` under `scale`.
#[must_use]
pub fn marker_size(review_count: u64, scale: &MarkerScale) -> f64 {
    scale.size_for(review_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_follows_rating_brackets() {
        assert_eq!(rating_class(Some(2.0)).color(), "red");
        assert_eq!(rating_class(Some(3.7)).color(), "orange");
        assert_eq!(rating_class(Some(4.2)).color(), "yellowgreen");
        assert_eq!(rating_class(Some(4.8)).color(), "green");
        assert_eq!(rating_class(None).color(), "red");
    }

    #[test]
    fn color_class_is_monotonic_in_rating() {
        let mut previous = RatingClass::Poor;
        for step in 0..=50 {
            let rating = f64::from(step) / 10.0;
            let class = rating_class(Some(rating));
            assert!(class >= previous, "class dropped at rating {rating}");
            previous = class;
        }
    }

    #[test]
    fn size_is_clamped_to_bounds() {
        let scale = MarkerScale::default();
        assert!((scale.size_for(0) - 4.0).abs() < f64::EPSILON);
        assert!((scale.size_for(1_000_000) - 14.0).abs() < f64::EPSILON);
    }

    #[test]
    fn size_is_monotonic_in_review_count() {
        let scale = MarkerScale::default();
        let mut previous = scale.size_for(0);
        for count in [1, 2, 5, 10, 50, 100, 120, 500, 10_000] {
            let size = scale.size_for(count);
            assert!(size >= previous, "size dropped at {count} reviews");
            assert!((scale.min_radius..=scale.max_radius).contains(&size));
            previous = size;
        }
    }

    #[test]
    fn well_reviewed_business_lands_near_upper_bound() {
        // 3 + sqrt(120) ~= 13.95
        let size = marker_size(120, &MarkerScale::default());
        assert!(size > 13.0 && size <= 14.0, "got {size}");
    }

    #[test]
    fn inverted_bounds_do_not_panic() {
        let scale = MarkerScale {
            base: 0.0,
            scale: 1.0,
            min_radius: 10.0,
            max_radius: 2.0,
        };
        assert!((scale.size_for(25) - 10.0).abs() < f64::EPSILON);
    }
}
