//! Average ratings derived from raw review records.
//!
//! Aggregates are request-scoped; nothing here is persisted. A key with no
//! reviews is absent from the map and callers default it to 0.

use crate::model::{CenterRatingAggregate, RatingAggregate, ReviewRecord};
use std::collections::HashMap;

/// Group reviews by reviewee and average them.
pub fn aggregate_reviews(reviews: &[ReviewRecord]) -> HashMap<String, RatingAggregate> {
    let mut totals: HashMap<&str, (f64, usize)> = HashMap::new();
    for review in reviews {
        let entry = totals.entry(review.reviewee_key.as_str()).or_insert((0.0, 0));
        entry.0 += review.rating;
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(key, (total, count))| {
            (
                key.to_string(),
                RatingAggregate {
                    key: key.to_string(),
                    average_rating: total / count as f64,
                    rated_count: count,
                },
            )
        })
        .collect()
}

/// Rating to display for `key`: the average, or 0 when there is no usable data.
pub fn rating_or_default(ratings: &HashMap<String, RatingAggregate>, key: Option<&str>) -> f64 {
    key.and_then(|k| ratings.get(k))
        .map(|agg| agg.average_rating)
        .filter(|avg| avg.is_finite())
        .unwrap_or(0.0)
}

/// Roll tutor ratings up to their centers.
///
/// Every assigned tutor adds to the numerator and to `total_tutor_count`, but
/// only tutors rated above zero count toward the denominator. The displayed
/// center rating is therefore an average over rated tutors while the headcount
/// covers all of them.
pub fn aggregate_centers<'a, I>(tutors: I) -> HashMap<String, CenterRatingAggregate>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut totals: HashMap<&str, (f64, usize, usize)> = HashMap::new();
    for (center, rating) in tutors {
        let entry = totals.entry(center).or_insert((0.0, 0, 0));
        entry.0 += rating;
        if rating > 0.0 {
            entry.1 += 1;
        }
        entry.2 += 1;
    }

    totals
        .into_iter()
        .map(|(center, (total, rated, all))| {
            let average_rating = if rated == 0 { 0.0 } else { total / rated as f64 };
            (
                center.to_string(),
                CenterRatingAggregate {
                    center_key: center.to_string(),
                    average_rating,
                    rated_tutor_count: rated,
                    total_tutor_count: all,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(key: &str, rating: f64) -> ReviewRecord {
        ReviewRecord {
            reviewee_key: key.to_string(),
            rating,
        }
    }

    #[test]
    fn averages_reviews_per_key() {
        let ratings = aggregate_reviews(&[review("a", 5.0), review("a", 3.0), review("b", 4.0)]);
        assert_eq!(ratings["a"].average_rating, 4.0);
        assert_eq!(ratings["a"].rated_count, 2);
        assert_eq!(ratings["b"].average_rating, 4.0);
        assert!(!ratings.contains_key("c"));
    }

    #[test]
    fn empty_input_yields_empty_map() {
        assert!(aggregate_reviews(&[]).is_empty());
        assert!(aggregate_centers(Vec::<(&str, f64)>::new()).is_empty());
    }

    #[test]
    fn missing_and_poisoned_ratings_default_to_zero() {
        let ratings = aggregate_reviews(&[review("a", f64::NAN), review("a", 5.0)]);
        assert!(ratings["a"].average_rating.is_nan());
        assert_eq!(rating_or_default(&ratings, Some("a")), 0.0);
        assert_eq!(rating_or_default(&ratings, Some("nobody")), 0.0);
        assert_eq!(rating_or_default(&ratings, None), 0.0);
    }

    #[test]
    fn center_average_counts_only_rated_tutors() {
        let centers = aggregate_centers([("c1", 0.0), ("c1", 4.0)]);
        let c1 = &centers["c1"];
        assert_eq!(c1.total_tutor_count, 2);
        assert_eq!(c1.rated_tutor_count, 1);
        assert_eq!(c1.average_rating, 4.0);
    }

    #[test]
    fn center_without_rated_tutors_shows_zero() {
        let centers = aggregate_centers([("c1", 0.0), ("c1", 0.0), ("c2", 3.0)]);
        assert_eq!(centers["c1"].average_rating, 0.0);
        assert_eq!(centers["c1"].total_tutor_count, 2);
        assert_eq!(centers["c2"].average_rating, 3.0);
    }

    #[test]
    fn negative_ratings_stay_in_numerator_only() {
        let centers = aggregate_centers([("c1", -2.0), ("c1", 4.0)]);
        assert_eq!(centers["c1"].average_rating, 2.0);
        assert_eq!(centers["c1"].rated_tutor_count, 1);
    }
}
