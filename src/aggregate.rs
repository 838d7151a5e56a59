use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::warn;

use crate::model::{Place, PlaceRow, Review, MISSING_NUMERIC};

/// Quantile cut points for `ratings_pct_tier`.
pub const QUARTILES: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_places: usize,
    pub total_reviews: usize,
    /// Ordered by count descending, then name.
    pub places_by_region: Vec<(String, usize)>,
    pub places_by_neighborhood: Vec<(String, usize)>,
    pub avg_reviews_per_place: f64,
    /// Places with no review in the dataset.
    pub missing_reviews: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ReviewStats {
    rating_mean: Option<f64>,
    rating_std: Option<f64>,
    review_count: usize,
    text_length_mean: Option<f64>,
    word_count_mean: Option<f64>,
}

/// Fill sentinels, attach per-place review statistics and quartile tiers,
/// and summarize. Places without reviews are kept.
pub fn aggregate(places: Vec<Place>, reviews: &[Review]) -> (Vec<PlaceRow>, Summary) {
    let missing_totals = places.iter().filter(|p| p.total_ratings.is_none()).count();
    let totals: Vec<f64> = places
        .iter()
        .map(|p| p.total_ratings.unwrap_or(MISSING_NUMERIC) as f64)
        .collect();
    warn_on_sentinel_skew(missing_totals, places.len());
    let edges = quantile_edges(&totals, &QUARTILES);

    let mut by_place: HashMap<&str, Vec<&Review>> = reviews
        .iter()
        .map(|r| (r.place_id.as_str(), r))
        .into_group_map();

    let rows: Vec<PlaceRow> = places
        .into_iter()
        .map(|place| {
            let stats = by_place
                .remove(place.place_id.as_str())
                .map(|group| review_stats(&group))
                .unwrap_or_default();
            let total_ratings = place.total_ratings.unwrap_or(MISSING_NUMERIC);
            let ratings_pct_tier = edges
                .as_ref()
                .map(|e| assign_tier(total_ratings as f64, e))
                .unwrap_or(1);
            PlaceRow {
                place_id: place.place_id,
                name: place.name,
                rating: place.rating.unwrap_or(MISSING_NUMERIC as f64),
                total_ratings,
                price_level: place.price_level.unwrap_or(MISSING_NUMERIC),
                types: place.types,
                business_status: place.business_status,
                neighborhood: place.neighborhood,
                region: place.region,
                ratings_pct_tier,
                rating_mean: stats.rating_mean,
                rating_std: stats.rating_std,
                review_count: stats.review_count,
                text_length_mean: stats.text_length_mean,
                word_count_mean: stats.word_count_mean,
            }
        })
        .collect();

    let summary = summarize(&rows, reviews);
    (rows, summary)
}

pub fn summarize<'a, I>(places: &[PlaceRow], reviews: I) -> Summary
where
    I: IntoIterator<Item = &'a Review>,
{
    let mut total_reviews = 0;
    let mut reviewed = HashSet::new();
    for review in reviews {
        total_reviews += 1;
        reviewed.insert(review.place_id.as_str());
    }
    let total_places = places.len();
    let missing_reviews = places
        .iter()
        .filter(|p| !reviewed.contains(p.place_id.as_str()))
        .count();

    Summary {
        total_places,
        total_reviews,
        places_by_region: value_counts(places.iter().map(|p| p.region.as_str())),
        places_by_neighborhood: value_counts(places.iter().map(|p| p.neighborhood.as_str())),
        avg_reviews_per_place: if total_places == 0 {
            0.0
        } else {
            total_reviews as f64 / total_places as f64
        },
        missing_reviews,
    }
}

fn value_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    values
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, n)| (k.to_string(), n))
        .collect()
}

fn review_stats(group: &[&Review]) -> ReviewStats {
    let ratings: Vec<f64> = group
        .iter()
        .filter_map(|r| r.rating.map(f64::from))
        .collect();
    let lengths: Vec<f64> = group.iter().map(|r| r.text_length as f64).collect();
    let words: Vec<f64> = group.iter().map(|r| r.word_count as f64).collect();
    ReviewStats {
        rating_mean: mean(&ratings),
        rating_std: sample_std(&ratings),
        review_count: group.len(),
        text_length_mean: mean(&lengths),
        word_count_mean: mean(&words),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Standard deviation with n - 1 in the denominator; `None` below two values.
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Quantiles with linear interpolation between closest ranks.
/// Returns `None` for an empty population.
pub fn quantile_edges<const N: usize>(values: &[f64], quantiles: &[f64; N]) -> Option<[f64; N]> {
    if values.is_empty() {
        return None;
    }
    let sorted: Vec<f64> = values.iter().copied().sorted_by(f64::total_cmp).collect();
    let last = sorted.len() - 1;
    Some(quantiles.map(|q| {
        let pos = q.clamp(0.0, 1.0) * last as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }))
}

/// Bins are `(e[i-1], e[i]]`, the first also holding `e[0]`. A value on a
/// repeated edge lands in the lowest bin that contains it.
pub fn assign_tier(value: f64, edges: &[f64; 5]) -> u8 {
    edges[1..]
        .iter()
        .position(|upper| value <= *upper)
        .map(|i| i as u8 + 1)
        .unwrap_or(4)
}

fn warn_on_sentinel_skew(missing: usize, population: usize) {
    if population == 0 || missing == 0 {
        return;
    }
    let share = missing as f64 / population as f64;
    if share >= 0.25 {
        warn!(
            missing,
            population,
            share_pct = share * 100.0,
            "total_ratings sentinel fills a quarter or more of places; lowest tier is skewed"
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn place(id: &str, total: Option<i64>, neighborhood: &str, region: &str) -> Place {
        Place {
            place_id: id.to_string(),
            name: format!("Cafe {id}"),
            rating: Some(4.0),
            total_ratings: total,
            price_level: Some(2),
            types: Default::default(),
            business_status: Some("OPERATIONAL".to_string()),
            neighborhood: neighborhood.to_string(),
            region: region.to_string(),
        }
    }

    fn review(place_id: &str, rating: Option<u8>, text_clean: &str) -> Review {
        Review {
            place_id: place_id.to_string(),
            place_name: format!("Cafe {place_id}"),
            author_id: None,
            rating,
            text: Some(text_clean.to_string()),
            text_clean: text_clean.to_string(),
            text_length: text_clean.chars().count(),
            word_count: text_clean.split_whitespace().count(),
            review_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            year: Some(2024),
            month: Some(1),
            day_of_week: Some(0),
            relative_time_description: None,
        }
    }

    #[test]
    fn per_place_statistics() {
        let places = vec![place("a", Some(10), "TB", "Central")];
        let reviews = vec![
            review("a", Some(5), "great coffee"),
            review("a", Some(3), "ok"),
            review("a", None, "no rating here"),
        ];
        let (rows, _) = aggregate(places, &reviews);
        let row = &rows[0];
        assert_eq!(row.review_count, 3);
        assert_eq!(row.rating_mean, Some(4.0));
        let std = row.rating_std.unwrap();
        assert!((std - 2f64.sqrt()).abs() < 1e-12);
        // lengths 12, 2, 14 and words 2, 1, 3
        assert_eq!(row.text_length_mean, Some(28.0 / 3.0));
        assert_eq!(row.word_count_mean, Some(2.0));
    }

    #[test]
    fn single_review_has_no_std() {
        let (rows, _) = aggregate(
            vec![place("a", Some(1), "TB", "Central")],
            &[review("a", Some(4), "fine")],
        );
        assert_eq!(rows[0].rating_mean, Some(4.0));
        assert_eq!(rows[0].rating_std, None);
    }

    #[test]
    fn place_without_reviews_is_kept() {
        let places = vec![
            place("a", Some(5), "TB", "Central"),
            place("b", Some(7), "TB", "Central"),
        ];
        let (rows, summary) = aggregate(places, &[review("a", Some(5), "nice")]);
        assert_eq!(rows.len(), 2);
        let quiet = rows.iter().find(|r| r.place_id == "b").unwrap();
        assert_eq!(quiet.review_count, 0);
        assert_eq!(quiet.rating_mean, None);
        assert_eq!(quiet.rating_std, None);
        assert_eq!(quiet.text_length_mean, None);
        assert_eq!(summary.missing_reviews, 1);
    }

    #[test]
    fn missing_numerics_become_sentinel() {
        let mut p = place("a", None, "TB", "Central");
        p.rating = None;
        p.price_level = None;
        let (rows, _) = aggregate(vec![p], &[]);
        assert_eq!(rows[0].rating, -1.0);
        assert_eq!(rows[0].total_ratings, -1);
        assert_eq!(rows[0].price_level, -1);
    }

    #[test]
    fn quartile_edges_interpolate() {
        let values: Vec<f64> = (1..=8).map(|v| (v * 10) as f64).collect();
        let edges = quantile_edges(&values, &QUARTILES).unwrap();
        assert_eq!(edges, [10.0, 27.5, 45.0, 62.5, 80.0]);
        assert!(quantile_edges(&[], &QUARTILES).is_none());
    }

    #[test]
    fn tiers_follow_quartiles() {
        let places: Vec<Place> = (1..=8)
            .map(|v| place(&format!("p{v}"), Some(v * 10), "TB", "Central"))
            .collect();
        let (rows, _) = aggregate(places, &[]);
        let tiers: Vec<u8> = rows.iter().map(|r| r.ratings_pct_tier).collect();
        assert_eq!(tiers, vec![1, 1, 2, 2, 3, 3, 4, 4]);
    }

    #[test]
    fn tiers_partition_population_in_ascending_order() {
        let totals = [0, 3, 3, 3, 9, 15, 15, 40, 41, 200, 1200, 7, 3, 0, 88];
        let places: Vec<Place> = totals
            .iter()
            .enumerate()
            .map(|(i, t)| place(&format!("p{i}"), Some(*t), "TB", "Central"))
            .collect();
        let (rows, _) = aggregate(places, &[]);
        let values: Vec<f64> = totals.iter().map(|t| *t as f64).collect();
        let edges = quantile_edges(&values, &QUARTILES).unwrap();

        for row in &rows {
            let tier = row.ratings_pct_tier;
            assert!((1..=4).contains(&tier));
            let v = row.total_ratings as f64;
            let upper = edges[tier as usize];
            let lower = edges[tier as usize - 1];
            assert!(v <= upper);
            if tier > 1 {
                assert!(v > lower);
            }
        }
        // higher totals never land in a lower tier
        for a in &rows {
            for b in &rows {
                if a.total_ratings < b.total_ratings {
                    assert!(a.ratings_pct_tier <= b.ratings_pct_tier);
                }
            }
        }
    }

    #[test]
    fn heavy_ties_still_partition() {
        let places: Vec<Place> = (0..6)
            .map(|i| place(&format!("p{i}"), Some(5), "TB", "Central"))
            .collect();
        let (rows, _) = aggregate(places, &[]);
        assert!(rows.iter().all(|r| r.ratings_pct_tier == 1));
    }

    #[test]
    fn sentinel_places_sit_in_lowest_tier() {
        let places = vec![
            place("a", None, "TB", "Central"),
            place("b", Some(10), "TB", "Central"),
            place("c", Some(20), "TB", "Central"),
            place("d", Some(30), "TB", "Central"),
            place("e", Some(40), "TB", "Central"),
        ];
        let (rows, _) = aggregate(places, &[]);
        assert_eq!(rows[0].total_ratings, -1);
        assert_eq!(rows[0].ratings_pct_tier, 1);
        assert_eq!(rows[4].ratings_pct_tier, 4);
    }

    #[test]
    fn summary_counts() {
        let places = vec![
            place("a", Some(1), "Tiong Bahru", "Central"),
            place("b", Some(2), "Katong", "East"),
            place("c", Some(3), "Joo Chiat", "East"),
            place("d", Some(4), "Katong", "East"),
        ];
        let reviews = vec![
            review("a", Some(5), "x"),
            review("a", Some(4), "y"),
            review("b", Some(3), "z"),
        ];
        let (_, summary) = aggregate(places, &reviews);
        assert_eq!(summary.total_places, 4);
        assert_eq!(summary.total_reviews, 3);
        assert_eq!(
            summary.places_by_region,
            vec![("East".to_string(), 3), ("Central".to_string(), 1)]
        );
        assert_eq!(
            summary.places_by_neighborhood,
            vec![
                ("Katong".to_string(), 2),
                ("Joo Chiat".to_string(), 1),
                ("Tiong Bahru".to_string(), 1),
            ]
        );
        assert_eq!(summary.avg_reviews_per_place, 0.75);
        assert_eq!(summary.missing_reviews, 2);
    }

    #[test]
    fn empty_population_summary() {
        let (rows, summary) = aggregate(Vec::new(), &[]);
        assert!(rows.is_empty());
        assert_eq!(summary.total_places, 0);
        assert_eq!(summary.avg_reviews_per_place, 0.0);
    }
}
