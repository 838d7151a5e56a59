use chrono::{DateTime, NaiveDate};
use tracing::warn;

use crate::config::{pause, CollectOptions};
use crate::error::ProviderError;
use crate::model::RawReview;
use crate::provider::{DetailsRequest, PlacesApi, ReviewRecord};

const UNKNOWN_PLACE_NAME: &str = "Unknown";

/// Name and flattened reviews of one place.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceReviews {
    pub place_name: String,
    pub reviews: Vec<RawReview>,
}

/// Result of the detail request for a single place.
#[derive(Debug)]
pub enum ReviewOutcome {
    Fetched {
        place_id: String,
        reviews: PlaceReviews,
    },
    Failed {
        place_id: String,
        error: ProviderError,
    },
}

/// Reviews from every place that answered, plus the ids that did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewBatch {
    pub reviews: Vec<RawReview>,
    pub failed: Vec<String>,
}

pub fn fetch_place_reviews<A>(
    api: &A,
    place_id: &str,
    language: &str,
) -> Result<PlaceReviews, ProviderError>
where
    A: PlacesApi + ?Sized,
{
    let detail = api.place_details(&DetailsRequest {
        place_id: place_id.to_string(),
        language: language.to_string(),
    })?;
    let place_name = detail
        .name
        .unwrap_or_else(|| UNKNOWN_PLACE_NAME.to_string());
    let reviews = detail
        .reviews
        .into_iter()
        .map(|r| to_raw_review(place_id, &place_name, r))
        .collect();
    Ok(PlaceReviews {
        place_name,
        reviews,
    })
}

/// One outcome per place, in request order. Sleeps after every request.
pub fn collect_review_outcomes<A, S>(
    api: &A,
    place_ids: &[S],
    options: &CollectOptions,
) -> Vec<ReviewOutcome>
where
    A: PlacesApi + ?Sized,
    S: AsRef<str>,
{
    place_ids
        .iter()
        .map(|id| {
            let place_id = id.as_ref().to_string();
            let outcome = match fetch_place_reviews(api, &place_id, &options.language) {
                Ok(reviews) => ReviewOutcome::Fetched { place_id, reviews },
                Err(error) => ReviewOutcome::Failed { place_id, error },
            };
            pause(options.limits.inter_review_delay);
            outcome
        })
        .collect()
}

/// Collect reviews for a batch of places. A failing place is logged and
/// skipped; it never stops the batch.
pub fn collect_reviews<A, S>(api: &A, place_ids: &[S], options: &CollectOptions) -> ReviewBatch
where
    A: PlacesApi + ?Sized,
    S: AsRef<str>,
{
    let mut batch = ReviewBatch::default();
    for outcome in collect_review_outcomes(api, place_ids, options) {
        match outcome {
            ReviewOutcome::Fetched { reviews, .. } => batch.reviews.extend(reviews.reviews),
            ReviewOutcome::Failed { place_id, error } => {
                warn!(place_id = %place_id, error = %error, "review fetch failed, skipping place");
                batch.failed.push(place_id);
            }
        }
    }
    batch
}

fn to_raw_review(place_id: &str, place_name: &str, record: ReviewRecord) -> RawReview {
    RawReview {
        place_id: place_id.to_string(),
        place_name: place_name.to_string(),
        author_id: record.author_url.as_deref().and_then(author_id_from_url),
        rating: record.rating,
        text: record.text,
        // a zero timestamp means the provider has no date
        review_date: record.time.filter(|t| *t != 0).and_then(epoch_to_date),
        relative_time_description: record.relative_time_description,
    }
}

/// Trailing `/` segment of an author profile URL.
pub fn author_id_from_url(url: &str) -> Option<String> {
    url.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// UTC calendar date of an epoch-seconds timestamp.
pub fn epoch_to_date(secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}
