//! Collection stages: per-area place search, cross-area dedupe and
//! per-place review fetching.

mod dedupe;
mod places;
mod reviews;

pub use dedupe::{dedupe, Deduplicated};
pub use places::collect_places;
pub use reviews::{
    author_id_from_url, collect_review_outcomes, collect_reviews, epoch_to_date,
    fetch_place_reviews, PlaceReviews, ReviewBatch, ReviewOutcome,
};
