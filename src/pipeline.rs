use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::aggregate::{aggregate, Summary};
use crate::clean::clean_all;
use crate::collect::{collect_places, collect_reviews, dedupe};
use crate::config::{pause, AreaCatalog, CollectOptions};
use crate::error::Result;
use crate::model::{Place, PlaceRow, RawReview, ReviewRow};
use crate::provider::PlacesApi;

/// Output of the collection stages, before cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct Collected {
    pub places: Vec<Place>,
    pub reviews: Vec<RawReview>,
    pub failed_places: Vec<String>,
    pub duplicates_removed: usize,
}

/// Final datasets of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub places: Vec<PlaceRow>,
    pub reviews: Vec<ReviewRow>,
    pub summary: Summary,
    pub failed_places: Vec<String>,
    pub duplicates_removed: usize,
}

/// Collect places for every area in catalog order, dedupe them, then fetch
/// reviews for the canonical set.
pub fn collect<A>(api: &A, catalog: &AreaCatalog, options: &CollectOptions) -> Result<Collected>
where
    A: PlacesApi + ?Sized,
{
    let areas = catalog.areas();
    let mut all_places = Vec::new();

    for (i, area) in areas.iter().enumerate() {
        if i > 0 {
            pause(options.limits.inter_area_delay);
        }
        info!(
            "[{}/{}] Collecting {} ({})",
            i + 1,
            areas.len(),
            area.name,
            area.region
        );
        let places = collect_places(api, area, options)?;
        if places.is_empty() {
            info!(area = %area.name, "no places found");
        } else {
            info!(area = %area.name, found = places.len(), "places found");
        }
        all_places.extend(places);
    }

    let deduped = dedupe(all_places);
    info!("Removed {} duplicate places", deduped.removed);

    let ids: Vec<&str> = deduped.places.iter().map(|p| p.place_id.as_str()).collect();
    let batch = collect_reviews(api, &ids, options);
    info!(
        reviews = batch.reviews.len(),
        failed = batch.failed.len(),
        "review collection finished"
    );

    Ok(Collected {
        places: deduped.places,
        reviews: batch.reviews,
        failed_places: batch.failed,
        duplicates_removed: deduped.removed,
    })
}

/// Clean reviews, drop those whose place was not collected, then aggregate
/// places and join each kept review to its place.
pub fn process(collected: Collected) -> Dataset {
    let Collected {
        places,
        reviews,
        failed_places,
        duplicates_removed,
    } = collected;

    let mut reviews = clean_all(reviews);
    let known: HashSet<&str> = places.iter().map(|p| p.place_id.as_str()).collect();
    reviews.retain(|review| {
        let owned = known.contains(review.place_id.as_str());
        if !owned {
            warn!(place_id = %review.place_id, "dropping review without a collected place");
        }
        owned
    });

    let (place_rows, summary) = aggregate(places, &reviews);

    let owners: HashMap<&str, &PlaceRow> =
        place_rows.iter().map(|p| (p.place_id.as_str(), p)).collect();
    let review_rows: Vec<ReviewRow> = reviews
        .into_iter()
        .filter_map(|review| {
            let place = owners.get(review.place_id.as_str())?;
            Some(ReviewRow {
                neighborhood: place.neighborhood.clone(),
                region: place.region.clone(),
                review,
            })
        })
        .collect();

    Dataset {
        places: place_rows,
        reviews: review_rows,
        summary,
        failed_places,
        duplicates_removed,
    }
}

pub fn run<A>(api: &A, catalog: &AreaCatalog, options: &CollectOptions) -> Result<Dataset>
where
    A: PlacesApi + ?Sized,
{
    let collected = collect(api, catalog, options)?;
    let dataset = process(collected);
    info!(
        places = dataset.places.len(),
        reviews = dataset.reviews.len(),
        "pipeline finished"
    );
    Ok(dataset)
}
