use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::config::{pause, CollectOptions};
use crate::error::{PipelineError, Result};
use crate::model::{Area, Place};
use crate::provider::{NearbyRequest, PlaceRecord, PlacesApi};

/// Per-area pagination state. Lives only while one area is collected.
#[derive(Debug, Default)]
struct Cursor {
    page_token: Option<String>,
    pages_fetched: usize,
}

impl Cursor {
    fn next_request(&self, area: &Area, options: &CollectOptions) -> NearbyRequest {
        match &self.page_token {
            None => NearbyRequest::Search {
                location: area.center,
                radius_meters: area.radius_meters,
                category: options.category.clone(),
                language: options.language.clone(),
            },
            Some(token) => NearbyRequest::Page {
                token: token.clone(),
            },
        }
    }
}

/// Collect every place the provider lists for one area, following page
/// tokens up to `max_pages_per_area`. Any provider failure is fatal.
pub fn collect_places<A>(api: &A, area: &Area, options: &CollectOptions) -> Result<Vec<Place>>
where
    A: PlacesApi + ?Sized,
{
    let limits = &options.limits;
    let mut cursor = Cursor::default();
    let mut places = Vec::new();

    loop {
        if cursor.page_token.is_some() {
            // tokens are rejected until the provider has had time to activate them
            pause(limits.inter_page_delay);
        }
        let request = cursor.next_request(area, options);
        let page = api
            .nearby_search(&request)
            .map_err(|source| PipelineError::NearbySearch {
                area: area.name.clone(),
                page: cursor.pages_fetched + 1,
                source,
            })?;
        cursor.pages_fetched += 1;
        debug!(
            area = %area.name,
            page = cursor.pages_fetched,
            results = page.results.len(),
            "nearby page"
        );

        places.extend(
            page.results
                .into_iter()
                .filter_map(|record| tag_record(record, area)),
        );

        cursor.page_token = page.next_page_token.filter(|t| !t.is_empty());
        if cursor.page_token.is_none() {
            break;
        }
        if cursor.pages_fetched >= limits.page_cap() {
            debug!(area = %area.name, "page cap reached, dropping remaining token");
            break;
        }
    }

    Ok(places)
}

fn tag_record(record: PlaceRecord, area: &Area) -> Option<Place> {
    let Some(place_id) = record.place_id.filter(|id| !id.is_empty()) else {
        warn!(area = %area.name, name = ?record.name, "skipping result without place_id");
        return None;
    };
    Some(Place {
        place_id,
        name: record.name.unwrap_or_default(),
        rating: record.rating,
        total_ratings: record.user_ratings_total,
        price_level: record.price_level,
        types: record.types.into_iter().collect::<BTreeSet<_>>(),
        business_status: record.business_status,
        neighborhood: area.name.clone(),
        region: area.region.clone(),
    })
}
