//! Places provider seam: request shapes, typed response schemas and the
//! `PlacesApi` trait the collectors are written against.

pub mod google;

use serde::Deserialize;

use crate::error::ProviderError;
use crate::model::Coordinate;

/// A nearby-search request. Follow-up pages may only carry the token.
#[derive(Debug, Clone, PartialEq)]
pub enum NearbyRequest {
    Search {
        location: Coordinate,
        radius_meters: u32,
        category: String,
        language: String,
    },
    Page {
        token: String,
    },
}

/// Place-detail request. Field list is fixed to name + reviews.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailsRequest {
    pub place_id: String,
    pub language: String,
}

impl DetailsRequest {
    pub const FIELDS: [&'static str; 2] = ["name", "reviews"];
}

/// One page of nearby-search results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearbyPage {
    #[serde(default)]
    pub results: Vec<PlaceRecord>,
    pub next_page_token: Option<String>,
}

/// Nearby-search result record. Unknown fields are ignored, so this struct
/// is the field allow-list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlaceRecord {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<i64>,
    pub price_level: Option<i64>,
    #[serde(default)]
    pub types: Vec<String>,
    pub business_status: Option<String>,
}

/// The `result` object of a place-detail response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceDetail {
    pub name: Option<String>,
    #[serde(default)]
    pub reviews: Vec<ReviewRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReviewRecord {
    pub author_url: Option<String>,
    pub rating: Option<u8>,
    pub text: Option<String>,
    /// Epoch seconds.
    pub time: Option<i64>,
    pub relative_time_description: Option<String>,
}

/// Blocking access to the two provider endpoints the pipeline uses.
pub trait PlacesApi {
    fn nearby_search(&self, request: &NearbyRequest) -> Result<NearbyPage, ProviderError>;

    fn place_details(&self, request: &DetailsRequest) -> Result<PlaceDetail, ProviderError>;
}
