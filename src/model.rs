use std::collections::BTreeSet;

use chrono::NaiveDate;

/// Value written into missing numeric place fields before aggregation.
pub const MISSING_NUMERIC: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Provider wire format: `lat,lon`.
    pub fn to_query(&self) -> String {
        format!("{},{}", self.lat, self.lon)
    }
}

/// A configured search region. Identity is `name` + `region`.
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    pub name: String,
    pub region: String,
    pub center: Coordinate,
    pub radius_meters: u32,
}

/// A place as collected for one area, already reduced to the kept fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub place_id: String,
    pub name: String,
    pub rating: Option<f64>,
    pub total_ratings: Option<i64>,
    pub price_level: Option<i64>,
    pub types: BTreeSet<String>,
    pub business_status: Option<String>,
    /// Name of the area that first returned this place.
    pub neighborhood: String,
    pub region: String,
}

/// One review as returned by the detail request, before cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReview {
    pub place_id: String,
    pub place_name: String,
    pub author_id: Option<String>,
    pub rating: Option<u8>,
    pub text: Option<String>,
    pub review_date: Option<NaiveDate>,
    pub relative_time_description: Option<String>,
}

/// A cleaned review with derived text and calendar features.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub place_id: String,
    pub place_name: String,
    pub author_id: Option<String>,
    pub rating: Option<u8>,
    pub text: Option<String>,
    pub text_clean: String,
    pub text_length: usize,
    pub word_count: usize,
    pub review_date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    /// Monday = 0.
    pub day_of_week: Option<u32>,
    pub relative_time_description: Option<String>,
}

/// Output row of the places dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceRow {
    pub place_id: String,
    pub name: String,
    pub rating: f64,
    pub total_ratings: i64,
    pub price_level: i64,
    pub types: BTreeSet<String>,
    pub business_status: Option<String>,
    pub neighborhood: String,
    pub region: String,
    /// Quartile of `total_ratings` across all places, 1 (lowest) to 4.
    pub ratings_pct_tier: u8,
    pub rating_mean: Option<f64>,
    pub rating_std: Option<f64>,
    pub review_count: usize,
    pub text_length_mean: Option<f64>,
    pub word_count_mean: Option<f64>,
}

/// Output row of the reviews dataset: a cleaned review joined to its place.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRow {
    pub review: Review,
    pub neighborhood: String,
    pub region: String,
}
