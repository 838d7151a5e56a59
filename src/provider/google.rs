use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{DetailsRequest, NearbyPage, NearbyRequest, PlaceDetail, PlacesApi};
use crate::error::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

/// Google Places web service client (legacy JSON endpoints).
pub struct GoogleClient {
    http: Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    status: String,
    error_message: Option<String>,
    #[serde(flatten)]
    body: T,
}

#[derive(Default, Deserialize)]
struct DetailsBody {
    #[serde(default)]
    result: PlaceDetail,
}

impl GoogleClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, timeout, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        timeout: Duration,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(GoogleClient {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}/json", self.base_url, endpoint);
        debug!(endpoint, ?query, "provider request");
        let body = self
            .http
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()?
            .error_for_status()?
            .text()?;
        decode(&body)
    }
}

impl PlacesApi for GoogleClient {
    fn nearby_search(&self, request: &NearbyRequest) -> Result<NearbyPage, ProviderError> {
        self.get("nearbysearch", &nearby_query(request))
    }

    fn place_details(&self, request: &DetailsRequest) -> Result<PlaceDetail, ProviderError> {
        let body: DetailsBody = self.get("details", &details_query(request))?;
        Ok(body.result)
    }
}

fn nearby_query(request: &NearbyRequest) -> Vec<(&'static str, String)> {
    match request {
        NearbyRequest::Search {
            location,
            radius_meters,
            category,
            language,
        } => vec![
            ("location", location.to_query()),
            ("radius", radius_meters.to_string()),
            ("type", category.clone()),
            ("language", language.clone()),
        ],
        NearbyRequest::Page { token } => vec![("pagetoken", token.clone())],
    }
}

fn details_query(request: &DetailsRequest) -> Vec<(&'static str, String)> {
    vec![
        ("place_id", request.place_id.clone()),
        ("fields", DetailsRequest::FIELDS.join(",")),
        ("language", request.language.clone()),
    ]
}

/// Parse a response body and reject any status other than OK / ZERO_RESULTS.
fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ProviderError> {
    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    match envelope.status.as_str() {
        "OK" | "ZERO_RESULTS" => Ok(envelope.body),
        _ => Err(ProviderError::Status {
            message: envelope
                .error_message
                .unwrap_or_else(|| "no error message".to_string()),
            status: envelope.status,
        }),
    }
}
