//! Google Maps web-service adapter.
//!
//! Uses blocking `ureq` calls on tokio's blocking pool so the picker's event
//! loop stays responsive while a request is in flight.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::providers::{DetailField, NearbyRanking, PlaceProvider};
use super::types::{
    AddressComponent, Coordinate, NearbyPlace, PlaceCandidate, PlaceDetails, ProviderError, ReverseGeocode,
};
use crate::config::LocatorConfig;

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

const USER_AGENT: &str = concat!("VenueLocator/", env!("CARGO_PKG_VERSION"));

// ─── Wire types ─────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct AutocompleteResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    predictions: Vec<RawPrediction>,
}

#[derive(Deserialize, Debug)]
struct RawPrediction {
    place_id: String,
    description: String,
    #[serde(default)]
    structured_formatting: Option<RawStructuredFormatting>,
}

#[derive(Deserialize, Debug)]
struct RawStructuredFormatting {
    main_text: String,
    #[serde(default)]
    secondary_text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    result: Option<RawPlace>,
}

#[derive(Deserialize, Debug)]
struct NearbyResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<RawPlace>,
}

#[derive(Deserialize, Debug)]
struct RawPlace {
    #[serde(default)]
    place_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct RawGeometry {
    location: RawLatLng,
}

#[derive(Deserialize, Debug)]
struct RawLatLng {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize, Debug)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<RawGeocodeResult>,
}

#[derive(Deserialize, Debug)]
struct RawGeocodeResult {
    formatted_address: String,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TimezoneResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    time_zone_id: Option<String>,
}

// ─── Response decoding ──────────────────────────────────────────

/// Map a response envelope status to "has results" or an error.
fn check_status(status: &str, message: Option<&str>) -> Result<bool, ProviderError> {
    match status {
        "OK" => Ok(true),
        "ZERO_RESULTS" | "NOT_FOUND" => Ok(false),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => Err(ProviderError::RateLimited),
        "REQUEST_DENIED" => Err(ProviderError::MissingCredentials(
            message.unwrap_or("request denied").to_string(),
        )),
        other => Err(ProviderError::Status {
            status: other.to_string(),
            message: message.unwrap_or_default().to_string(),
        }),
    }
}

fn decode_autocomplete(resp: AutocompleteResponse) -> Result<Vec<PlaceCandidate>, ProviderError> {
    if !check_status(&resp.status, resp.error_message.as_deref())? {
        return Ok(vec![]);
    }
    Ok(resp
        .predictions
        .into_iter()
        .map(|p| {
            let (main_text, secondary_text) = match p.structured_formatting {
                Some(sf) => (sf.main_text, sf.secondary_text.unwrap_or_default()),
                None => {
                    let mut split = p.description.splitn(2, ',');
                    let main = split.next().unwrap_or_default().trim().to_string();
                    let rest = split.next().unwrap_or_default().trim().to_string();
                    (main, rest)
                }
            };
            PlaceCandidate {
                id: p.place_id,
                description: p.description,
                main_text,
                secondary_text,
            }
        })
        .collect())
}

fn decode_details(place_id: &str, resp: DetailsResponse) -> Result<PlaceDetails, ProviderError> {
    if !check_status(&resp.status, resp.error_message.as_deref())? {
        return Err(ProviderError::Status {
            status: resp.status,
            message: format!("no details for place {}", place_id),
        });
    }
    let place = resp
        .result
        .ok_or_else(|| ProviderError::InvalidResponse("details response without result".into()))?;
    let geometry = place
        .geometry
        .ok_or_else(|| ProviderError::InvalidResponse(format!("place {} has no geometry", place_id)))?;
    Ok(PlaceDetails {
        coordinate: Coordinate::new(geometry.location.lat, geometry.location.lng),
        address_components: place.address_components,
        name: place.name,
        formatted_address: place.formatted_address,
    })
}

fn decode_nearby(resp: NearbyResponse) -> Result<Vec<NearbyPlace>, ProviderError> {
    if !check_status(&resp.status, resp.error_message.as_deref())? {
        return Ok(vec![]);
    }
    let places = resp
        .results
        .into_iter()
        .filter_map(|r| {
            let id = r.place_id?;
            let geometry = r.geometry?;
            Some(NearbyPlace {
                name: r.name.unwrap_or_default(),
                id,
                types: r.types,
                coordinate: Coordinate::new(geometry.location.lat, geometry.location.lng),
            })
        })
        .collect();
    Ok(places)
}

fn decode_geocode(resp: GeocodeResponse) -> Result<Option<ReverseGeocode>, ProviderError> {
    if !check_status(&resp.status, resp.error_message.as_deref())? {
        return Ok(None);
    }
    Ok(resp.results.into_iter().next().map(|r| ReverseGeocode {
        formatted_address: r.formatted_address,
        address_components: r.address_components,
    }))
}

fn decode_timezone(resp: TimezoneResponse) -> Result<String, ProviderError> {
    if !check_status(&resp.status, resp.error_message.as_deref())? {
        return Err(ProviderError::Status {
            status: resp.status,
            message: "no timezone for coordinate".into(),
        });
    }
    resp.time_zone_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::InvalidResponse("no timeZoneId field".into()))
}

fn map_ureq_error(err: ureq::Error) -> ProviderError {
    match err {
        ureq::Error::Status(429, _) => ProviderError::RateLimited,
        ureq::Error::Status(code, resp) => ProviderError::Status {
            status: code.to_string(),
            message: resp.status_text().to_string(),
        },
        ureq::Error::Transport(t) => ProviderError::Network(t.to_string()),
    }
}

fn latlng_param(at: Coordinate) -> String {
    format!("{},{}", at.lat, at.lng)
}

// ─── Provider ───────────────────────────────────────────────────

/// Google Maps Places, Geocoding and Time Zone APIs.
#[derive(Clone)]
pub struct GoogleMapsProvider {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
}

impl GoogleMapsProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Build from configuration; fails when no API key is configured.
    pub fn from_config(config: &LocatorConfig) -> Result<Self, ProviderError> {
        let key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::MissingCredentials("no maps API key configured".into()))?;
        let mut provider = Self::new(key, config.request_timeout);
        if let Some(ref url) = config.provider_base_url {
            provider = provider.with_base_url(url.clone());
        }
        Ok(provider)
    }

    /// Point the adapter at a different host (proxy, test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T>(&self, endpoint: &'static str, params: Vec<(&'static str, String)>) -> Result<T, ProviderError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = format!("{}/{}", self.base_url, endpoint);
        let key = self.api_key.clone();

        debug!(endpoint, "map provider request");
        let result = tokio::task::spawn_blocking(move || {
            let mut request = agent.get(&url);
            for (name, value) in &params {
                request = request.query(name, value);
            }
            let response = request.query("key", &key).call().map_err(map_ureq_error)?;
            response
                .into_json::<T>()
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
        })
        .await
        .map_err(|e| ProviderError::Network(format!("request task failed: {}", e)))?;

        if let Err(ref e) = result {
            warn!(endpoint, error = %e, "map provider request failed");
        }
        result
    }
}

#[async_trait]
impl PlaceProvider for GoogleMapsProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn autocomplete(
        &self,
        text: &str,
        countries: Option<&[String]>,
    ) -> Result<Vec<PlaceCandidate>, ProviderError> {
        let mut params = vec![("input", text.to_string())];
        if let Some(codes) = countries.filter(|c| !c.is_empty()) {
            let components = codes
                .iter()
                .map(|c| format!("country:{}", c.to_lowercase()))
                .collect::<Vec<_>>()
                .join("|");
            params.push(("components", components));
        }
        let resp: AutocompleteResponse = self.get_json("place/autocomplete/json", params).await?;
        decode_autocomplete(resp)
    }

    async fn details(&self, place_id: &str, fields: &[DetailField]) -> Result<PlaceDetails, ProviderError> {
        let fields = fields.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(",");
        let params = vec![("place_id", place_id.to_string()), ("fields", fields)];
        let resp: DetailsResponse = self.get_json("place/details/json", params).await?;
        decode_details(place_id, resp)
    }

    async fn nearby_search(&self, at: Coordinate, ranking: NearbyRanking) -> Result<Vec<NearbyPlace>, ProviderError> {
        let mut params = vec![("location", latlng_param(at))];
        match ranking {
            NearbyRanking::Radius(meters) => params.push(("radius", meters.to_string())),
            NearbyRanking::ByDistance => {
                // rankby=distance requires a type or keyword.
                params.push(("rankby", "distance".to_string()));
                params.push(("type", "point_of_interest".to_string()));
            }
        }
        let resp: NearbyResponse = self.get_json("place/nearbysearch/json", params).await?;
        decode_nearby(resp)
    }

    async fn reverse_geocode(&self, at: Coordinate) -> Result<Option<ReverseGeocode>, ProviderError> {
        let params = vec![("latlng", latlng_param(at))];
        let resp: GeocodeResponse = self.get_json("geocode/json", params).await?;
        decode_geocode(resp)
    }

    async fn timezone(&self, at: Coordinate) -> Result<String, ProviderError> {
        let params = vec![
            ("location", latlng_param(at)),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];
        let resp: TimezoneResponse = self.get_json("timezone/json", params).await?;
        decode_timezone(resp)
    }
}
