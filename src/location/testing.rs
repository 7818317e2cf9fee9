//! In-memory provider for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::providers::{DetailField, NearbyRanking, PlaceProvider};
use super::types::{
    Coordinate, NearbyPlace, PlaceCandidate, PlaceDetails, ProviderError, ReverseGeocode,
};

/// A provider that answers from canned data and records every call.
pub struct FakeProvider {
    autocomplete: HashMap<String, (Duration, Result<Vec<PlaceCandidate>, ProviderError>)>,
    details: HashMap<String, Result<PlaceDetails, ProviderError>>,
    nearby_radius: Result<Vec<NearbyPlace>, ProviderError>,
    nearby_closest: Result<Vec<NearbyPlace>, ProviderError>,
    reverse: Result<Option<ReverseGeocode>, ProviderError>,
    timezone: Result<String, ProviderError>,
    pub calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            autocomplete: HashMap::new(),
            details: HashMap::new(),
            nearby_radius: Ok(vec![]),
            nearby_closest: Ok(vec![]),
            reverse: Ok(None),
            timezone: Ok("Asia/Jakarta".into()),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn with_autocomplete(mut self, text: &str, delay: Duration, candidates: Vec<PlaceCandidate>) -> Self {
        self.autocomplete.insert(text.to_string(), (delay, Ok(candidates)));
        self
    }

    pub fn with_autocomplete_error(mut self, text: &str, err: ProviderError) -> Self {
        self.autocomplete.insert(text.to_string(), (Duration::ZERO, Err(err)));
        self
    }

    pub fn with_details(mut self, id: &str, details: Result<PlaceDetails, ProviderError>) -> Self {
        self.details.insert(id.to_string(), details);
        self
    }

    pub fn with_nearby(mut self, places: Vec<NearbyPlace>) -> Self {
        self.nearby_radius = Ok(places);
        self
    }

    pub fn with_nearby_closest(mut self, places: Vec<NearbyPlace>) -> Self {
        self.nearby_closest = Ok(places);
        self
    }

    pub fn with_reverse(mut self, reverse: Result<Option<ReverseGeocode>, ProviderError>) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn with_timezone(mut self, timezone: Result<String, ProviderError>) -> Self {
        self.timezone = timezone;
        self
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push((call, Instant::now()));
    }

    pub fn calls_named(&self, prefix: &str) -> Vec<(String, Instant)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c.starts_with(prefix))
            .cloned()
            .collect()
    }
}

pub fn candidate(id: &str, description: &str) -> PlaceCandidate {
    let main = description.split(',').next().unwrap_or(description).trim().to_string();
    PlaceCandidate {
        id: id.into(),
        description: description.into(),
        main_text: main,
        secondary_text: String::new(),
    }
}

pub fn nearby(id: &str, name: &str, types: &[&str], lat: f64, lng: f64) -> NearbyPlace {
    NearbyPlace {
        id: id.into(),
        name: name.into(),
        types: types.iter().map(|t| t.to_string()).collect(),
        coordinate: Coordinate::new(lat, lng),
    }
}

pub fn details(name: &str, lat: f64, lng: f64) -> PlaceDetails {
    PlaceDetails {
        coordinate: Coordinate::new(lat, lng),
        address_components: vec![],
        name: Some(name.into()),
        formatted_address: None,
    }
}

#[async_trait]
impl PlaceProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn autocomplete(&self, text: &str, _countries: Option<&[String]>) -> Result<Vec<PlaceCandidate>, ProviderError> {
        self.record(format!("autocomplete:{}", text));
        match self.autocomplete.get(text) {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                result.clone()
            }
            None => Ok(vec![]),
        }
    }

    async fn details(&self, place_id: &str, _fields: &[DetailField]) -> Result<PlaceDetails, ProviderError> {
        self.record(format!("details:{}", place_id));
        self.details
            .get(place_id)
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::Status {
                status: "NOT_FOUND".into(),
                message: place_id.to_string(),
            }))
    }

    async fn nearby_search(&self, _at: Coordinate, ranking: NearbyRanking) -> Result<Vec<NearbyPlace>, ProviderError> {
        match ranking {
            NearbyRanking::Radius(m) => {
                self.record(format!("nearby:radius:{}", m));
                self.nearby_radius.clone()
            }
            NearbyRanking::ByDistance => {
                self.record("nearby:closest".to_string());
                self.nearby_closest.clone()
            }
        }
    }

    async fn reverse_geocode(&self, _at: Coordinate) -> Result<Option<ReverseGeocode>, ProviderError> {
        self.record("reverse".to_string());
        self.reverse.clone()
    }

    async fn timezone(&self, _at: Coordinate) -> Result<String, ProviderError> {
        self.record("timezone".to_string());
        self.timezone.clone()
    }
}
