//! Location resolver: the confirmation paths.
//!
//! Autocomplete selection: details → coordinate → timezone
//! Map click:              disambiguator → timezone
//! Typed text:             no coordinate, timezone from the offline table
//! Manual coordinates:     reverse geocode (best effort) → timezone

use std::sync::Arc;

use tracing::{info, warn};

use super::address::AddressFormatter;
use super::disambiguator::Disambiguator;
use super::google::GoogleMapsProvider;
use super::providers::{PlaceProvider, UnavailableProvider, SELECTION_FIELDS};
use super::timezone::TimezoneResolver;
use super::types::{Coordinate, LocationError, LocationSelection, LocationSource, PlaceCandidate, ResolvedLocation};
use crate::config::LocatorConfig;

/// A click on the map, optionally on a provider-rendered POI.
#[derive(Debug, Clone, PartialEq)]
pub struct MapClick {
    pub coordinate: Coordinate,
    pub place_id: Option<String>,
}

impl MapClick {
    pub fn at(coordinate: Coordinate) -> Self {
        Self { coordinate, place_id: None }
    }

    pub fn on_place(coordinate: Coordinate, place_id: impl Into<String>) -> Self {
        Self {
            coordinate,
            place_id: Some(place_id.into()),
        }
    }
}

/// Bundles the provider, disambiguator, formatter and timezone resolver.
#[derive(Clone)]
pub struct LocationResolver {
    provider: Arc<dyn PlaceProvider>,
    disambiguator: Disambiguator,
    timezones: TimezoneResolver,
    formatter: AddressFormatter,
    countries: Vec<String>,
}

impl LocationResolver {
    pub fn new(provider: Arc<dyn PlaceProvider>, config: &LocatorConfig) -> Self {
        let formatter = AddressFormatter::new(config.home_country.clone(), config.home_country_code.clone());
        let disambiguator = Disambiguator::new(provider.clone(), formatter.clone())
            .with_radius(config.search_radius_m)
            .with_nearest_limit(config.nearest_limit);
        Self {
            timezones: TimezoneResolver::new(provider.clone()),
            provider,
            disambiguator,
            formatter,
            countries: config.autocomplete_countries.clone(),
        }
    }

    /// Build the Google provider from config, or an unavailable stand-in when
    /// offline or missing credentials.
    pub fn from_config(config: &LocatorConfig) -> Self {
        let provider: Arc<dyn PlaceProvider> = if config.offline {
            Arc::new(UnavailableProvider::new("offline mode"))
        } else {
            match GoogleMapsProvider::from_config(config) {
                Ok(p) => Arc::new(p),
                Err(e) => {
                    warn!(error = %e, "map provider unavailable");
                    Arc::new(UnavailableProvider::new(e.to_string()))
                }
            }
        };
        Self::new(provider, config)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    /// Autocomplete with the configured country allow-list.
    pub async fn autocomplete(&self, text: &str) -> Vec<PlaceCandidate> {
        let countries = (!self.countries.is_empty()).then_some(self.countries.as_slice());
        self.autocomplete_in(text, countries).await
    }

    /// Autocomplete with an explicit allow-list (`None` for worldwide).
    /// Failures yield an empty list.
    pub async fn autocomplete_in(&self, text: &str, countries: Option<&[String]>) -> Vec<PlaceCandidate> {
        let text = text.trim();
        if text.is_empty() {
            return vec![];
        }
        match self.provider.autocomplete(text, countries).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(query = text, error = %e, "autocomplete failed");
                vec![]
            }
        }
    }

    /// Confirm an autocomplete row.
    ///
    /// When the details lookup fails the candidate's description is kept
    /// without coordinate or timezone.
    pub async fn select_candidate(&self, candidate: &PlaceCandidate) -> LocationSelection {
        match self.provider.details(&candidate.id, SELECTION_FIELDS).await {
            Ok(details) => {
                let timezone = self.timezones.resolve(details.coordinate).await;
                info!(place = %candidate.description, timezone = %timezone, "candidate resolved");
                ResolvedLocation {
                    display_name: candidate.description.clone(),
                    coordinate: details.coordinate,
                    timezone,
                    source: LocationSource::Autocomplete,
                }
                .into()
            }
            Err(e) => {
                warn!(place_id = %candidate.id, error = %e, "details lookup failed, keeping description only");
                LocationSelection::text_only(candidate.description.clone())
            }
        }
    }

    /// Resolve a map click to a place or street address.
    pub async fn resolve_click(&self, click: &MapClick) -> Result<ResolvedLocation, LocationError> {
        let resolution = match click.place_id.as_deref() {
            Some(place_id) => self.disambiguator.resolve_place_click(click.coordinate, place_id).await?,
            None => self.disambiguator.resolve_coordinate_click(click.coordinate).await?,
        };
        let timezone = self.timezones.resolve(resolution.coordinate).await;
        Ok(ResolvedLocation {
            display_name: resolution.display_name,
            coordinate: resolution.coordinate,
            timezone,
            source: resolution.source,
        })
    }

    /// Confirm free text with no coordinate. `None` for blank text.
    pub fn resolve_typed(&self, text: &str) -> Option<LocationSelection> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(LocationSelection {
            display_name: text.to_string(),
            timezone: Some(self.timezones.resolve_text(text)),
            coordinate: None,
        })
    }

    /// Create a location from raw coordinates.
    ///
    /// The name comes from reverse geocoding when possible, else the
    /// coordinate itself.
    pub async fn resolve_manual(&self, coordinate: Coordinate) -> ResolvedLocation {
        let display_name = match self.provider.reverse_geocode(coordinate).await {
            Ok(Some(r)) => self.formatter.format(&r.formatted_address, &r.address_components),
            Ok(None) => String::new(),
            Err(e) => {
                warn!(error = %e, "reverse geocode for manual coordinate failed");
                String::new()
            }
        };
        let display_name = if display_name.is_empty() {
            format!("{:.4}, {:.4}", coordinate.lat, coordinate.lng)
        } else {
            display_name
        };
        ResolvedLocation {
            display_name,
            coordinate,
            timezone: self.timezones.resolve(coordinate).await,
            source: LocationSource::Manual,
        }
    }

    pub async fn timezone(&self, coordinate: Coordinate) -> String {
        self.timezones.resolve(coordinate).await
    }

    pub fn format_address(&self, address: &str) -> String {
        self.formatter.format_text(address)
    }
}
