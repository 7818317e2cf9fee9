//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A WGS84 point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a coordinate from user input, rejecting out-of-range values.
    pub fn checked(lat: f64, lng: f64) -> Result<Self, LocationError> {
        if !lat.is_finite() || !lng.is_finite() || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(LocationError::InvalidCoordinate { lat, lng });
        }
        Ok(Self { lat, lng })
    }

    /// Straight-line distance in degree space.
    ///
    /// Not geodesic. Good enough at city scale for thresholds of tens to
    /// hundreds of meters; it degrades near the poles.
    pub fn planar_distance(&self, other: &Coordinate) -> f64 {
        let dlat = self.lat - other.lat;
        let dlng = self.lng - other.lng;
        (dlat * dlat + dlng * dlng).sqrt()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lng >= 0.0 { 'E' } else { 'W' };
        write!(f, "{:.4}\u{00B0} {}, {:.4}\u{00B0} {}", self.lat.abs(), ns, self.lng.abs(), ew)
    }
}

/// An autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub id: String,
    pub description: String,
    pub main_text: String,
    #[serde(default)]
    pub secondary_text: String,
}

/// One piece of a structured address (locality, route, country, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

impl AddressComponent {
    pub fn has_type(&self, tag: &str) -> bool {
        self.types.iter().any(|t| t == tag)
    }
}

/// Details for a single place, keyed by its provider id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub coordinate: Coordinate,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
}

/// A place returned by a search around a clicked point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    pub coordinate: Coordinate,
}

/// Raw reverse-geocode result for a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseGeocode {
    pub formatted_address: String,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

/// How a confirmed location was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Autocomplete,
    MapPoi,
    MapAddress,
    Manual,
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Autocomplete => write!(f, "Autocomplete"),
            Self::MapPoi => write!(f, "Map (place)"),
            Self::MapAddress => write!(f, "Map (address)"),
            Self::Manual => write!(f, "Manual"),
        }
    }
}

/// A confirmed location: name, coordinate, and timezone.
///
/// There is no way to build one without a coordinate. Text-only confirmations
/// are carried by [`LocationSelection`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub display_name: String,
    pub coordinate: Coordinate,
    pub timezone: String,
    pub source: LocationSource,
}

impl ResolvedLocation {
    pub fn display_line(&self) -> String {
        format!(
            "\u{1F4CD} {}\n  \u{1F552} {}\n  \u{1F4D0} {}",
            self.display_name, self.timezone, self.coordinate
        )
    }
}

/// What the event form receives on every confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSelection {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<Coordinate>,
}

impl LocationSelection {
    /// A selection carrying only text, e.g. when a details lookup failed.
    pub fn text_only(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            timezone: None,
            coordinate: None,
        }
    }
}

impl From<ResolvedLocation> for LocationSelection {
    fn from(loc: ResolvedLocation) -> Self {
        Self {
            display_name: loc.display_name,
            timezone: Some(loc.timezone),
            coordinate: Some(loc.coordinate),
        }
    }
}

/// Failures reported by a [`PlaceProvider`](super::providers::PlaceProvider).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("map provider is not configured: {0}")]
    MissingCredentials(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by map provider")]
    RateLimited,

    #[error("map provider returned status {status}: {message}")]
    Status { status: String, message: String },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Location resolution errors.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("no results for {0}")]
    NoResult(String),

    #[error("invalid coordinate ({lat}, {lng}): latitude must be within -90..90 and longitude within -180..180")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
