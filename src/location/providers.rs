//! Map provider capability surface.
//!
//! The rest of the subsystem only talks to a provider through
//! [`PlaceProvider`]. The concrete HTTP adapter lives in [`super::google`].

use async_trait::async_trait;

use super::types::{Coordinate, NearbyPlace, PlaceCandidate, PlaceDetails, ProviderError, ReverseGeocode};

/// Fields that can be requested from a details lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailField {
    Geometry,
    AddressComponents,
    Name,
    FormattedAddress,
}

impl DetailField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::AddressComponents => "address_components",
            Self::Name => "name",
            Self::FormattedAddress => "formatted_address",
        }
    }
}

/// Fields for an autocomplete selection: coordinates and address only.
pub const SELECTION_FIELDS: &[DetailField] = &[DetailField::Geometry, DetailField::AddressComponents];

/// Fields for a map click, which also needs the place's own name.
pub const CLICK_FIELDS: &[DetailField] = &[
    DetailField::Geometry,
    DetailField::AddressComponents,
    DetailField::Name,
    DetailField::FormattedAddress,
];

/// How a nearby search ranks and bounds its results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NearbyRanking {
    /// Everything within this many meters.
    Radius(u32),
    /// Closest places first, no fixed radius.
    ByDistance,
}

/// A mapping/geocoding/timezone backend.
#[async_trait]
pub trait PlaceProvider: Send + Sync + 'static {
    /// Short name used in logs and status output.
    fn name(&self) -> &str;

    /// Whether the provider can serve requests at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Typeahead suggestions, optionally restricted to ISO country codes.
    async fn autocomplete(
        &self,
        text: &str,
        countries: Option<&[String]>,
    ) -> Result<Vec<PlaceCandidate>, ProviderError>;

    /// Details for a candidate id, limited to `fields`.
    async fn details(&self, place_id: &str, fields: &[DetailField]) -> Result<PlaceDetails, ProviderError>;

    /// Places around a coordinate.
    async fn nearby_search(&self, at: Coordinate, ranking: NearbyRanking) -> Result<Vec<NearbyPlace>, ProviderError>;

    /// Address for a coordinate; `None` when the provider knows nothing there.
    async fn reverse_geocode(&self, at: Coordinate) -> Result<Option<ReverseGeocode>, ProviderError>;

    /// IANA timezone name for a coordinate.
    async fn timezone(&self, at: Coordinate) -> Result<String, ProviderError>;
}

/// Stand-in used when the real provider is misconfigured (e.g. no API key).
///
/// Every call fails with [`ProviderError::MissingCredentials`], so callers
/// degrade through their normal fallback paths.
#[derive(Debug, Clone)]
pub struct UnavailableProvider {
    reason: String,
}

impl UnavailableProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn err<T>(&self) -> Result<T, ProviderError> {
        Err(ProviderError::MissingCredentials(self.reason.clone()))
    }
}

#[async_trait]
impl PlaceProvider for UnavailableProvider {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn autocomplete(&self, _text: &str, _countries: Option<&[String]>) -> Result<Vec<PlaceCandidate>, ProviderError> {
        self.err()
    }

    async fn details(&self, _place_id: &str, _fields: &[DetailField]) -> Result<PlaceDetails, ProviderError> {
        self.err()
    }

    async fn nearby_search(&self, _at: Coordinate, _ranking: NearbyRanking) -> Result<Vec<NearbyPlace>, ProviderError> {
        self.err()
    }

    async fn reverse_geocode(&self, _at: Coordinate) -> Result<Option<ReverseGeocode>, ProviderError> {
        self.err()
    }

    async fn timezone(&self, _at: Coordinate) -> Result<String, ProviderError> {
        self.err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names() {
        let names: Vec<&str> = CLICK_FIELDS.iter().map(|f| f.as_str()).collect();
        assert_eq!(names, ["geometry", "address_components", "name", "formatted_address"]);
        assert!(!SELECTION_FIELDS.contains(&DetailField::Name));
    }

    #[tokio::test]
    async fn test_unavailable_provider_fails_every_call() {
        let p = UnavailableProvider::new("VENUE_MAPS_API_KEY is not set");
        assert!(!p.is_available());
        let at = Coordinate::new(-6.2, 106.8);
        assert!(matches!(
            p.autocomplete("mall", None).await,
            Err(ProviderError::MissingCredentials(_))
        ));
        assert!(p.timezone(at).await.is_err());
        assert!(p.reverse_geocode(at).await.is_err());
        assert!(p.nearby_search(at, NearbyRanking::ByDistance).await.is_err());
        assert!(p.details("x", SELECTION_FIELDS).await.is_err());
    }
}
