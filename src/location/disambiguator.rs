//! Map-click disambiguation.
//!
//! Resolves a click to the real-world entity the user most likely meant.
//! Candidates are ranked by POI priority first and distance second, so a
//! farther mall beats a closer shop inside it. Only the top-ranked candidate
//! is tested against its distance threshold; if it fails, the click is treated
//! as landing on a plain street address.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::address::AddressFormatter;
use super::priority::{accepts, distance_threshold, priority_of};
use super::providers::{NearbyRanking, PlaceProvider, CLICK_FIELDS};
use super::types::{Coordinate, LocationError, LocationSource, NearbyPlace};

pub const DEFAULT_SEARCH_RADIUS_M: u32 = 300;
pub const DEFAULT_NEAREST_LIMIT: usize = 10;

/// A nearby place with its priority and distance from the click.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPlace {
    pub place: NearbyPlace,
    pub priority: u8,
    pub distance: f64,
}

impl ScoredPlace {
    pub fn accepted(&self) -> bool {
        accepts(self.priority, self.distance)
    }
}

/// Rank candidates: priority descending, then distance ascending.
/// The sort is stable, so exact ties keep their input order.
pub fn rank(click: Coordinate, places: &[NearbyPlace]) -> Vec<ScoredPlace> {
    let mut scored: Vec<ScoredPlace> = places
        .iter()
        .map(|p| ScoredPlace {
            priority: priority_of(&p.types),
            distance: click.planar_distance(&p.coordinate),
            place: p.clone(),
        })
        .collect();
    scored.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal))
    });
    scored
}

/// The top-ranked candidate, if it is close enough to count as clicked.
pub fn select(click: Coordinate, places: &[NearbyPlace]) -> Option<ScoredPlace> {
    let top = rank(click, places).into_iter().next()?;
    if top.accepted() {
        Some(top)
    } else {
        debug!(
            place = %top.place.name,
            priority = top.priority,
            distance = top.distance,
            threshold = distance_threshold(top.priority),
            "top candidate too far from click"
        );
        None
    }
}

/// Result of resolving a click, before a timezone is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickResolution {
    pub display_name: String,
    pub coordinate: Coordinate,
    pub source: LocationSource,
}

/// Runs the nearby search, selection, and address fallback against a provider.
#[derive(Clone)]
pub struct Disambiguator {
    provider: Arc<dyn PlaceProvider>,
    formatter: AddressFormatter,
    radius_m: u32,
    nearest_limit: usize,
}

impl Disambiguator {
    pub fn new(provider: Arc<dyn PlaceProvider>, formatter: AddressFormatter) -> Self {
        Self {
            provider,
            formatter,
            radius_m: DEFAULT_SEARCH_RADIUS_M,
            nearest_limit: DEFAULT_NEAREST_LIMIT,
        }
    }

    pub fn with_radius(mut self, radius_m: u32) -> Self {
        self.radius_m = radius_m;
        self
    }

    pub fn with_nearest_limit(mut self, limit: usize) -> Self {
        self.nearest_limit = limit.max(1);
        self
    }

    /// A click that only carries a coordinate.
    pub async fn resolve_coordinate_click(&self, click: Coordinate) -> Result<ClickResolution, LocationError> {
        self.resolve(click, None).await
    }

    /// A click on a provider-rendered POI that came with its own place id.
    ///
    /// Runs the same selection; the clicked place is used only when no nearby
    /// candidate is accepted.
    pub async fn resolve_place_click(&self, click: Coordinate, place_id: &str) -> Result<ClickResolution, LocationError> {
        self.resolve(click, Some(place_id)).await
    }

    async fn resolve(&self, click: Coordinate, clicked_place: Option<&str>) -> Result<ClickResolution, LocationError> {
        let candidates = self.gather_candidates(click).await;

        if let Some(best) = select(click, &candidates) {
            info!(
                place = %best.place.name,
                priority = best.priority,
                distance = best.distance,
                "click resolved to place"
            );
            return Ok(self.place_resolution(&best.place).await);
        }

        if let Some(place_id) = clicked_place {
            match self.provider.details(place_id, CLICK_FIELDS).await {
                Ok(details) => {
                    let name = details
                        .name
                        .as_deref()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string)
                        .or_else(|| details.formatted_address.as_deref().map(|a| self.formatter.format_text(a)))
                        .filter(|n| !n.is_empty());
                    if let Some(display_name) = name {
                        info!(place_id, name = %display_name, "click resolved to clicked place");
                        return Ok(ClickResolution {
                            display_name,
                            coordinate: details.coordinate,
                            source: LocationSource::MapPoi,
                        });
                    }
                }
                Err(e) => warn!(place_id, error = %e, "details lookup for clicked place failed"),
            }
        }

        self.address_resolution(click).await
    }

    /// Radius search, then nearest-neighbour search when the radius is empty.
    /// Provider failures count as no candidates.
    async fn gather_candidates(&self, click: Coordinate) -> Vec<NearbyPlace> {
        let within_radius = match self.provider.nearby_search(click, NearbyRanking::Radius(self.radius_m)).await {
            Ok(places) => places,
            Err(e) => {
                warn!(error = %e, "radius search failed");
                vec![]
            }
        };
        if !within_radius.is_empty() {
            return within_radius;
        }

        // A venue's centroid can sit just outside a small radius.
        match self.provider.nearby_search(click, NearbyRanking::ByDistance).await {
            Ok(mut places) => {
                places.truncate(self.nearest_limit);
                places
            }
            Err(e) => {
                warn!(error = %e, "nearest-place search failed");
                vec![]
            }
        }
    }

    async fn place_resolution(&self, place: &NearbyPlace) -> ClickResolution {
        match self.provider.details(&place.id, CLICK_FIELDS).await {
            Ok(details) => {
                let display_name = details
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| place.name.clone());
                ClickResolution {
                    display_name,
                    coordinate: details.coordinate,
                    source: LocationSource::MapPoi,
                }
            }
            Err(e) => {
                warn!(place_id = %place.id, error = %e, "details lookup failed, using nearby result");
                ClickResolution {
                    display_name: place.name.clone(),
                    coordinate: place.coordinate,
                    source: LocationSource::MapPoi,
                }
            }
        }
    }

    async fn address_resolution(&self, click: Coordinate) -> Result<ClickResolution, LocationError> {
        let reverse = self.provider.reverse_geocode(click).await.map_err(|e| {
            warn!(error = %e, "reverse geocode failed");
            e
        })?;
        let reverse = reverse.ok_or_else(|| LocationError::NoResult(click.to_string()))?;

        let display_name = self.formatter.format(&reverse.formatted_address, &reverse.address_components);
        if display_name.is_empty() {
            return Err(LocationError::NoResult(click.to_string()));
        }
        info!(name = %display_name, "click resolved to street address");
        Ok(ClickResolution {
            display_name,
            coordinate: click,
            source: LocationSource::MapAddress,
        })
    }
}
