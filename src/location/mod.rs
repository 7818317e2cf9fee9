//! Location resolution for venue pickers.
//!
//! Turns autocomplete picks, map clicks and free text into a display name,
//! coordinate and IANA timezone.

pub mod address;
pub mod controller;
pub mod disambiguator;
pub mod google;
pub mod priority;
pub mod providers;
pub mod resolver;
pub mod timezone;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use address::AddressFormatter;
pub use controller::{PickerEvent, PickerHandle, PickerPhase, PickerState, SearchController};
pub use disambiguator::Disambiguator;
pub use google::GoogleMapsProvider;
pub use providers::{PlaceProvider, UnavailableProvider};
pub use resolver::{LocationResolver, MapClick};
pub use types::{Coordinate, LocationError, LocationSelection, LocationSource, PlaceCandidate, ProviderError, ResolvedLocation};
