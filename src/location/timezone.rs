//! Timezone resolution.
//!
//! Primary path: the provider's timezone lookup.
//! Fallback path: a fixed table of lat/lng boxes, then a default zone.
//! Both paths hand back a plain IANA name; which one was used is only logged.

use std::sync::Arc;

use chrono::{Offset, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use super::providers::PlaceProvider;
use super::types::Coordinate;

/// Zone used when a coordinate falls outside every box.
pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";

struct TzBox {
    /// Names that identify this region in typed text.
    names: &'static [&'static str],
    lat_min: f64,
    lat_max: f64,
    lng_min: f64,
    lng_max: f64,
    tz: &'static str,
}

impl TzBox {
    fn contains(&self, c: &Coordinate) -> bool {
        (self.lat_min..=self.lat_max).contains(&c.lat) && (self.lng_min..=self.lng_max).contains(&c.lng)
    }
}

// First match wins, so city boxes come before the broad national ones.
const TZ_BOXES: &[TzBox] = &[
    TzBox {
        names: &["singapore"],
        lat_min: 1.15,
        lat_max: 1.48,
        lng_min: 103.6,
        lng_max: 104.1,
        tz: "Asia/Singapore",
    },
    TzBox {
        names: &["kuala lumpur"],
        lat_min: 2.9,
        lat_max: 3.3,
        lng_min: 101.5,
        lng_max: 101.8,
        tz: "Asia/Kuala_Lumpur",
    },
    TzBox {
        names: &["bangkok"],
        lat_min: 13.5,
        lat_max: 14.0,
        lng_min: 100.3,
        lng_max: 100.95,
        tz: "Asia/Bangkok",
    },
    TzBox {
        names: &["ho chi minh", "saigon"],
        lat_min: 10.6,
        lat_max: 11.0,
        lng_min: 106.5,
        lng_max: 106.9,
        tz: "Asia/Ho_Chi_Minh",
    },
    TzBox {
        names: &["manila"],
        lat_min: 14.3,
        lat_max: 14.9,
        lng_min: 120.9,
        lng_max: 121.2,
        tz: "Asia/Manila",
    },
    TzBox {
        names: &["hong kong"],
        lat_min: 22.15,
        lat_max: 22.56,
        lng_min: 113.8,
        lng_max: 114.45,
        tz: "Asia/Hong_Kong",
    },
    TzBox {
        names: &["seoul"],
        lat_min: 37.4,
        lat_max: 37.7,
        lng_min: 126.8,
        lng_max: 127.2,
        tz: "Asia/Seoul",
    },
    TzBox {
        names: &["tokyo"],
        lat_min: 35.5,
        lat_max: 35.9,
        lng_min: 139.5,
        lng_max: 140.0,
        tz: "Asia/Tokyo",
    },
    // Neighbours inside the Indonesian bands. Boxes stay clear of the Sumatran
    // coast across the Strait of Malacca.
    // Peninsular Malaysia, north
    TzBox {
        names: &["penang", "ipoh", "kedah", "kelantan", "terengganu", "pahang"],
        lat_min: 2.8,
        lat_max: 6.8,
        lng_min: 100.1,
        lng_max: 104.6,
        tz: "Asia/Kuala_Lumpur",
    },
    TzBox {
        names: &["port dickson", "negeri sembilan"],
        lat_min: 2.3,
        lat_max: 2.8,
        lng_min: 101.3,
        lng_max: 102.2,
        tz: "Asia/Kuala_Lumpur",
    },
    // Peninsular Malaysia, south
    TzBox {
        names: &["malacca", "melaka", "johor", "johor bahru"],
        lat_min: 1.25,
        lat_max: 2.8,
        lng_min: 102.2,
        lng_max: 104.6,
        tz: "Asia/Kuala_Lumpur",
    },
    TzBox {
        names: &["brunei", "bandar seri begawan"],
        lat_min: 4.0,
        lat_max: 5.1,
        lng_min: 114.0,
        lng_max: 115.4,
        tz: "Asia/Brunei",
    },
    TzBox {
        names: &["sabah", "kota kinabalu", "sandakan"],
        lat_min: 4.3,
        lat_max: 7.5,
        lng_min: 115.3,
        lng_max: 119.3,
        tz: "Asia/Kuching",
    },
    TzBox {
        names: &["sarawak", "kuching", "miri", "sibu"],
        lat_min: 1.45,
        lat_max: 5.0,
        lng_min: 109.6,
        lng_max: 115.5,
        tz: "Asia/Kuching",
    },
    // Timor-Leste, east of the West Timor border
    TzBox {
        names: &["dili", "timor leste"],
        lat_min: -9.5,
        lat_max: -8.1,
        lng_min: 125.0,
        lng_max: 127.3,
        tz: "Asia/Dili",
    },
    // Indonesia, eastern time (Maluku, Papua)
    TzBox {
        names: &["papua", "jayapura", "ambon", "maluku", "sorong"],
        lat_min: -11.0,
        lat_max: 6.0,
        lng_min: 127.0,
        lng_max: 141.5,
        tz: "Asia/Jayapura",
    },
    // Indonesia, central time (Bali, Nusa Tenggara, Sulawesi)
    TzBox {
        names: &["bali", "denpasar", "makassar", "lombok", "manado", "kupang", "balikpapan"],
        lat_min: -11.0,
        lat_max: 6.0,
        lng_min: 114.5,
        lng_max: 127.0,
        tz: "Asia/Makassar",
    },
    // Indonesia, western time (Sumatra, Java)
    TzBox {
        names: &["jakarta", "bandung", "surabaya", "medan", "yogyakarta", "semarang", "palembang"],
        lat_min: -11.0,
        lat_max: 6.0,
        lng_min: 95.0,
        lng_max: 114.5,
        tz: "Asia/Jakarta",
    },
];

/// Offline approximation for a coordinate. Pure and infallible.
pub fn approximate(coord: Coordinate) -> &'static str {
    TZ_BOXES
        .iter()
        .find(|b| b.contains(&coord))
        .map(|b| b.tz)
        .unwrap_or(DEFAULT_TIMEZONE)
}

/// Offline approximation for typed text with no coordinate.
///
/// Looks for a known region name as a whole word; anything else gets the
/// default zone.
pub fn approximate_for_text(text: &str) -> &'static str {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let haystack = format!(" {} ", words.join(" "));

    TZ_BOXES
        .iter()
        .find(|b| b.names.iter().any(|n| haystack.contains(&format!(" {} ", n))))
        .map(|b| b.tz)
        .unwrap_or(DEFAULT_TIMEZONE)
}

/// Parse an IANA name, rejecting anything `chrono-tz` doesn't know.
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Current UTC offset of a zone, e.g. `UTC+07:00`.
pub fn utc_offset_label(name: &str) -> Option<String> {
    let tz = parse_timezone(name)?;
    let offset = Utc::now().with_timezone(&tz).offset().fix();
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    Some(format!("UTC{}{:02}:{:02}", sign, secs / 3600, (secs % 3600) / 60))
}

/// Resolves coordinates to IANA names through the provider, falling back to
/// the offline table.
#[derive(Clone)]
pub struct TimezoneResolver {
    provider: Arc<dyn PlaceProvider>,
}

impl TimezoneResolver {
    pub fn new(provider: Arc<dyn PlaceProvider>) -> Self {
        Self { provider }
    }

    pub async fn resolve(&self, coord: Coordinate) -> String {
        match self.provider.timezone(coord).await {
            Ok(name) => match parse_timezone(&name) {
                Some(tz) => {
                    debug!(path = "provider", lat = coord.lat, lng = coord.lng, timezone = %tz.name(), "timezone resolved");
                    tz.name().to_string()
                }
                None => {
                    let fallback = approximate(coord);
                    warn!(path = "fallback", returned = %name, timezone = fallback, "provider returned unknown timezone");
                    fallback.to_string()
                }
            },
            Err(e) => {
                let fallback = approximate(coord);
                warn!(path = "fallback", error = %e, timezone = fallback, "timezone lookup failed");
                fallback.to_string()
            }
        }
    }

    /// Timezone for text that never got a coordinate.
    pub fn resolve_text(&self, text: &str) -> String {
        let tz = approximate_for_text(text);
        debug!(path = "fallback", text, timezone = tz, "timezone approximated from text");
        tz.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::testing::FakeProvider;
    use crate::location::types::ProviderError;

    #[test]
    fn test_home_region_boxes() {
        assert_eq!(approximate(Coordinate::new(-6.2088, 106.8456)), "Asia/Jakarta");
        assert_eq!(approximate(Coordinate::new(-8.6500, 115.2167)), "Asia/Makassar");
        assert_eq!(approximate(Coordinate::new(-2.5337, 140.7181)), "Asia/Jayapura");
    }

    #[test]
    fn test_city_boxes_take_precedence() {
        assert_eq!(approximate(Coordinate::new(1.3521, 103.8198)), "Asia/Singapore");
        assert_eq!(approximate(Coordinate::new(3.1390, 101.6869)), "Asia/Kuala_Lumpur");
        assert_eq!(approximate(Coordinate::new(35.6762, 139.6503)), "Asia/Tokyo");
    }

    #[test]
    fn test_neighbours_inside_indonesian_bands() {
        // Penang, Malacca, Kuching, Bandar Seri Begawan, Dili
        assert_eq!(approximate(Coordinate::new(5.4141, 100.3288)), "Asia/Kuala_Lumpur");
        assert_eq!(approximate(Coordinate::new(2.1896, 102.2501)), "Asia/Kuala_Lumpur");
        assert_eq!(approximate(Coordinate::new(1.5535, 110.3593)), "Asia/Kuching");
        assert_eq!(approximate(Coordinate::new(4.9031, 114.9398)), "Asia/Brunei");
        assert_eq!(approximate(Coordinate::new(-8.5569, 125.5603)), "Asia/Dili");
        assert_eq!(utc_offset_label(approximate(Coordinate::new(1.5535, 110.3593))).as_deref(), Some("UTC+08:00"));
    }

    #[test]
    fn test_indonesian_border_cities_stay_indonesian() {
        // Medan, Dumai, Bagansiapiapi, Pontianak, Atambua, Nunukan
        assert_eq!(approximate(Coordinate::new(3.5952, 98.6722)), "Asia/Jakarta");
        assert_eq!(approximate(Coordinate::new(1.6666, 101.4478)), "Asia/Jakarta");
        assert_eq!(approximate(Coordinate::new(2.1597, 100.8090)), "Asia/Jakarta");
        assert_eq!(approximate(Coordinate::new(-0.0263, 109.3425)), "Asia/Jakarta");
        assert_eq!(approximate(Coordinate::new(-9.1061, 124.8925)), "Asia/Makassar");
        assert_eq!(approximate(Coordinate::new(4.1363, 117.6660)), "Asia/Makassar");
    }

    #[test]
    fn test_outside_all_boxes_is_default() {
        assert_eq!(approximate(Coordinate::new(48.8566, 2.3522)), DEFAULT_TIMEZONE);
        assert_eq!(approximate(Coordinate::new(0.0, 0.0)), DEFAULT_TIMEZONE);
    }

    #[test]
    fn test_every_table_zone_is_valid_iana() {
        for b in TZ_BOXES {
            assert!(parse_timezone(b.tz).is_some(), "{}", b.tz);
        }
        assert!(parse_timezone(DEFAULT_TIMEZONE).is_some());
    }

    #[test]
    fn test_approximate_for_text() {
        assert_eq!(approximate_for_text("Ubud, Bali"), "Asia/Makassar");
        assert_eq!(approximate_for_text("Marina Bay, Singapore"), "Asia/Singapore");
        assert_eq!(approximate_for_text("Kuala Lumpur City Centre"), "Asia/Kuala_Lumpur");
        assert_eq!(approximate_for_text("Waterfront, Kuching"), "Asia/Kuching");
        assert_eq!(approximate_for_text("Cristo Rei, Dili, Timor-Leste"), "Asia/Dili");
        assert_eq!(approximate_for_text("Balinese restaurant"), DEFAULT_TIMEZONE);
        assert_eq!(approximate_for_text("my office"), DEFAULT_TIMEZONE);
    }

    #[test]
    fn test_utc_offset_label() {
        assert_eq!(utc_offset_label("Asia/Jakarta").as_deref(), Some("UTC+07:00"));
        assert_eq!(utc_offset_label("Asia/Kolkata").as_deref(), Some("UTC+05:30"));
        assert!(utc_offset_label("Mars/Olympus").is_none());
    }

    #[tokio::test]
    async fn test_provider_path() {
        let provider = Arc::new(FakeProvider::new().with_timezone(Ok("Asia/Makassar".into())));
        let resolver = TimezoneResolver::new(provider);
        assert_eq!(resolver.resolve(Coordinate::new(-6.2, 106.8)).await, "Asia/Makassar");
    }

    #[tokio::test]
    async fn test_network_failure_falls_back_to_home_region() {
        let provider = Arc::new(
            FakeProvider::new().with_timezone(Err(ProviderError::Network("connection reset".into()))),
        );
        let resolver = TimezoneResolver::new(provider);
        assert_eq!(resolver.resolve(Coordinate::new(-6.2088, 106.8456)).await, "Asia/Jakarta");
        assert_eq!(resolver.resolve(Coordinate::new(-8.65, 115.2167)).await, "Asia/Makassar");
    }

    #[tokio::test]
    async fn test_unknown_provider_zone_falls_back() {
        let provider = Arc::new(FakeProvider::new().with_timezone(Ok("Not/AZone".into())));
        let resolver = TimezoneResolver::new(provider);
        assert_eq!(resolver.resolve(Coordinate::new(1.3521, 103.8198)).await, "Asia/Singapore");
    }
}
