//! POI priority model.
//!
//! Every place-category tag carries a fixed importance score. Clicking near a
//! large venue should land on the venue rather than on a tenant inside it, so
//! big venues score high and get a wider acceptance radius.

/// Score for tags that are generic or not in the table.
pub const DEFAULT_PRIORITY: u8 = 5;

/// Anything closer than this (~10 m) is accepted regardless of priority.
pub const VERY_CLOSE: f64 = 0.0001;

// ─── Priority table ─────────────────────────────────────────────

const PRIORITY_TABLE: &[(&str, u8)] = &[
    // Large venues
    ("shopping_mall", 100),
    ("stadium", 100),
    ("airport", 100),
    ("university", 95),
    ("amusement_park", 90),
    ("hospital", 90),
    ("convention_center", 90),
    ("zoo", 85),
    // Mid-size venues
    ("museum", 75),
    ("train_station", 70),
    ("park", 70),
    ("transit_station", 65),
    ("tourist_attraction", 65),
    ("lodging", 60),
    ("city_hall", 60),
    ("subway_station", 60),
    ("bus_station", 55),
    ("place_of_worship", 55),
    ("mosque", 55),
    ("church", 55),
    ("hindu_temple", 55),
    ("department_store", 50),
    ("library", 50),
    ("school", 50),
    ("secondary_school", 45),
    ("movie_theater", 45),
    // Small businesses
    ("supermarket", 30),
    ("gas_station", 30),
    ("bank", 25),
    ("pharmacy", 25),
    ("gym", 25),
    ("restaurant", 20),
    ("cafe", 15),
    ("bar", 15),
    ("store", 15),
    ("clothing_store", 15),
    ("electronics_store", 15),
    ("bakery", 12),
    ("convenience_store", 12),
    ("beauty_salon", 10),
    ("hair_care", 10),
    ("meal_takeaway", 10),
    ("atm", 10),
];

/// Score of a single tag.
pub fn tag_priority(tag: &str) -> u8 {
    PRIORITY_TABLE
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, score)| *score)
        .unwrap_or(DEFAULT_PRIORITY)
}

/// Importance of a place, the maximum over its tags.
pub fn priority_of<S: AsRef<str>>(types: &[S]) -> u8 {
    types
        .iter()
        .map(|t| tag_priority(t.as_ref()))
        .max()
        .unwrap_or(DEFAULT_PRIORITY)
}

/// Maximum click distance (degrees) at which a place of `priority` is accepted.
pub fn distance_threshold(priority: u8) -> f64 {
    match priority {
        80..=u8::MAX => 0.002,
        50..=79 => 0.001,
        25..=49 => 0.0007,
        _ => 0.0005,
    }
}

/// Strict acceptance test used by the disambiguator.
pub fn accepts(priority: u8, distance: f64) -> bool {
    distance < distance_threshold(priority) || distance < VERY_CLOSE
}
