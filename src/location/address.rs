//! Display-name formatting for reverse-geocoded addresses.
//!
//! Reverse geocoding returns long strings such as
//! `"AB12+34, Kecamatan Cengkareng, Kota Jakarta Barat, Daerah Khusus Ibukota Jakarta 11730, Indonesia"`.
//! The formatter turns these into the short style the autocomplete list uses.
//! It never fails and is idempotent.

use regex::Regex;
use std::sync::LazyLock;

use super::types::AddressComponent;

/// Leading grid-locator code followed by a comma, e.g. `AB12+34, `.
static GRID_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[A-Za-z]{2}\d+[+-]?[A-Za-z0-9]*\s*,\s*").unwrap());

/// Regional administrative prefixes: special capital region, district,
/// sub-district, regency, province, village, city.
static REGIONAL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:daerah\s+khusus\s+ibukota|kecamatan|kelurahan|kabupaten|provinsi|desa|kota)\b\s*")
        .unwrap()
});

static TRAILING_POSTAL_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\b\d{5}\s*$").unwrap());

static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Formats addresses relative to a home country, which is left out of
/// display names.
#[derive(Debug, Clone)]
pub struct AddressFormatter {
    home_country: String,
    home_country_code: String,
}

impl Default for AddressFormatter {
    fn default() -> Self {
        Self::new("Indonesia", "ID")
    }
}

impl AddressFormatter {
    pub fn new(home_country: impl Into<String>, home_country_code: impl Into<String>) -> Self {
        Self {
            home_country: home_country.into(),
            home_country_code: home_country_code.into(),
        }
    }

    /// Format a reverse-geocode result.
    ///
    /// Structured components win when they produce anything; otherwise the
    /// raw formatted address is cleaned up. Place and building names from
    /// components are kept verbatim, since "Kota" or "Desa" can be part of
    /// a venue's real name.
    pub fn format(&self, formatted_address: &str, components: &[AddressComponent]) -> String {
        match self.assemble(components) {
            Some(assembled) => assembled,
            None => self.format_text(formatted_address),
        }
    }

    /// Clean a free-form address string.
    pub fn format_text(&self, address: &str) -> String {
        // Every pass only removes text, so this reaches a fixed point.
        let mut current = address.trim().to_string();
        loop {
            let next = self.clean_once(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn clean_once(&self, address: &str) -> String {
        let s = GRID_CODE.replace(address, "");
        let s = REGIONAL_PREFIX.replace_all(&s, "");

        let mut parts: Vec<String> = s
            .split(',')
            .map(|p| MULTI_SPACE.replace_all(p.trim(), " ").into_owned())
            .filter(|p| !p.is_empty())
            .collect();

        while parts.len() > 1 && parts.last().is_some_and(|p| self.is_home_country(p)) {
            parts.pop();
        }

        if let Some(last) = parts.pop() {
            let stripped = TRAILING_POSTAL_CODE.replace(&last, "").trim().to_string();
            if !stripped.is_empty() || parts.is_empty() {
                parts.push(stripped);
            }
        }

        parts.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
        parts.join(", ")
    }

    fn is_home_country(&self, part: &str) -> bool {
        let part = part.trim();
        !part.is_empty()
            && (part.eq_ignore_ascii_case(&self.home_country) || part.eq_ignore_ascii_case(&self.home_country_code))
    }

    /// Build a display name from structured components, or `None` when they
    /// yield nothing usable.
    fn assemble(&self, components: &[AddressComponent]) -> Option<String> {
        if components.is_empty() {
            return None;
        }

        let find = |tag: &str| {
            components
                .iter()
                .find(|c| c.has_type(tag) && !c.has_type("plus_code"))
                .map(|c| c.long_name.trim())
                .filter(|s| !s.is_empty())
        };
        let find_component = |tag: &str| components.iter().find(|c| c.has_type(tag));

        let mut parts: Vec<String> = Vec::new();

        if let Some(name) = find("point_of_interest")
            .or_else(|| find("establishment"))
            .or_else(|| find("premise"))
        {
            parts.push(name.to_string());
        }

        let street = match (find("street_number"), find("route")) {
            (Some(number), Some(route)) => Some(format!("{} {}", number, route)),
            (None, Some(route)) => Some(route.to_string()),
            _ => None,
        };
        if let Some(street) = street {
            parts.push(street);
        }

        let locality = find("locality")
            .map(strip_regional_prefixes)
            .or_else(|| find("administrative_area_level_2").map(strip_regional_prefixes))
            .filter(|s| !s.is_empty());
        if let Some(ref city) = locality {
            parts.push(city.clone());
        }

        if let Some(admin) = find_component("administrative_area_level_1") {
            let raw = if admin.short_name.trim().is_empty() {
                &admin.long_name
            } else {
                &admin.short_name
            };
            let province = strip_regional_prefixes(raw);
            let long_province = strip_regional_prefixes(&admin.long_name);
            let duplicates_city = locality.as_deref().is_some_and(|city| {
                city.eq_ignore_ascii_case(&province) || city.eq_ignore_ascii_case(&long_province)
            });
            if !province.is_empty() && !duplicates_city {
                parts.push(province);
            }
        }

        if let Some(country) = find_component("country") {
            let is_home = self.is_home_country(&country.long_name) || self.is_home_country(&country.short_name);
            if !is_home && !country.long_name.trim().is_empty() {
                parts.push(country.long_name.trim().to_string());
            }
        }

        // A city-state's locality and country share a name.
        parts.dedup_by(|a, b| a.eq_ignore_ascii_case(b));

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Remove regional administrative words ("Kota", "Kabupaten", ...).
pub fn strip_regional_prefixes(name: &str) -> String {
    let s = REGIONAL_PREFIX.replace_all(name, "");
    MULTI_SPACE.replace_all(s.trim(), " ").into_owned()
}
