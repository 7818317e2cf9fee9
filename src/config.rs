//! Runtime configuration.
//!
//! Defaults suit an Indonesian deployment. Values come from `VENUE_*`
//! environment variables and may be overridden by CLI flags.

use std::time::Duration;

use thiserror::Error;

use crate::location::disambiguator::{DEFAULT_NEAREST_LIMIT, DEFAULT_SEARCH_RADIUS_M};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocatorConfig {
    /// Maps API key. Without it the provider is reported unavailable.
    pub api_key: Option<String>,
    pub provider_base_url: Option<String>,
    /// Country left out of display names.
    pub home_country: String,
    pub home_country_code: String,
    /// Radius of the first nearby search on a map click.
    pub search_radius_m: u32,
    /// How many places the nearest-neighbour fallback considers.
    pub nearest_limit: usize,
    pub debounce: Duration,
    pub request_timeout: Duration,
    /// ISO country allow-list for autocomplete; empty means worldwide.
    pub autocomplete_countries: Vec<String>,
    /// Skip the network entirely.
    pub offline: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider_base_url: None,
            home_country: "Indonesia".into(),
            home_country_code: "ID".into(),
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            nearest_limit: DEFAULT_NEAREST_LIMIT,
            debounce: Duration::from_millis(300),
            request_timeout: Duration::from_secs(5),
            autocomplete_countries: vec![],
            offline: false,
        }
    }
}

impl LocatorConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary lookup, so tests don't touch the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
            match get(var) {
                Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                }),
                None => Ok(default),
            }
        };

        let search_radius_m = parse_u64("VENUE_SEARCH_RADIUS_M", u64::from(defaults.search_radius_m))?;
        let search_radius_m = u32::try_from(search_radius_m)
            .ok()
            .filter(|r| *r > 0)
            .ok_or_else(|| ConfigError::InvalidEnvVar {
                var: "VENUE_SEARCH_RADIUS_M".into(),
                reason: "must be between 1 and 4294967295".into(),
            })?;

        let nearest_limit = parse_u64("VENUE_NEAREST_LIMIT", defaults.nearest_limit as u64)? as usize;
        if nearest_limit == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: "VENUE_NEAREST_LIMIT".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            api_key: get("VENUE_MAPS_API_KEY"),
            provider_base_url: get("VENUE_MAPS_BASE_URL"),
            home_country: get("VENUE_HOME_COUNTRY").unwrap_or(defaults.home_country),
            home_country_code: get("VENUE_HOME_COUNTRY_CODE")
                .map(|c| c.to_uppercase())
                .unwrap_or(defaults.home_country_code),
            search_radius_m,
            nearest_limit,
            debounce: Duration::from_millis(parse_u64("VENUE_DEBOUNCE_MS", 300)?),
            request_timeout: Duration::from_secs(parse_u64("VENUE_REQUEST_TIMEOUT_SECS", 5)?),
            autocomplete_countries: get("VENUE_AUTOCOMPLETE_COUNTRIES")
                .map(|raw| parse_country_list(&raw))
                .unwrap_or_default(),
            offline: get("VENUE_OFFLINE").is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes")),
        })
    }
}

/// Parse `"id, sg"` into `["ID", "SG"]`.
pub fn parse_country_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<LocatorConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        LocatorConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, LocatorConfig::default());
        assert_eq!(config.search_radius_m, 300);
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("VENUE_MAPS_API_KEY", "abc123"),
            ("VENUE_HOME_COUNTRY", "Singapore"),
            ("VENUE_HOME_COUNTRY_CODE", "sg"),
            ("VENUE_SEARCH_RADIUS_M", "500"),
            ("VENUE_DEBOUNCE_MS", "150"),
            ("VENUE_AUTOCOMPLETE_COUNTRIES", "id, sg,,my"),
            ("VENUE_OFFLINE", "true"),
        ])
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.home_country, "Singapore");
        assert_eq!(config.home_country_code, "SG");
        assert_eq!(config.search_radius_m, 500);
        assert_eq!(config.debounce, Duration::from_millis(150));
        assert_eq!(config.autocomplete_countries, ["ID", "SG", "MY"]);
        assert!(config.offline);
    }

    #[test]
    fn test_blank_key_is_none() {
        let config = config_from(&[("VENUE_MAPS_API_KEY", "   ")]).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_invalid_numbers() {
        let err = config_from(&[("VENUE_SEARCH_RADIUS_M", "far")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "VENUE_SEARCH_RADIUS_M"));
        assert!(config_from(&[("VENUE_SEARCH_RADIUS_M", "0")]).is_err());
        assert!(config_from(&[("VENUE_NEAREST_LIMIT", "0")]).is_err());
    }
}
