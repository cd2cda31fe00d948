//! Server configuration from environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::geometry::{Point, point};
use crate::provider::mapbox::DEFAULT_API_BASE;
use crate::safety::DANGER_ZONE_RADIUS_KM;
use crate::search::{DEFAULT_PROVIDER_TIMEOUT, SearchSettings};
use crate::shift::SHIFT_OFFSET_DEG;

/// Times Square, the danger point the map starts with.
pub const DEFAULT_DANGER_ZONES: &str = "-73.9851,40.7589";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set for the {1} provider")]
    Missing(&'static str, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Mapbox,
    Graph,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mapbox" => Ok(ProviderKind::Mapbox),
            "graph" | "osm" => Ok(ProviderKind::Graph),
            other => Err(format!("unknown provider {:?}, expected mapbox or graph", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub provider: ProviderKind,
    pub mapbox_access_token: String,
    pub mapbox_api_base: String,
    pub osm_pbf_path: PathBuf,
    pub provider_timeout: Duration,
    pub danger_radius_km: f64,
    pub shift_offset_deg: f64,
    pub danger_zones: Vec<Point>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Missing keys fall back to defaults; present but malformed ones are an
    /// error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let provider = parsed(&lookup, "SAFEWALK_PROVIDER", ProviderKind::Mapbox)?;
        let mapbox_access_token = lookup("MAPBOX_ACCESS_TOKEN").unwrap_or_default();
        if provider == ProviderKind::Mapbox && mapbox_access_token.trim().is_empty() {
            return Err(ConfigError::Missing("MAPBOX_ACCESS_TOKEN", "mapbox"));
        }

        let timeout_ms = parsed(
            &lookup,
            "SAFEWALK_PROVIDER_TIMEOUT_MS",
            DEFAULT_PROVIDER_TIMEOUT.as_millis() as u64,
        )?;

        if timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "SAFEWALK_PROVIDER_TIMEOUT_MS",
                value: timeout_ms.to_string(),
                reason: "must be at least one millisecond".to_string(),
            });
        }

        let danger_radius_km = positive(
            parsed(&lookup, "SAFEWALK_DANGER_RADIUS_KM", DANGER_ZONE_RADIUS_KM)?,
            "SAFEWALK_DANGER_RADIUS_KM",
            "must be a positive number of kilometres",
        )?;
        let shift_offset_deg = positive(
            parsed(&lookup, "SAFEWALK_SHIFT_OFFSET_DEG", SHIFT_OFFSET_DEG)?,
            "SAFEWALK_SHIFT_OFFSET_DEG",
            "must be a positive number of degrees",
        )?;

        let zones_raw =
            lookup("SAFEWALK_DANGER_ZONES").unwrap_or_else(|| DEFAULT_DANGER_ZONES.to_string());
        let danger_zones = parse_zones(&zones_raw).map_err(|reason| ConfigError::Invalid {
            key: "SAFEWALK_DANGER_ZONES",
            value: zones_raw.clone(),
            reason,
        })?;

        Ok(Self {
            server_port: parsed(&lookup, "SAFEWALK_PORT", 3000)?,
            provider,
            mapbox_access_token,
            mapbox_api_base: lookup("MAPBOX_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            osm_pbf_path: lookup("SAFEWALK_OSM_PBF")
                .unwrap_or_else(|| "assets/patiala.osm.pbf".to_string())
                .into(),
            provider_timeout: Duration::from_millis(timeout_ms),
            danger_radius_km,
            shift_offset_deg,
            danger_zones,
        })
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            shift_offset_deg: self.shift_offset_deg,
            provider_timeout: self.provider_timeout,
        }
    }
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };

    let result: Result<T, T::Err> = value.trim().parse();
    result.map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}

fn positive(value: f64, key: &'static str, reason: &str) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        })
    }
}

/// `lon,lat;lon,lat;...`. An empty string is an empty set.
fn parse_zones(raw: &str) -> Result<Vec<Point>, String> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (lon, lat) = pair
                .split_once(',')
                .ok_or_else(|| format!("expected lon,lat but got {:?}", pair))?;
            let lon: f64 = lon.trim().parse().map_err(|e| format!("{}: {}", pair, e))?;
            let lat: f64 = lat.trim().parse().map_err(|e| format!("{}: {}", pair, e))?;
            point([lon, lat]).map_err(|e| e.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_the_search_constants() {
        let config = config(&[("MAPBOX_ACCESS_TOKEN", "pk.test")]).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.provider, ProviderKind::Mapbox);
        assert_eq!(config.danger_radius_km, DANGER_ZONE_RADIUS_KM);
        assert_eq!(config.shift_offset_deg, SHIFT_OFFSET_DEG);
        assert_eq!(config.provider_timeout, Duration::from_secs(10));
        assert_eq!(config.danger_zones, vec![Point::new(-73.9851, 40.7589)]);
        assert_eq!(config.mapbox_api_base, "https://api.mapbox.com");
    }

    #[test]
    fn mapbox_needs_a_token() {
        assert!(matches!(
            config(&[]),
            Err(ConfigError::Missing("MAPBOX_ACCESS_TOKEN", _))
        ));
        let graph = config(&[("SAFEWALK_PROVIDER", "graph"), ("SAFEWALK_OSM_PBF", "city.osm.pbf")])
            .unwrap();
        assert_eq!(graph.provider, ProviderKind::Graph);
        assert_eq!(graph.osm_pbf_path, PathBuf::from("city.osm.pbf"));
    }

    #[test]
    fn parses_zone_lists() {
        let config = config(&[
            ("SAFEWALK_PROVIDER", "graph"),
            ("SAFEWALK_DANGER_ZONES", " -74.3,40.2 ; -74.5, 40.1 ;"),
            ("SAFEWALK_PROVIDER_TIMEOUT_MS", "2500"),
        ])
        .unwrap();
        assert_eq!(
            config.danger_zones,
            vec![Point::new(-74.3, 40.2), Point::new(-74.5, 40.1)]
        );
        assert_eq!(config.search_settings().provider_timeout, Duration::from_millis(2500));

        let empty = super::parse_zones("").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn malformed_values_are_errors() {
        let base = [("SAFEWALK_PROVIDER", "graph")];
        for (key, value) in [
            ("SAFEWALK_PORT", "eighty"),
            ("SAFEWALK_PROVIDER", "google"),
            ("SAFEWALK_DANGER_RADIUS_KM", "-0.1"),
            ("SAFEWALK_DANGER_RADIUS_KM", "NaN"),
            ("SAFEWALK_SHIFT_OFFSET_DEG", "NaN"),
            ("SAFEWALK_SHIFT_OFFSET_DEG", "inf"),
            ("SAFEWALK_SHIFT_OFFSET_DEG", "-0.002"),
            ("SAFEWALK_SHIFT_OFFSET_DEG", "0"),
            ("SAFEWALK_PROVIDER_TIMEOUT_MS", "0"),
            ("SAFEWALK_DANGER_ZONES", "-74.3"),
            ("SAFEWALK_DANGER_ZONES", "abc,40.0"),
        ] {
            let mut vars = base.to_vec();
            vars.push((key, value));
            assert!(config(&vars).is_err(), "{}={} should be rejected", key, value);
        }
    }
}
