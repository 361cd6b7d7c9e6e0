use std::{fs, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

use crate::{
    geocode::{GeocoderParams, NOMINATIM_SEARCH_URL},
    graph::GraphConfig,
    risk::RiskConfig,
};

const SAMPLE_GRAPH_PATH: &str = "backend/data/sample_graph.json";
const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("failed to read risk config {path}: {source}")]
    RiskFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid risk config {path}: {source}")]
    RiskParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Process configuration, read once at start-up and never mutated.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub graph_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub graph: GraphConfig,
    pub risk: RiskConfig,
    pub visibility_score: u32,
    /// Precomputed edge density percentage; bucketed and preferred over `visibility_score`.
    pub visibility_edge_density: Option<f64>,
    /// Fixes the hazard simulation; every request then replays this seed.
    pub risk_seed: Option<u64>,
    /// `None` disables free-text endpoints.
    pub geocoder: Option<GeocoderParams>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, `std::env` in production.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let graph_path = lookup("GRAPH_JSON")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(SAMPLE_GRAPH_PATH));

        let bind_addr = match lookup("BIND_ADDR") {
            Some(addr) => parse_value("BIND_ADDR", &addr)?,
            None => {
                let port = optional(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT);
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let defaults = GraphConfig::default();
        let graph = GraphConfig {
            max_snap_distance_km: distance(&lookup, "MAX_SNAP_KM")?.unwrap_or(defaults.max_snap_distance_km),
            search_margin_m: distance(&lookup, "SEARCH_MARGIN_M")?.unwrap_or(defaults.search_margin_m),
            min_search_radius_m: distance(&lookup, "SEARCH_RADIUS_MIN_M")?
                .unwrap_or(defaults.min_search_radius_m),
            max_search_radius_m: distance(&lookup, "SEARCH_RADIUS_MAX_M")?
                .unwrap_or(defaults.max_search_radius_m),
        };
        if graph.min_search_radius_m > graph.max_search_radius_m {
            return Err(ConfigError::Invalid {
                key: "SEARCH_RADIUS_MIN_M",
                value: graph.min_search_radius_m.to_string(),
            });
        }

        let risk = match lookup("RISK_CONFIG") {
            Some(path) => load_risk_config(PathBuf::from(path))?,
            None => RiskConfig::default(),
        };

        let geocoder = if optional::<bool>(&lookup, "GEOCODER_DISABLED")?.unwrap_or(false) {
            None
        } else {
            let defaults = GeocoderParams::default();
            Some(GeocoderParams {
                base_url: lookup("GEOCODER_URL").unwrap_or_else(|| NOMINATIM_SEARCH_URL.to_string()),
                user_agent: lookup("GEOCODER_USER_AGENT").unwrap_or(defaults.user_agent),
                timeout: optional(&lookup, "GEOCODER_TIMEOUT_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.timeout),
            })
        };

        Ok(Self {
            graph_path,
            bind_addr,
            graph,
            risk,
            visibility_score: optional(&lookup, "VISIBILITY_SCORE")?.unwrap_or(0),
            visibility_edge_density: optional(&lookup, "VISIBILITY_EDGE_DENSITY")?,
            risk_seed: optional(&lookup, "RISK_SEED")?,
            geocoder,
        })
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn optional<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(key).map(|value| parse_value(key, &value)).transpose()
}

/// Finite and non-negative; `NaN` would otherwise parse as a valid f64.
fn distance(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<f64>, ConfigError> {
    match optional::<f64>(lookup, key)? {
        Some(value) if !value.is_finite() || value < 0.0 => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
        value => Ok(value),
    }
}

fn load_risk_config(path: PathBuf) -> Result<RiskConfig, ConfigError> {
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(source) => return Err(ConfigError::RiskFile { path, source }),
    };
    serde_json::from_str(&content).map_err(|source| ConfigError::RiskParse { path, source })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.graph_path, PathBuf::from(SAMPLE_GRAPH_PATH));
        assert_eq!(cfg.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(cfg.graph, GraphConfig::default());
        assert_eq!(cfg.risk, RiskConfig::default());
        assert_eq!(cfg.visibility_score, 0);
        assert_eq!(cfg.visibility_edge_density, None);
        assert_eq!(cfg.risk_seed, None);
        assert_eq!(cfg.geocoder.unwrap().base_url, NOMINATIM_SEARCH_URL);
    }

    #[test]
    fn port_and_overrides() {
        let cfg = config(&[
            ("PORT", "8080"),
            ("VISIBILITY_SCORE", "10"),
            ("VISIBILITY_EDGE_DENSITY", "3.5"),
            ("RISK_SEED", "42"),
            ("SEARCH_RADIUS_MAX_M", "20000"),
            ("GEOCODER_DISABLED", "true"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.visibility_score, 10);
        assert_eq!(cfg.visibility_edge_density, Some(3.5));
        assert_eq!(cfg.risk_seed, Some(42));
        assert_eq!(cfg.graph.max_search_radius_m, 20_000.0);
        assert!(cfg.geocoder.is_none());
    }

    #[test]
    fn bind_addr_wins_over_port() {
        let cfg = config(&[("BIND_ADDR", "127.0.0.1:3000"), ("PORT", "9")]).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn malformed_values_are_reported() {
        let err = config(&[("VISIBILITY_SCORE", "foggy")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "VISIBILITY_SCORE", .. }));

        let err = config(&[("SEARCH_RADIUS_MIN_M", "5000"), ("SEARCH_RADIUS_MAX_M", "1000")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SEARCH_RADIUS_MIN_M", .. }));
    }

    #[test]
    fn distances_must_be_finite_and_non_negative() {
        for (key, value) in [
            ("SEARCH_RADIUS_MIN_M", "NaN"),
            ("SEARCH_RADIUS_MAX_M", "nan"),
            ("SEARCH_MARGIN_M", "inf"),
            ("MAX_SNAP_KM", "-1"),
        ] {
            let err = config(&[(key, value)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { key: k, .. } if k == key),
                "{key}={value}: {err}"
            );
        }

        let cfg = config(&[("SEARCH_MARGIN_M", "0")]).unwrap();
        assert_eq!(cfg.graph.search_margin_m, 0.0);
    }

    #[test]
    fn risk_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk.json");
        fs::write(&path, r#"{"blackspot_probability": 0.0, "high_speed_weight": 12}"#).unwrap();

        let cfg = config(&[("RISK_CONFIG", path.to_str().unwrap())]).unwrap();
        assert_eq!(cfg.risk.blackspot_probability, 0.0);
        assert_eq!(cfg.risk.high_speed_weight, 12);
        assert_eq!(cfg.risk.poor_lighting_weight, 15);

        let missing = config(&[("RISK_CONFIG", "/nonexistent/risk.json")]).unwrap_err();
        assert!(matches!(missing, ConfigError::RiskFile { .. }));

        fs::write(&path, "not json").unwrap();
        let broken = config(&[("RISK_CONFIG", path.to_str().unwrap())]).unwrap_err();
        assert!(matches!(broken, ConfigError::RiskParse { .. }));
    }
}
