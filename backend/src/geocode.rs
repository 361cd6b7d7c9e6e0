use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::Coordinate;

pub const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocoder error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("no match for location {0:?}")]
    NotFound(String),
    #[error("geocoder returned an unreadable coordinate: {0}")]
    InvalidCoordinate(String),
    #[error("location {0:?} is not a lat,lon pair and geocoding is disabled")]
    Disabled(String),
}

/// Parses `"lat,lon"`. Anything else, including out-of-range values, is `None`.
pub fn parse_lat_lon(text: &str) -> Option<Coordinate> {
    let (lat, lon) = text.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    let valid = lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0;
    valid.then_some(Coordinate { lat, lon })
}

#[derive(Debug, Clone)]
pub struct GeocoderParams {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for GeocoderParams {
    fn default() -> Self {
        Self {
            base_url: NOMINATIM_SEARCH_URL.to_string(),
            user_agent: concat!("saferoute/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Nominatim-compatible free-text geocoder.
pub struct Geocoder {
    params: GeocoderParams,
    client: reqwest::Client,
}

impl Geocoder {
    pub fn new(params: GeocoderParams) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(params.user_agent.clone())
            .timeout(params.timeout)
            .build()?;
        Ok(Self { params, client })
    }

    pub async fn geocode(&self, query: &str) -> Result<Coordinate, GeocodeError> {
        let response = self
            .client
            .get(&self.params.base_url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Api { status, message });
        }

        let hits: Vec<SearchHit> = response.json().await?;
        debug!("geocoder returned {} hit(s) for {query:?}", hits.len());
        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NotFound(query.to_string()))?;
        coordinate_from_hit(&hit)
    }
}

fn coordinate_from_hit(hit: &SearchHit) -> Result<Coordinate, GeocodeError> {
    parse_lat_lon(&format!("{},{}", hit.lat, hit.lon))
        .ok_or_else(|| GeocodeError::InvalidCoordinate(format!("{},{}", hit.lat, hit.lon)))
}

/// Coordinates are taken as-is; free text goes through the geocoder.
pub async fn resolve_endpoint(text: &str, geocoder: Option<&Geocoder>) -> Result<Coordinate, GeocodeError> {
    if let Some(coord) = parse_lat_lon(text) {
        return Ok(coord);
    }
    match geocoder {
        Some(geocoder) => geocoder.geocode(text.trim()).await,
        None => Err(GeocodeError::Disabled(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinate_pairs() {
        assert_eq!(parse_lat_lon("30.34,76.38"), Some(Coordinate::new(30.34, 76.38)));
        assert_eq!(parse_lat_lon(" -12.5 , 130 "), Some(Coordinate::new(-12.5, 130.0)));
    }

    #[test]
    fn rejects_non_coordinates() {
        assert_eq!(parse_lat_lon("Patiala, Punjab"), None);
        assert_eq!(parse_lat_lon("30.34"), None);
        assert_eq!(parse_lat_lon("30.34,76.38,1"), None);
        assert_eq!(parse_lat_lon("95.0,10.0"), None);
        assert_eq!(parse_lat_lon("10.0,-181"), None);
        assert_eq!(parse_lat_lon("NaN,1"), None);
    }

    #[test]
    fn hit_coordinates_are_validated() {
        let hit = SearchHit {
            lat: "30.3398".into(),
            lon: "76.3869".into(),
        };
        assert_eq!(coordinate_from_hit(&hit).unwrap(), Coordinate::new(30.3398, 76.3869));

        let bad = SearchHit {
            lat: "north".into(),
            lon: "76".into(),
        };
        assert!(matches!(coordinate_from_hit(&bad), Err(GeocodeError::InvalidCoordinate(_))));
    }

    #[tokio::test]
    async fn free_text_without_geocoder_is_disabled() {
        let coord = resolve_endpoint("30.34,76.38", None).await.unwrap();
        assert_eq!(coord, Coordinate::new(30.34, 76.38));

        let err = resolve_endpoint("Leela Bhawan, Patiala", None).await.unwrap_err();
        assert!(matches!(err, GeocodeError::Disabled(_)));
    }
}
