use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn midpoint(self, other: Self) -> Self {
        Self {
            lat: (self.lat + other.lat) / 2.0,
            lon: (self.lon + other.lon) / 2.0,
        }
    }

    /// `[lat, lon]`, the order map polylines expect.
    pub fn to_lat_lon(self) -> [f64; 2] {
        [self.lat, self.lon]
    }
}

/// Endpoints are either `"lat,lon"` or free text to be geocoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDto {
    pub positions: Vec<[f64; 2]>,
    pub color: String,
    pub risk: String,
    pub info: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskStats {
    #[serde(rename = "High")]
    pub high: usize,
    #[serde(rename = "Moderate")]
    pub moderate: usize,
    #[serde(rename = "Low")]
    pub low: usize,
}

impl RiskStats {
    pub fn total(&self) -> usize {
        self.high + self.moderate + self.low
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub segments: Vec<SegmentDto>,
    pub stats: RiskStats,
    pub hazards: BTreeMap<String, usize>,
    /// Kilometres, two decimals.
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}
