use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::models::{Coordinate, RawEdgeTags};

const METERS_PER_DEGREE: f64 = 111_000.0;

/// On-disk road graph: nodes plus tagged edges, as exported from OSM.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphFile {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: u64,
    pub to: u64,
    /// Derived from the geometry when absent.
    #[serde(default)]
    pub length_m: Option<f64>,
    /// Two-way edges are traversable `to -> from` with the geometry reversed.
    #[serde(default)]
    pub oneway: bool,
    #[serde(flatten)]
    pub tags: RawEdgeTags,
}

impl GraphFile {
    pub fn read_from_path(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let path = path.as_ref();

        let compressed_path = path.with_extension("json.zst");
        if compressed_path.exists() {
            return Self::read_compressed(&compressed_path);
        }

        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, io::Error> {
        serde_json::from_reader(reader).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    pub fn read_compressed(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let file = File::open(path)?;
        let decoder = zstd::stream::read::Decoder::new(file)?;
        Self::from_reader(BufReader::new(decoder))
    }
}

/// Limits applied to a road graph query. Passed to the graph at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphConfig {
    /// Endpoints farther than this from any node cannot be routed.
    pub max_snap_distance_km: f64,
    /// Added around the half span between the endpoints.
    pub search_margin_m: f64,
    pub min_search_radius_m: f64,
    pub max_search_radius_m: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_snap_distance_km: 20.0,
            search_margin_m: 2_000.0,
            min_search_radius_m: 2_500.0,
            max_search_radius_m: 10_000.0,
        }
    }
}

/// Disk around the midpoint of a trip inside which paths are searched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchArea {
    pub center: Coordinate,
    pub radius_m: f64,
}

impl SearchArea {
    pub fn around(start: Coordinate, end: Coordinate, config: &GraphConfig) -> Self {
        let center = start.midpoint(end);

        let lat_span = (start.lat - end.lat).abs() * METERS_PER_DEGREE;
        let lon_span = (start.lon - end.lon).abs() * METERS_PER_DEGREE;
        let radius = lat_span.max(lon_span) / 2.0 + config.search_margin_m;
        // min/max instead of clamp: inverted or NaN bounds must not panic
        let radius_m = radius.min(config.max_search_radius_m).max(config.min_search_radius_m);

        Self { center, radius_m }
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        crate::routing::haversine_km(self.center, coord) * 1000.0 <= self.radius_m
    }
}
