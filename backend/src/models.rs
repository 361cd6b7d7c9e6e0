use serde::{Deserialize, Serialize};

pub use shared::{ApiError, Coordinate, RiskStats, RouteRequest, RouteResponse, SegmentDto};

/// A tag value as found in OSM-derived graph files: `"2"`, `2` or `2.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Number(f64),
    Text(String),
}

impl TagValue {
    /// Integer reading of the tag. Numbers truncate toward zero, text must
    /// be a signed integer, so `"1.5"` and `"two"` are rejected while `1.5`
    /// reads as 1 and `"-1"` as -1.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            TagValue::Number(n) => truncate(*n),
            TagValue::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            TagValue::Number(n) => n.to_string(),
            TagValue::Text(s) => s.clone(),
        }
    }
}

fn truncate(n: f64) -> Option<i64> {
    n.is_finite().then(|| n.trunc() as i64)
}

/// Simplified ways keep the alternatives of every merged way as a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::One(value) => Some(value),
            OneOrMany::Many(values) => values.first(),
        }
    }
}

/// Edge tags exactly as they arrive, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEdgeTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lanes: Option<OneOrMany<TagValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highway: Option<OneOrMany<TagValue>>,
    /// Shape of the edge in traversal order, endpoints included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<Coordinate>>,
}
