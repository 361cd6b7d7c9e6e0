use std::fmt;

use crate::models::{Coordinate, OneOrMany, RawEdgeTags, TagValue};

/// Lane count assumed when the tag is missing or unreadable.
pub const DEFAULT_LANES: i64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighwayClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Residential,
    Service,
    Track,
    Unclassified,
    Other(String),
}

impl HighwayClass {
    pub fn parse(tag: &str) -> Self {
        match tag.trim() {
            "motorway" => HighwayClass::Motorway,
            "trunk" => HighwayClass::Trunk,
            "primary" => HighwayClass::Primary,
            "secondary" => HighwayClass::Secondary,
            "tertiary" => HighwayClass::Tertiary,
            "residential" => HighwayClass::Residential,
            "service" => HighwayClass::Service,
            "track" => HighwayClass::Track,
            "unclassified" => HighwayClass::Unclassified,
            other => HighwayClass::Other(other.to_string()),
        }
    }

    pub fn is_high_speed(&self) -> bool {
        matches!(
            self,
            HighwayClass::Motorway | HighwayClass::Trunk | HighwayClass::Primary
        )
    }

    pub fn is_poorly_lit(&self) -> bool {
        matches!(
            self,
            HighwayClass::Track | HighwayClass::Unclassified | HighwayClass::Service
        )
    }
}

impl fmt::Display for HighwayClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            HighwayClass::Motorway => "motorway",
            HighwayClass::Trunk => "trunk",
            HighwayClass::Primary => "primary",
            HighwayClass::Secondary => "secondary",
            HighwayClass::Tertiary => "tertiary",
            HighwayClass::Residential => "residential",
            HighwayClass::Service => "service",
            HighwayClass::Track => "track",
            HighwayClass::Unclassified => "unclassified",
            HighwayClass::Other(tag) => tag,
        };
        f.write_str(tag)
    }
}

/// Road metadata of one path edge in the strict shape the classifier reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentAttributes {
    /// `None` when absent or unparseable. Kept signed so odd values still
    /// count as narrow.
    pub lanes: Option<i64>,
    pub highway: Option<HighwayClass>,
    /// `None` means a straight line between the edge endpoints.
    pub geometry: Option<Vec<Coordinate>>,
}

impl SegmentAttributes {
    /// Only the first alternative of list-valued tags is considered.
    pub fn from_raw(raw: &RawEdgeTags) -> Self {
        let lanes = raw
            .lanes
            .as_ref()
            .and_then(OneOrMany::first)
            .and_then(TagValue::as_integer);

        let highway = raw
            .highway
            .as_ref()
            .and_then(OneOrMany::first)
            .map(|tag| HighwayClass::parse(&tag.as_text()));

        Self {
            lanes,
            highway,
            geometry: raw.geometry.clone(),
        }
    }

    pub fn lane_count(&self) -> i64 {
        self.lanes.unwrap_or(DEFAULT_LANES)
    }
}
