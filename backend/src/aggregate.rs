use crate::{
    attributes::SegmentAttributes,
    models::{Coordinate, RiskStats, RouteResponse, SegmentDto},
    risk::{DecisionSource, Hazard, RiskCategory, RiskClassifier, RiskResult},
};

/// Read access to the road graph the path was computed on.
pub trait GraphAccessor {
    type NodeId: Copy + std::fmt::Debug;

    /// Attributes of the representative edge `u -> v`.
    fn edge_attributes(&self, u: Self::NodeId, v: Self::NodeId) -> Result<SegmentAttributes, GraphError>;

    fn node_coordinates(&self, node: Self::NodeId) -> Result<Coordinate, GraphError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("unknown node {0}")]
    UnknownNode(String),
    #[error("no edge between {0} and {1}")]
    MissingEdge(String, String),
}

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("no route found between these points")]
    NoRoute,
    #[error("graph lookup failed: {0}")]
    Graph(#[from] GraphError),
}

/// An ordered node path as produced by the path finder.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPath<N> {
    pub nodes: Vec<N>,
    /// Sum of edge lengths along `nodes`.
    pub length_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSegment {
    pub positions: Vec<Coordinate>,
    pub result: RiskResult,
}

impl RenderedSegment {
    pub fn category(&self) -> RiskCategory {
        self.result.category
    }

    pub fn info(&self) -> String {
        self.result.reasons().join(", ")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub low: usize,
    pub moderate: usize,
    pub high: usize,
}

impl CategoryCounts {
    fn record(&mut self, category: RiskCategory) {
        match category {
            RiskCategory::Low => self.low += 1,
            RiskCategory::Moderate => self.moderate += 1,
            RiskCategory::High => self.high += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.moderate + self.high
    }
}

/// Occurrences of every known hazard, zero included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HazardCounts([usize; Hazard::COUNT]);

impl HazardCounts {
    fn record(&mut self, hazard: Hazard) {
        self.0[hazard.index()] += 1;
    }

    pub fn get(&self, hazard: Hazard) -> usize {
        self.0[hazard.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Hazard, usize)> + '_ {
        Hazard::ALL.into_iter().map(|hazard| (hazard, self.get(hazard)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub segments: Vec<RenderedSegment>,
    pub stats: CategoryCounts,
    pub hazards: HazardCounts,
    pub total_distance_km: f64,
}

impl RouteSummary {
    pub fn into_response(self) -> RouteResponse {
        let segments = self
            .segments
            .iter()
            .map(|segment| SegmentDto {
                positions: segment.positions.iter().map(|c| c.to_lat_lon()).collect(),
                color: segment.result.color().to_string(),
                risk: segment.category().label().to_string(),
                info: segment.info(),
            })
            .collect();

        RouteResponse {
            segments,
            stats: RiskStats {
                high: self.stats.high,
                moderate: self.stats.moderate,
                low: self.stats.low,
            },
            hazards: self
                .hazards
                .iter()
                .map(|(hazard, count)| (hazard.label().to_string(), count))
                .collect(),
            distance: self.total_distance_km,
        }
    }
}

/// Per-request annotation context. Build a new one for every route; nothing
/// carries over between calls.
pub struct RouteAnnotator<'a, D> {
    classifier: &'a RiskClassifier,
    decisions: D,
    visibility: u32,
}

impl<'a, D: DecisionSource> RouteAnnotator<'a, D> {
    pub fn new(classifier: &'a RiskClassifier, decisions: D, visibility: u32) -> Self {
        Self {
            classifier,
            decisions,
            visibility,
        }
    }

    /// Classifies every edge of `path` and tallies categories and hazards.
    pub fn aggregate<G>(&mut self, path: &PlannedPath<G::NodeId>, graph: &G) -> Result<RouteSummary, AggregateError>
    where
        G: GraphAccessor + ?Sized,
    {
        if path.nodes.len() < 2 {
            return Err(AggregateError::NoRoute);
        }

        let mut segments = Vec::with_capacity(path.nodes.len() - 1);
        let mut stats = CategoryCounts::default();
        let mut hazards = HazardCounts::default();

        for pair in path.nodes.windows(2) {
            let (u, v) = (pair[0], pair[1]);
            let attrs = graph.edge_attributes(u, v)?;

            let positions = match &attrs.geometry {
                Some(geometry) => geometry.clone(),
                None => vec![graph.node_coordinates(u)?, graph.node_coordinates(v)?],
            };

            let result = self.classifier.classify(&attrs, self.visibility, &mut self.decisions);
            tracing::debug!(
                ?u,
                ?v,
                score = result.score,
                category = %result.category,
                "segment classified"
            );

            stats.record(result.category);
            for hazard in result.hazards() {
                hazards.record(hazard);
            }
            segments.push(RenderedSegment { positions, result });
        }

        let total_distance_km = round_2(path.length_m / 1000.0);
        tracing::info!(
            segments = segments.len(),
            high = stats.high,
            moderate = stats.moderate,
            low = stats.low,
            distance_km = total_distance_km,
            "route annotated"
        );

        Ok(RouteSummary {
            segments,
            stats,
            hazards,
            total_distance_km,
        })
    }
}

fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
