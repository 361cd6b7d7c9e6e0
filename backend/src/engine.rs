use std::{
    collections::{HashMap, hash_map::Entry},
    io::{self, Read},
    path::Path,
};

use kdtree::KdTree;
use kdtree::distance::squared_euclidean;
use petgraph::{
    algo::astar,
    graph::{DiGraph, EdgeReference, NodeIndex},
    visit::NodeFiltered,
};

use crate::{
    aggregate::{GraphAccessor, GraphError, PlannedPath},
    attributes::SegmentAttributes,
    graph::{GraphConfig, GraphFile, SearchArea},
    models::Coordinate,
    routing::{haversine_km, polyline_length_km},
};

/// Finds the length-weighted shortest path between two coordinates.
///
/// Implementations snap both coordinates to the nearest graph node and
/// return the node sequence together with its total length.
pub trait PathFinder: Send + Sync {
    type NodeId;

    fn shortest_path(&self, start: Coordinate, end: Coordinate) -> Result<PlannedPath<Self::NodeId>, PathError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to read graph file: {0}")]
    Io(#[from] io::Error),
    #[error("graph is empty")]
    EmptyGraph,
    #[error("node {0} is defined twice")]
    DuplicateNode(u64),
    #[error("edge references unknown node {0}")]
    MissingNode(u64),
    #[error("edge {from} -> {to} has an invalid length")]
    InvalidLength { from: u64, to: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("no road within {max_km} km of {lat:.5},{lon:.5}")]
    Unsnappable { lat: f64, lon: f64, max_km: f64 },
    #[error("no path between the resolved endpoints")]
    NoPath,
}

#[derive(Clone, Debug)]
struct NodeData {
    id: u64,
    coord: Coordinate,
}

#[derive(Clone, Debug)]
struct EdgeData {
    length_m: f64,
    attributes: SegmentAttributes,
}

/// Immutable road network shared by all requests.
pub struct RoadGraph {
    graph: DiGraph<NodeData, EdgeData>,
    spatial_index: KdTree<f64, usize, [f64; 2]>,
    config: GraphConfig,
    /// Largest factor keeping the great-circle heuristic below every
    /// `length_m`; 1.0 unless the file lists edges shorter than their chord.
    heuristic_scale: f64,
}

impl RoadGraph {
    pub fn from_file(path: impl AsRef<Path>, config: GraphConfig) -> Result<Self, EngineError> {
        let graph_file = GraphFile::read_from_path(path)?;
        Self::from_graph_file(graph_file, config)
    }

    pub fn from_reader(reader: impl Read, config: GraphConfig) -> Result<Self, EngineError> {
        let graph_file = GraphFile::from_reader(reader)?;
        Self::from_graph_file(graph_file, config)
    }

    pub fn from_graph_file(graph_file: GraphFile, config: GraphConfig) -> Result<Self, EngineError> {
        if graph_file.nodes.is_empty() {
            return Err(EngineError::EmptyGraph);
        }

        let mut graph = DiGraph::with_capacity(graph_file.nodes.len(), graph_file.edges.len() * 2);
        let mut id_to_index = HashMap::with_capacity(graph_file.nodes.len());
        let mut heuristic_scale: f64 = 1.0;

        for node in graph_file.nodes {
            let Entry::Vacant(slot) = id_to_index.entry(node.id) else {
                return Err(EngineError::DuplicateNode(node.id));
            };
            slot.insert(graph.add_node(NodeData {
                id: node.id,
                coord: Coordinate::new(node.lat, node.lon),
            }));
        }

        for edge in graph_file.edges {
            let from = *id_to_index
                .get(&edge.from)
                .ok_or(EngineError::MissingNode(edge.from))?;
            let to = *id_to_index
                .get(&edge.to)
                .ok_or(EngineError::MissingNode(edge.to))?;

            let length_m = match edge.length_m {
                Some(length) => length,
                None => {
                    let shape = match &edge.tags.geometry {
                        Some(geometry) => polyline_length_km(geometry),
                        None => haversine_km(graph[from].coord, graph[to].coord),
                    };
                    shape * 1000.0
                }
            };
            if !length_m.is_finite() || length_m < 0.0 {
                return Err(EngineError::InvalidLength {
                    from: edge.from,
                    to: edge.to,
                });
            }

            let chord_m = haversine_km(graph[from].coord, graph[to].coord) * 1000.0;
            if chord_m > 0.0 {
                heuristic_scale = heuristic_scale.min(length_m / chord_m);
            }

            let attributes = SegmentAttributes::from_raw(&edge.tags);
            if !edge.oneway {
                let mut reverse = attributes.clone();
                if let Some(geometry) = reverse.geometry.as_mut() {
                    geometry.reverse();
                }
                graph.add_edge(
                    to,
                    from,
                    EdgeData {
                        length_m,
                        attributes: reverse,
                    },
                );
            }
            graph.add_edge(from, to, EdgeData { length_m, attributes });
        }

        let spatial_index = Self::build_spatial_index(&graph);
        if heuristic_scale < 1.0 {
            tracing::warn!(heuristic_scale, "some edge lengths are shorter than their endpoint distance");
        }
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "road graph ready"
        );

        Ok(Self {
            graph,
            spatial_index,
            config,
            heuristic_scale,
        })
    }

    fn build_spatial_index(graph: &DiGraph<NodeData, EdgeData>) -> KdTree<f64, usize, [f64; 2]> {
        let mut tree = KdTree::new(2);
        for idx in graph.node_indices() {
            let coord = graph[idx].coord;
            let _ = tree.add([coord.lon, coord.lat], idx.index());
        }
        tree
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Node id as it appears in the graph file.
    pub fn source_id(&self, node: NodeIndex) -> Option<u64> {
        self.graph.node_weight(node).map(|n| n.id)
    }

    /// Nearest node, or `None` beyond `max_snap_distance_km`.
    pub fn closest_node(&self, target: Coordinate) -> Option<NodeIndex> {
        let nearest = self
            .spatial_index
            .nearest(&[target.lon, target.lat], 1, &squared_euclidean)
            .ok()?;

        let &(_, &idx) = nearest.first()?;
        let node = NodeIndex::new(idx);
        let distance_km = haversine_km(self.graph[node].coord, target);
        (distance_km <= self.config.max_snap_distance_km).then_some(node)
    }

    /// Shortest of the parallel edges `u -> v`.
    fn representative_edge(&self, u: NodeIndex, v: NodeIndex) -> Option<&EdgeData> {
        self.graph
            .edges_connecting(u, v)
            .map(|edge| edge.weight())
            .min_by(|a, b| a.length_m.total_cmp(&b.length_m))
    }

    fn label(&self, node: NodeIndex) -> String {
        match self.source_id(node) {
            Some(id) => id.to_string(),
            None => format!("#{}", node.index()),
        }
    }

    fn unsnappable(&self, coord: Coordinate) -> PathError {
        PathError::Unsnappable {
            lat: coord.lat,
            lon: coord.lon,
            max_km: self.config.max_snap_distance_km,
        }
    }
}

impl PathFinder for RoadGraph {
    type NodeId = NodeIndex;

    fn shortest_path(&self, start: Coordinate, end: Coordinate) -> Result<PlannedPath<NodeIndex>, PathError> {
        let origin = self.closest_node(start).ok_or_else(|| self.unsnappable(start))?;
        let goal = self.closest_node(end).ok_or_else(|| self.unsnappable(end))?;

        let area = SearchArea::around(start, end, &self.config);
        tracing::debug!(
            origin = %self.label(origin),
            goal = %self.label(goal),
            radius_m = area.radius_m,
            "searching path"
        );

        let inside = |idx: NodeIndex| idx == origin || idx == goal || area.contains(self.graph[idx].coord);
        let filtered = NodeFiltered::from_fn(&self.graph, inside);
        let target = self.graph[goal].coord;

        let (length_m, nodes) = astar(
            &filtered,
            origin,
            |node| node == goal,
            |edge: EdgeReference<EdgeData>| edge.weight().length_m,
            |node| haversine_km(self.graph[node].coord, target) * 1000.0 * self.heuristic_scale,
        )
        .ok_or(PathError::NoPath)?;

        Ok(PlannedPath { nodes, length_m })
    }
}

impl GraphAccessor for RoadGraph {
    type NodeId = NodeIndex;

    fn edge_attributes(&self, u: NodeIndex, v: NodeIndex) -> Result<SegmentAttributes, GraphError> {
        self.representative_edge(u, v)
            .map(|edge| edge.attributes.clone())
            .ok_or_else(|| GraphError::MissingEdge(self.label(u), self.label(v)))
    }

    fn node_coordinates(&self, node: NodeIndex) -> Result<Coordinate, GraphError> {
        self.graph
            .node_weight(node)
            .map(|n| n.coord)
            .ok_or_else(|| GraphError::UnknownNode(format!("#{}", node.index())))
    }
}
