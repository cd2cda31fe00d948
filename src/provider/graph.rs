use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use geo::HaversineDistance;
use itertools::Itertools;
use osmpbf::{Element, ElementReader};
use petgraph::algo::astar;
use petgraph::graph::{Graph, NodeIndex};
use rstar::RTree;
use rstar::primitives::GeomWithData;

use super::RoutingProvider;
use crate::error::ProviderError;
use crate::geometry::{Point, Route};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoNode {
    pub lat: f64,
    pub lon: f64,
}

impl GeoNode {
    fn point(self) -> Point {
        Point::new(self.lon, self.lat)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WalkEdge {
    pub distance_meters: f64,
}

type IndexedNode = GeomWithData<[f64; 2], NodeIndex>;

/// Whether pedestrians may use a way with these OSM tags.
pub fn is_walkable(tags: &HashMap<&str, &str>) -> bool {
    let highway = tags.get("highway").copied().unwrap_or("");
    let foot = tags.get("foot").copied().unwrap_or("");
    let sidewalk = tags.get("sidewalk").copied().unwrap_or("");

    if foot == "no" {
        return false;
    }

    let is_walkable_type = matches!(
        highway,
        "footway"
            | "path"
            | "steps"
            | "pedestrian"
            | "living_street"
            | "residential"
            | "tertiary"
            | "service"
            | "unclassified"
    );

    let is_motor_road = matches!(highway, "motorway" | "trunk" | "primary" | "secondary");
    let foot_allowed = matches!(foot, "yes" | "designated" | "permissive");
    let has_sidewalk = matches!(sidewalk, "both" | "left" | "right" | "yes" | "separate");

    is_walkable_type || (is_motor_road && (foot_allowed || has_sidewalk))
}

/// Accumulates OSM nodes and walkable segments into a [`WalkGraph`].
#[derive(Default)]
pub struct WalkGraphBuilder {
    graph: Graph<GeoNode, WalkEdge>,
    osm_id_map: HashMap<i64, NodeIndex>,
}

impl WalkGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, id: i64, node: GeoNode) -> NodeIndex {
        let graph = &mut self.graph;
        *self
            .osm_id_map
            .entry(id)
            .or_insert_with(|| graph.add_node(node))
    }

    /// Add a two-way walkable segment between two OSM nodes.
    pub fn add_segment(&mut self, (id_a, a): (i64, GeoNode), (id_b, b): (i64, GeoNode)) {
        let idx_a = self.node(id_a, a);
        let idx_b = self.node(id_b, b);

        let edge = WalkEdge {
            distance_meters: a.point().haversine_distance(&b.point()),
        };

        self.graph.add_edge(idx_a, idx_b, edge);
        self.graph.add_edge(idx_b, idx_a, edge);
    }

    pub fn build(self) -> WalkGraph {
        let lon_scale = lon_scale(&self.graph);
        let entries: Vec<IndexedNode> = self
            .graph
            .node_indices()
            .map(|idx| {
                let node = self.graph[idx];
                GeomWithData::new(project(node.point(), lon_scale), idx)
            })
            .collect();

        WalkGraph {
            graph: self.graph,
            index: RTree::bulk_load(entries),
            lon_scale,
        }
    }
}

/// Length of a degree of longitude over a degree of latitude at the extract's
/// mean latitude. Extracts are city sized, so one factor holds across the graph.
fn lon_scale(graph: &Graph<GeoNode, WalkEdge>) -> f64 {
    if graph.node_count() == 0 {
        return 1.0;
    }
    let mean_lat = graph.node_weights().map(|n| n.lat).sum::<f64>() / graph.node_count() as f64;
    mean_lat.to_radians().cos().max(f64::EPSILON)
}

/// Equirectangular position used by the nearest-node index.
fn project(point: Point, lon_scale: f64) -> [f64; 2] {
    [point.x() * lon_scale, point.y()]
}

/// Offline pedestrian network with nearest-node snapping.
pub struct WalkGraph {
    graph: Graph<GeoNode, WalkEdge>,
    index: RTree<IndexedNode>,
    lon_scale: f64,
}

impl WalkGraph {
    pub fn from_pbf(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        tracing::info!("Parsing OSM PBF: {}", path.display());

        let mut temp_nodes = HashMap::new();

        // Pass 1: node coordinates
        let reader = ElementReader::from_path(path)?;
        reader.for_each(|element| match element {
            Element::Node(node) => {
                temp_nodes.insert(node.id(), GeoNode { lat: node.lat(), lon: node.lon() });
            }
            Element::DenseNode(node) => {
                temp_nodes.insert(node.id(), GeoNode { lat: node.lat(), lon: node.lon() });
            }
            _ => {}
        })?;

        tracing::info!("Loaded {} nodes. Building edges...", temp_nodes.len());

        // Pass 2: walkable ways
        let mut builder = WalkGraphBuilder::new();
        let reader = ElementReader::from_path(path)?;
        reader.for_each(|element| {
            if let Element::Way(way) = element {
                let tags: HashMap<&str, &str> = way.tags().collect();
                if !is_walkable(&tags) {
                    return;
                }

                for (id_a, id_b) in way.refs().tuple_windows() {
                    if let (Some(&a), Some(&b)) = (temp_nodes.get(&id_a), temp_nodes.get(&id_b)) {
                        builder.add_segment((id_a, a), (id_b, b));
                    }
                }
            }
        })?;

        let graph = builder.build();
        tracing::info!(
            "Walk graph built: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn find_nearest_node(&self, point: Point) -> Option<NodeIndex> {
        if !point.x().is_finite() || !point.y().is_finite() {
            return None;
        }
        self.index
            .nearest_neighbor(&project(point, self.lon_scale))
            .map(|entry| entry.data)
    }

    /// Node coordinates along the shortest walk between the nodes nearest to
    /// `origin` and `destination`.
    pub fn shortest_path(&self, origin: Point, destination: Point) -> Option<Vec<Point>> {
        let start = self.find_nearest_node(origin)?;
        let goal = self.find_nearest_node(destination)?;
        let goal_point = self.graph[goal].point();

        let (_cost, nodes) = astar(
            &self.graph,
            start,
            |n| n == goal,
            |e| e.weight().distance_meters,
            |n| self.graph[n].point().haversine_distance(&goal_point),
        )?;

        Some(nodes.into_iter().map(|n| self.graph[n].point()).collect())
    }
}

#[async_trait]
impl RoutingProvider for WalkGraph {
    fn name(&self) -> &'static str {
        "osm-graph"
    }

    async fn walking_route(
        &self,
        origin: Point,
        destination: Point,
    ) -> Result<Route, ProviderError> {
        let path = self
            .shortest_path(origin, destination)
            .ok_or(ProviderError::NoRoute)?;

        let mut points = Vec::with_capacity(path.len() + 2);
        points.push(origin);
        points.extend(path);
        points.push(destination);
        points.dedup();

        Ok(Route::new(points)?)
    }
}
