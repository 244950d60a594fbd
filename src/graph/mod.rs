//! # Abstract Floor Graph
//!
//! The room graph is the first artifact of the pipeline: nodes are future
//! rooms, connections are future doors or hallways. `FloorGraph` owns both
//! vectors; nodes refer to their incident connections by index, so traversal
//! never clones or self-references.

pub mod analysis;
pub mod generate;

pub use analysis::{analyze, recompute_critical_path};
pub use generate::{
    generate_graph, CellularAutomataConfig, GraphAlgorithm, GridBasedConfig, GridConnectivity,
    HubAndSpokeConfig, MazeAlgorithm, MazeBasedConfig, MazeType,
};

use std::collections::VecDeque;

/// An unordered pair of connected node ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomConnection {
    a: i32,
    b: i32,
}

impl RoomConnection {
    /// Creates a connection between two distinct nodes. The pair is stored
    /// with the lower id first so equal connections compare equal.
    pub fn new(a: i32, b: i32) -> Self {
        debug_assert_ne!(a, b);
        Self {
            a: a.min(b),
            b: a.max(b),
        }
    }

    /// Lower endpoint id.
    pub fn a(&self) -> i32 {
        self.a
    }

    /// Higher endpoint id.
    pub fn b(&self) -> i32 {
        self.b
    }

    /// Returns the other endpoint when `id` is one of the two.
    pub fn other_node_id(&self, id: i32) -> Option<i32> {
        if id == self.a {
            Some(self.b)
        } else if id == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// Checks whether `id` is one of the endpoints.
    pub fn involves(&self, id: i32) -> bool {
        id == self.a || id == self.b
    }
}

/// A vertex of the abstract graph plus the attributes later stages fill in.
#[derive(Debug, Clone)]
pub struct RoomNode {
    id: i32,
    connection_indices: Vec<usize>,
    distance_from_start: i32,
    is_on_critical_path: bool,
    difficulty: f64,
}

impl RoomNode {
    fn new(id: i32) -> Self {
        Self {
            id,
            connection_indices: Vec::new(),
            distance_from_start: 0,
            is_on_critical_path: false,
            difficulty: 0.0,
        }
    }

    /// Node id; equal to the node's index in the graph.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Number of incident connections. A node with exactly one is a dead
    /// end.
    pub fn connection_count(&self) -> usize {
        self.connection_indices.len()
    }

    /// BFS distance from the start node, set by the analyzer.
    pub fn distance_from_start(&self) -> i32 {
        self.distance_from_start
    }

    /// Whether the node lies on the spawn-to-boss critical path.
    pub fn is_on_critical_path(&self) -> bool {
        self.is_on_critical_path
    }

    /// Scalar difficulty, set by the scorer (0 when scoring is disabled).
    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    /// Indices into the graph's connection vector.
    pub fn connection_indices(&self) -> &[usize] {
        &self.connection_indices
    }
}

/// Connected node/edge graph for one floor.
#[derive(Debug, Clone)]
pub struct FloorGraph {
    nodes: Vec<RoomNode>,
    connections: Vec<RoomConnection>,
    start_node_id: i32,
    boss_node_id: i32,
    critical_path: Vec<i32>,
}

impl FloorGraph {
    /// Creates a graph with `node_count` isolated nodes `0..node_count`.
    pub fn new(node_count: i32) -> Self {
        Self {
            nodes: (0..node_count).map(RoomNode::new).collect(),
            connections: Vec::new(),
            start_node_id: 0,
            boss_node_id: 0,
            critical_path: Vec::new(),
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes, indexed by id.
    pub fn nodes(&self) -> &[RoomNode] {
        &self.nodes
    }

    /// All connections.
    pub fn connections(&self) -> &[RoomConnection] {
        &self.connections
    }

    /// Node by id.
    pub fn node(&self, id: i32) -> Option<&RoomNode> {
        self.nodes.get(id as usize)
    }

    /// Start node id (always 0).
    pub fn start_node_id(&self) -> i32 {
        self.start_node_id
    }

    /// Boss node id, provisional after analysis, final after assignment.
    pub fn boss_node_id(&self) -> i32 {
        self.boss_node_id
    }

    /// Shortest spawn-to-boss path, ties broken by lowest node id.
    pub fn critical_path(&self) -> &[i32] {
        &self.critical_path
    }

    /// Position of a node on the critical path, if it lies on it.
    pub fn critical_path_index(&self, id: i32) -> Option<usize> {
        self.critical_path.iter().position(|&n| n == id)
    }

    /// Adds an undirected connection; duplicate pairs and self-loops are
    /// ignored. Returns true when the edge was added.
    pub fn add_connection(&mut self, a: i32, b: i32) -> bool {
        if a == b || self.are_connected(a, b) {
            return false;
        }
        let conn = RoomConnection::new(a, b);
        let index = self.connections.len();
        self.connections.push(conn);
        self.nodes[a as usize].connection_indices.push(index);
        self.nodes[b as usize].connection_indices.push(index);
        true
    }

    /// Checks whether two nodes share a connection.
    pub fn are_connected(&self, a: i32, b: i32) -> bool {
        if a == b {
            return false;
        }
        self.nodes
            .get(a as usize)
            .map(|node| {
                node.connection_indices
                    .iter()
                    .any(|&i| self.connections[i].involves(b))
            })
            .unwrap_or(false)
    }

    /// Neighbor ids of a node in ascending order.
    pub fn neighbors(&self, id: i32) -> Vec<i32> {
        let mut out: Vec<i32> = self.nodes[id as usize]
            .connection_indices
            .iter()
            .filter_map(|&i| self.connections[i].other_node_id(id))
            .collect();
        out.sort_unstable();
        out
    }

    /// BFS distances from `from` to every node; unreachable nodes get -1.
    pub fn bfs_distances(&self, from: i32) -> Vec<i32> {
        let mut dist = vec![-1; self.nodes.len()];
        let mut queue = VecDeque::new();
        dist[from as usize] = 0;
        queue.push_back(from);
        while let Some(current) = queue.pop_front() {
            for neighbor in self.neighbors(current) {
                if dist[neighbor as usize] < 0 {
                    dist[neighbor as usize] = dist[current as usize] + 1;
                    queue.push_back(neighbor);
                }
            }
        }
        dist
    }

    /// True when every node is reachable from node 0.
    pub fn is_connected(&self) -> bool {
        self.nodes.is_empty() || self.bfs_distances(0).iter().all(|&d| d >= 0)
    }

    pub(crate) fn set_boss_node(&mut self, id: i32) {
        self.boss_node_id = id;
    }

    pub(crate) fn set_critical_path(&mut self, path: Vec<i32>) {
        for node in &mut self.nodes {
            node.is_on_critical_path = false;
        }
        for &id in &path {
            self.nodes[id as usize].is_on_critical_path = true;
        }
        self.critical_path = path;
    }

    pub(crate) fn set_distances(&mut self, distances: &[i32]) {
        for (node, &d) in self.nodes.iter_mut().zip(distances) {
            node.distance_from_start = d;
        }
    }

    pub(crate) fn set_difficulty(&mut self, id: i32, difficulty: f64) {
        self.nodes[id as usize].difficulty = difficulty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph(n: i32) -> FloorGraph {
        let mut g = FloorGraph::new(n);
        for i in 1..n {
            g.add_connection(i - 1, i);
        }
        g
    }

    #[test]
    fn test_connection_other_node() {
        let conn = RoomConnection::new(7, 3);
        assert_eq!(conn.a(), 3);
        assert_eq!(conn.b(), 7);
        assert_eq!(conn.other_node_id(3), Some(7));
        assert_eq!(conn.other_node_id(7), Some(3));
        assert_eq!(conn.other_node_id(5), None);
    }

    #[test]
    fn test_add_connection_dedupes() {
        let mut g = FloorGraph::new(3);
        assert!(g.add_connection(0, 1));
        assert!(!g.add_connection(1, 0));
        assert!(!g.add_connection(1, 1));
        assert_eq!(g.connections().len(), 1);
        assert_eq!(g.node(0).unwrap().connection_count(), 1);
    }

    #[test]
    fn test_neighbors_sorted() {
        let mut g = FloorGraph::new(4);
        g.add_connection(2, 3);
        g.add_connection(2, 0);
        g.add_connection(2, 1);
        assert_eq!(g.neighbors(2), vec![0, 1, 3]);
    }

    #[test]
    fn test_bfs_distances() {
        let g = path_graph(5);
        assert_eq!(g.bfs_distances(0), vec![0, 1, 2, 3, 4]);
        assert_eq!(g.bfs_distances(2), vec![2, 1, 0, 1, 2]);
    }

    #[test]
    fn test_connectivity_check() {
        let mut g = FloorGraph::new(4);
        g.add_connection(0, 1);
        g.add_connection(2, 3);
        assert!(!g.is_connected());
        g.add_connection(1, 2);
        assert!(g.is_connected());
    }

    #[test]
    fn test_dead_end_detection() {
        let g = path_graph(3);
        assert_eq!(g.node(0).unwrap().connection_count(), 1);
        assert_eq!(g.node(1).unwrap().connection_count(), 2);
        assert_eq!(g.node(2).unwrap().connection_count(), 1);
    }
}
