//! # Graph Analysis
//!
//! BFS distance labeling, provisional boss selection, and critical-path
//! extraction. The provisional boss is the node farthest from the start;
//! once the constraint solver pins the boss room type, the critical path is
//! recomputed for the assigned node.

use crate::graph::FloorGraph;
use crate::{WarrenError, WarrenResult};
use log::debug;

/// Populates `distance_from_start`, the provisional boss node, the critical
/// path, and the per-node critical-path flags.
pub fn analyze(graph: &mut FloorGraph) -> WarrenResult<()> {
    let distances = graph.bfs_distances(graph.start_node_id());
    if distances.iter().any(|&d| d < 0) {
        return Err(WarrenError::InvalidConfiguration(
            "graph analyzer: graph is not connected".to_string(),
        ));
    }
    graph.set_distances(&distances);

    // Provisional boss: maximum distance, ties by lowest id.
    let boss = (0..graph.node_count() as i32)
        .max_by_key(|&id| (distances[id as usize], -id))
        .expect("graph has at least two nodes");
    graph.set_boss_node(boss);

    let path = shortest_path(graph, &distances, boss);
    debug!(
        "graph analyzer: boss node {boss} at distance {}, critical path length {}",
        distances[boss as usize],
        path.len()
    );
    graph.set_critical_path(path);
    Ok(())
}

/// Re-targets the critical path at the node actually assigned the boss room
/// type. Distances are unchanged; path and flags are rewritten.
pub fn recompute_critical_path(graph: &mut FloorGraph, boss_id: i32) {
    if boss_id == graph.boss_node_id() && !graph.critical_path().is_empty() {
        return;
    }
    let distances: Vec<i32> = graph.nodes().iter().map(|n| n.distance_from_start()).collect();
    let path = shortest_path(graph, &distances, boss_id);
    graph.set_boss_node(boss_id);
    graph.set_critical_path(path);
}

/// Shortest start-to-target path. Each step walks from the target toward the
/// start through the lowest-id neighbor one BFS layer closer, which makes
/// tie-breaking by node id explicit.
fn shortest_path(graph: &FloorGraph, distances: &[i32], target: i32) -> Vec<i32> {
    let mut path = vec![target];
    let mut current = target;
    while current != graph.start_node_id() {
        let layer = distances[current as usize] - 1;
        let parent = graph
            .neighbors(current)
            .into_iter()
            .find(|&n| distances[n as usize] == layer)
            .expect("BFS layers are contiguous on a connected graph");
        path.push(parent);
        current = parent;
    }
    path.reverse();
    path
}
