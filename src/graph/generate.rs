//! # Graph Generation Algorithms
//!
//! Five ways to build the abstract room graph. Every variant yields a
//! connected graph with exactly `room_count` nodes and unique undirected
//! edges, and is a pure function of its inputs and the graph RNG stream.

use crate::graph::FloorGraph;
use crate::{WarrenError, WarrenResult};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Cell adjacency rule for grid-embedded algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridConnectivity {
    FourWay,
    EightWay,
}

/// Parameters for [`GraphAlgorithm::GridBased`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBasedConfig {
    pub grid_width: i32,
    pub grid_height: i32,
    pub connectivity: GridConnectivity,
}

/// Parameters for [`GraphAlgorithm::CellularAutomata`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellularAutomataConfig {
    /// A dead grid cell becomes alive with at least this many live neighbors.
    pub birth_threshold: u32,
    /// A live grid cell survives with at least this many live neighbors.
    pub survival_threshold: u32,
    /// Number of automaton iterations.
    pub iterations: u32,
}

/// Whether a maze stays a tree or gains loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MazeType {
    /// Exactly `|V| - 1` edges.
    Perfect,
    /// Extra loop edges added per the branching factor.
    Imperfect,
}

/// Maze construction algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MazeAlgorithm {
    Prims,
    Kruskals,
}

/// Parameters for [`GraphAlgorithm::MazeBased`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeBasedConfig {
    pub maze_type: MazeType,
    pub algorithm: MazeAlgorithm,
}

/// Parameters for [`GraphAlgorithm::HubAndSpoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubAndSpokeConfig {
    pub hub_count: i32,
    pub max_spoke_length: i32,
}

/// Algorithm selection for the abstract graph stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphAlgorithm {
    /// Random spanning tree plus branching edges. The default.
    SpanningTree,
    GridBased(GridBasedConfig),
    CellularAutomata(CellularAutomataConfig),
    MazeBased(MazeBasedConfig),
    HubAndSpoke(HubAndSpokeConfig),
}

impl Default for GraphAlgorithm {
    fn default() -> Self {
        GraphAlgorithm::SpanningTree
    }
}

/// Generates the abstract room graph.
///
/// `room_count` must be at least 2 and `branching_factor` must lie in
/// `[0, 1]`; both are validated again here because this entry point is
/// public.
pub fn generate_graph(
    room_count: i32,
    branching_factor: f32,
    rng: &mut StdRng,
    algorithm: &GraphAlgorithm,
) -> WarrenResult<FloorGraph> {
    if room_count < 2 {
        return Err(WarrenError::InvalidConfiguration(format!(
            "graph generator: room_count must be at least 2, got {room_count}"
        )));
    }
    if !(0.0..=1.0).contains(&branching_factor) {
        return Err(WarrenError::InvalidConfiguration(format!(
            "graph generator: branching_factor must lie in [0, 1], got {branching_factor}"
        )));
    }

    let graph = match algorithm {
        GraphAlgorithm::SpanningTree => spanning_tree(room_count, branching_factor, rng),
        GraphAlgorithm::GridBased(cfg) => grid_based(room_count, branching_factor, rng, cfg)?,
        GraphAlgorithm::CellularAutomata(cfg) => {
            cellular_automata(room_count, branching_factor, rng, cfg)
        }
        GraphAlgorithm::MazeBased(cfg) => maze_based(room_count, branching_factor, rng, cfg),
        GraphAlgorithm::HubAndSpoke(cfg) => {
            hub_and_spoke(room_count, branching_factor, rng, cfg)?
        }
    };

    debug_assert!(graph.is_connected());
    debug!(
        "graph generator: {} nodes, {} connections",
        graph.node_count(),
        graph.connections().len()
    );
    Ok(graph)
}

/// Random spanning tree: each node `1..n` connects to a uniformly random
/// earlier node, then extra non-tree edges are added with probability
/// `branching_factor`, capped at `ceil(n * branching_factor)`.
fn spanning_tree(n: i32, branching: f32, rng: &mut StdRng) -> FloorGraph {
    let mut graph = FloorGraph::new(n);
    for node in 1..n {
        let earlier = rng.gen_range(0..node);
        graph.add_connection(node, earlier);
    }

    let cap = (n as f32 * branching).ceil() as usize;
    let mut added = 0;
    'candidates: for a in 0..n {
        for b in (a + 1)..n {
            if added >= cap {
                break 'candidates;
            }
            if graph.are_connected(a, b) {
                continue;
            }
            if rng.gen::<f32>() < branching {
                graph.add_connection(a, b);
                added += 1;
            }
        }
    }
    graph
}

/// Candidate grid adjacencies among the first `n` row-major cells.
fn grid_adjacency(
    n: i32,
    width: i32,
    connectivity: GridConnectivity,
) -> Vec<(i32, i32)> {
    let offsets: &[(i32, i32)] = match connectivity {
        GridConnectivity::FourWay => &[(1, 0), (0, 1)],
        // Forward half of the 8-neighborhood; the reverse half would only
        // produce duplicate unordered pairs.
        GridConnectivity::EightWay => &[(1, 0), (0, 1), (1, 1), (-1, 1)],
    };
    let mut edges = Vec::new();
    for id in 0..n {
        let (x, y) = (id % width, id / width);
        for &(dx, dy) in offsets {
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || nx >= width {
                continue;
            }
            let other = ny * width + nx;
            if other < n {
                edges.push((id.min(other), id.max(other)));
            }
        }
    }
    edges.sort_unstable();
    edges.dedup();
    edges
}

/// Nodes embedded row-major in a grid; a BFS tree over grid adjacencies
/// guarantees connectivity, then leftover adjacencies are added per the
/// branching factor.
fn grid_based(
    n: i32,
    branching: f32,
    rng: &mut StdRng,
    cfg: &GridBasedConfig,
) -> WarrenResult<FloorGraph> {
    if cfg.grid_width <= 0 || cfg.grid_height <= 0 {
        return Err(WarrenError::InvalidConfiguration(format!(
            "graph generator: grid extents must be positive, got {}x{}",
            cfg.grid_width, cfg.grid_height
        )));
    }
    if cfg.grid_width * cfg.grid_height < n {
        return Err(WarrenError::InvalidConfiguration(format!(
            "graph generator: grid {}x{} cannot hold {n} rooms",
            cfg.grid_width, cfg.grid_height
        )));
    }

    let candidates = grid_adjacency(n, cfg.grid_width, cfg.connectivity);
    let mut graph = FloorGraph::new(n);

    // BFS from node 0 over the candidate adjacency.
    let mut adjacency = vec![Vec::new(); n as usize];
    for &(a, b) in &candidates {
        adjacency[a as usize].push(b);
        adjacency[b as usize].push(a);
    }
    for list in &mut adjacency {
        list.sort_unstable();
    }
    let mut visited = vec![false; n as usize];
    let mut queue = std::collections::VecDeque::new();
    visited[0] = true;
    queue.push_back(0i32);
    while let Some(current) = queue.pop_front() {
        for &next in &adjacency[current as usize] {
            if !visited[next as usize] {
                visited[next as usize] = true;
                graph.add_connection(current, next);
                queue.push_back(next);
            }
        }
    }

    for &(a, b) in &candidates {
        if !graph.are_connected(a, b) && rng.gen::<f32>() < branching {
            graph.add_connection(a, b);
        }
    }
    Ok(graph)
}

/// Binary-grid cellular automaton. Live cells become rooms (revived
/// row-major when the automaton leaves too few), rooms connect along grid
/// adjacency, and components are stitched together with repair edges.
fn cellular_automata(
    n: i32,
    branching: f32,
    rng: &mut StdRng,
    cfg: &CellularAutomataConfig,
) -> FloorGraph {
    let side = ((n as f64 * 2.0).sqrt().ceil() as i32).max(2);
    let len = (side * side) as usize;
    let mut alive: Vec<bool> = (0..len).map(|_| rng.gen_bool(0.5)).collect();

    for _ in 0..cfg.iterations {
        let mut next = alive.clone();
        for y in 0..side {
            for x in 0..side {
                let mut live_neighbors = 0;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < 0 || ny < 0 || nx >= side || ny >= side {
                            continue;
                        }
                        if alive[(ny * side + nx) as usize] {
                            live_neighbors += 1;
                        }
                    }
                }
                let index = (y * side + x) as usize;
                next[index] = if alive[index] {
                    live_neighbors >= cfg.survival_threshold
                } else {
                    live_neighbors >= cfg.birth_threshold
                };
            }
        }
        alive = next;
    }

    // Room sites: live cells row-major, padded with dead cells when the
    // automaton killed too many.
    let mut sites: Vec<i32> = (0..len as i32).filter(|&i| alive[i as usize]).collect();
    if (sites.len() as i32) < n {
        for i in 0..len as i32 {
            if !alive[i as usize] {
                sites.push(i);
            }
            if sites.len() as i32 == n {
                break;
            }
        }
        sites.sort_unstable();
    }
    sites.truncate(n as usize);

    let site_node = |site: i32| sites.iter().position(|&s| s == site).map(|p| p as i32);
    let mut graph = FloorGraph::new(n);
    for (node, &site) in sites.iter().enumerate() {
        let (x, y) = (site % side, site / side);
        for (dx, dy) in [(1, 0), (0, 1)] {
            let (nx, ny) = (x + dx, y + dy);
            if nx >= side || ny >= side {
                continue;
            }
            if let Some(other) = site_node(ny * side + nx) {
                graph.add_connection(node as i32, other);
            }
        }
    }

    // Stitch components: connect the spatially closest pair of nodes across
    // the main component and each stray component, lowest ids on ties.
    loop {
        let distances = graph.bfs_distances(0);
        let stray_set: Vec<i32> = (0..n).filter(|&id| distances[id as usize] < 0).collect();
        if stray_set.is_empty() {
            break;
        }
        let mut best: Option<(i32, i32, i32)> = None;
        for &s in &stray_set {
            let (sx, sy) = (sites[s as usize] % side, sites[s as usize] / side);
            for m in (0..n).filter(|&id| distances[id as usize] >= 0) {
                let (mx, my) = (sites[m as usize] % side, sites[m as usize] / side);
                let d = (sx - mx).abs() + (sy - my).abs();
                let candidate = (d, m, s);
                if best.map(|b| candidate < b).unwrap_or(true) {
                    best = Some(candidate);
                }
            }
        }
        let (_, main_node, stray_node) = best.expect("stray component implies a repair pair");
        graph.add_connection(main_node, stray_node);
    }

    // Branching pass over diagonal adjacencies the room pass skipped.
    for (node, &site) in sites.iter().enumerate() {
        let (x, y) = (site % side, site / side);
        for (dx, dy) in [(1, 1), (-1, 1)] {
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || nx >= side || ny >= side {
                continue;
            }
            if let Some(other) = site_node(ny * side + nx) {
                if !graph.are_connected(node as i32, other) && rng.gen::<f32>() < branching {
                    graph.add_connection(node as i32, other);
                }
            }
        }
    }
    graph
}

/// Maze over a near-square grid embedding via Prim's or Kruskal's algorithm.
fn maze_based(n: i32, branching: f32, rng: &mut StdRng, cfg: &MazeBasedConfig) -> FloorGraph {
    let width = (n as f64).sqrt().ceil() as i32;
    let candidates = grid_adjacency(n, width, GridConnectivity::FourWay);
    let mut graph = FloorGraph::new(n);

    match cfg.algorithm {
        MazeAlgorithm::Prims => {
            let mut adjacency = vec![Vec::new(); n as usize];
            for &(a, b) in &candidates {
                adjacency[a as usize].push(b);
                adjacency[b as usize].push(a);
            }
            for list in &mut adjacency {
                list.sort_unstable();
            }
            let mut in_maze = vec![false; n as usize];
            in_maze[0] = true;
            let mut frontier: Vec<(i32, i32)> =
                adjacency[0].iter().map(|&next| (0, next)).collect();
            while let Some(index) = (!frontier.is_empty())
                .then(|| rng.gen_range(0..frontier.len()))
            {
                let (from, to) = frontier.swap_remove(index);
                if in_maze[to as usize] {
                    continue;
                }
                in_maze[to as usize] = true;
                graph.add_connection(from, to);
                for &next in &adjacency[to as usize] {
                    if !in_maze[next as usize] {
                        frontier.push((to, next));
                    }
                }
            }
        }
        MazeAlgorithm::Kruskals => {
            let mut shuffled = candidates.clone();
            shuffled.shuffle(rng);
            let mut parent: Vec<i32> = (0..n).collect();
            fn find(parent: &mut [i32], mut x: i32) -> i32 {
                while parent[x as usize] != x {
                    parent[x as usize] = parent[parent[x as usize] as usize];
                    x = parent[x as usize];
                }
                x
            }
            for (a, b) in shuffled {
                let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
                if ra != rb {
                    parent[ra as usize] = rb;
                    graph.add_connection(a, b);
                }
            }
        }
    }

    if cfg.maze_type == MazeType::Imperfect {
        for &(a, b) in &candidates {
            if !graph.are_connected(a, b) && rng.gen::<f32>() < branching {
                graph.add_connection(a, b);
            }
        }
    }
    graph
}

/// Densely connected hubs with random-length spoke chains filling the
/// remaining nodes.
fn hub_and_spoke(
    n: i32,
    _branching: f32,
    rng: &mut StdRng,
    cfg: &HubAndSpokeConfig,
) -> WarrenResult<FloorGraph> {
    if cfg.hub_count < 1 || cfg.hub_count > n {
        return Err(WarrenError::InvalidConfiguration(format!(
            "graph generator: hub_count must lie in [1, {n}], got {}",
            cfg.hub_count
        )));
    }
    if cfg.max_spoke_length < 1 {
        return Err(WarrenError::InvalidConfiguration(format!(
            "graph generator: max_spoke_length must be at least 1, got {}",
            cfg.max_spoke_length
        )));
    }

    let mut graph = FloorGraph::new(n);
    for a in 0..cfg.hub_count {
        for b in (a + 1)..cfg.hub_count {
            graph.add_connection(a, b);
        }
    }

    let mut next = cfg.hub_count;
    while next < n {
        let hub = rng.gen_range(0..cfg.hub_count);
        let length = rng.gen_range(1..=cfg.max_spoke_length);
        let mut prev = hub;
        for _ in 0..length {
            if next >= n {
                break;
            }
            graph.add_connection(prev, next);
            prev = next;
            next += 1;
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    fn check_variant(algorithm: &GraphAlgorithm, n: i32, branching: f32, seed: u64) {
        let graph = generate_graph(n, branching, &mut rng(seed), algorithm).unwrap();
        assert_eq!(graph.node_count(), n as usize, "{algorithm:?}");
        assert!(graph.is_connected(), "{algorithm:?} must be connected");
        // Unordered edges must be unique.
        let mut pairs: Vec<(i32, i32)> = graph
            .connections()
            .iter()
            .map(|c| (c.a(), c.b()))
            .collect();
        pairs.sort_unstable();
        let before = pairs.len();
        pairs.dedup();
        assert_eq!(pairs.len(), before, "{algorithm:?} produced duplicate edges");
    }

    #[test]
    fn test_spanning_tree_properties() {
        for seed in 0..10 {
            check_variant(&GraphAlgorithm::SpanningTree, 12, 0.3, seed);
        }
    }

    #[test]
    fn test_spanning_tree_zero_branching_is_tree() {
        let graph = generate_graph(15, 0.0, &mut rng(7), &GraphAlgorithm::SpanningTree).unwrap();
        assert_eq!(graph.connections().len(), 14);
    }

    #[test]
    fn test_grid_based_properties() {
        for connectivity in [GridConnectivity::FourWay, GridConnectivity::EightWay] {
            let algorithm = GraphAlgorithm::GridBased(GridBasedConfig {
                grid_width: 4,
                grid_height: 4,
                connectivity,
            });
            for seed in 0..5 {
                check_variant(&algorithm, 13, 0.4, seed);
            }
        }
    }

    #[test]
    fn test_grid_too_small_rejected() {
        let algorithm = GraphAlgorithm::GridBased(GridBasedConfig {
            grid_width: 2,
            grid_height: 2,
            connectivity: GridConnectivity::FourWay,
        });
        assert!(generate_graph(5, 0.3, &mut rng(1), &algorithm).is_err());
    }

    #[test]
    fn test_cellular_automata_properties() {
        let algorithm = GraphAlgorithm::CellularAutomata(CellularAutomataConfig {
            birth_threshold: 5,
            survival_threshold: 3,
            iterations: 3,
        });
        for seed in 0..8 {
            check_variant(&algorithm, 14, 0.2, seed);
        }
    }

    #[test]
    fn test_perfect_maze_is_tree() {
        for algorithm in [MazeAlgorithm::Prims, MazeAlgorithm::Kruskals] {
            let variant = GraphAlgorithm::MazeBased(MazeBasedConfig {
                maze_type: MazeType::Perfect,
                algorithm,
            });
            let graph = generate_graph(16, 0.9, &mut rng(3), &variant).unwrap();
            assert_eq!(graph.connections().len(), 15, "{algorithm:?}");
            assert!(graph.is_connected());
        }
    }

    #[test]
    fn test_imperfect_maze_gains_loops() {
        let variant = GraphAlgorithm::MazeBased(MazeBasedConfig {
            maze_type: MazeType::Imperfect,
            algorithm: MazeAlgorithm::Kruskals,
        });
        // With branching at 1.0 every leftover grid adjacency becomes a loop.
        let graph = generate_graph(16, 1.0, &mut rng(3), &variant).unwrap();
        assert!(graph.connections().len() > 15);
        check_variant(&variant, 16, 1.0, 3);
    }

    #[test]
    fn test_hub_and_spoke_properties() {
        let algorithm = GraphAlgorithm::HubAndSpoke(HubAndSpokeConfig {
            hub_count: 3,
            max_spoke_length: 4,
        });
        for seed in 0..8 {
            check_variant(&algorithm, 20, 0.3, seed);
        }
        // Hubs are densely connected.
        let graph = generate_graph(20, 0.3, &mut rng(0), &algorithm).unwrap();
        assert!(graph.are_connected(0, 1));
        assert!(graph.are_connected(0, 2));
        assert!(graph.are_connected(1, 2));
    }

    #[test]
    fn test_determinism_per_variant() {
        let variants = [
            GraphAlgorithm::SpanningTree,
            GraphAlgorithm::MazeBased(MazeBasedConfig {
                maze_type: MazeType::Imperfect,
                algorithm: MazeAlgorithm::Prims,
            }),
            GraphAlgorithm::HubAndSpoke(HubAndSpokeConfig {
                hub_count: 2,
                max_spoke_length: 3,
            }),
        ];
        for variant in &variants {
            let a = generate_graph(10, 0.5, &mut rng(99), variant).unwrap();
            let b = generate_graph(10, 0.5, &mut rng(99), variant).unwrap();
            let edges = |g: &FloorGraph| {
                g.connections()
                    .iter()
                    .map(|c| (c.a(), c.b()))
                    .collect::<Vec<_>>()
            };
            assert_eq!(edges(&a), edges(&b), "{variant:?}");
        }
    }

    #[test]
    fn test_room_count_validation() {
        assert!(generate_graph(1, 0.3, &mut rng(0), &GraphAlgorithm::SpanningTree).is_err());
        assert!(generate_graph(-4, 0.3, &mut rng(0), &GraphAlgorithm::SpanningTree).is_err());
        assert!(generate_graph(5, 1.5, &mut rng(0), &GraphAlgorithm::SpanningTree).is_err());
    }
}
