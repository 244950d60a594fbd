//! # Hallway Routing
//!
//! Connects placed rooms along every graph edge. Adjacent rooms can share a
//! single door cell; everything else gets an A* route through free cells,
//! coalesced into straight segments.
//!
//! A* runs on the 4-connected lattice with unit step cost and the Manhattan
//! heuristic. Ties on the f-score are broken by lower g, then by
//! lexicographic cell order, so routes are reproducible.

use crate::config::HallwayMode;
use crate::graph::FloorGraph;
use crate::grid::{BoundingBox, Cell, Edge};
use crate::layout::{Door, PlacedRoom};
use crate::rooms::RoomKind;
use crate::{WarrenError, WarrenResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Margin added around the occupied bounding box when routing.
const ROUTE_MARGIN: i32 = 8;
/// Upper bound on cells expanded per A* search.
const MAX_EXPANDED_CELLS: usize = 20_000;
/// Door pairs tried per edge before giving up.
const MAX_DOOR_PAIRS: usize = 8;

/// A straight horizontal or vertical run of hallway cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HallwaySegment {
    pub start: Cell,
    pub end: Cell,
}

impl HallwaySegment {
    /// Creates a segment; the endpoints must be collinear on one axis.
    pub fn new(start: Cell, end: Cell) -> Self {
        debug_assert!(start.x == end.x || start.y == end.y);
        Self { start, end }
    }

    /// Enumerates every lattice point from `start` to `end` inclusive, one
    /// step at a time.
    pub fn cells(&self) -> Vec<Cell> {
        let step = Cell::new(
            (self.end.x - self.start.x).signum(),
            (self.end.y - self.start.y).signum(),
        );
        let mut cells = vec![self.start];
        let mut current = self.start;
        while current != self.end {
            current = current + step;
            cells.push(current);
        }
        cells
    }
}

/// A routed hallway between two doors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hallway {
    pub id: u32,
    pub segments: Vec<HallwaySegment>,
    pub door_a: Door,
    pub door_b: Door,
}

impl Hallway {
    /// The full cell path from `door_a.position` to `door_b.position`,
    /// with segment-shared endpoints deduplicated.
    pub fn cells(&self) -> Vec<Cell> {
        let mut cells = Vec::new();
        for segment in &self.segments {
            for cell in segment.cells() {
                if cells.last() != Some(&cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }
}

/// Doors and hallways produced for one floor.
#[derive(Debug, Default)]
pub(crate) struct RoutedFloor {
    pub doors: Vec<Door>,
    pub hallways: Vec<Hallway>,
}

/// Routes every graph connection per the hallway mode. The router is built
/// by the caller so the secret-passage stage can keep using it afterwards.
pub(crate) fn route_hallways(
    graph: &FloorGraph,
    router: &mut Router,
    mode: HallwayMode,
) -> WarrenResult<RoutedFloor> {
    let mut routed = RoutedFloor::default();

    for connection in graph.connections() {
        let (a, b) = (connection.a(), connection.b());
        if mode == HallwayMode::AsNeeded {
            if let Some((door_a, door_b)) = router.shared_door(a, b) {
                router.claim_door(door_a);
                routed.doors.push(door_a);
                routed.doors.push(door_b);
                continue;
            }
        }
        let hallway = router.route_edge(a, b, routed.hallways.len() as u32)?;
        routed.doors.push(hallway.door_a);
        routed.doors.push(hallway.door_b);
        routed.hallways.push(hallway);
    }

    debug!(
        "hallway router: {} doors, {} hallways",
        routed.doors.len(),
        routed.hallways.len()
    );
    Ok(routed)
}

/// Routing state shared between the main pass and the secret-passage
/// inserter.
pub(crate) struct Router {
    occupied: HashMap<Cell, i32>,
    door_sites: HashMap<i32, Vec<(Cell, Edge)>>,
    claimed_doors: HashSet<Cell>,
    hallway_cells: HashSet<Cell>,
    bounds: BoundingBox,
}

impl Router {
    pub(crate) fn new<T: RoomKind>(rooms: &[PlacedRoom<T>]) -> Self {
        let mut occupied = HashMap::new();
        let mut door_sites = HashMap::new();
        for room in rooms {
            for cell in room.world_cells() {
                occupied.insert(cell, room.node_id());
            }
            let sites = room
                .template()
                .door_sites()
                .into_iter()
                .map(|(cell, edge)| (room.position() + cell, edge))
                .collect();
            door_sites.insert(room.node_id(), sites);
        }
        let bounds = BoundingBox::of(occupied.keys().copied())
            .map(|bb| bb.inflated(ROUTE_MARGIN))
            .unwrap_or(BoundingBox {
                min: Cell::new(-ROUTE_MARGIN, -ROUTE_MARGIN),
                max: Cell::new(ROUTE_MARGIN, ROUTE_MARGIN),
            });
        Self {
            occupied,
            door_sites,
            claimed_doors: HashSet::new(),
            hallway_cells: HashSet::new(),
            bounds,
        }
    }

    /// A cell that may still become a door: outside every room, not an
    /// existing door, and not crossed by a routed hallway.
    fn is_free(&self, cell: Cell) -> bool {
        !self.occupied.contains_key(&cell)
            && !self.claimed_doors.contains(&cell)
            && !self.hallway_cells.contains(&cell)
    }

    pub(crate) fn claim_door(&mut self, door: Door) {
        self.claimed_doors.insert(door.position);
    }

    /// A single exterior cell that can serve as a door for both rooms, if
    /// the rooms are placed door-adjacent. Smallest cell wins.
    pub(crate) fn shared_door(&self, a: i32, b: i32) -> Option<(Door, Door)> {
        let sites_a = self.door_sites.get(&a)?;
        let sites_b = self.door_sites.get(&b)?;
        let mut best: Option<(Cell, Edge, Edge)> = None;
        for &(interior_a, edge_a) in sites_a {
            let cell = interior_a.neighbor(edge_a);
            if !self.is_free(cell) {
                continue;
            }
            for &(interior_b, edge_b) in sites_b {
                if interior_b.neighbor(edge_b) == cell {
                    let candidate = (cell, edge_a, edge_b);
                    if best.map(|current| candidate.0 < current.0).unwrap_or(true) {
                        best = Some(candidate);
                    }
                }
            }
        }
        best.map(|(cell, edge_a, edge_b)| {
            (
                Door {
                    position: cell,
                    edge: edge_a,
                    room_id: a,
                    connects_to_room_id: b,
                },
                Door {
                    position: cell,
                    edge: edge_b,
                    room_id: b,
                    connects_to_room_id: a,
                },
            )
        })
    }

    /// Free door candidates of a room, sorted by cell.
    fn door_candidates(&self, room: i32) -> Vec<(Cell, Edge)> {
        let mut candidates: Vec<(Cell, Edge)> = self
            .door_sites
            .get(&room)
            .map(|sites| {
                sites
                    .iter()
                    .map(|&(interior, edge)| (interior.neighbor(edge), edge))
                    .filter(|&(cell, _)| self.is_free(cell))
                    .collect()
            })
            .unwrap_or_default();
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }

    /// Routes one edge: picks the closest viable door pair and connects the
    /// two doors with an A* path.
    pub(crate) fn route_edge(&mut self, a: i32, b: i32, id: u32) -> WarrenResult<Hallway> {
        let candidates_a = self.door_candidates(a);
        let candidates_b = self.door_candidates(b);
        let mut pairs: Vec<(i32, Cell, Edge, Cell, Edge)> = Vec::new();
        for &(cell_a, edge_a) in &candidates_a {
            for &(cell_b, edge_b) in &candidates_b {
                if cell_a == cell_b {
                    continue;
                }
                pairs.push((
                    cell_a.manhattan_distance(cell_b),
                    cell_a,
                    edge_a,
                    cell_b,
                    edge_b,
                ));
            }
        }
        pairs.sort_unstable();

        for &(_, cell_a, edge_a, cell_b, edge_b) in pairs.iter().take(MAX_DOOR_PAIRS) {
            let blocked = |cell: Cell| {
                (self.occupied.contains_key(&cell) && cell != cell_a && cell != cell_b)
                    || (self.claimed_doors.contains(&cell) && cell != cell_a && cell != cell_b)
            };
            if let Some(path) = astar_route(cell_a, cell_b, self.bounds, &blocked) {
                let door_a = Door {
                    position: cell_a,
                    edge: edge_a,
                    room_id: a,
                    connects_to_room_id: b,
                };
                let door_b = Door {
                    position: cell_b,
                    edge: edge_b,
                    room_id: b,
                    connects_to_room_id: a,
                };
                self.claim_door(door_a);
                self.claim_door(door_b);
                self.hallway_cells.extend(path.iter().copied());
                return Ok(Hallway {
                    id,
                    segments: segments_from_path(&path),
                    door_a,
                    door_b,
                });
            }
        }

        Err(WarrenError::SpatialPlacement(format!(
            "hallway router: no route between rooms {a} and {b} \
             (tried {} door pairs)",
            pairs.len().min(MAX_DOOR_PAIRS)
        )))
    }
}

/// A* node ordered for a min-heap: lowest f first, ties by lower g, then by
/// lexicographic cell order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AStarNode {
    f: i32,
    g: i32,
    cell: Cell,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse ordering for min-heap behavior in BinaryHeap.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.g.cmp(&self.g))
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest 4-connected path from `start` to `goal` through non-blocked
/// cells inside `bounds`, inclusive of both endpoints.
pub(crate) fn astar_route(
    start: Cell,
    goal: Cell,
    bounds: BoundingBox,
    blocked: &dyn Fn(Cell) -> bool,
) -> Option<Vec<Cell>> {
    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut g_score: HashMap<Cell, i32> = HashMap::new();
    let mut expanded = 0usize;

    g_score.insert(start, 0);
    open.push(AStarNode {
        f: start.manhattan_distance(goal),
        g: 0,
        cell: start,
    });

    while let Some(node) = open.pop() {
        if node.cell == goal {
            let mut path = vec![goal];
            let mut current = goal;
            while let Some(&previous) = came_from.get(&current) {
                path.push(previous);
                current = previous;
            }
            path.reverse();
            return Some(path);
        }
        if node.g > *g_score.get(&node.cell).unwrap_or(&i32::MAX) {
            continue;
        }
        expanded += 1;
        if expanded > MAX_EXPANDED_CELLS {
            return None;
        }
        for neighbor in node.cell.neighbors() {
            if !bounds.contains(neighbor) {
                continue;
            }
            if neighbor != goal && blocked(neighbor) {
                continue;
            }
            let tentative = node.g + 1;
            if tentative < *g_score.get(&neighbor).unwrap_or(&i32::MAX) {
                came_from.insert(neighbor, node.cell);
                g_score.insert(neighbor, tentative);
                open.push(AStarNode {
                    f: tentative + neighbor.manhattan_distance(goal),
                    g: tentative,
                    cell: neighbor,
                });
            }
        }
    }
    None
}

/// Coalesces a cell path into maximal straight segments. Consecutive
/// segments share exactly the turning cell.
pub(crate) fn segments_from_path(path: &[Cell]) -> Vec<HallwaySegment> {
    if path.len() < 2 {
        return path
            .first()
            .map(|&c| vec![HallwaySegment::new(c, c)])
            .unwrap_or_default();
    }
    let mut segments = Vec::new();
    let mut run_start = path[0];
    let mut direction = path[1] - path[0];
    for window in path.windows(2).skip(1) {
        let step = window[1] - window[0];
        if step != direction {
            segments.push(HallwaySegment::new(run_start, window[0]));
            run_start = window[0];
            direction = step;
        }
    }
    segments.push(HallwaySegment::new(run_start, *path.last().unwrap()));
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_cells_inclusive() {
        let segment = HallwaySegment::new(Cell::new(0, 0), Cell::new(3, 0));
        assert_eq!(
            segment.cells(),
            vec![
                Cell::new(0, 0),
                Cell::new(1, 0),
                Cell::new(2, 0),
                Cell::new(3, 0)
            ]
        );
        let reverse = HallwaySegment::new(Cell::new(0, 2), Cell::new(0, 0));
        assert_eq!(reverse.cells().len(), 3);
    }

    #[test]
    fn test_segments_from_straight_path() {
        let path = vec![Cell::new(0, 0), Cell::new(1, 0), Cell::new(2, 0)];
        let segments = segments_from_path(&path);
        assert_eq!(segments, vec![HallwaySegment::new(Cell::new(0, 0), Cell::new(2, 0))]);
    }

    #[test]
    fn test_segments_share_turning_cell() {
        let path = vec![
            Cell::new(0, 0),
            Cell::new(1, 0),
            Cell::new(1, 1),
            Cell::new(1, 2),
        ];
        let segments = segments_from_path(&path);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].end, segments[1].start);
        assert_eq!(segments[0].end, Cell::new(1, 0));
    }

    #[test]
    fn test_hallway_cells_dedupe_joints() {
        let path = vec![
            Cell::new(0, 0),
            Cell::new(1, 0),
            Cell::new(1, 1),
        ];
        let door = |cell| Door {
            position: cell,
            edge: Edge::East,
            room_id: 0,
            connects_to_room_id: 1,
        };
        let hallway = Hallway {
            id: 0,
            segments: segments_from_path(&path),
            door_a: door(Cell::new(0, 0)),
            door_b: door(Cell::new(1, 1)),
        };
        assert_eq!(hallway.cells(), path);
    }

    #[test]
    fn test_astar_straight_line() {
        let bounds = BoundingBox {
            min: Cell::new(-5, -5),
            max: Cell::new(15, 15),
        };
        let path = astar_route(Cell::new(0, 0), Cell::new(4, 0), bounds, &|_| false).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], Cell::new(0, 0));
        assert_eq!(path[4], Cell::new(4, 0));
        for pair in path.windows(2) {
            assert!(pair[0].is_adjacent(pair[1]));
        }
    }

    #[test]
    fn test_astar_routes_around_walls() {
        let bounds = BoundingBox {
            min: Cell::new(-5, -5),
            max: Cell::new(15, 15),
        };
        // Vertical wall at x=2 with no opening between y=-5 and y=4.
        let blocked = |c: Cell| c.x == 2 && c.y <= 4;
        let path = astar_route(Cell::new(0, 0), Cell::new(4, 0), bounds, &blocked).unwrap();
        assert!(path.len() > 5);
        assert!(path.iter().all(|&c| !blocked(c)));
        for pair in path.windows(2) {
            assert!(pair[0].is_adjacent(pair[1]));
        }
    }

    #[test]
    fn test_astar_unreachable() {
        let bounds = BoundingBox {
            min: Cell::new(-2, -2),
            max: Cell::new(6, 6),
        };
        // Complete box around the goal.
        let blocked = |c: Cell| {
            (c.x - 4).abs().max((c.y - 4).abs()) == 1
        };
        assert!(astar_route(Cell::new(0, 0), Cell::new(4, 4), bounds, &blocked).is_none());
    }

    #[test]
    fn test_astar_is_deterministic() {
        let bounds = BoundingBox {
            min: Cell::new(-5, -5),
            max: Cell::new(20, 20),
        };
        let blocked = |c: Cell| c.x == 3 && (0..8).contains(&c.y);
        let a = astar_route(Cell::new(0, 2), Cell::new(9, 2), bounds, &blocked);
        let b = astar_route(Cell::new(0, 2), Cell::new(9, 2), bounds, &blocked);
        assert_eq!(a, b);
    }
}
